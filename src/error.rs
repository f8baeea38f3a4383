//! Error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::mutex::MutexKind;
use crate::sink::Stream;

/// Crate wide result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A release that would have unbalanced the mutex. The mutex is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReleaseError {
    /// The hold count is already zero.
    #[error("release of a mutex that is not held")]
    NotHeld,

    /// The mutex is held by another thread.
    #[error("release of a mutex held by another thread")]
    NotOwner,
}

/// A result line that could not be read back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Not `<secs>.<nanos>` with nine nanosecond digits.
    #[error("invalid timestamp {0:?}")]
    Timespec(String),

    /// Not an unsigned 64 bit attempt count.
    #[error("invalid attempt count {0:?}")]
    Count(String),

    /// Wrong number of comma separated fields.
    #[error("expected 3 fields, got {0}")]
    Fields(usize),
}

/// Everything that can end a benchmark run.
#[derive(Debug, Error)]
pub enum Error {
    /// An output stream could not be opened for appending.
    #[error("cannot open {stream} stream {path:?}: {source}")]
    Open {
        /// Which stream.
        stream: Stream,
        /// Where it was looked for.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A record could not be appended.
    #[error("cannot write {stream} record: {source}")]
    Write {
        /// Which stream.
        stream: Stream,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A stream could not be read back.
    #[error("cannot read {path:?}: {source}")]
    Read {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// A line read back is not a record.
    #[error("{path:?} line {line}: {source}")]
    Parse {
        /// The file being read.
        path: PathBuf,
        /// One based line number.
        line: usize,
        /// What is wrong with the line.
        source: ParseError,
    },

    /// Unbalanced release.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// The self-cycle scenario was handed a mutex that cannot be re-entered.
    #[error("self-cycle needs a reentrant mutex, got {0}")]
    NotReentrant(MutexKind),

    /// Some acquisitions in the self-cycle loop failed, so the release count would not match.
    #[error("{failed} of {attempted} self-cycle acquisitions failed")]
    SelfAcquireFailed {
        /// Failed trylocks.
        failed: u64,
        /// Trylocks attempted.
        attempted: u64,
    },

    /// The worker thread panicked before reporting.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl Error {
    /// Process exit status for this error.
    ///
    /// Stream failures get the stream's own status so they are distinguishable,
    /// everything else exits with 4.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Open { stream, .. } | Error::Write { stream, .. } => stream.exit_code(),
            _ => 4,
        }
    }
}
