//! Timing samples and the append-only streams they are written to.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::debug;

use crate::clock::Timespec;
use crate::error::{Error, ParseError, Result};

/// One measured phase: when it started, how many operations ran, how long it took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimingSample {
    /// Timestamp at the start of the measured loop.
    pub start: Timespec,
    /// Operations performed in the loop.
    pub attempts: u64,
    /// Wall time spent in the loop.
    pub elapsed: Timespec,
}

impl TimingSample {
    /// Operations per second, `None` for an empty span.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> Option<f64> {
        let secs = std::time::Duration::from(self.elapsed).as_secs_f64();
        (secs > 0.0).then(|| self.attempts as f64 / secs)
    }
}

/// `<start_secs>.<start_nanos>, <attempts>, <elapsed_secs>.<elapsed_nanos>`
impl fmt::Display for TimingSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.start, self.attempts, self.elapsed)
    }
}

impl FromStr for TimingSample {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(',').map(str::trim).collect();
        let [start, attempts, elapsed] = fields.as_slice() else {
            return Err(ParseError::Fields(fields.len()));
        };
        Ok(TimingSample {
            start: start.parse()?,
            attempts: attempts
                .parse()
                .map_err(|_| ParseError::Count(attempts.to_string()))?,
            elapsed: elapsed.parse()?,
        })
    }
}

/// The output streams of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Trylock attempts against a mutex held by another thread (scenarios A and B).
    Contention,
    /// Self-cycle acquisitions.
    SelfAcquire,
    /// Self-cycle releases.
    SelfRelease,
}

impl Stream {
    /// All streams, in the order they are opened.
    pub const ALL: [Stream; 3] = [Stream::Contention, Stream::SelfAcquire, Stream::SelfRelease];

    /// File name inside the output directory.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Stream::Contention => "contention.data",
            Stream::SelfAcquire => "self_cycle_acquire.data",
            Stream::SelfRelease => "self_cycle_release.data",
        }
    }

    /// Process exit status when this stream fails.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Stream::Contention => 1,
            Stream::SelfAcquire => 2,
            Stream::SelfRelease => 3,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stream::Contention => "contention",
            Stream::SelfAcquire => "self-cycle acquire",
            Stream::SelfRelease => "self-cycle release",
        })
    }
}

/// Receives samples in trial order.
pub trait ResultSink {
    /// Append one sample.
    ///
    /// # Errors
    ///
    /// Implementation specific; file sinks report [`Error::Write`].
    fn append(&mut self, sample: &TimingSample) -> Result<()>;
}

impl ResultSink for Vec<TimingSample> {
    fn append(&mut self, sample: &TimingSample) -> Result<()> {
        self.push(*sample);
        Ok(())
    }
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn append(&mut self, sample: &TimingSample) -> Result<()> {
        (**self).append(sample)
    }
}

/// A stream file opened for appending, one line per sample.
///
/// Closed when dropped.
#[derive(Debug)]
pub struct FileSink {
    stream: Stream,
    path: PathBuf,
    writer: LineWriter<File>,
}

impl FileSink {
    /// Open (creating if absent) the file for `stream` inside `dir`.
    ///
    /// # Errors
    ///
    /// [`Error::Open`] when the file cannot be opened for appending.
    pub fn open(dir: &Path, stream: Stream) -> Result<Self> {
        let path = dir.join(stream.file_name());
        debug!("opening {stream} stream {}", path.display());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| Error::Open {
                stream,
                path: path.clone(),
                source,
            })?;
        Ok(FileSink {
            stream,
            path,
            writer: LineWriter::new(file),
        })
    }

    /// The stream this sink writes.
    #[must_use]
    pub fn stream(&self) -> Stream {
        self.stream
    }

    /// Where this sink writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for FileSink {
    fn append(&mut self, sample: &TimingSample) -> Result<()> {
        writeln!(self.writer, "{sample}").map_err(|source| Error::Write {
            stream: self.stream,
            source,
        })
    }
}

/// The three file streams of a full run.
#[derive(Debug)]
pub struct Sinks {
    /// Scenarios A and B.
    pub contention: FileSink,
    /// Scenario C acquisitions.
    pub self_acquire: FileSink,
    /// Scenario C releases.
    pub self_release: FileSink,
}

impl Sinks {
    /// Open all streams inside `dir`, in [`Stream::ALL`] order.
    ///
    /// # Errors
    ///
    /// [`Error::Open`] for the first stream that fails; streams already opened are closed again.
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Sinks {
            contention: FileSink::open(dir, Stream::Contention)?,
            self_acquire: FileSink::open(dir, Stream::SelfAcquire)?,
            self_release: FileSink::open(dir, Stream::SelfRelease)?,
        })
    }
}

/// Read every sample from a stream file, in file order. Blank lines are skipped.
///
/// # Errors
///
/// [`Error::Read`] when the file cannot be read, [`Error::Parse`] for a malformed line.
pub fn read_samples(path: &Path) -> Result<Vec<TimingSample>> {
    let read_error = |source| Error::Read {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(read_error)?);

    let mut samples = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(read_error)?;
        if line.trim().is_empty() {
            continue;
        }
        samples.push(line.parse::<TimingSample>().map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?);
    }
    Ok(samples)
}
