//! Raw exclusive and reentrant mutexes behind one checked handle.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::warn;
use parking_lot::lock_api::{GetThreadId, RawMutex as RawMutexTrait, RawReentrantMutex};
use parking_lot::{RawMutex, RawThreadId};

use crate::error::ReleaseError;

/// Capability of a [`MutexHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutexKind {
    /// One acquisition per owner; the owner's own trylock fails while held.
    Exclusive,
    /// The owner may acquire again; each acquisition needs its own release.
    Reentrant,
}

impl fmt::Display for MutexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MutexKind::Exclusive => "exclusive",
            MutexKind::Reentrant => "reentrant",
        })
    }
}

enum Raw {
    Exclusive(RawMutex),
    Reentrant(RawReentrantMutex<RawMutex, RawThreadId>),
}

/// A raw mutex without guards: acquire and release are separate calls, as
/// the measurement loops need them.
///
/// The handle counts holds and remembers the owning thread, so an unbalanced
/// or foreign [`release`](MutexHandle::release) is refused instead of reaching
/// the raw unlock.
pub struct MutexHandle {
    raw: Raw,
    // Both only written by the owning thread while the raw lock is held.
    holds: AtomicUsize,
    owner: AtomicUsize,
}

fn current_thread() -> usize {
    RawThreadId::INIT.nonzero_thread_id().get()
}

impl MutexHandle {
    /// Create an unowned mutex of the given kind.
    #[must_use]
    pub fn new(kind: MutexKind) -> Self {
        let raw = match kind {
            MutexKind::Exclusive => Raw::Exclusive(RawMutex::INIT),
            MutexKind::Reentrant => Raw::Reentrant(RawReentrantMutex::INIT),
        };
        MutexHandle {
            raw,
            holds: AtomicUsize::new(0),
            owner: AtomicUsize::new(0),
        }
    }

    /// The capability this mutex was created with.
    #[must_use]
    pub fn kind(&self) -> MutexKind {
        match self.raw {
            Raw::Exclusive(_) => MutexKind::Exclusive,
            Raw::Reentrant(_) => MutexKind::Reentrant,
        }
    }

    /// Non-blocking acquire. Returns immediately with whether the lock was taken.
    #[inline]
    pub fn try_acquire(&self) -> bool {
        let taken = match &self.raw {
            Raw::Exclusive(raw) => raw.try_lock(),
            Raw::Reentrant(raw) => raw.try_lock(),
        };
        if taken {
            self.acquired();
        }
        taken
    }

    /// Blocking acquire.
    ///
    /// On an exclusive mutex already held by the calling thread this never returns.
    pub fn acquire(&self) {
        match &self.raw {
            Raw::Exclusive(raw) => raw.lock(),
            Raw::Reentrant(raw) => raw.lock(),
        }
        self.acquired();
    }

    #[inline]
    fn acquired(&self) {
        if self.holds.fetch_add(1, Ordering::Relaxed) == 0 {
            self.owner.store(current_thread(), Ordering::Relaxed);
        }
    }

    /// Give up one hold. The last release frees the mutex.
    ///
    /// # Errors
    ///
    /// [`ReleaseError::NotHeld`] when the hold count is zero and
    /// [`ReleaseError::NotOwner`] when another thread holds the mutex. In both
    /// cases the mutex is left untouched.
    #[inline]
    pub fn release(&self) -> Result<(), ReleaseError> {
        let holds = self.holds.load(Ordering::Relaxed);
        if holds == 0 {
            return Err(ReleaseError::NotHeld);
        }
        if self.owner.load(Ordering::Relaxed) != current_thread() {
            return Err(ReleaseError::NotOwner);
        }

        if holds == 1 {
            self.owner.store(0, Ordering::Relaxed);
        }
        self.holds.store(holds - 1, Ordering::Relaxed);

        unsafe {
            // SAFETY: the hold count and owner checks above guarantee the calling thread holds the lock
            match &self.raw {
                Raw::Exclusive(raw) => raw.unlock(),
                Raw::Reentrant(raw) => raw.unlock(),
            }
        }
        Ok(())
    }

    /// Current hold count. Only meaningful when read by the owning thread.
    #[must_use]
    pub fn holds(&self) -> usize {
        self.holds.load(Ordering::Relaxed)
    }

    /// Whether any thread holds the mutex.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        match &self.raw {
            Raw::Exclusive(raw) => raw.is_locked(),
            Raw::Reentrant(raw) => raw.is_locked(),
        }
    }
}

impl fmt::Debug for MutexHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexHandle")
            .field("kind", &self.kind())
            .field("holds", &self.holds())
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl Drop for MutexHandle {
    fn drop(&mut self) {
        let holds = *self.holds.get_mut();
        if holds != 0 {
            warn!("{} mutex destroyed with {holds} outstanding holds", self.kind());
        }
    }
}
