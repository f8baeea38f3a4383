//! The measuring side of each scenario.

use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::handshake::Handshake;
use crate::mutex::{MutexHandle, MutexKind};
use crate::sink::TimingSample;

/// Hammers a mutex held by the orchestrator with trylocks until told to stop.
///
/// Runs scenarios A (exclusive) and B (reentrant); the mutex kind makes the
/// only difference.
#[derive(Debug)]
pub struct ContentionWorker {
    mutex: Option<Arc<MutexHandle>>,
    handshake: Arc<Handshake>,
    clock: Clock,
}

impl ContentionWorker {
    /// Worker for one trial. `mutex` may be absent, see [`run`](ContentionWorker::run).
    #[must_use]
    pub fn new(mutex: Option<Arc<MutexHandle>>, handshake: Arc<Handshake>, clock: Clock) -> Self {
        ContentionWorker {
            mutex,
            handshake,
            clock,
        }
    }

    /// Run the worker side of the handshake and the timed trylock loop.
    ///
    /// Without a mutex the worker raises `stop` in place of `ready` and
    /// returns `None`, so the orchestrator does not wait for it forever.
    #[must_use]
    pub fn run(self) -> Option<TimingSample> {
        let Some(mutex) = self.mutex else {
            self.handshake.signal_stop();
            return None;
        };

        self.handshake.signal_ready();
        // the orchestrator takes the lock before clearing ready
        self.handshake.wait_for_ready_cleared();

        let start = self.clock.now();
        let mut attempts: u64 = 0;
        while !self.handshake.is_stopped() {
            let _ = mutex.try_acquire();
            attempts += 1;
        }
        let end = self.clock.now();

        Some(TimingSample {
            start,
            attempts,
            elapsed: end.since(start),
        })
    }
}

/// The two samples of one self-cycle trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfCycleSamples {
    /// The `N` extra acquisitions.
    pub acquire: TimingSample,
    /// The `N + 1` releases.
    pub release: TimingSample,
}

/// Re-acquires a reentrant mutex it already owns, then releases every hold.
#[derive(Debug)]
pub struct SelfCycleWorker {
    mutex: Option<Arc<MutexHandle>>,
    iterations: u32,
    clock: Clock,
}

impl SelfCycleWorker {
    /// Worker for one trial performing `iterations` extra acquisitions.
    #[must_use]
    pub fn new(mutex: Option<Arc<MutexHandle>>, iterations: u32, clock: Clock) -> Self {
        SelfCycleWorker {
            mutex,
            iterations,
            clock,
        }
    }

    /// Take the mutex, time `N` trylocks on it, then time the `N + 1` releases.
    ///
    /// Returns `Ok(None)` without measuring when the mutex is absent.
    ///
    /// # Errors
    ///
    /// * [`Error::NotReentrant`] for an exclusive mutex, checked before anything is acquired.
    /// * [`Error::SelfAcquireFailed`] when a trylock in the timed loop failed. Every
    ///   hold taken is released before returning.
    /// * [`Error::Release`] when a release is refused.
    pub fn run(self) -> Result<Option<SelfCycleSamples>> {
        let Some(mutex) = self.mutex else {
            return Ok(None);
        };
        if mutex.kind() != MutexKind::Reentrant {
            return Err(Error::NotReentrant(mutex.kind()));
        }
        let n = u64::from(self.iterations);

        mutex.acquire();

        let start = self.clock.now();
        let mut failed: u64 = 0;
        for _ in 0..n {
            failed += u64::from(!mutex.try_acquire());
        }
        let end = self.clock.now();

        if failed != 0 {
            while mutex.holds() != 0 {
                mutex.release()?;
            }
            return Err(Error::SelfAcquireFailed {
                failed,
                attempted: n,
            });
        }
        let acquire = TimingSample {
            start,
            attempts: n,
            elapsed: end.since(start),
        };

        // the initial acquire plus the n above
        let start = self.clock.now();
        for _ in 0..=n {
            mutex.release()?;
        }
        let end = self.clock.now();

        Ok(Some(SelfCycleSamples {
            acquire,
            release: TimingSample {
                start,
                attempts: n + 1,
                elapsed: end.since(start),
            },
        }))
    }
}
