//! Two-flag spin handshake between the orchestrating thread and one worker.

use std::hint;
use std::sync::atomic::{AtomicBool, Ordering};

/// The `ready`/`stop` flag pair shared by exactly one orchestrator and one worker.
///
/// Neither side ever blocks in the OS: every wait is a busy poll. A worker that
/// never calls [`signal_ready`](Handshake::signal_ready) nor
/// [`signal_stop`](Handshake::signal_stop) leaves the orchestrator spinning.
#[derive(Debug, Default)]
pub struct Handshake {
    ready: AtomicBool,
    stop: AtomicBool,
}

impl Handshake {
    /// Both flags cleared.
    #[must_use]
    pub const fn new() -> Self {
        Handshake {
            ready: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        }
    }

    /// Worker: about to start timing.
    pub fn signal_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Worker: spin until the orchestrator clears `ready`.
    #[cfg_attr(test, mutants::skip)]
    pub fn wait_for_ready_cleared(&self) {
        while self.ready.load(Ordering::Acquire) {
            hint::spin_loop();
        }
    }

    /// Orchestrator: spin until the worker is ready.
    ///
    /// Returns `false` when the worker gave up and raised `stop` instead.
    #[cfg_attr(test, mutants::skip)]
    pub fn wait_for_ready(&self) -> bool {
        loop {
            if self.ready.load(Ordering::Acquire) {
                return true;
            }
            if self.stop.load(Ordering::Acquire) {
                return false;
            }
            hint::spin_loop();
        }
    }

    /// Orchestrator: lock is held, the worker may start timing.
    pub fn clear_ready(&self) {
        self.ready.store(false, Ordering::Release);
    }

    /// End the measurement window.
    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Whether `stop` has been raised.
    #[must_use]
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Whether `ready` is currently raised.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Both flags false, the state required between trials.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.is_ready() && !self.is_stopped()
    }

    /// Clear both flags for the next trial.
    pub fn reset(&self) {
        self.ready.store(false, Ordering::Release);
        self.stop.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn smoke() {
        let hs = Handshake::new();
        assert!(hs.is_idle());
        hs.signal_ready();
        assert!(hs.is_ready());
        hs.clear_ready();
        hs.signal_stop();
        assert!(hs.is_stopped());
        hs.reset();
        assert!(hs.is_idle());
    }

    #[test]
    fn ready_round_trip() {
        let hs = Arc::new(Handshake::new());
        let worker = {
            let hs = Arc::clone(&hs);
            thread::spawn(move || {
                hs.signal_ready();
                hs.wait_for_ready_cleared();
                while !hs.is_stopped() {
                    hint::spin_loop();
                }
            })
        };

        assert!(hs.wait_for_ready());
        hs.clear_ready();
        hs.signal_stop();
        worker.join().unwrap();
        hs.reset();
        assert!(hs.is_idle());
    }

    #[test]
    fn stop_aborts_ready_wait() {
        let hs = Handshake::new();
        hs.signal_stop();
        assert!(!hs.wait_for_ready());
    }
}
