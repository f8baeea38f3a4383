//! Build time constants of a benchmark run.

use std::path::PathBuf;
use std::time::Duration;

/// Trials per scenario.
pub const TRIALS: usize = 32;

/// How long the orchestrator holds the mutex while the worker hammers it.
pub const CONTENTION_WINDOW: Duration = Duration::from_secs(1);

/// Extra acquisitions per self-cycle trial.
#[allow(clippy::cast_sign_loss)]
pub const SELF_CYCLE_ITERATIONS: u32 = (i32::MAX / 1000) as u32;

/// Parameters of a run. The binary always uses [`BenchConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Trials per scenario.
    pub trials: usize,
    /// How long each contention trial holds the mutex.
    pub contention_window: Duration,
    /// Extra acquisitions per self-cycle trial, releases are one more.
    pub self_cycle_iterations: u32,
    /// Directory the stream files are created in.
    pub output_dir: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            trials: TRIALS,
            contention_window: CONTENTION_WINDOW,
            self_cycle_iterations: SELF_CYCLE_ITERATIONS,
            output_dir: PathBuf::from("."),
        }
    }
}

impl BenchConfig {
    /// Set the number of trials per scenario.
    #[must_use]
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    /// Set the contention window.
    #[must_use]
    pub fn with_contention_window(mut self, window: Duration) -> Self {
        self.contention_window = window;
        self
    }

    /// Set the self-cycle acquisition count.
    #[must_use]
    pub fn with_self_cycle_iterations(mut self, iterations: u32) -> Self {
        self.self_cycle_iterations = iterations;
        self
    }

    /// Set the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BenchConfig::default();
        assert_eq!(config.trials, 32);
        assert_eq!(config.contention_window, Duration::from_secs(1));
        assert_eq!(config.self_cycle_iterations, 2_147_483);
    }
}
