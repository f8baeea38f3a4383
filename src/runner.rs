//! Orchestrating side: trial lifecycle and the scenario loops.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, trace, warn};

use crate::clock::Clock;
use crate::config::BenchConfig;
use crate::error::{Error, Result};
use crate::handshake::Handshake;
use crate::mutex::{MutexHandle, MutexKind};
use crate::sink::{ResultSink, Sinks, TimingSample};
use crate::worker::{ContentionWorker, SelfCycleSamples, SelfCycleWorker};

/// The three fixed access patterns, in the order a full run executes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// A: trylocks on an exclusive mutex held by another thread.
    ExclusiveContention,
    /// B: trylocks on a reentrant mutex held by another thread.
    ReentrantContention,
    /// C: one thread re-acquiring and releasing its own reentrant mutex.
    SelfCycle,
}

impl Scenario {
    /// Run order.
    pub const ALL: [Scenario; 3] = [
        Scenario::ExclusiveContention,
        Scenario::ReentrantContention,
        Scenario::SelfCycle,
    ];

    /// The mutex created for each trial of this scenario.
    #[must_use]
    pub fn mutex_kind(self) -> MutexKind {
        match self {
            Scenario::ExclusiveContention => MutexKind::Exclusive,
            Scenario::ReentrantContention | Scenario::SelfCycle => MutexKind::Reentrant,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scenario::ExclusiveContention => "case one: exclusive contention",
            Scenario::ReentrantContention => "case two: reentrant contention",
            Scenario::SelfCycle => "case three: reentrant self-cycle",
        })
    }
}

/// Where the orchestrator is within a trial.
///
/// Contention trials walk every state in order. Self-cycle trials and trials
/// whose worker had no mutex skip from `WorkerSpawned` to `Joined`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrialPhase {
    /// Fresh mutex, handshake idle.
    #[default]
    Init,
    /// Worker thread running.
    WorkerSpawned,
    /// Worker raised `ready`.
    ReadyObserved,
    /// Orchestrator holds the mutex.
    LockHeld,
    /// `ready` cleared, worker is timing.
    TimingWindow,
    /// `stop` raised.
    StopSignaled,
    /// Worker thread joined.
    Joined,
    /// Mutex destroyed, handshake reset.
    TornDown,
}

/// Drives trials: one fresh mutex, one worker thread and one handshake reset per trial.
#[derive(Debug)]
pub struct TrialRunner {
    config: BenchConfig,
    clock: Clock,
    handshake: Arc<Handshake>,
    phase: TrialPhase,
}

impl TrialRunner {
    /// Runner with its own clock.
    #[must_use]
    pub fn new(config: BenchConfig) -> Self {
        Self::with_clock(config, Clock::new())
    }

    /// Runner sharing an existing clock.
    #[must_use]
    pub fn with_clock(config: BenchConfig, clock: Clock) -> Self {
        TrialRunner {
            config,
            clock,
            handshake: Arc::new(Handshake::new()),
            phase: TrialPhase::Init,
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// The handshake handed to contention workers. Idle between trials.
    #[must_use]
    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Phase of the current or last trial.
    #[must_use]
    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    fn enter(&mut self, phase: TrialPhase) {
        trace!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn tear_down(&mut self) {
        self.enter(TrialPhase::TornDown);
        self.handshake.reset();
    }

    /// One contention trial against a fresh mutex of `kind`.
    ///
    /// # Errors
    ///
    /// [`Error::WorkerPanicked`] or a refused release of the orchestrator's hold.
    pub fn run_contention_trial(&mut self, kind: MutexKind) -> Result<Option<TimingSample>> {
        self.run_contention_trial_with(Some(MutexHandle::new(kind)))
    }

    /// One contention trial against `mutex`, which is destroyed at the end of the trial.
    ///
    /// Returns `None` when the mutex is absent: the worker stops without
    /// measuring and the trial is torn down without a sample.
    ///
    /// # Errors
    ///
    /// [`Error::WorkerPanicked`] or a refused release of the orchestrator's hold.
    pub fn run_contention_trial_with(
        &mut self,
        mutex: Option<MutexHandle>,
    ) -> Result<Option<TimingSample>> {
        self.enter(TrialPhase::Init);
        let mutex = mutex.map(Arc::new);

        let worker = ContentionWorker::new(mutex.clone(), Arc::clone(&self.handshake), self.clock);
        let handle = thread::spawn(move || worker.run());
        self.enter(TrialPhase::WorkerSpawned);

        let ready = self.handshake.wait_for_ready();
        let outcome = match (ready, mutex.as_deref()) {
            (true, Some(mutex)) => self.hold_for_window(mutex, handle),
            _ => {
                warn!("worker stopped without a mutex, trial aborted");
                let joined = handle.join().map_err(|_| Error::WorkerPanicked);
                self.enter(TrialPhase::Joined);
                joined
            }
        };

        drop(mutex);
        self.tear_down();
        outcome
    }

    fn hold_for_window(
        &mut self,
        mutex: &MutexHandle,
        worker: JoinHandle<Option<TimingSample>>,
    ) -> Result<Option<TimingSample>> {
        self.enter(TrialPhase::ReadyObserved);

        mutex.acquire();
        self.enter(TrialPhase::LockHeld);

        self.handshake.clear_ready();
        self.enter(TrialPhase::TimingWindow);
        thread::sleep(self.config.contention_window);

        self.handshake.signal_stop();
        self.enter(TrialPhase::StopSignaled);

        let sample = worker.join().map_err(|_| Error::WorkerPanicked);
        self.enter(TrialPhase::Joined);

        mutex.release()?;
        sample
    }

    /// One self-cycle trial on a fresh reentrant mutex, run on its own thread.
    ///
    /// # Errors
    ///
    /// Whatever [`SelfCycleWorker::run`] reports, or [`Error::WorkerPanicked`].
    pub fn run_self_cycle_trial(&mut self) -> Result<Option<SelfCycleSamples>> {
        self.run_self_cycle_trial_with(Some(MutexHandle::new(MutexKind::Reentrant)))
    }

    /// One self-cycle trial on `mutex`, which is destroyed at the end of the trial.
    ///
    /// # Errors
    ///
    /// Whatever [`SelfCycleWorker::run`] reports, or [`Error::WorkerPanicked`].
    pub fn run_self_cycle_trial_with(
        &mut self,
        mutex: Option<MutexHandle>,
    ) -> Result<Option<SelfCycleSamples>> {
        self.enter(TrialPhase::Init);
        let mutex = mutex.map(Arc::new);

        let worker = SelfCycleWorker::new(mutex.clone(), self.config.self_cycle_iterations, self.clock);
        let handle = thread::spawn(move || worker.run());
        self.enter(TrialPhase::WorkerSpawned);

        let outcome = handle.join().map_err(|_| Error::WorkerPanicked);
        self.enter(TrialPhase::Joined);

        drop(mutex);
        self.tear_down();
        outcome?
    }

    /// Run every contention trial on mutexes of `kind`, appending each sample to `sink`.
    ///
    /// Returns the number of samples recorded.
    ///
    /// # Errors
    ///
    /// The first trial or sink error; no further trials run.
    pub fn run_contention<S>(&mut self, kind: MutexKind, sink: &mut S) -> Result<usize>
    where
        S: ResultSink + ?Sized,
    {
        let mut recorded = 0;
        for trial in 0..self.config.trials {
            debug!("{kind} contention trial {trial}");
            if let Some(sample) = self.run_contention_trial(kind)? {
                info!("Lock Attempts: {} in {} s", sample.attempts, sample.elapsed);
                sink.append(&sample)?;
                recorded += 1;
            }
        }
        Ok(recorded)
    }

    /// Run every self-cycle trial, appending acquisition samples to `acquire`
    /// and release samples to `release`.
    ///
    /// Returns the number of trials recorded.
    ///
    /// # Errors
    ///
    /// The first trial or sink error; no further trials run.
    pub fn run_self_cycle<A, R>(&mut self, acquire: &mut A, release: &mut R) -> Result<usize>
    where
        A: ResultSink + ?Sized,
        R: ResultSink + ?Sized,
    {
        let mut recorded = 0;
        for trial in 0..self.config.trials {
            debug!("self-cycle trial {trial}");
            if let Some(samples) = self.run_self_cycle_trial()? {
                info!(
                    "Lock Attempts: {} in {} s",
                    samples.acquire.attempts, samples.acquire.elapsed
                );
                acquire.append(&samples.acquire)?;
                info!(
                    "Unlock Attempts: {} in {} s",
                    samples.release.attempts, samples.release.elapsed
                );
                release.append(&samples.release)?;
                recorded += 1;
            }
        }
        Ok(recorded)
    }

    /// Run one scenario against the file streams.
    ///
    /// # Errors
    ///
    /// See [`run_contention`](TrialRunner::run_contention) and
    /// [`run_self_cycle`](TrialRunner::run_self_cycle).
    pub fn run_scenario(&mut self, scenario: Scenario, sinks: &mut Sinks) -> Result<usize> {
        info!("{scenario}");
        match scenario {
            Scenario::ExclusiveContention | Scenario::ReentrantContention => {
                self.run_contention(scenario.mutex_kind(), &mut sinks.contention)
            }
            Scenario::SelfCycle => {
                self.run_self_cycle(&mut sinks.self_acquire, &mut sinks.self_release)
            }
        }
    }

    /// Run all scenarios in order.
    ///
    /// # Errors
    ///
    /// The first error of any scenario.
    pub fn run_all(&mut self, sinks: &mut Sinks) -> Result<()> {
        for scenario in Scenario::ALL {
            self.run_scenario(scenario, sinks)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn runner() -> TrialRunner {
        TrialRunner::new(
            BenchConfig::default()
                .with_trials(2)
                .with_contention_window(Duration::from_millis(20))
                .with_self_cycle_iterations(100),
        )
    }

    #[test]
    fn contention_trial_walks_phases() {
        let mut runner = runner();
        let sample = runner.run_contention_trial(MutexKind::Exclusive).unwrap().unwrap();
        assert!(sample.attempts > 0);
        assert_eq!(runner.phase(), TrialPhase::TornDown);
        assert!(runner.handshake().is_idle());
    }

    #[test]
    fn absent_mutex_aborts_trial() {
        let mut runner = runner();
        assert_eq!(runner.run_contention_trial_with(None).unwrap(), None);
        assert_eq!(runner.phase(), TrialPhase::TornDown);
        assert!(runner.handshake().is_idle());

        // the next trial is unaffected
        assert!(runner.run_contention_trial(MutexKind::Reentrant).unwrap().is_some());
    }

    #[test]
    fn self_cycle_trial() {
        let mut runner = runner();
        let samples = runner.run_self_cycle_trial().unwrap().unwrap();
        assert_eq!(samples.acquire.attempts, 100);
        assert_eq!(samples.release.attempts, 101);
        assert_eq!(runner.phase(), TrialPhase::TornDown);
    }

    #[test]
    fn self_cycle_exclusive_is_an_error() {
        let mut runner = runner();
        let err = runner
            .run_self_cycle_trial_with(Some(MutexHandle::new(MutexKind::Exclusive)))
            .unwrap_err();
        assert!(matches!(err, Error::NotReentrant(MutexKind::Exclusive)));
        assert_eq!(runner.phase(), TrialPhase::TornDown);
    }

    #[test]
    fn contention_into_vec() {
        let mut runner = runner();
        let mut samples: Vec<TimingSample> = Vec::new();
        assert_eq!(runner.run_contention(MutexKind::Reentrant, &mut samples).unwrap(), 2);
        assert_eq!(samples.len(), 2);
        assert!(samples[0].start <= samples[1].start);
    }

    #[test]
    fn scenario_kinds() {
        assert_eq!(Scenario::ExclusiveContention.mutex_kind(), MutexKind::Exclusive);
        assert_eq!(Scenario::ReentrantContention.mutex_kind(), MutexKind::Reentrant);
        assert_eq!(Scenario::SelfCycle.mutex_kind(), MutexKind::Reentrant);
    }
}
