#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod clock;
pub mod config;
mod error;
mod handshake;
mod mutex;
mod runner;
mod sink;
mod worker;

pub use clock::{Clock, Timespec};
pub use config::BenchConfig;
pub use error::{Error, ParseError, ReleaseError, Result};
pub use handshake::Handshake;
pub use mutex::{MutexHandle, MutexKind};
pub use runner::{Scenario, TrialPhase, TrialRunner};
pub use sink::{read_samples, FileSink, ResultSink, Sinks, Stream, TimingSample};
pub use worker::{ContentionWorker, SelfCycleSamples, SelfCycleWorker};
