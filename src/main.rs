//! Runs every scenario with the built-in constants and appends to the stream files.

use std::process::exit;

use log::{error, info, LevelFilter};
use trylock_bench::{BenchConfig, Clock, Result, Sinks, TrialRunner};

fn run(config: BenchConfig, clock: Clock) -> Result<()> {
    let mut sinks = Sinks::open(&config.output_dir)?;
    let mut runner = TrialRunner::with_clock(config, clock);
    runner.run_all(&mut sinks)
}

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let clock = Clock::new();
    let start = clock.now();
    info!("trylock_bench {}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = run(BenchConfig::default(), clock) {
        error!("{err}");
        exit(err.exit_code());
    }

    info!("Program Elapsed Time: {} s", clock.now().since(start));
}
