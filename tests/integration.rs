use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use trylock_bench::*;

fn config(trials: usize) -> BenchConfig {
    BenchConfig::default()
        .with_trials(trials)
        .with_contention_window(Duration::from_millis(20))
        .with_self_cycle_iterations(1000)
}

#[test]
fn contention_appends_one_line_per_trial() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = FileSink::open(dir.path(), Stream::Contention).unwrap();
    let mut runner = TrialRunner::new(config(3));

    assert_eq!(runner.run_contention(MutexKind::Exclusive, &mut sink).unwrap(), 3);
    assert_eq!(runner.run_contention(MutexKind::Reentrant, &mut sink).unwrap(), 3);
    drop(sink);

    let samples = read_samples(&dir.path().join("contention.data")).unwrap();
    assert_eq!(samples.len(), 6);
    for pair in samples.windows(2) {
        assert!(pair[0].start <= pair[1].start);
    }
}

#[test]
fn self_cycle_counts_every_trial() {
    let mut runner = TrialRunner::new(config(4));
    let mut acquire: Vec<TimingSample> = Vec::new();
    let mut release: Vec<TimingSample> = Vec::new();

    assert_eq!(runner.run_self_cycle(&mut acquire, &mut release).unwrap(), 4);
    assert_eq!(acquire.len(), 4);
    assert_eq!(release.len(), 4);
    assert!(acquire.iter().all(|s| s.attempts == 1000));
    assert!(release.iter().all(|s| s.attempts == 1001));
}

#[test]
fn handshake_idle_between_trials() {
    let mut runner = TrialRunner::new(config(1));
    for kind in [MutexKind::Exclusive, MutexKind::Reentrant, MutexKind::Exclusive] {
        runner.run_contention_trial(kind).unwrap().unwrap();
        assert!(runner.handshake().is_idle());
        assert_eq!(runner.phase(), TrialPhase::TornDown);
    }
    runner.run_self_cycle_trial().unwrap().unwrap();
    assert!(runner.handshake().is_idle());
}

#[test]
fn elapsed_covers_contention_window() {
    let window = Duration::from_millis(50);
    let tolerance = Duration::from_millis(20);
    let mut runner = TrialRunner::new(config(1).with_contention_window(window));

    for kind in [MutexKind::Exclusive, MutexKind::Reentrant] {
        let sample = runner.run_contention_trial(kind).unwrap().unwrap();
        assert!(Duration::from(sample.elapsed) >= window - tolerance);
    }
}

#[test]
fn absent_mutex_does_not_hang() {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut runner = TrialRunner::new(config(1));
        let outcome = runner.run_contention_trial_with(None).map_err(|e| e.to_string());
        let idle = runner.handshake().is_idle();
        tx.send((outcome, idle)).unwrap();
    });

    let (outcome, idle) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(outcome, Ok(None));
    assert!(idle);
}

#[test]
fn full_run_writes_all_streams() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(2)
        .with_contention_window(Duration::from_millis(5))
        .with_output_dir(dir.path());
    let mut sinks = Sinks::open(&cfg.output_dir).unwrap();
    TrialRunner::new(cfg).run_all(&mut sinks).unwrap();
    drop(sinks);

    let read = |stream: Stream| read_samples(&dir.path().join(stream.file_name())).unwrap();
    assert_eq!(read(Stream::Contention).len(), 4);
    assert_eq!(read(Stream::SelfAcquire).len(), 2);
    assert_eq!(read(Stream::SelfRelease).len(), 2);
}

#[test]
fn line_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let sample = TimingSample {
        start: Timespec::new(1_657_036_800, 999_999_999),
        attempts: u64::MAX,
        elapsed: Timespec::new(1, 7),
    };
    {
        let mut sink = FileSink::open(dir.path(), Stream::SelfRelease).unwrap();
        sink.append(&sample).unwrap();
    }
    let text = std::fs::read_to_string(dir.path().join("self_cycle_release.data")).unwrap();
    assert_eq!(text, "1657036800.999999999, 18446744073709551615, 1.000000007\n");
    assert_eq!(text.trim().parse::<TimingSample>().unwrap(), sample);
}

#[test]
fn release_underflow_is_refused() {
    let mutex = MutexHandle::new(MutexKind::Reentrant);
    mutex.acquire();
    assert!(mutex.try_acquire());
    mutex.release().unwrap();
    mutex.release().unwrap();
    assert_eq!(mutex.release(), Err(ReleaseError::NotHeld));
    assert!(!mutex.is_locked());
    assert!(mutex.try_acquire());
    mutex.release().unwrap();
}
