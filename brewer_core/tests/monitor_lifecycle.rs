//! Monitor thread: read-failure policy, shutdown, and a full run against
//! the simulated brewer.

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use brewer_core::mocks::{RecordingWriter, ScriptedReader};
use brewer_core::order_log::read_entries;
use brewer_core::{
    BrewError, BrewOrder, ControllerSettings, LinkError, MashStep, OrderController, Phase,
    StatusCode, run_order,
};
use brewer_hardware::{SimParams, SimulatedBrewer};

fn settings(limit: u32, read_timeout: Duration) -> ControllerSettings {
    ControllerSettings {
        tick: Duration::from_millis(5),
        settle: Duration::ZERO,
        read_timeout,
        read_failure_limit: limit,
        read_failure_backoff: Duration::ZERO,
        ..ControllerSettings::default()
    }
}

fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

fn order() -> BrewOrder {
    BrewOrder::new(
        "IPA",
        vec![MashStep::new(65.0, 2.0), MashStep::new(70.0, 1.0)],
    )
}

#[test]
fn first_failure_is_fatal_with_limit_one() {
    let dir = tempfile::tempdir().unwrap();
    let writer = RecordingWriter::default();
    let ctl = OrderController::builder()
        .with_writer(writer.clone())
        .with_storage_dir(dir.path())
        .with_settings(settings(1, Duration::from_secs(2)))
        .build();
    ctl.submit_order(order()).unwrap();

    let (script, reader) = ScriptedReader::new();
    script.fail(ErrorKind::TimedOut);
    let monitor = ctl.spawn_monitor(reader);

    assert!(wait_until(Duration::from_secs(2), || !monitor.is_running()));
    assert_eq!(
        monitor.failure(),
        Some(BrewError::Link(LinkError::Timeout))
    );
    assert_eq!(ctl.phase(), Phase::Idle);
    assert_eq!(writer.lines(), vec!["heat;65;2;", "idle;"]);
    assert!(ctl.order_log_path().is_none());
}

#[test]
fn transient_failures_below_limit_are_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    let ctl = OrderController::builder()
        .with_writer(RecordingWriter::default())
        .with_storage_dir(dir.path())
        .with_settings(settings(3, Duration::from_secs(2)))
        .build();
    ctl.submit_order(order()).unwrap();

    let (script, reader) = ScriptedReader::new();
    script.fail(ErrorKind::TimedOut);
    script.push("heat;61;"); // decode failure counts too
    script.push("heat;40;2;");
    let mut monitor = ctl.spawn_monitor(reader);

    assert!(wait_until(Duration::from_secs(2), || {
        ctl.current_status().temperature == 40.0
    }));
    assert!(monitor.is_running());
    assert!(matches!(ctl.phase(), Phase::Running { step: 0, .. }));
    monitor.shutdown();
    assert!(!monitor.is_running());
    assert_eq!(monitor.failure(), None);
}

#[test]
fn drop_joins_the_worker() {
    let dir = tempfile::tempdir().unwrap();
    let ctl = OrderController::builder()
        .with_writer(RecordingWriter::default())
        .with_storage_dir(dir.path())
        .with_settings(settings(u32::MAX, Duration::from_millis(20)))
        .build();
    let (_script, reader) = ScriptedReader::new();
    let start = Instant::now();
    {
        let _monitor = ctl.spawn_monitor(reader);
        std::thread::sleep(Duration::from_millis(30));
    }
    // one read timeout plus one tick, with slack for slow CI
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[test]
fn simulated_brewer_runs_order_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let sim = SimulatedBrewer::new(SimParams {
        ramp_per_read: 100.0,
        read_delay: Duration::ZERO,
        ..SimParams::default()
    });
    let (reader, writer) = sim.split();
    let ctl = OrderController::builder()
        .with_writer(writer)
        .with_storage_dir(dir.path())
        .with_settings(settings(1, Duration::from_millis(200)))
        .build();

    let mut seen = Vec::new();
    let report = run_order(&ctl, reader, order(), |s| seen.push(s.status)).unwrap();

    assert_eq!(report.order, "IPA");
    assert_eq!(report.steps, 2);
    assert_eq!(sim.received(), vec!["heat;65;2;", "heat;70;1;", "idle;"]);
    assert_eq!(ctl.phase(), Phase::Idle);
    assert!(seen.contains(&StatusCode::Heating));

    let log = report.log_path.unwrap();
    assert!(log.starts_with(dir.path()));
    let entries = read_entries(&log).unwrap();
    assert!(entries.iter().all(|e| e.status != StatusCode::Idle));
    assert!(entries.iter().any(|e| e.status == StatusCode::Done));
    assert!(entries.iter().any(|e| e.temperature == 65.0));
}

#[test]
fn replacing_an_order_under_a_live_monitor() {
    let dir = tempfile::tempdir().unwrap();
    let sim = SimulatedBrewer::new(SimParams {
        read_delay: Duration::from_millis(2),
        ..SimParams::default()
    });
    let (reader, writer) = sim.split();
    let ctl = OrderController::builder()
        .with_writer(writer)
        .with_storage_dir(dir.path())
        .with_settings(ControllerSettings {
            settle: Duration::from_millis(50),
            ..settings(3, Duration::from_millis(200))
        })
        .build();

    ctl.submit_order(BrewOrder::new("Pale", vec![MashStep::new(60.0, 5.0)]))
        .unwrap();
    let pale_log = ctl.order_log_path().unwrap();
    let mut monitor = ctl.spawn_monitor(reader);
    assert!(wait_until(Duration::from_secs(5), || sim.temperature() >= 23.0));

    ctl.submit_order(BrewOrder::new("Stout", vec![MashStep::new(21.0, 0.02)]))
        .unwrap();
    let stout_log = ctl.order_log_path().unwrap();
    assert_ne!(pale_log, stout_log);
    let pale_entries = read_entries(&pale_log).unwrap().len();
    assert!(pale_entries > 0);

    assert!(wait_until(Duration::from_secs(5), || ctl.phase() == Phase::Idle));
    monitor.shutdown();
    assert_eq!(monitor.failure(), None);

    assert_eq!(
        sim.received(),
        vec!["heat;60;5;", "idle;", "heat;21;0.02;", "idle;"]
    );
    // the old log saw nothing after rotation
    assert_eq!(read_entries(&pale_log).unwrap().len(), pale_entries);

    let stout = read_entries(&stout_log).unwrap();
    assert!(stout.iter().any(|e| e.status == StatusCode::Done));
    assert!(
        stout
            .iter()
            .filter(|e| e.status == StatusCode::Heating)
            .all(|e| e.remaining_time <= 0.02),
        "a line from the replaced order was logged: {stout:?}"
    );
}
