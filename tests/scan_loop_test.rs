//! Integration tests for the scan loop lifecycle.

mod common;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

use welltemp::domain::models::ROW_HEADER;
use welltemp::infrastructure::recorder::RowLog;
use welltemp::services::{CalibrationSession, DeviceSet};
use welltemp::{
    CalibrationModel, CoefficientStore, DeviceSession, DomainError, Medium, ScanController,
    ScanEvent, ScanState, ThermalProfile,
};

use common::{
    fast_settings, temp_dir, toggling_devices, wait_until, DeadLine, QuietLine,
    ScriptedInstrument, SlowInstrument, ToggleLine,
};

fn air_store() -> CoefficientStore {
    CoefficientStore::new(CalibrationModel::bootstrap(Medium::Air))
}

async fn next_samples(
    events: &mut tokio::sync::broadcast::Receiver<ScanEvent>,
    count: usize,
) -> Vec<u64> {
    let mut counters = Vec::new();
    while counters.len() < count {
        match timeout(Duration::from_secs(5), events.recv()).await {
            Ok(Ok(ScanEvent::Sample(sample))) => counters.push(sample.counter),
            Ok(Ok(_)) => {}
            other => panic!("scan stalled: {other:?}"),
        }
    }
    counters
}

#[tokio::test]
async fn test_rows_are_written_in_counter_order() {
    let dir = temp_dir();
    let mut controller = ScanController::new(
        fast_settings(dir.path()),
        DeviceSession::new(toggling_devices()),
        air_store(),
    );
    let mut events = controller.subscribe();

    let path = assert_ok!(controller.start("well-1").await);
    assert!(path.starts_with(dir.path()));

    let first = next_samples(&mut events, 5).await;
    assert_eq!(first, vec![1, 2, 3, 4, 5]);

    let report = assert_ok!(controller.stop().await);
    assert_eq!(controller.state().await, ScanState::Stopped);
    assert!(report.samples >= 5);
    assert_eq!(report.session_id, "well-1");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().next(), Some(ROW_HEADER));

    let samples = RowLog::read_samples(&path).await.unwrap();
    assert_eq!(samples.len() as u64, report.samples);
    for (i, sample) in samples.iter().enumerate() {
        assert_eq!(sample.counter, i as u64 + 1);
        let temperature = sample.converted_value.expect("10 kOhm converts");
        assert!((temperature - 24.96).abs() < 0.05, "got {temperature}");
    }
    assert!(samples.windows(2).all(|w| w[0].elapsed_time <= w[1].elapsed_time));
}

#[tokio::test]
async fn test_stop_during_edge_wait_is_prompt() {
    let dir = temp_dir();
    let line = QuietLine::default();
    let reads = line.reads.clone();
    let devices = DeviceSet::new(
        Box::new(ScriptedInstrument::steady("probe", 10_000.0)),
        Box::new(line),
    );
    let mut controller =
        ScanController::new(fast_settings(dir.path()), DeviceSession::new(devices), air_store());

    let path = controller.start("quiet").await.unwrap();
    assert!(
        wait_until(
            || {
                let reads = reads.clone();
                async move { reads.load(Ordering::SeqCst) > 3 }
            },
            Duration::from_secs(2),
        )
        .await
    );
    assert_eq!(controller.state().await, ScanState::Waiting);

    let started = Instant::now();
    let report = controller.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    assert_eq!(report.samples, 0);
    assert_eq!(controller.state().await, ScanState::Stopped);
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, format!("{ROW_HEADER}\n"));
}

#[tokio::test]
async fn test_edge_timeout_counts_no_trigger() {
    let dir = temp_dir();
    let mut settings = fast_settings(dir.path());
    settings.edge_timeout = Duration::from_millis(5);
    let devices = DeviceSet::new(
        Box::new(ScriptedInstrument::steady("probe", 10_000.0)),
        Box::new(QuietLine::default()),
    );
    let mut controller = ScanController::new(settings, DeviceSession::new(devices), air_store());
    let mut events = controller.subscribe();

    controller.start("timeouts").await.unwrap();
    let saw_no_trigger = timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(ScanEvent::NoTrigger) = events.recv().await {
                break;
            }
        }
    })
    .await;
    assert!(saw_no_trigger.is_ok());

    let report = controller.stop().await.unwrap();
    assert!(report.no_trigger >= 1);
    assert_eq!(report.samples, 0);
    assert_eq!(controller.counter().await, 0);
}

#[tokio::test]
async fn test_preflight_failures_leave_scan_idle() {
    let dir = temp_dir();
    let session = DeviceSession::new(toggling_devices());
    let mut controller =
        ScanController::new(fast_settings(dir.path()), session.clone(), air_store());

    let err = assert_err!(controller.start("   ").await);
    assert!(matches!(err, DomainError::PreflightFailure(_)));
    assert_eq!(controller.state().await, ScanState::Idle);
    assert!(session.is_available());

    // Output "directory" that is actually a file.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "x").unwrap();
    let mut blocked = ScanController::new(fast_settings(&blocker), session.clone(), air_store());
    let err = assert_err!(blocked.start("well-1").await);
    assert!(matches!(err, DomainError::PreflightFailure(_)));
    assert_eq!(blocked.state().await, ScanState::Idle);
    assert!(session.is_available());
}

#[tokio::test]
async fn test_unopenable_signal_line_returns_devices() {
    let dir = temp_dir();
    let devices = DeviceSet::new(
        Box::new(ScriptedInstrument::steady("probe", 10_000.0)),
        Box::new(DeadLine),
    );
    let session = DeviceSession::new(devices);
    let mut controller =
        ScanController::new(fast_settings(dir.path()), session.clone(), air_store());

    let err = controller.start("well-1").await.unwrap_err();
    assert!(matches!(err, DomainError::DeviceUnavailable(_)));
    assert_eq!(controller.state().await, ScanState::Idle);
    assert!(session.is_available());
    assert!(std::fs::read_dir(dir.path()).unwrap().all(|entry| {
        let name = entry.unwrap().file_name();
        !name.to_string_lossy().ends_with(".csv")
    }));
}

#[tokio::test]
async fn test_reset_is_required_before_restart() {
    let dir = temp_dir();
    let mut controller = ScanController::new(
        fast_settings(dir.path()),
        DeviceSession::new(toggling_devices()),
        air_store(),
    );
    let mut events = controller.subscribe();

    controller.start("first").await.unwrap();
    assert!(controller.reset().await.is_err(), "reset while running");
    next_samples(&mut events, 2).await;
    controller.stop().await.unwrap();

    let err = controller.start("second").await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidStateTransition { .. }));

    controller.reset().await.unwrap();
    assert_eq!(controller.state().await, ScanState::Idle);
    assert_eq!(controller.counter().await, 0);
    assert!(controller.plot_snapshot().await.is_empty());

    let mut events = controller.subscribe();
    controller.start("second").await.unwrap();
    let counters = next_samples(&mut events, 1).await;
    assert_eq!(counters, vec![1]);
    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_failed_reads_are_substituted_from_profile() {
    let dir = temp_dir();
    let instrument = ScriptedInstrument::scripted(
        "probe",
        [
            Err(DomainError::ReadFailure("timeout".to_string())),
            Ok(f64::NAN),
        ],
        10_000.0,
    );
    let devices = DeviceSet::new(Box::new(instrument), Box::new(ToggleLine::default()));
    let mut controller =
        ScanController::new(fast_settings(dir.path()), DeviceSession::new(devices), air_store());
    let mut events = controller.subscribe();

    let path = controller.start("flaky").await.unwrap();
    next_samples(&mut events, 3).await;
    let report = controller.stop().await.unwrap();
    assert_eq!(report.substituted, 2);

    let samples = RowLog::read_samples(&path).await.unwrap();
    let profile = ThermalProfile::default();
    assert!((samples[0].raw_value - profile.resistance_at(1)).abs() < 1e-9);
    assert!((samples[1].raw_value - profile.resistance_at(2)).abs() < 1e-9);
    assert!((samples[2].raw_value - 10_000.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_unconvertible_reading_leaves_temperature_empty() {
    let dir = temp_dir();
    let devices = DeviceSet::new(
        Box::new(ScriptedInstrument::steady("probe", -3.0)),
        Box::new(ToggleLine::default()),
    );
    let mut controller =
        ScanController::new(fast_settings(dir.path()), DeviceSession::new(devices), air_store());
    let mut events = controller.subscribe();

    let path = controller.start("negative").await.unwrap();
    next_samples(&mut events, 1).await;
    let report = controller.stop().await.unwrap();
    assert!(report.invalid_conversions >= 1);

    let contents = std::fs::read_to_string(&path).unwrap();
    let first_row = contents.lines().nth(1).unwrap();
    assert!(first_row.starts_with("1,"));
    assert!(first_row.ends_with(",-3.0,"));
}

#[tokio::test]
async fn test_published_coefficients_apply_to_next_sample() {
    let dir = temp_dir();
    let store = air_store();
    let mut controller = ScanController::new(
        fast_settings(dir.path()),
        DeviceSession::new(toggling_devices()),
        store.clone(),
    );
    let mut events = controller.subscribe();

    controller.start("swap").await.unwrap();
    next_samples(&mut events, 1).await;
    store.publish(CalibrationModel::new(Medium::Air, vec![100.0, 0.0]).unwrap());

    let converted = timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(ScanEvent::Sample(sample)) = events.recv().await {
                if sample.converted_value == Some(100.0) {
                    break;
                }
            }
        }
    })
    .await;
    assert!(converted.is_ok(), "new coefficients never took effect");
    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_devices_are_exclusive_between_scan_and_calibration() {
    let dir = temp_dir();
    let session = DeviceSession::new(toggling_devices());
    let mut controller =
        ScanController::new(fast_settings(dir.path()), session.clone(), air_store());

    controller.start("busy").await.unwrap();
    let err = CalibrationSession::begin(
        &session,
        CalibrationModel::bootstrap(Medium::Air),
        &dir.path().join("cal"),
        air_store(),
        10,
    )
    .await
    .unwrap_err();
    match err {
        DomainError::DeviceBusy { holder } => assert_eq!(holder, "scan"),
        other => panic!("expected DeviceBusy, got {other:?}"),
    }

    controller.stop().await.unwrap();
    assert!(session.is_available());
    let calibration = CalibrationSession::begin(
        &session,
        CalibrationModel::bootstrap(Medium::Air),
        &dir.path().join("cal"),
        air_store(),
        10,
    )
    .await
    .unwrap();
    assert_eq!(session.holder().as_deref(), Some("calibration"));

    let mut again = ScanController::new(fast_settings(dir.path()), session.clone(), air_store());
    assert!(matches!(
        again.start("later").await,
        Err(DomainError::DeviceBusy { .. })
    ));
    assert_eq!(again.state().await, ScanState::Idle);

    let summary = calibration.finish();
    assert_eq!(summary.points, 0);
    assert!(session.is_available());
}

#[tokio::test]
async fn test_stop_during_measurement_still_records_the_row() {
    let dir = temp_dir();
    let instrument = SlowInstrument::new(Duration::from_millis(300), 10_000.0);
    let started = instrument.started.clone();
    let finished = instrument.finished.clone();
    let devices = DeviceSet::new(Box::new(instrument), Box::new(ToggleLine::default()));
    let mut controller =
        ScanController::new(fast_settings(dir.path()), DeviceSession::new(devices), air_store());

    let path = controller.start("mid-read").await.unwrap();
    assert!(
        wait_until(
            || {
                let started = started.clone();
                async move { started.load(Ordering::SeqCst) == 1 }
            },
            Duration::from_secs(2),
        )
        .await
    );
    assert_eq!(controller.state().await, ScanState::Measuring);

    let report = controller.stop().await.unwrap();
    assert_eq!(finished.load(Ordering::SeqCst), 1, "read ran to completion");
    assert_eq!(started.load(Ordering::SeqCst), 1, "no further read after stop");
    assert_eq!(report.samples, 1);

    let samples = RowLog::read_samples(&path).await.unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].counter, 1);
    assert!((samples[0].raw_value - 10_000.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_iterations_are_paced_from_completion() {
    let dir = temp_dir();
    let read_time = Duration::from_millis(40);
    let mut settings = fast_settings(dir.path());
    settings.post_measurement_delay = Duration::from_millis(60);
    let devices = DeviceSet::new(
        Box::new(SlowInstrument::new(read_time, 10_000.0)),
        Box::new(ToggleLine::default()),
    );
    let mut controller = ScanController::new(settings, DeviceSession::new(devices), air_store());
    let mut events = controller.subscribe();

    let path = controller.start("paced").await.unwrap();
    next_samples(&mut events, 4).await;
    controller.stop().await.unwrap();

    let samples = RowLog::read_samples(&path).await.unwrap();
    assert!(samples.len() >= 4);
    let minimum_gap = (read_time + Duration::from_millis(60)).as_secs_f64();
    for pair in samples.windows(2) {
        let gap = pair[1].elapsed_time - pair[0].elapsed_time;
        assert!(
            gap >= minimum_gap - 1e-3,
            "samples {} and {} only {gap:.3}s apart",
            pair[0].counter,
            pair[1].counter
        );
    }
}
