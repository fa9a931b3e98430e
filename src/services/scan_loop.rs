//! Acquisition controller.
//!
//! Drives edge-wait, acquire, convert, record, notify on a single tokio task.
//! The next iteration starts only after the previous one has completed plus
//! the post-measurement delay. Stop is cooperative: the controller cancels a
//! token that the loop checks at iteration boundaries, during the delay and
//! inside the edge-wait poll. An iteration that has started measuring always
//! finishes recording first.

use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::coefficient_store::CoefficientStore;
use super::device_session::{DeviceLease, DeviceSession};
use super::edge_detector::{EdgeDetector, EdgeWait};
use super::measurement_source::MeasurementSource;
use super::temperature_converter::convert;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Config, Sample, ScanState};
use crate::domain::ports::Recorder;
use crate::infrastructure::recorder::RowLog;

const EVENT_CAPACITY: usize = 256;

/// Lease holder name used by the scan loop.
pub const SCAN_HOLDER: &str = "scan";

/// Notification sent to observers.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    StateChanged(ScanState),
    /// A sample was acquired and handed to the recorder.
    Sample(Sample),
    /// The edge wait timed out; nothing was measured this tick.
    NoTrigger,
    /// Degraded operation the operator should know about.
    Warning(String),
}

/// Resolved numeric settings for the controller.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub detector: EdgeDetector,
    pub edge_timeout: Duration,
    pub post_measurement_delay: Duration,
    pub sample_count: u32,
    pub plot_buffer_len: usize,
    pub output_dir: PathBuf,
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Self {
        let acquisition = &config.acquisition;
        Self {
            detector: EdgeDetector::from_config(acquisition),
            edge_timeout: acquisition.edge_timeout(),
            post_measurement_delay: acquisition.post_measurement_delay(),
            sample_count: acquisition.sample_count,
            plot_buffer_len: acquisition.plot_buffer_len,
            output_dir: config.output.directory.clone(),
        }
    }
}

/// Totals for one session, returned by [`ScanController::stop`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub run_id: Uuid,
    pub session_id: String,
    pub output_path: PathBuf,
    /// Completed edge waits, triggered or not.
    pub iterations: u64,
    pub samples: u64,
    pub no_trigger: u64,
    pub substituted: u64,
    pub invalid_conversions: u64,
    pub write_failures: u64,
}

/// Most recent samples, oldest evicted first.
#[derive(Debug, Clone)]
pub struct PlotBuffer {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl PlotBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        if self.capacity == 0 {
            return;
        }
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().cloned().collect()
    }
}

struct Shared {
    state: RwLock<ScanState>,
    source: Mutex<MeasurementSource>,
    buffer: Mutex<PlotBuffer>,
    events: broadcast::Sender<ScanEvent>,
}

impl Shared {
    async fn set_state(&self, state: ScanState) {
        *self.state.write().await = state;
        let _ = self.events.send(ScanEvent::StateChanged(state));
    }

    fn warn(&self, message: String) {
        let _ = self.events.send(ScanEvent::Warning(message));
    }
}

struct RunningScan {
    cancel: CancellationToken,
    handle: JoinHandle<ScanReport>,
}

/// Owner of the scan loop lifecycle.
pub struct ScanController {
    settings: ScanSettings,
    devices: DeviceSession,
    coefficients: CoefficientStore,
    shared: Arc<Shared>,
    running: Option<RunningScan>,
}

impl ScanController {
    pub fn new(
        settings: ScanSettings,
        devices: DeviceSession,
        coefficients: CoefficientStore,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            state: RwLock::new(ScanState::Idle),
            source: Mutex::new(MeasurementSource::new()),
            buffer: Mutex::new(PlotBuffer::new(settings.plot_buffer_len)),
            events,
        });
        Self {
            settings,
            devices,
            coefficients,
            shared,
            running: None,
        }
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Receive state changes, samples and warnings.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.shared.events.subscribe()
    }

    pub async fn state(&self) -> ScanState {
        *self.shared.state.read().await
    }

    pub async fn counter(&self) -> u64 {
        self.shared.source.lock().await.counter()
    }

    pub async fn rate(&self) -> f64 {
        self.shared.source.lock().await.rate()
    }

    /// Samples currently held for display.
    pub async fn plot_snapshot(&self) -> Vec<Sample> {
        self.shared.buffer.lock().await.snapshot()
    }

    /// Run preflight, open the devices and arm the loop.
    ///
    /// On any failure the state stays `Idle` and the devices go back to the
    /// session. Returns the path of the new session file.
    pub async fn start(&mut self, session_id: &str) -> DomainResult<PathBuf> {
        let state = self.state().await;
        if !state.can_start() || self.running.is_some() {
            return Err(DomainError::InvalidStateTransition {
                from: state.to_string(),
                to: ScanState::Armed.to_string(),
            });
        }

        let session_id = session_id.trim();
        if session_id.is_empty() {
            let err = DomainError::PreflightFailure("session identifier is required".to_string());
            warn!(error = %err, "start aborted");
            self.shared.warn(err.to_string());
            return Err(err);
        }

        let dir = self.settings.output_dir.clone();
        if let Err(e) = RowLog::prepare_directory(&dir).await {
            let err = DomainError::PreflightFailure(format!(
                "output directory {} is not writable: {e}",
                dir.display()
            ));
            warn!(error = %err, "start aborted");
            self.shared.warn(err.to_string());
            return Err(err);
        }

        let mut lease = self.devices.checkout(SCAN_HOLDER)?;
        if let Err(e) = lease.open_for_scan(self.settings.sample_count).await {
            warn!(error = %e, "start aborted");
            self.shared.warn(e.to_string());
            return Err(e);
        }

        let log = RowLog::create(&dir, session_id).await.map_err(|e| {
            let err = DomainError::PreflightFailure(format!("cannot create session file: {e}"));
            self.shared.warn(err.to_string());
            err
        })?;
        let output_path = log.path().to_path_buf();

        self.shared.source.lock().await.arm();
        self.shared.set_state(ScanState::Armed).await;

        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let scan = ScanLoop {
            detector: self.settings.detector,
            edge_timeout: self.settings.edge_timeout,
            post_measurement_delay: self.settings.post_measurement_delay,
            lease,
            recorder: Box::new(log),
            coefficients: self.coefficients.clone(),
            shared: Arc::clone(&self.shared),
            cancel: cancel.clone(),
            report: ScanReport {
                run_id,
                session_id: session_id.to_string(),
                output_path: output_path.clone(),
                ..ScanReport::default()
            },
        };

        let span = info_span!("scan", %run_id, session = %session_id);
        let handle = tokio::spawn(scan.run().instrument(span));
        self.running = Some(RunningScan { cancel, handle });

        info!(session = %session_id, path = %output_path.display(), "scan started");
        Ok(output_path)
    }

    /// Request stop and wait for the in-flight iteration to finish.
    pub async fn stop(&mut self) -> DomainResult<ScanReport> {
        let Some(running) = self.running.take() else {
            return Err(DomainError::InvalidStateTransition {
                from: self.state().await.to_string(),
                to: ScanState::Stopped.to_string(),
            });
        };

        running.cancel.cancel();
        match running.handle.await {
            Ok(report) => {
                info!(
                    samples = report.samples,
                    iterations = report.iterations,
                    "scan stopped"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "scan task ended abnormally");
                self.shared.set_state(ScanState::Stopped).await;
                Err(DomainError::TaskFailed(e.to_string()))
            }
        }
    }

    /// Zero the counters and clear the plot buffer. Calibration state is
    /// untouched.
    pub async fn reset(&mut self) -> DomainResult<()> {
        let state = self.state().await;
        if self.running.is_some() || !state.can_reset() {
            return Err(DomainError::InvalidStateTransition {
                from: state.to_string(),
                to: ScanState::Idle.to_string(),
            });
        }

        self.shared.source.lock().await.reset();
        self.shared.buffer.lock().await.clear();
        self.shared.set_state(ScanState::Idle).await;
        info!("scan reset");
        Ok(())
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
        }
    }
}

/// State owned by the loop task for one session.
struct ScanLoop {
    detector: EdgeDetector,
    edge_timeout: Duration,
    post_measurement_delay: Duration,
    lease: DeviceLease,
    recorder: Box<dyn Recorder>,
    coefficients: CoefficientStore,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    report: ScanReport,
}

impl ScanLoop {
    async fn run(mut self) -> ScanReport {
        debug!(devices = %self.lease.kind(), "scan loop running");

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.shared.set_state(ScanState::Waiting).await;
            let outcome = self
                .detector
                .wait_for_edge_until(self.lease.signal.as_mut(), self.edge_timeout, &self.cancel)
                .await;

            match outcome {
                EdgeWait::Cancelled => break,
                EdgeWait::TimedOut => {
                    self.report.iterations += 1;
                    self.report.no_trigger += 1;
                    let _ = self.shared.events.send(ScanEvent::NoTrigger);
                }
                EdgeWait::Triggered => {
                    self.report.iterations += 1;
                    self.shared.set_state(ScanState::Measuring).await;
                    self.measure().await;
                }
            }

            self.shared.set_state(ScanState::Armed).await;

            tokio::select! {
                () = sleep(self.post_measurement_delay) => {}
                () = self.cancel.cancelled() => break,
            }
        }

        self.shared.set_state(ScanState::Stopped).await;
        self.report
    }

    async fn measure(&mut self) {
        let acquisition = {
            let mut source = self.shared.source.lock().await;
            source.acquire(self.lease.instrument.as_mut()).await
        };
        if acquisition.substituted {
            self.report.substituted += 1;
            self.shared.warn(format!(
                "sample {} used a simulated value after a failed read",
                acquisition.counter
            ));
        }

        let model = self.coefficients.current();
        let converted_value = match convert(&model, acquisition.raw_value) {
            Ok(temperature) => Some(temperature),
            Err(e) => {
                self.report.invalid_conversions += 1;
                warn!(counter = acquisition.counter, error = %e, "temperature left empty");
                self.shared.warn(e.to_string());
                None
            }
        };

        let sample = Sample {
            counter: acquisition.counter,
            elapsed_time: acquisition.elapsed_time,
            rate: acquisition.rate,
            timestamp: acquisition.timestamp,
            raw_value: acquisition.raw_value,
            converted_value,
        };

        if let Err(e) = self.recorder.append(&sample).await {
            self.report.write_failures += 1;
            error!(
                counter = sample.counter,
                location = %self.recorder.location(),
                error = %e,
                "failed to record sample"
            );
            self.shared.warn(format!("row {} not written: {e}", sample.counter));
        }

        self.report.samples += 1;
        self.shared.buffer.lock().await.push(sample.clone());
        let _ = self.shared.events.send(ScanEvent::Sample(sample));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(counter: u64) -> Sample {
        Sample {
            counter,
            elapsed_time: 1.0,
            rate: 1.0,
            timestamp: "T".to_string(),
            raw_value: 1.0,
            converted_value: None,
        }
    }

    #[test]
    fn test_plot_buffer_evicts_oldest() {
        let mut buffer = PlotBuffer::new(3);
        for i in 1..=5 {
            buffer.push(sample(i));
        }
        let counters: Vec<u64> = buffer.snapshot().iter().map(|s| s.counter).collect();
        assert_eq!(counters, vec![3, 4, 5]);
    }

    #[test]
    fn test_plot_buffer_zero_capacity_keeps_nothing() {
        let mut buffer = PlotBuffer::new(0);
        buffer.push(sample(1));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.acquisition.post_measurement_delay_ms = 75;
        config.output.directory = PathBuf::from("/tmp/wt");

        let settings = ScanSettings::from_config(&config);
        assert_eq!(settings.post_measurement_delay, Duration::from_millis(75));
        assert_eq!(settings.detector.poll_interval(), Duration::from_millis(10));
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/wt"));
    }
}
