//! Common test utilities for integration tests
//!
//! Scripted device doubles and fixtures shared across integration test files.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use welltemp::domain::models::Config;
use welltemp::services::{DeviceSet, ScanSettings};
use welltemp::{DeviceKind, DomainError, DomainResult, MeasurementInstrument, SignalLine};

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Setup test logging
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Fast scan settings writing into `dir`.
pub fn fast_settings(dir: &std::path::Path) -> ScanSettings {
    let mut config = Config::default();
    config.acquisition.poll_interval_ms = 1;
    config.acquisition.post_measurement_delay_ms = 1;
    config.acquisition.edge_timeout_ms = 60_000;
    config.output.directory = dir.to_path_buf();
    ScanSettings::from_config(&config)
}

/// Trigger line that alternates inactive/active on every read, starting
/// inactive. Under edge semantics every second poll fires.
#[derive(Debug, Default)]
pub struct ToggleLine {
    next: bool,
}

#[async_trait]
impl SignalLine for ToggleLine {
    fn name(&self) -> &str {
        "toggle"
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Real
    }

    async fn open(&mut self) -> bool {
        true
    }

    async fn active(&mut self) -> DomainResult<bool> {
        let level = self.next;
        self.next = !self.next;
        Ok(level)
    }
}

/// Trigger line that never fires. Counts reads.
#[derive(Debug, Default, Clone)]
pub struct QuietLine {
    pub reads: Arc<AtomicUsize>,
}

#[async_trait]
impl SignalLine for QuietLine {
    fn name(&self) -> &str {
        "quiet"
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Real
    }

    async fn open(&mut self) -> bool {
        true
    }

    async fn active(&mut self) -> DomainResult<bool> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    }
}

/// Trigger line whose `open` fails.
#[derive(Debug, Default)]
pub struct DeadLine;

#[async_trait]
impl SignalLine for DeadLine {
    fn name(&self) -> &str {
        "dead"
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Real
    }

    async fn open(&mut self) -> bool {
        false
    }

    async fn active(&mut self) -> DomainResult<bool> {
        Err(DomainError::DeviceUnavailable("dead line".to_string()))
    }
}

/// Instrument replaying scripted results, then repeating `steady`.
#[derive(Debug)]
pub struct ScriptedInstrument {
    name: &'static str,
    script: VecDeque<DomainResult<f64>>,
    steady: f64,
    pub queries: Arc<AtomicUsize>,
}

impl ScriptedInstrument {
    pub fn steady(name: &'static str, value: f64) -> Self {
        Self {
            name,
            script: VecDeque::new(),
            steady: value,
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn scripted(
        name: &'static str,
        script: impl IntoIterator<Item = DomainResult<f64>>,
        steady: f64,
    ) -> Self {
        Self {
            name,
            script: script.into_iter().collect(),
            steady,
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl MeasurementInstrument for ScriptedInstrument {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Real
    }

    async fn open(&mut self) -> bool {
        true
    }

    async fn configure(&mut self, _sample_count: u32) -> DomainResult<()> {
        Ok(())
    }

    async fn query(&mut self, _command: &str) -> DomainResult<f64> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.script.pop_front().unwrap_or(Ok(self.steady))
    }
}

/// Instrument whose every reading takes `read_time`. Counts started and
/// finished queries.
#[derive(Debug, Clone)]
pub struct SlowInstrument {
    read_time: Duration,
    value: f64,
    pub started: Arc<AtomicUsize>,
    pub finished: Arc<AtomicUsize>,
}

impl SlowInstrument {
    pub fn new(read_time: Duration, value: f64) -> Self {
        Self {
            read_time,
            value,
            started: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl MeasurementInstrument for SlowInstrument {
    fn name(&self) -> &str {
        "slow-probe"
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Real
    }

    async fn open(&mut self) -> bool {
        true
    }

    async fn configure(&mut self, _sample_count: u32) -> DomainResult<()> {
        Ok(())
    }

    async fn query(&mut self, _command: &str) -> DomainResult<f64> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.read_time).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(self.value)
    }
}

/// Device set with a toggling line and a steady 10 kOhm probe.
pub fn toggling_devices() -> DeviceSet {
    DeviceSet::new(
        Box::new(ScriptedInstrument::steady("probe", 10_000.0)),
        Box::new(ToggleLine::default()),
    )
}

/// Wait until `predicate` holds, polling every 5 ms.
pub async fn wait_until<F, Fut>(mut predicate: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
