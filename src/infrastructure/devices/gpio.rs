//! Trigger line read from a sysfs-style GPIO value file.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{DeviceKind, SignalLine};

#[derive(Debug, Clone)]
pub struct GpioSignalLine {
    path: PathBuf,
    active_low: bool,
}

impl GpioSignalLine {
    pub const fn new(path: PathBuf, active_low: bool) -> Self {
        Self { path, active_low }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SignalLine for GpioSignalLine {
    fn name(&self) -> &str {
        "gpio"
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Real
    }

    async fn open(&mut self) -> bool {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(_) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "signal line not readable");
                false
            }
        }
    }

    async fn active(&mut self) -> DomainResult<bool> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let level = match raw.trim() {
            "1" => true,
            "0" => false,
            other => {
                return Err(DomainError::ReadFailure(format!(
                    "unexpected signal level '{other}' in {}",
                    self.path.display()
                )))
            }
        };
        Ok(level != self.active_low)
    }
}
