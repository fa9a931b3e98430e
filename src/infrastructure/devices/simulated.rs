use async_trait::async_trait;
use tracing::trace;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::ThermalProfile;
use crate::domain::ports::{DeviceKind, MeasurementInstrument, SignalLine, READ_COMMAND};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Resistance,
    Temperature,
}

/// Instrument that walks the thermal profile, one step per reading.
#[derive(Debug, Clone)]
pub struct SimulatedInstrument {
    name: &'static str,
    profile: ThermalProfile,
    output: Output,
    index: u64,
    fail_every: Option<u64>,
}

impl SimulatedInstrument {
    /// Probe returning resistance in ohms.
    pub const fn probe(profile: ThermalProfile) -> Self {
        Self {
            name: "simulated-probe",
            profile,
            output: Output::Resistance,
            index: 0,
            fail_every: None,
        }
    }

    /// Reference thermometer returning degrees C.
    pub const fn reference(profile: ThermalProfile) -> Self {
        Self {
            name: "simulated-reference",
            profile,
            output: Output::Temperature,
            index: 0,
            fail_every: None,
        }
    }

    /// Fail every `n`th query with a read error.
    #[must_use]
    pub const fn failing_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n);
        self
    }
}

#[async_trait]
impl MeasurementInstrument for SimulatedInstrument {
    fn name(&self) -> &str {
        self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Simulated
    }

    async fn open(&mut self) -> bool {
        true
    }

    async fn configure(&mut self, sample_count: u32) -> DomainResult<()> {
        trace!(instrument = self.name, sample_count, "simulated configure");
        Ok(())
    }

    async fn query(&mut self, command: &str) -> DomainResult<f64> {
        if command != READ_COMMAND {
            return Err(DomainError::ReadFailure(format!(
                "unsupported command '{command}'"
            )));
        }
        self.index += 1;
        if let Some(n) = self.fail_every {
            if n > 0 && self.index % n == 0 {
                return Err(DomainError::ReadFailure(format!(
                    "simulated fault on reading {}",
                    self.index
                )));
            }
        }
        Ok(match self.output {
            Output::Resistance => self.profile.resistance_at(self.index),
            Output::Temperature => self.profile.temperature_at(self.index),
        })
    }
}

/// Trigger line stand-in; always active, so the edge wait is bypassed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSignalLine;

#[async_trait]
impl SignalLine for SimulatedSignalLine {
    fn name(&self) -> &str {
        "simulated-signal"
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Simulated
    }

    async fn open(&mut self) -> bool {
        true
    }

    async fn active(&mut self) -> DomainResult<bool> {
        Ok(true)
    }
}
