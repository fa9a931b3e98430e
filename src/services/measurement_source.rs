//! Raw reading acquisition with counter, elapsed time and rate tracking.

use chrono::Local;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::models::ThermalProfile;
use crate::domain::ports::{MeasurementInstrument, READ_COMMAND};

/// One raw reading plus the bookkeeping taken alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub counter: u64,
    pub elapsed_time: f64,
    pub rate: f64,
    pub timestamp: String,
    pub raw_value: f64,
    /// The instrument read failed and `raw_value` is simulated.
    pub substituted: bool,
}

/// `counter / elapsed`, zero until time has elapsed.
pub fn sample_rate(counter: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs < 1e-9 {
        0.0
    } else {
        counter as f64 / elapsed_secs
    }
}

/// Local wall-clock time in the row log's timestamp format.
pub fn timestamp_now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Acquires readings and tracks the per-session counters.
///
/// Acquisition never fails: a bad read is logged and replaced with a value
/// from the simulated thermal profile.
#[derive(Debug)]
pub struct MeasurementSource {
    counter: u64,
    origin: Instant,
    fallback: ThermalProfile,
    substitutions: u64,
}

impl Default for MeasurementSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementSource {
    pub fn new() -> Self {
        Self::with_fallback(ThermalProfile::default())
    }

    pub fn with_fallback(fallback: ThermalProfile) -> Self {
        Self {
            counter: 0,
            origin: Instant::now(),
            fallback,
            substitutions: 0,
        }
    }

    pub const fn counter(&self) -> u64 {
        self.counter
    }

    /// Readings replaced by simulated values since the last reset.
    pub const fn substitutions(&self) -> u64 {
        self.substitutions
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    pub fn rate(&self) -> f64 {
        sample_rate(self.counter, self.elapsed_secs())
    }

    /// Restart the elapsed-time origin if no sample has been taken yet.
    pub fn arm(&mut self) {
        if self.counter == 0 {
            self.origin = Instant::now();
        }
    }

    /// Zero the counter and restart the elapsed-time origin.
    pub fn reset(&mut self) {
        debug!(previous = self.counter, "measurement source reset");
        self.counter = 0;
        self.substitutions = 0;
        self.origin = Instant::now();
    }

    /// Take one reading.
    pub async fn acquire(&mut self, instrument: &mut dyn MeasurementInstrument) -> Acquisition {
        self.counter += 1;
        let elapsed_time = self.elapsed_secs();
        let rate = sample_rate(self.counter, elapsed_time);
        let timestamp = timestamp_now();

        let (raw_value, substituted) = match instrument.query(READ_COMMAND).await {
            Ok(value) if value.is_finite() => (value, false),
            Ok(value) => {
                warn!(
                    instrument = instrument.name(),
                    value, "non-finite reading, substituting simulated value"
                );
                (self.substitute(), true)
            }
            Err(e) => {
                warn!(
                    instrument = instrument.name(),
                    error = %e,
                    "failed reading from device, substituting simulated value"
                );
                (self.substitute(), true)
            }
        };

        Acquisition {
            counter: self.counter,
            elapsed_time,
            rate,
            timestamp,
            raw_value,
            substituted,
        }
    }

    fn substitute(&mut self) -> f64 {
        self.substitutions += 1;
        self.fallback.resistance_at(self.counter)
    }
}
