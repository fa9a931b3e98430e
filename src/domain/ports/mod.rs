//! Port traits for the devices and the row sink.
//!
//! The acquisition loop and the calibration session talk to hardware only
//! through these traits. Each adapter comes in a real and a simulated
//! variant, chosen once when the device set is built.

pub mod instrument;
pub mod recorder;
pub mod signal_line;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use instrument::{MeasurementInstrument, READ_COMMAND};
pub use recorder::Recorder;
pub use signal_line::SignalLine;

/// Whether an adapter drives physical hardware or stands in for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Real,
    Simulated,
}

impl DeviceKind {
    pub const fn is_simulated(self) -> bool {
        matches!(self, Self::Simulated)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => f.write_str("real"),
            Self::Simulated => f.write_str("simulated"),
        }
    }
}
