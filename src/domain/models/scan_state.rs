//! Acquisition controller lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the scan loop.
///
/// `Idle -> Armed` on a successful start; while armed each iteration moves
/// through `Waiting` (edge wait) and `Measuring` (acquire, convert, record)
/// before returning to `Armed`. `Stopped` follows a stop request, and
/// `reset` brings `Stopped` or `Idle` back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    #[default]
    Idle,
    Armed,
    Waiting,
    Measuring,
    Stopped,
}

impl ScanState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Waiting => "waiting",
            Self::Measuring => "measuring",
            Self::Stopped => "stopped",
        }
    }

    /// True while the loop task owns the devices.
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Armed | Self::Waiting | Self::Measuring)
    }

    /// Whether `reset` is permitted from this state.
    pub const fn can_reset(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }

    /// Whether `start` is permitted from this state. A stopped loop must be
    /// reset first.
    pub const fn can_start(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
