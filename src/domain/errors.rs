//! Domain errors for the welltemp acquisition system.

use thiserror::Error;

/// Domain-level errors raised by the acquisition loop, the converter, the
/// calibration fitter and the device session.
///
/// None of these are fatal to the process. Callers degrade: a read failure is
/// replaced by a simulated value, a fit failure keeps the previous
/// coefficients, an invalid conversion leaves the temperature field empty.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Instrument read failed: {0}")]
    ReadFailure(String),

    #[error("Calibration fit failed: {0}")]
    FitFailure(String),

    #[error("Invalid conversion: raw value {0} is outside the model domain")]
    InvalidConversion(f64),

    #[error("Preflight failed: {0}")]
    PreflightFailure(String),

    #[error("Devices are checked out by {holder}")]
    DeviceBusy { holder: String },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Malformed row: {0}")]
    RowParse(String),

    #[error("Scan task failed: {0}")]
    TaskFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl DomainError {
    /// Whether the error leaves the scan loop able to continue on the next
    /// iteration without operator action.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ReadFailure(_) | Self::FitFailure(_) | Self::InvalidConversion(_) | Self::Io(_)
        )
    }
}
