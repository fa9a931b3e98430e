use async_trait::async_trait;

use super::DeviceKind;
use crate::domain::errors::DomainResult;

/// Command returning one reading from a configured instrument.
pub const READ_COMMAND: &str = "READ?";

/// Port for an instrument that returns a scalar reading per query.
///
/// Implementations are owned by exactly one flow at a time (see
/// `DeviceSession`), hence `&mut self` and no `Sync` bound.
#[async_trait]
pub trait MeasurementInstrument: Send {
    /// Human-readable identity for logs and warnings.
    fn name(&self) -> &str;

    fn kind(&self) -> DeviceKind;

    /// Connect to the instrument. `false` means the device is unavailable.
    async fn open(&mut self) -> bool;

    /// Apply the integration (sample count) setting.
    async fn configure(&mut self, sample_count: u32) -> DomainResult<()>;

    /// Send `command` and parse the response as a float.
    ///
    /// Transport errors and malformed responses are `ReadFailure`.
    async fn query(&mut self, command: &str) -> DomainResult<f64>;
}
