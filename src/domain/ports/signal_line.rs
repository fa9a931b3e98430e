use async_trait::async_trait;

use super::DeviceKind;
use crate::domain::errors::DomainResult;

/// Port for the boolean trigger line.
#[async_trait]
pub trait SignalLine: Send {
    fn name(&self) -> &str;

    /// A simulated line makes the edge detector bypass polling.
    fn kind(&self) -> DeviceKind;

    /// Acquire the line. `false` means the device is unavailable.
    async fn open(&mut self) -> bool;

    /// Current trigger level; `true` is active.
    async fn active(&mut self) -> DomainResult<bool>;
}
