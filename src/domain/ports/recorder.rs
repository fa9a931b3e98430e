use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Sample;

/// Append-only sink for acquired samples.
///
/// One recorder is bound to one session. Implementations must not hold
/// resources across calls, so rows already written survive a crash.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Append one row.
    async fn append(&self, sample: &Sample) -> DomainResult<()>;

    /// Where rows end up, for reporting.
    fn location(&self) -> String;
}
