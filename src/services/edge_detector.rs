//! Trigger line edge detection.
//!
//! Polls a [`SignalLine`] at a fixed interval until it fires or the timeout
//! elapses. The cancellable variant checks its token before every poll and
//! while sleeping, so a stop request is honoured within one poll interval.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::domain::models::{AcquisitionConfig, TriggerSemantics};
use crate::domain::ports::SignalLine;

/// Result of one cancellable edge wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeWait {
    /// The line fired; measure now.
    Triggered,
    /// No edge before the timeout; skip this tick.
    TimedOut,
    /// Stop was requested during the wait.
    Cancelled,
}

/// Edge detector over a polled boolean line.
#[derive(Debug, Clone, Copy)]
pub struct EdgeDetector {
    poll_interval: Duration,
    semantics: TriggerSemantics,
}

impl EdgeDetector {
    pub const fn new(poll_interval: Duration, semantics: TriggerSemantics) -> Self {
        Self {
            poll_interval,
            semantics,
        }
    }

    pub const fn from_config(config: &AcquisitionConfig) -> Self {
        Self::new(config.poll_interval(), config.trigger)
    }

    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub const fn semantics(&self) -> TriggerSemantics {
        self.semantics
    }

    /// Wait up to `timeout` for the line to fire.
    ///
    /// `false` means no measurement this tick, not an error.
    pub async fn wait_for_edge(&self, line: &mut dyn SignalLine, timeout: Duration) -> bool {
        let never = CancellationToken::new();
        self.wait_for_edge_until(line, timeout, &never).await == EdgeWait::Triggered
    }

    /// Wait for the line to fire, the timeout to elapse, or `cancel`.
    ///
    /// A simulated line fires immediately. Under edge semantics the line must
    /// be seen inactive at least once before an active reading counts. A
    /// failed line read counts as inactive.
    pub async fn wait_for_edge_until(
        &self,
        line: &mut dyn SignalLine,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> EdgeWait {
        if cancel.is_cancelled() {
            return EdgeWait::Cancelled;
        }
        if line.kind().is_simulated() {
            trace!(line = line.name(), "simulated trigger line, bypassing edge wait");
            return EdgeWait::Triggered;
        }

        let deadline = Instant::now() + timeout;
        let mut seen_inactive = false;
        let mut polls = 0u64;

        loop {
            if cancel.is_cancelled() {
                debug!(polls, "edge wait cancelled");
                return EdgeWait::Cancelled;
            }

            polls += 1;
            let active = match line.active().await {
                Ok(active) => active,
                Err(e) => {
                    warn!(line = line.name(), error = %e, "trigger line read failed");
                    false
                }
            };

            let fired = match self.semantics {
                TriggerSemantics::Level => active,
                TriggerSemantics::Edge => {
                    if !active {
                        seen_inactive = true;
                    }
                    active && seen_inactive
                }
            };
            if fired {
                debug!(polls, semantics = ?self.semantics, "trigger observed");
                return EdgeWait::Triggered;
            }

            if Instant::now() >= deadline {
                debug!(polls, ?timeout, "edge wait timed out");
                return EdgeWait::TimedOut;
            }

            tokio::select! {
                () = sleep(self.poll_interval) => {}
                () = cancel.cancelled() => {
                    debug!(polls, "edge wait cancelled");
                    return EdgeWait::Cancelled;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{DomainError, DomainResult};
    use crate::domain::ports::DeviceKind;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    /// Replays levels in order, repeating the last one forever.
    struct ScriptedLine {
        levels: VecDeque<DomainResult<bool>>,
        last: bool,
        reads: usize,
    }

    impl ScriptedLine {
        fn new(levels: &[bool]) -> Self {
            Self {
                levels: levels.iter().copied().map(Ok).collect(),
                last: levels.last().copied().unwrap_or(false),
                reads: 0,
            }
        }
    }

    #[async_trait]
    impl SignalLine for ScriptedLine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn kind(&self) -> DeviceKind {
            DeviceKind::Real
        }

        async fn open(&mut self) -> bool {
            true
        }

        async fn active(&mut self) -> DomainResult<bool> {
            self.reads += 1;
            self.levels.pop_front().unwrap_or(Ok(self.last))
        }
    }

    struct AlwaysActiveSimulated;

    #[async_trait]
    impl SignalLine for AlwaysActiveSimulated {
        fn name(&self) -> &str {
            "sim"
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

    const POLL: Duration = Duration::from_millis(2);

    #[tokio::test]
    async fn test_edge_fires_on_third_sample() {
        let detector = EdgeDetector::new(POLL, TriggerSemantics::Edge);
        let mut line = ScriptedLine::new(&[false, false, true]);

        assert!(detector.wait_for_edge(&mut line, POLL * 50).await);
        assert_eq!(line.reads, 3);
    }

    #[tokio::test]
    async fn test_edge_ignores_line_already_active() {
        let detector = EdgeDetector::new(POLL, TriggerSemantics::Edge);
        let mut line = ScriptedLine::new(&[true, true]);

        assert!(!detector.wait_for_edge(&mut line, POLL * 5).await);
        assert!(line.reads >= 2);
    }

    #[tokio::test]
    async fn test_level_fires_on_first_active() {
        let detector = EdgeDetector::new(POLL, TriggerSemantics::Level);
        let mut line = ScriptedLine::new(&[true]);

        assert!(detector.wait_for_edge(&mut line, POLL * 5).await);
        assert_eq!(line.reads, 1);
    }

    #[tokio::test]
    async fn test_read_error_counts_as_inactive() {
        let detector = EdgeDetector::new(POLL, TriggerSemantics::Edge);
        let mut line = ScriptedLine::new(&[true, true]);
        line.levels.push_front(Err(DomainError::ReadFailure("framing".into())));

        assert!(detector.wait_for_edge(&mut line, POLL * 50).await);
        assert_eq!(line.reads, 2);
    }

    #[tokio::test]
    async fn test_simulated_line_bypasses_polling() {
        let detector = EdgeDetector::new(Duration::from_secs(60), TriggerSemantics::Edge);
        let mut line = AlwaysActiveSimulated;

        assert!(detector.wait_for_edge(&mut line, Duration::from_secs(600)).await);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_long_wait() {
        let detector = EdgeDetector::new(Duration::from_millis(5), TriggerSemantics::Edge);
        let mut line = ScriptedLine::new(&[false]);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let outcome = detector
            .wait_for_edge_until(&mut line, Duration::from_secs(30), &cancel)
            .await;

        assert_eq!(outcome, EdgeWait::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_skips_polling() {
        let detector = EdgeDetector::new(POLL, TriggerSemantics::Level);
        let mut line = ScriptedLine::new(&[true]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = detector.wait_for_edge_until(&mut line, POLL, &cancel).await;
        assert_eq!(outcome, EdgeWait::Cancelled);
        assert_eq!(line.reads, 0);
    }
}
