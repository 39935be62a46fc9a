//! Stateful test-case generators (spec §4.3).
//!
//! One generator family per `TestCaseKind`, unified as a tagged enum
//! rather than a trait object — the design notes call this out
//! explicitly: "generators share a two-method capability {name, next};
//! implement as a tagged variant or interface abstraction. Avoid
//! inheritance hierarchies."

mod basic_kv;
mod metadata_ephemeral;
mod metadata_notification;
mod streaming_sequence;

pub use basic_kv::BasicKv;
pub use metadata_ephemeral::MetadataEphemeral;
pub use metadata_notification::MetadataNotification;
pub use streaming_sequence::StreamingSequence;

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::{TestCaseDescriptor, TestCaseKind};
use crate::error::{DriverError, DriverResult};
use crate::operation::Operation;
use crate::rate_limiter::RateLimiter;

/// Shared per-generator state: the wall-clock duration cap, the
/// token-bucket gate, the generator's own cancellation handle (derived
/// from the task's, per the design notes: "do not share a single
/// global handle"), and the task-local monotonic `sequence` counter.
pub(crate) struct GeneratorContext {
    task_name: String,
    start: Instant,
    duration: Duration,
    limiter: RateLimiter,
    cancel: CancellationToken,
    sequence: i64,
}

impl GeneratorContext {
    pub(crate) fn new(
        task_name: String,
        op_rate: u32,
        duration: Duration,
        parent_cancel: CancellationToken,
    ) -> Self {
        Self {
            task_name,
            start: Instant::now(),
            duration,
            limiter: RateLimiter::new(op_rate),
            cancel: parent_cancel.child_token(),
            sequence: 0,
        }
    }

    pub(crate) fn task_name(&self) -> &str {
        &self.task_name
    }

    fn expired(&self) -> bool {
        self.start.elapsed() > self.duration
    }

    /// Gates one tick: `None` if the duration cap has passed or the
    /// generator was cancelled while waiting on the rate limiter.
    /// Idempotent once expired, per spec §4.3.
    pub(crate) async fn gate(&self) -> Option<()> {
        if self.expired() {
            return None;
        }
        self.limiter.acquire(&self.cancel).await.ok()
    }

    pub(crate) fn next_sequence(&mut self) -> i64 {
        let seq = self.sequence;
        self.sequence += 1;
        seq
    }
}

/// One of the four implemented generator kinds.
pub enum Generator {
    BasicKv(BasicKv),
    MetadataEphemeral(MetadataEphemeral),
    MetadataNotification(MetadataNotification),
    StreamingSequence(StreamingSequence),
}

impl Generator {
    /// Builds the generator named by `tc.kind`. `SecondaryIndex` and
    /// `MetadataVersionId` are declared extension points with no
    /// implemented behavior (spec §9 Open Question #4) and return
    /// `DriverError::UnsupportedKind` rather than panicking.
    pub fn from_descriptor(
        tc: &TestCaseDescriptor,
        cancel: CancellationToken,
    ) -> DriverResult<Self> {
        match tc.kind {
            TestCaseKind::Basic => Ok(Generator::BasicKv(BasicKv::new(tc, cancel)?)),
            TestCaseKind::MetadataEphemeral => {
                Ok(Generator::MetadataEphemeral(MetadataEphemeral::new(tc, cancel)))
            }
            TestCaseKind::MetadataNotification => Ok(Generator::MetadataNotification(
                MetadataNotification::new(tc, cancel)?,
            )),
            TestCaseKind::StreamingSequence => {
                Ok(Generator::StreamingSequence(StreamingSequence::new(tc, cancel)))
            }
            TestCaseKind::SecondaryIndex | TestCaseKind::MetadataVersionId => Err(
                DriverError::UnsupportedKind(format!("{:?}", tc.kind)),
            ),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Generator::BasicKv(g) => g.name(),
            Generator::MetadataEphemeral(g) => g.name(),
            Generator::MetadataNotification(g) => g.name(),
            Generator::StreamingSequence(g) => g.name(),
        }
    }

    /// Yields the next `(Operation)`, or `None` once the duration cap
    /// has passed or the generator was cancelled. Idempotent after the
    /// first `None`.
    pub async fn next(&mut self) -> Option<Operation> {
        match self {
            Generator::BasicKv(g) => g.next().await,
            Generator::MetadataEphemeral(g) => g.next().await,
            Generator::MetadataNotification(g) => g.next().await,
            Generator::StreamingSequence(g) => g.next().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Spec §8 invariant 6: after wall clock exceeds `start+duration`,
    /// every subsequent `next()` returns `has_next=false` — and stays
    /// that way (idempotent), per spec §4.3.
    #[tokio::test]
    async fn gate_returns_none_after_duration_cap_and_stays_none() {
        let ctx = GeneratorContext::new(
            "tc".to_string(),
            1000,
            Duration::from_millis(20),
            CancellationToken::new(),
        );
        assert!(ctx.gate().await.is_some());
        tokio::time::sleep(Duration::from_millis(30)).await;
        for _ in 0..3 {
            assert!(ctx.gate().await.is_none());
        }
    }

    #[tokio::test]
    async fn gate_returns_none_when_cancelled_mid_wait() {
        let cancel = CancellationToken::new();
        let ctx = GeneratorContext::new("tc".to_string(), 1, Duration::from_secs(60), cancel.clone());
        // Drains the single-token burst so the next gate() actually
        // waits on the rate limiter rather than returning immediately.
        assert!(ctx.gate().await.is_some());
        cancel.cancel();
        assert!(ctx.gate().await.is_none());
    }
}
