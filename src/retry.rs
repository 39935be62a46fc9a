//! Exponential backoff for the task runtime's outer (reconnect) and
//! inner (in-stream retry) loops (spec §4.4).
//!
//! Built on the `backoff` crate's `ExponentialBackoff`, which already
//! gives jittered growth and a resettable `next_backoff()`. The
//! teacher's `RetryExecutor` (knhk-sidecar) hand-rolls this delay math
//! for a single-shot `execute(closure)` retry helper; the task runtime
//! instead needs live backoff state it can poll per failed attempt and
//! reset on success ("inner backoff is reset on each Ok", spec §4.4),
//! so it's kept as owned state rather than wrapped in a one-shot
//! helper.

use backoff::backoff::Backoff as _;
use backoff::exponential::ExponentialBackoff;
use backoff::SystemClock;
use tokio::time::sleep;

use crate::config::DriverConfig;

/// A resettable exponential backoff. One lives on the outer
/// (reconnect) loop and one on the inner (operation retry) loop, per
/// task — neither has an overall deadline (spec §4.4: "no overall
/// deadline on the outer"; the inner loop is bounded only by the
/// eventually-empty window, enforced by the caller).
pub struct TaskBackoff {
    inner: ExponentialBackoff<SystemClock>,
}

impl TaskBackoff {
    pub fn new(config: &DriverConfig) -> Self {
        let mut inner = ExponentialBackoff {
            current_interval: config.backoff_initial,
            initial_interval: config.backoff_initial,
            multiplier: config.backoff_multiplier,
            max_interval: config.backoff_max,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        inner.reset();
        Self { inner }
    }

    /// Sleeps for the next backoff interval. `max_elapsed_time` is
    /// unset so `next_backoff()` never yields `None` in practice; the
    /// fallback to `max_interval` only guards that invariant.
    pub async fn wait(&mut self) {
        let delay = self
            .inner
            .next_backoff()
            .unwrap_or(self.inner.max_interval);
        sleep(delay).await;
    }

    /// Resets to the initial interval. Called on every `Ok` response.
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_grows_and_reset_returns_to_initial() {
        let config = DriverConfig {
            backoff_initial: Duration::from_millis(1),
            backoff_max: Duration::from_millis(4),
            backoff_multiplier: 2.0,
            ..DriverConfig::default()
        };
        let mut backoff = TaskBackoff::new(&config);
        assert_eq!(backoff.inner.current_interval, Duration::from_millis(1));
        backoff.wait().await;
        assert!(backoff.inner.current_interval > Duration::from_millis(1));
        backoff.reset();
        assert_eq!(backoff.inner.current_interval, Duration::from_millis(1));
    }
}
