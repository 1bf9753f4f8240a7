//! Exponential-backoff reconnection policy.
//!
//! When the connection drops while auto-reconnect is armed, the session
//! waits `min(base * 2^attempts, max)` and retries, up to
//! [`ReconnectPolicy::max_attempts`] times. The armed flag is re-checked
//! when the timer fires, not when it is scheduled, so a `disconnect()`
//! issued during the wait always wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on the delay between retries.
    pub max_delay: Duration,
    /// Automatic retries before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the retry following `completed` prior attempts,
    /// clamped to `max_delay`.
    pub fn delay_for(&self, completed: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let ms = base_ms.saturating_mul(2u64.saturating_pow(completed));
        Duration::from_millis(ms).min(self.max_delay)
    }
}

/// Wait out a backoff delay, deciding at fire time whether the retry may
/// proceed.
///
/// Returns `false` if the token is cancelled during the wait or the
/// armed flag was cleared by the time the timer fires.
pub async fn wait_for_retry(
    delay: Duration,
    armed: &AtomicBool,
    cancel: &CancellationToken,
) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => armed.load(Ordering::Acquire),
    }
}
