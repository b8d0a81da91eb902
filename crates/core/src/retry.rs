//! Bounded retries with exponential backoff
//!
//! Used for transient failures on the path to the store, primarily pool
//! establishment. Settlement is never wrapped in a retry loop: its
//! idempotency guard makes the caller responsible for deciding whether a
//! second attempt is meaningful.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Fraction of the computed delay that jitter may add on top
const JITTER_FRACTION: f64 = 0.3;

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retry attempts after the initial one (0 disables retries)
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one
    pub base_delay: Duration,
    /// Cap on the exponential growth
    pub max_delay: Duration,
    /// Add random jitter to each delay
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(120),
            max_delay: Duration::from_secs(6),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration, jitter: bool) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            jitter,
        }
    }

    /// More attempts, shorter initial delay; for startup-critical paths
    pub fn aggressive() -> Self {
        Self {
            max_retries: 6,
            base_delay: Duration::from_millis(40),
            max_delay: Duration::from_secs(4),
            jitter: true,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = match 2u32.checked_pow(attempt) {
            Some(factor) => self.base_delay.saturating_mul(factor),
            None => self.max_delay,
        };
        let capped = doubled.min(self.max_delay);

        if !self.jitter {
            return capped;
        }
        let spread_ms = (capped.as_millis() as f64 * JITTER_FRACTION) as u64;
        if spread_ms == 0 {
            return capped;
        }
        // Clock-seeded jitter keeps concurrent reconnects from aligning
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos() as u64;
        capped + Duration::from_millis(seed % (spread_ms + 1))
    }
}

/// Run `operation`, retrying per `policy` while `is_retryable` holds
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    mut operation: F,
    policy: RetryPolicy,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        let error = match operation().await {
            Ok(value) => {
                tracing::debug!(attempt, "operation succeeded");
                return Ok(value);
            }
            Err(error) => error,
        };

        if attempt >= policy.max_retries {
            tracing::warn!(attempt, max = policy.max_retries, "retries exhausted");
            return Err(error);
        }
        if !is_retryable(&error) {
            tracing::debug!(attempt, "error is not retryable");
            return Err(error);
        }

        let delay = policy.delay_for(attempt);
        tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying");
        sleep(delay).await;
        attempt += 1;
    }
}
