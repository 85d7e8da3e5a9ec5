use std::future::Future;

use tokio::time::{sleep, Duration};
use tracing::warn;

use crate::external::market_data_provider::MarketDataError;

/// How often, and how patiently, a rate-limited fetch is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Detail lookups: info snapshots and history tables.
    pub fn info() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Duration::from_secs(5))
    }

    /// Price and valuation lookups.
    pub fn price() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Duration::from_secs(10))
    }
}

/// Run `op` until it succeeds, retrying only on rate limiting.
///
/// Returns `None` once attempts are exhausted or on any non-retryable error.
/// Callers treat `None` as "no data" for that request.
pub async fn fetch_with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, MarketDataError>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Some(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                warn!(
                    "Rate limited fetching {}, retrying in {}s (attempt {}/{})",
                    what,
                    policy.delay.as_secs(),
                    attempt,
                    max_attempts
                );
                sleep(policy.delay).await;
            }
            Err(e) if e.is_retryable() => {
                warn!("Rate limited fetching {}, giving up after {} attempts", what, max_attempts);
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", what, e);
                return None;
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn always_rate_limited_gives_up_after_three_attempts() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Option<()> = fetch_with_retry(&RetryPolicy::price(), "AAPL price", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(MarketDataError::RateLimited) }
        })
        .await;

        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // two waits between three attempts
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(20));
        assert!(elapsed < Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn info_policy_waits_five_seconds() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = fetch_with_retry(&RetryPolicy::info(), "AAPL info", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(MarketDataError::RateLimited)
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_fails_fast() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result: Option<u8> = fetch_with_retry(&RetryPolicy::info(), "NOPE info", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(MarketDataError::NotFound) }
        })
        .await;

        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn success_needs_no_retry() {
        let result = fetch_with_retry(&RetryPolicy::info(), "ok", || async { Ok("bars") }).await;
        assert_eq!(result, Some("bars"));
    }
}
