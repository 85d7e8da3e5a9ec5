use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Duration, Instant};
use parking_lot::Mutex;

/// Paces outgoing market data requests.
///
/// Free data endpoints start answering 429 well before any documented quota,
/// so requests are spread out client-side in addition to being retried.
pub struct RateLimiter {
    /// Caps requests in flight at once
    semaphore: Arc<Semaphore>,
    /// When the previous request was released to the provider
    last_request: Mutex<Option<Instant>>,
    min_delay: Duration,
}

impl RateLimiter {
    /// `max_in_flight` concurrent requests, at most `requests_per_minute` started per minute.
    pub fn new(max_in_flight: usize, requests_per_minute: u32) -> Self {
        let min_delay_ms = 60_000 / requests_per_minute.max(1) as u64;
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight.max(1))),
            last_request: Mutex::new(None),
            min_delay: Duration::from_millis(min_delay_ms),
        }
    }

    /// Wait for a free slot and for the minimum spacing since the previous request.
    /// The slot is released when the returned guard drops.
    pub async fn acquire(&self) -> RateLimitGuard {
        let permit = self.semaphore.clone().acquire_owned().await.ok();

        // Reserve our start time under the lock, then sleep outside it
        let wait_time = {
            let mut last = self.last_request.lock();
            let now = Instant::now();
            let start = match *last {
                Some(prev) if prev + self.min_delay > now => prev + self.min_delay,
                _ => now,
            };
            *last = Some(start);
            start.saturating_duration_since(now)
        };

        if !wait_time.is_zero() {
            sleep(wait_time).await;
        }

        RateLimitGuard { _permit: permit }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }
}

pub struct RateLimitGuard {
    _permit: Option<OwnedSemaphorePermit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_requests_by_min_delay() {
        // 60 per minute = one per second
        let limiter = RateLimiter::new(2, 60);
        let start = Instant::now();

        drop(limiter.acquire().await);
        assert!(start.elapsed() < Duration::from_millis(100), "first request is immediate");

        drop(limiter.acquire().await);
        assert!(start.elapsed() >= Duration::from_millis(1000));

        drop(limiter.acquire().await);
        assert!(start.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_all_complete() {
        let limiter = Arc::new(RateLimiter::new(2, 120));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    let _guard = limiter.acquire().await;
                    sleep(Duration::from_millis(100)).await;
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[test]
    fn zero_rate_is_clamped() {
        let limiter = RateLimiter::new(0, 0);
        assert_eq!(limiter.min_delay(), Duration::from_secs(60));
    }
}
