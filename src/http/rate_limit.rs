//! Rate limiting implementation
//!
//! Fixed-window counter: at most `limit` requests are admitted per window
//! (one second by default). Callers that find the window full sleep until it
//! rolls over.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Admission state for the current window
#[derive(Debug)]
struct RateLimitWindow {
    window_start: Instant,
    count: u32,
}

/// Fixed-window rate limiter shared by every request of a client
#[derive(Debug)]
pub struct RateLimiter {
    window: Mutex<RateLimitWindow>,
    limit: u32,
    period: Duration,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` requests per second
    pub fn new(limit: u32) -> Result<Self> {
        Self::with_period(limit, Duration::from_secs(1))
    }

    /// Create a limiter with a custom window length
    pub fn with_period(limit: u32, period: Duration) -> Result<Self> {
        if limit == 0 {
            return Err(Error::invalid_value(
                "rate_limit_per_second",
                "must be greater than zero",
            ));
        }
        if period.is_zero() {
            return Err(Error::invalid_value("rate_limit_period", "must be non-zero"));
        }

        Ok(Self {
            window: Mutex::new(RateLimitWindow {
                window_start: Instant::now(),
                count: 0,
            }),
            limit,
            period,
        })
    }

    /// Requests admitted per window
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Wait until the current window has capacity, then record one request.
    ///
    /// The window lock is held for the whole call, including any sleep, so
    /// waiters are admitted in arrival order. Dropping the future releases the
    /// lock without consuming a slot.
    pub async fn acquire(&self) {
        let mut window = self.window.lock().await;

        loop {
            let now = Instant::now();
            let elapsed = now.duration_since(window.window_start);

            if elapsed >= self.period {
                window.window_start = now;
                window.count = 0;
            }

            if window.count < self.limit {
                window.count += 1;
                return;
            }

            let wait = self.period.saturating_sub(elapsed);
            debug!(
                limit = self.limit,
                wait_ms = wait.as_millis() as u64,
                "Rate limit window full, waiting"
            );
            sleep(wait).await;
        }
    }

    /// Record one request if the window has capacity right now.
    ///
    /// Returns `false` while another caller holds the window lock, which
    /// includes any caller sleeping inside `acquire`, even if the window has
    /// room.
    #[cfg(test)]
    pub(crate) fn try_acquire(&self) -> bool {
        let Ok(mut window) = self.window.try_lock() else {
            return false;
        };

        let now = Instant::now();
        if now.duration_since(window.window_start) >= self.period {
            window.window_start = now;
            window.count = 0;
        }

        if window.count < self.limit {
            window.count += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_rate_limiter_rejects_zero_limit() {
        let err = RateLimiter::new(0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[tokio::test]
    async fn test_rate_limiter_allows_full_window() {
        let limiter = RateLimiter::new(5).unwrap();

        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_resets_after_window() {
        let limiter = RateLimiter::new(2).unwrap();
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(1)).await;

        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_acquire_waits_for_rollover() {
        let limiter = RateLimiter::new(1).unwrap();
        limiter.acquire().await;

        let mut waiting = task::spawn(limiter.acquire());
        assert_pending!(waiting.poll());

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert_ready!(waiting.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_fails_while_waiter_holds_window() {
        let limiter = RateLimiter::new(1).unwrap();
        limiter.acquire().await;

        let mut waiting = task::spawn(limiter.acquire());
        assert_pending!(waiting.poll());

        // Window has rolled over, but the sleeping waiter still owns the lock
        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(!limiter.try_acquire());

        assert_ready!(waiting.poll());
        drop(waiting);
        assert!(!limiter.try_acquire());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_acquire_elapsed_time() {
        let limiter = RateLimiter::new(3).unwrap();
        let start = Instant::now();

        for _ in 0..7 {
            limiter.acquire().await;
        }

        // 3 in the first window, 3 in the second, 1 in the third
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_millis(2100));
    }
}
