//! Fixed-delay throttle for outbound requests.
//!
//! This module provides the [`RateLimiter`] struct which pauses for a fixed
//! interval before every request to the remote service. There is no adaptive
//! backoff: each call to [`RateLimiter::wait`] sleeps for the same duration,
//! regardless of how long ago the previous request was made.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use readinglist_core::session::RateLimiter;
//!
//! # async fn example() {
//! let mut limiter = RateLimiter::new(Duration::from_millis(500));
//!
//! // Every request waits the full interval first
//! limiter.wait().await;
//! limiter.wait().await;
//! assert_eq!(limiter.waits(), 2);
//! # }
//! ```

use std::time::Duration;

use tracing::{debug, instrument, warn};

/// Default delay before each request, in milliseconds.
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 500;

/// Default delay before each request (500 ms).
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(DEFAULT_REQUEST_INTERVAL_MS);

/// Warning threshold for cumulative delay within one pipeline run (30 seconds).
const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Fixed-delay rate limiter owned by one pipeline run.
///
/// The limiter is not shared: each run creates its own, so its counters
/// describe that run alone.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Delay applied before every request.
    interval: Duration,

    /// Whether rate limiting is disabled (for `--rate-limit 0`).
    disabled: bool,

    /// Number of calls to `wait`.
    waits: u32,

    /// Total time spent sleeping.
    cumulative_delay: Duration,

    /// Whether the cumulative-delay warning has been emitted.
    warned: bool,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_INTERVAL)
    }
}

impl RateLimiter {
    /// Creates a rate limiter with the specified delay.
    ///
    /// A zero interval behaves like [`RateLimiter::disabled`].
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            disabled: interval.is_zero(),
            waits: 0,
            cumulative_delay: Duration::ZERO,
            warned: false,
        }
    }

    /// Creates a disabled rate limiter that applies no delays.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns the delay applied before each request.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of times [`wait`](Self::wait) has been called, disabled or not.
    #[must_use]
    pub fn waits(&self) -> u32 {
        self.waits
    }

    /// Total time spent sleeping so far.
    #[must_use]
    pub(crate) fn cumulative_delay(&self) -> Duration {
        self.cumulative_delay
    }

    /// Suspends the caller for the configured interval.
    #[instrument(level = "trace", skip(self), fields(interval_ms = self.interval.as_millis()))]
    pub async fn wait(&mut self) {
        self.waits += 1;
        if self.disabled {
            return;
        }

        tokio::time::sleep(self.interval).await;
        self.cumulative_delay += self.interval;

        debug!(
            waits = self.waits,
            cumulative_ms = self.cumulative_delay.as_millis(),
            "rate limit delay applied"
        );

        if !self.warned && self.cumulative_delay >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
            self.warned = true;
            warn!(
                cumulative_ms = self.cumulative_delay.as_millis(),
                "cumulative rate limit delay exceeded 30s for this run"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn test_default_interval_is_500ms() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.interval(), Duration::from_millis(500));
        assert!(!limiter.disabled);
    }

    #[test]
    fn test_zero_interval_is_disabled() {
        assert!(RateLimiter::new(Duration::ZERO).disabled);
        assert!(RateLimiter::disabled().disabled);
    }

    #[tokio::test]
    async fn test_wait_sleeps_for_interval_every_time() {
        let mut limiter = RateLimiter::new(Duration::from_millis(20));

        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(40),
            "two waits should take at least 40ms, took {elapsed:?}"
        );
        assert_eq!(limiter.waits(), 2);
        assert_eq!(limiter.cumulative_delay(), Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_disabled_limiter_counts_without_sleeping() {
        let mut limiter = RateLimiter::disabled();

        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait().await;
        }

        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(limiter.waits(), 5);
        assert_eq!(limiter.cumulative_delay(), Duration::ZERO);
    }
}
