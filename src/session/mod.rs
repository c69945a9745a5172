//! Per-run session state: cookies and request throttling.
//!
//! A [`Session`] is created at the start of one pipeline run and dropped at
//! the end. Nothing in it is process-wide, so concurrent runs never see each
//! other's cookies.

mod cookies;
pub mod rate_limiter;

pub use cookies::{Cookie, CookieStore};
pub use rate_limiter::{DEFAULT_REQUEST_INTERVAL, DEFAULT_REQUEST_INTERVAL_MS, RateLimiter};

/// Cookie store and rate limiter owned by one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Cookies accumulated across every exchange so far.
    pub cookies: CookieStore,
    /// Throttle applied before each remote call.
    pub limiter: RateLimiter,
}

impl Session {
    /// Creates a session with an empty cookie store.
    #[must_use]
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            cookies: CookieStore::new(),
            limiter,
        }
    }
}
