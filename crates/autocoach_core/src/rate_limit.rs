//! crates/autocoach_core/src/rate_limit.rs
//!
//! A rolling-window admission check for outbound model requests.
//!
//! Check and commit are two explicit steps: `is_over_limit` only prunes and
//! counts, and the caller records the timestamp with `record` once the
//! request is actually admitted. A rejected request therefore never
//! consumes budget.

use std::time::{Duration, Instant};

/// Maximum admitted requests per trailing window.
pub const REQUESTS_PER_MINUTE_LIMIT: usize = 5;

const WINDOW: Duration = Duration::from_secs(60);

/// Tracks the timestamps of recently admitted requests.
///
/// Single-threaded by construction: the session manager that owns it is the
/// only caller, so no interior locking is needed.
#[derive(Debug, Default)]
pub struct RateLimiter {
    timestamps: Vec<Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prunes timestamps older than the window and reports whether the
    /// budget is exhausted as of `now`.
    pub fn is_over_limit_at(&mut self, now: Instant) -> bool {
        self.timestamps
            .retain(|t| now.duration_since(*t) < WINDOW);
        self.timestamps.len() >= REQUESTS_PER_MINUTE_LIMIT
    }

    /// Commits one admitted request at `now`.
    pub fn record_at(&mut self, now: Instant) {
        self.timestamps.push(now);
    }

    pub fn is_over_limit(&mut self) -> bool {
        self.is_over_limit_at(Instant::now())
    }

    pub fn record(&mut self) {
        self.record_at(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_limit() {
        let mut limiter = RateLimiter::new();
        let start = Instant::now();
        for i in 0..REQUESTS_PER_MINUTE_LIMIT {
            assert!(!limiter.is_over_limit_at(start + Duration::from_secs(i as u64)));
            limiter.record_at(start + Duration::from_secs(i as u64));
        }
        assert!(limiter.is_over_limit_at(start + Duration::from_secs(10)));
    }

    #[test]
    fn rejected_checks_consume_no_budget() {
        let mut limiter = RateLimiter::new();
        let start = Instant::now();
        for _ in 0..REQUESTS_PER_MINUTE_LIMIT {
            limiter.record_at(start);
        }
        // Repeated over-limit checks must not extend the lockout.
        for i in 0..10 {
            assert!(limiter.is_over_limit_at(start + Duration::from_secs(i)));
        }
        assert!(!limiter.is_over_limit_at(start + Duration::from_secs(61)));
    }

    #[test]
    fn capacity_frees_as_the_oldest_entry_expires() {
        let mut limiter = RateLimiter::new();
        let start = Instant::now();
        limiter.record_at(start);
        for _ in 0..(REQUESTS_PER_MINUTE_LIMIT - 1) {
            limiter.record_at(start + Duration::from_secs(30));
        }

        assert!(limiter.is_over_limit_at(start + Duration::from_secs(59)));
        // The first commit leaves the window; exactly one slot opens.
        assert!(!limiter.is_over_limit_at(start + Duration::from_secs(61)));
        limiter.record_at(start + Duration::from_secs(61));
        assert!(limiter.is_over_limit_at(start + Duration::from_secs(62)));
    }
}
