//! Fixed-window rate limiter for the LLM upstream (spec §4.4).
//!
//! Directly generalizes the teacher's per-IP `RateLimitLayer` in
//! `middleware::rate_limit` (same window-reset-then-admit shape) into a
//! single-counter limiter with no burst allowance, matching §4.4 exactly:
//! admit iff `count < max`, reset when the window has elapsed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

use crate::clock::Clock;

struct Window {
    count: u32,
    window_started_at: Instant,
}

pub struct FixedWindowLimiter {
    max_requests: u32,
    window_size: Duration,
    clock: Arc<dyn Clock>,
    window: Mutex<Window>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub requests_remaining: u32,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window_size: Duration, clock: Arc<dyn Clock>) -> Self {
        let window_started_at = clock.now();
        Self {
            max_requests,
            window_size,
            clock,
            window: Mutex::new(Window {
                count: 0,
                window_started_at,
            }),
        }
    }

    fn roll_window_if_expired(&self, window: &mut Window) {
        if self.clock.now().duration_since(window.window_started_at) > self.window_size {
            window.count = 0;
            window.window_started_at = self.clock.now();
        }
    }

    /// Checks admission without recording. The LLM wrapper calls this before
    /// `generate_content`, separately from `record_request`.
    pub fn check_rate_limit(&self) -> bool {
        let mut window = self.window.lock();
        self.roll_window_if_expired(&mut window);
        window.count < self.max_requests
    }

    /// Atomically increments the window counter. Call only after
    /// `check_rate_limit` returned true and the caller intends to proceed.
    pub fn record_request(&self) {
        let mut window = self.window.lock();
        self.roll_window_if_expired(&mut window);
        window.count += 1;
    }

    /// Admits and records in one step — convenience for the common case.
    pub fn try_admit(&self) -> bool {
        let mut window = self.window.lock();
        self.roll_window_if_expired(&mut window);
        if window.count < self.max_requests {
            window.count += 1;
            true
        } else {
            false
        }
    }

    pub fn get_status(&self) -> RateLimitStatus {
        let mut window = self.window.lock();
        self.roll_window_if_expired(&mut window);
        RateLimitStatus {
            requests_remaining: self.max_requests.saturating_sub(window.count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;

    #[test]
    fn admits_up_to_max_then_rejects() {
        let clock = Arc::new(TestClock::new());
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60), clock);
        assert!(limiter.try_admit());
        assert!(limiter.try_admit());
        assert!(limiter.try_admit());
        assert!(!limiter.try_admit());
    }

    #[test]
    fn resets_after_window_elapses() {
        let clock = Arc::new(TestClock::new());
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60), clock.clone());
        assert!(limiter.try_admit());
        assert!(limiter.try_admit());
        assert!(!limiter.try_admit());
        clock.advance(Duration::from_secs(61));
        assert!(limiter.try_admit());
    }

    #[test]
    fn check_without_record_does_not_consume() {
        let clock = Arc::new(TestClock::new());
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60), clock);
        assert!(limiter.check_rate_limit());
        assert!(limiter.check_rate_limit());
        limiter.record_request();
        assert!(!limiter.check_rate_limit());
    }

    #[test]
    fn status_reports_remaining() {
        let clock = Arc::new(TestClock::new());
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(60), clock);
        limiter.try_admit();
        limiter.try_admit();
        assert_eq!(limiter.get_status().requests_remaining, 3);
    }
}
