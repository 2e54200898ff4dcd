//! Fixed-window rate limiting, one limiter instance per route family.
//!
//! Deliberately a fixed window, not sliding: a burst straddling a window
//! boundary can reach up to 2x the max. Rejections never consume model quota.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::cache::now_ms;

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    window_reset_at_ms: u64,
}

/// Verdict for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: u64,
    pub limit: u32,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, rounded up; drives `Retry-After`.
    pub fn retry_after_secs(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms).div_ceil(1000)
    }
}

/// Per-client-key fixed-window counter.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    windows: Mutex<HashMap<String, WindowRecord>>,
    max_requests: u32,
    window_ms: u64,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_requests,
            window_ms: window.as_millis() as u64,
        }
    }

    pub fn check(&self, client_key: &str) -> RateLimitDecision {
        self.check_at(client_key, now_ms())
    }

    pub fn check_at(&self, client_key: &str, now_ms: u64) -> RateLimitDecision {
        let mut windows = self.windows.lock().expect("limiter mutex poisoned");
        let rec = windows.entry(client_key.to_string()).or_insert(WindowRecord {
            count: 0,
            window_reset_at_ms: now_ms + self.window_ms,
        });

        if now_ms > rec.window_reset_at_ms {
            rec.count = 1;
            rec.window_reset_at_ms = now_ms + self.window_ms;
        } else if rec.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at_ms: rec.window_reset_at_ms,
                limit: self.max_requests,
            };
        } else {
            rec.count += 1;
        }

        RateLimitDecision {
            allowed: true,
            remaining: self.max_requests - rec.count,
            reset_at_ms: rec.window_reset_at_ms,
            limit: self.max_requests,
        }
    }

    /// Drop windows that have already elapsed; piggybacks on the cache sweep.
    pub fn sweep_at(&self, now_ms: u64) -> usize {
        let mut windows = self.windows.lock().expect("limiter mutex poisoned");
        let before = windows.len();
        windows.retain(|_, r| now_ms <= r.window_reset_at_ms);
        before - windows.len()
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().expect("limiter mutex poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_then_rejects() {
        let l = FixedWindowLimiter::new(3, Duration::from_secs(60));
        let t0 = 1_000;

        let d1 = l.check_at("1.2.3.4", t0);
        let d2 = l.check_at("1.2.3.4", t0 + 1);
        let d3 = l.check_at("1.2.3.4", t0 + 2);
        assert!(d1.allowed && d2.allowed && d3.allowed);
        assert_eq!((d1.remaining, d2.remaining, d3.remaining), (2, 1, 0));

        let d4 = l.check_at("1.2.3.4", t0 + 3);
        assert!(!d4.allowed);
        assert_eq!(d4.remaining, 0);
    }

    #[test]
    fn window_elapse_resets_the_counter() {
        let l = FixedWindowLimiter::new(3, Duration::from_secs(60));
        let t0 = 1_000;
        for i in 0..4 {
            l.check_at("k", t0 + i);
        }
        let d = l.check_at("k", t0 + 60_001);
        assert!(d.allowed);
        assert_eq!(d.remaining, 2);
    }

    #[test]
    fn keys_are_independent() {
        let l = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert!(l.check_at("a", 0).allowed);
        assert!(!l.check_at("a", 1).allowed);
        assert!(l.check_at("b", 1).allowed);
    }

    #[test]
    fn retry_after_rounds_up_to_whole_seconds() {
        let l = FixedWindowLimiter::new(1, Duration::from_secs(60));
        let t0 = 0;
        l.check_at("k", t0);
        let d = l.check_at("k", t0 + 500);
        assert!(!d.allowed);
        assert_eq!(d.retry_after_secs(t0 + 500), 60);
    }

    #[test]
    fn sweep_drops_elapsed_windows_only() {
        let l = FixedWindowLimiter::new(3, Duration::from_secs(60));
        l.check_at("old", 0);
        l.check_at("new", 50_000);
        assert_eq!(l.sweep_at(60_001), 1);
        assert_eq!(l.tracked_keys(), 1);
    }
}
