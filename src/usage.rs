//! Model-usage accounting with a timezone-aware daily reset.
//!
//! The daily window rolls at midnight US Eastern time (the market's home
//! timezone), not server-local time. The date check runs on every record and
//! every read, never on a background timer, so idle periods cannot drift.
//! Counters are process-wide and never persisted; a restart starts clean.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::US::Eastern;
use serde::Serialize;

/// Outcome of one provider call, as classified by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failed,
    /// Daily/total quota exhausted upstream.
    QuotaExceeded,
    /// Upstream 429.
    RateLimited,
}

#[derive(Debug, Clone)]
struct Counters {
    total_calls: u64,
    successful_calls: u64,
    failed_calls: u64,
    quota_error_count: u64,
    rate_limit_error_count: u64,
    todays_calls: u32,
    last_reset_date: NaiveDate,
    estimated_tokens_used: u64,
}

/// Serializable view returned by `/api/usage`.
#[derive(Debug, Clone, Serialize)]
pub struct UsageStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub quota_error_count: u64,
    pub rate_limit_error_count: u64,
    pub todays_calls: u32,
    pub daily_ceiling: u32,
    pub quota_used_pct: f32,
    pub remaining_today: u32,
    pub estimated_tokens_used: u64,
    /// Date the daily window last rolled, Eastern calendar.
    pub last_reset_date: String,
    /// Next midnight Eastern, RFC 3339.
    pub next_reset: String,
}

#[derive(Debug)]
pub struct UsageTracker {
    inner: Mutex<Counters>,
    daily_ceiling: u32,
}

impl UsageTracker {
    pub fn new(daily_ceiling: u32) -> Self {
        Self {
            inner: Mutex::new(Counters {
                total_calls: 0,
                successful_calls: 0,
                failed_calls: 0,
                quota_error_count: 0,
                rate_limit_error_count: 0,
                todays_calls: 0,
                last_reset_date: eastern_date(Utc::now()),
                estimated_tokens_used: 0,
            }),
            daily_ceiling,
        }
    }

    pub fn record_call_start(&self) {
        self.record_call_start_at(Utc::now());
    }

    pub fn record_call_start_at(&self, now: DateTime<Utc>) {
        let mut c = self.inner.lock().expect("usage mutex poisoned");
        roll_date(&mut c, now);
        c.total_calls += 1;
        c.todays_calls = c.todays_calls.saturating_add(1);
    }

    pub fn record_call_result(&self, outcome: CallOutcome, estimated_tokens: u64) {
        self.record_call_result_at(outcome, estimated_tokens, Utc::now());
    }

    pub fn record_call_result_at(
        &self,
        outcome: CallOutcome,
        estimated_tokens: u64,
        now: DateTime<Utc>,
    ) {
        let mut c = self.inner.lock().expect("usage mutex poisoned");
        roll_date(&mut c, now);
        match outcome {
            CallOutcome::Success => c.successful_calls += 1,
            CallOutcome::Failed => c.failed_calls += 1,
            CallOutcome::QuotaExceeded => {
                c.failed_calls += 1;
                c.quota_error_count += 1;
            }
            CallOutcome::RateLimited => {
                c.failed_calls += 1;
                c.rate_limit_error_count += 1;
            }
        }
        c.estimated_tokens_used += estimated_tokens;
    }

    pub fn stats(&self) -> UsageStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> UsageStats {
        let mut c = self.inner.lock().expect("usage mutex poisoned");
        roll_date(&mut c, now);

        let used_pct = if self.daily_ceiling > 0 {
            (c.todays_calls as f32 / self.daily_ceiling as f32 * 100.0).min(100.0)
        } else {
            0.0
        };

        UsageStats {
            total_calls: c.total_calls,
            successful_calls: c.successful_calls,
            failed_calls: c.failed_calls,
            quota_error_count: c.quota_error_count,
            rate_limit_error_count: c.rate_limit_error_count,
            todays_calls: c.todays_calls,
            daily_ceiling: self.daily_ceiling,
            quota_used_pct: used_pct,
            remaining_today: self.daily_ceiling.saturating_sub(c.todays_calls),
            estimated_tokens_used: c.estimated_tokens_used,
            last_reset_date: c.last_reset_date.to_string(),
            next_reset: next_reset(now).to_rfc3339(),
        }
    }
}

/// Zero the daily counter when the Eastern calendar date has moved on.
fn roll_date(c: &mut Counters, now: DateTime<Utc>) {
    let today = eastern_date(now);
    if today != c.last_reset_date {
        c.todays_calls = 0;
        c.last_reset_date = today;
    }
}

fn eastern_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Eastern).date_naive()
}

/// Midnight Eastern on the next calendar day.
fn next_reset(now: DateTime<Utc>) -> DateTime<chrono_tz::Tz> {
    let next_day = eastern_date(now) + chrono::Days::new(1);
    let midnight = next_day.and_time(NaiveTime::MIN);
    match Eastern.from_local_datetime(&midnight) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(earliest, _) => earliest,
        // Midnight never falls inside a US DST gap, but keep a fallback.
        chrono::LocalResult::None => Eastern.from_utc_datetime(&midnight),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().expect("test timestamp")
    }

    #[test]
    fn todays_calls_reset_across_eastern_midnight() {
        let t = UsageTracker::new(100);
        // 2025-03-03 23:30 Eastern == 2025-03-04 04:30 UTC
        let day1 = at("2025-03-04T04:30:00Z");
        t.record_call_start_at(day1);
        t.record_call_start_at(day1);
        let s = t.stats_at(day1);
        assert_eq!(s.todays_calls, 2);
        assert_eq!(s.total_calls, 2);

        // 30 minutes later it is 00:00 Eastern on the next calendar day.
        let day2 = at("2025-03-04T05:00:00Z");
        let s = t.stats_at(day2);
        assert_eq!(s.todays_calls, 0, "daily counter must reset at Eastern midnight");
        assert_eq!(s.total_calls, 2, "total stays monotonic across the boundary");
    }

    #[test]
    fn utc_midnight_alone_does_not_reset() {
        let t = UsageTracker::new(100);
        // 19:30 Eastern, still the same Eastern day after UTC midnight passes.
        t.record_call_start_at(at("2025-03-03T23:30:00Z"));
        let s = t.stats_at(at("2025-03-04T00:30:00Z"));
        assert_eq!(s.todays_calls, 1);
    }

    #[test]
    fn outcome_classification_feeds_the_right_counters() {
        let t = UsageTracker::new(10);
        let now = at("2025-06-01T12:00:00Z");
        t.record_call_start_at(now);
        t.record_call_result_at(CallOutcome::Success, 500, now);
        t.record_call_start_at(now);
        t.record_call_result_at(CallOutcome::QuotaExceeded, 0, now);
        t.record_call_start_at(now);
        t.record_call_result_at(CallOutcome::RateLimited, 0, now);

        let s = t.stats_at(now);
        assert_eq!(s.successful_calls, 1);
        assert_eq!(s.failed_calls, 2);
        assert_eq!(s.quota_error_count, 1);
        assert_eq!(s.rate_limit_error_count, 1);
        assert_eq!(s.estimated_tokens_used, 500);
    }

    #[test]
    fn quota_percentage_and_remaining() {
        let t = UsageTracker::new(4);
        let now = at("2025-06-01T12:00:00Z");
        t.record_call_start_at(now);
        let s = t.stats_at(now);
        assert!((s.quota_used_pct - 25.0).abs() < 1e-3);
        assert_eq!(s.remaining_today, 3);
    }

    #[test]
    fn next_reset_is_midnight_eastern() {
        let s = UsageTracker::new(10).stats_at(at("2025-06-01T12:00:00Z"));
        // June: EDT (UTC-4), so midnight Eastern renders with -04:00.
        assert!(
            s.next_reset.starts_with("2025-06-02T00:00:00"),
            "got {}",
            s.next_reset
        );
        assert!(s.next_reset.ends_with("-04:00"), "got {}", s.next_reset);
    }
}
