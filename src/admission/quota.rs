//! Quota Ledger
//!
//! Fixed-window request counters per identity. Buckets older than the
//! current one minus one are pruned the next time the identity is seen.
//! Newer buckets survive a call that arrives with a slightly stale clock.

use crate::admission::credentials::Identity;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 3600;

/// Current unix time in whole seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// One of the two rate windows tracked per identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateWindow {
    Minute,
    Hour,
}

impl RateWindow {
    /// Width of the window in seconds
    pub fn seconds(self) -> i64 {
        match self {
            RateWindow::Minute => MINUTE_SECS,
            RateWindow::Hour => HOUR_SECS,
        }
    }

    /// Bucket id containing `now`
    pub fn bucket(self, now: i64) -> i64 {
        now.div_euclid(self.seconds())
    }

    /// Seconds until the bucket containing `now` closes
    pub fn retry_after(self, now: i64) -> u64 {
        (self.seconds() - now.rem_euclid(self.seconds())) as u64
    }
}

impl fmt::Display for RateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateWindow::Minute => write!(f, "minute"),
            RateWindow::Hour => write!(f, "hour"),
        }
    }
}

/// Request limits applied to an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    /// Maximum requests per minute bucket
    pub requests_per_minute: u32,

    /// Maximum requests per hour bucket
    pub requests_per_hour: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_hour: 1000,
        }
    }
}

/// Retained buckets for one identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateWindowState {
    /// Minute bucket id -> request count
    pub minute_buckets: BTreeMap<i64, u32>,

    /// Hour bucket id -> request count
    pub hour_buckets: BTreeMap<i64, u32>,
}

impl RateWindowState {
    fn prune(&mut self, minute_bucket: i64, hour_bucket: i64) {
        self.minute_buckets.retain(|&id, _| id >= minute_bucket - 1);
        self.hour_buckets.retain(|&id, _| id >= hour_bucket - 1);
    }
}

/// Outcome of a single check-and-record call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the request was admitted (and counted)
    pub allowed: bool,

    /// Requests left in the current minute bucket
    pub remaining_minute: u32,

    /// Requests left in the current hour bucket
    pub remaining_hour: u32,

    /// Which window denied the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<RateWindow>,

    /// Human-readable denial reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Seconds until the denying bucket closes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl RateLimitDecision {
    fn denied(window: RateWindow, limit: u32, now: i64, minute: u32, hour: u32) -> Self {
        Self {
            allowed: false,
            remaining_minute: minute,
            remaining_hour: hour,
            window: Some(window),
            reason: Some(format!(
                "Rate limit exceeded: {} requests per {}",
                limit, window
            )),
            retry_after_secs: Some(window.retry_after(now)),
        }
    }
}

/// Per-identity request counters
///
/// The outer map is only write-locked to insert a new identity; the
/// check-then-increment sequence runs under that identity's own mutex, so
/// different identities never contend with each other.
#[derive(Debug, Default)]
pub struct QuotaLedger {
    identities: RwLock<HashMap<Identity, Arc<Mutex<RateWindowState>>>>,
}

impl QuotaLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    fn state_for(&self, identity: &Identity) -> Arc<Mutex<RateWindowState>> {
        if let Some(state) = self.identities.read().get(identity) {
            return Arc::clone(state);
        }

        let mut identities = self.identities.write();
        Arc::clone(identities.entry(identity.clone()).or_default())
    }

    /// Check both windows for `identity` and count the request if admitted
    pub fn check_and_record(
        &self,
        identity: &Identity,
        limits: RateLimits,
        now: i64,
    ) -> RateLimitDecision {
        let minute_bucket = RateWindow::Minute.bucket(now);
        let hour_bucket = RateWindow::Hour.bucket(now);

        let state = self.state_for(identity);
        let mut state = state.lock();
        state.prune(minute_bucket, hour_bucket);

        let minute_count = state
            .minute_buckets
            .get(&minute_bucket)
            .copied()
            .unwrap_or(0);
        let hour_count = state.hour_buckets.get(&hour_bucket).copied().unwrap_or(0);

        let minute_left = limits.requests_per_minute.saturating_sub(minute_count);
        let hour_left = limits.requests_per_hour.saturating_sub(hour_count);

        if minute_count >= limits.requests_per_minute {
            return RateLimitDecision::denied(
                RateWindow::Minute,
                limits.requests_per_minute,
                now,
                minute_left,
                hour_left,
            );
        }

        if hour_count >= limits.requests_per_hour {
            return RateLimitDecision::denied(
                RateWindow::Hour,
                limits.requests_per_hour,
                now,
                minute_left,
                hour_left,
            );
        }

        *state.minute_buckets.entry(minute_bucket).or_insert(0) += 1;
        *state.hour_buckets.entry(hour_bucket).or_insert(0) += 1;

        RateLimitDecision {
            allowed: true,
            remaining_minute: minute_left - 1,
            remaining_hour: hour_left - 1,
            window: None,
            reason: None,
            retry_after_secs: None,
        }
    }

    /// Snapshot of the retained buckets for an identity
    pub fn window_state(&self, identity: &Identity) -> Option<RateWindowState> {
        self.identities
            .read()
            .get(identity)
            .map(|state| state.lock().clone())
    }

    /// Drop all counters for an identity; returns whether it was tracked
    pub fn reset(&self, identity: &Identity) -> bool {
        self.identities.write().remove(identity).is_some()
    }

    /// Number of identities currently held in memory
    pub fn tracked_identities(&self) -> usize {
        self.identities.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-01T00:00:00Z, aligned to both minute and hour buckets
    const T0: i64 = 1_704_067_200;

    fn limits(per_minute: u32, per_hour: u32) -> RateLimits {
        RateLimits {
            requests_per_minute: per_minute,
            requests_per_hour: per_hour,
        }
    }

    #[test]
    fn test_minute_limit_boundary() {
        let ledger = QuotaLedger::new();
        let id = Identity::from_token("sk-minute");

        let remaining: Vec<u32> = (0..5)
            .map(|i| {
                let decision = ledger.check_and_record(&id, limits(5, 1000), T0 + i);
                assert!(decision.allowed);
                decision.remaining_minute
            })
            .collect();
        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);

        let denied = ledger.check_and_record(&id, limits(5, 1000), T0 + 10);
        assert!(!denied.allowed);
        assert_eq!(denied.window, Some(RateWindow::Minute));
        assert!(denied.reason.as_deref().unwrap().contains("minute"));
        assert_eq!(denied.retry_after_secs, Some(50));
        assert!(denied.retry_after_secs.unwrap() <= 60);
    }

    #[test]
    fn test_denied_requests_are_not_counted() {
        let ledger = QuotaLedger::new();
        let id = Identity::from_token("sk-denied");

        for _ in 0..2 {
            ledger.check_and_record(&id, limits(2, 1000), T0);
        }
        for _ in 0..3 {
            assert!(!ledger.check_and_record(&id, limits(2, 1000), T0 + 1).allowed);
        }

        let state = ledger.window_state(&id).unwrap();
        assert_eq!(state.minute_buckets.get(&RateWindow::Minute.bucket(T0)), Some(&2));
        assert_eq!(state.hour_buckets.get(&RateWindow::Hour.bucket(T0)), Some(&2));
    }

    #[test]
    fn test_hour_limit_reports_hour_window() {
        let ledger = QuotaLedger::new();
        let id = Identity::from_token("sk-hourly");

        // Spread three requests over three minutes so the minute window never trips
        for minute in 0..3 {
            assert!(ledger
                .check_and_record(&id, limits(10, 3), T0 + minute * 60)
                .allowed);
        }

        let now = T0 + 3 * 60 + 15;
        let denied = ledger.check_and_record(&id, limits(10, 3), now);
        assert!(!denied.allowed);
        assert_eq!(denied.window, Some(RateWindow::Hour));
        assert!(denied.reason.as_deref().unwrap().contains("hour"));
        assert_eq!(denied.retry_after_secs, Some(3600 - 195));
        assert_eq!(denied.remaining_hour, 0);
        assert_eq!(denied.remaining_minute, 10);
    }

    #[test]
    fn test_old_buckets_are_pruned() {
        let ledger = QuotaLedger::new();
        let id = Identity::from_token("sk-prune");

        ledger.check_and_record(&id, limits(60, 1000), T0);
        let first_minute = RateWindow::Minute.bucket(T0);

        // One bucket later the previous bucket is still retained
        ledger.check_and_record(&id, limits(60, 1000), T0 + 60);
        let state = ledger.window_state(&id).unwrap();
        assert!(state.minute_buckets.contains_key(&first_minute));

        // Two bucket widths later it is gone
        ledger.check_and_record(&id, limits(60, 1000), T0 + 120);
        let state = ledger.window_state(&id).unwrap();
        assert!(!state.minute_buckets.contains_key(&first_minute));
        assert!(state.minute_buckets.len() <= 2);

        ledger.check_and_record(&id, limits(60, 1000), T0 + 2 * 3600);
        let state = ledger.window_state(&id).unwrap();
        assert!(!state
            .hour_buckets
            .contains_key(&RateWindow::Hour.bucket(T0)));
        assert!(state.hour_buckets.len() <= 2);
    }

    #[test]
    fn test_stale_clock_keeps_newer_bucket() {
        let ledger = QuotaLedger::new();
        let id = Identity::from_token("sk-stale");
        let t = T0 + 60;

        for _ in 0..5 {
            assert!(ledger.check_and_record(&id, limits(5, 1000), t).allowed);
        }
        assert!(!ledger.check_and_record(&id, limits(5, 1000), t).allowed);

        // A request stamped just before the bucket boundary lands in the
        // previous bucket and must not wipe the current one
        assert!(ledger.check_and_record(&id, limits(5, 1000), t - 1).allowed);

        let state = ledger.window_state(&id).unwrap();
        assert_eq!(state.minute_buckets.get(&RateWindow::Minute.bucket(t)), Some(&5));
        assert_eq!(state.minute_buckets.get(&RateWindow::Minute.bucket(t - 1)), Some(&1));

        let denied = ledger.check_and_record(&id, limits(5, 1000), t + 1);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining_minute, 0);
    }

    #[test]
    fn test_fixed_window_allows_double_burst_at_boundary() {
        // Fixed windows, not a sliding log: a full burst at the end of one
        // bucket and another at the start of the next are both admitted,
        // so two seconds can see twice the per-minute limit.
        let ledger = QuotaLedger::new();
        let id = Identity::from_token("sk-burst");
        let end_of_minute = T0 + 59;

        let admitted = (0..5)
            .filter(|_| ledger.check_and_record(&id, limits(5, 1000), end_of_minute).allowed)
            .count()
            + (0..5)
                .filter(|_| {
                    ledger
                        .check_and_record(&id, limits(5, 1000), end_of_minute + 1)
                        .allowed
                })
                .count();

        assert_eq!(admitted, 10);
    }

    #[test]
    fn test_identities_are_independent() {
        let ledger = QuotaLedger::new();
        let a = Identity::from_token("sk-a");
        let b = Identity::from_token("sk-b");

        ledger.check_and_record(&a, limits(1, 1000), T0);
        assert!(!ledger.check_and_record(&a, limits(1, 1000), T0).allowed);
        assert!(ledger.check_and_record(&b, limits(1, 1000), T0).allowed);
        assert_eq!(ledger.tracked_identities(), 2);
    }

    #[test]
    fn test_reset_forgets_identity() {
        let ledger = QuotaLedger::new();
        let id = Identity::from_token("sk-reset");

        ledger.check_and_record(&id, limits(1, 1000), T0);
        assert!(!ledger.check_and_record(&id, limits(1, 1000), T0).allowed);

        assert!(ledger.reset(&id));
        assert!(ledger.window_state(&id).is_none());
        assert!(ledger.check_and_record(&id, limits(1, 1000), T0).allowed);
        assert!(!ledger.reset(&Identity::from_token("sk-unknown")));
    }

    #[test]
    fn test_retry_after_per_window() {
        assert_eq!(RateWindow::Minute.retry_after(T0), 60);
        assert_eq!(RateWindow::Minute.retry_after(T0 + 45), 15);
        assert_eq!(RateWindow::Hour.retry_after(T0 + 3599), 1);
    }
}
