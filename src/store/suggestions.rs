//! Monthly suggestion counters
//!
//! Every user has one counter per calendar month under
//! `suggestions:{user}:{YYYY-MM}`. Counters expire twelve months after the
//! start of their month, which is exactly as long as [`SuggestionLedger::history`]
//! looks back.
use super::{KeyValueStore, StoreError};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use tracing::info;

const PREFIX: &str = "suggestions:";

/// Suggestions a user that is not whitelisted may make per month
pub const MONTHLY_SUGGESTION_LIMIT: i64 = 3;

const HISTORY_MONTHS: u32 = 12;

/// Result of [`SuggestionLedger::record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionOutcome {
    /// The suggestion was counted; holds the new monthly count
    Recorded(i64),
    /// The monthly limit is used up; holds the current count
    QuotaExceeded(i64),
}

/// Per-user monthly suggestion bookkeeping
#[derive(Debug)]
pub struct SuggestionLedger<S> {
    store: S,
}

impl<S: KeyValueStore> SuggestionLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Counts a suggestion of `user_id` in the month of `now`
    ///
    /// Exempt users (the whitelisted ones) are never refused.
    pub fn record(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        exempt: bool,
    ) -> Result<SuggestionOutcome, StoreError> {
        let current = self.count(user_id, now)?;
        if !exempt && current >= MONTHLY_SUGGESTION_LIMIT {
            return Ok(SuggestionOutcome::QuotaExceeded(current));
        }

        let key = key(user_id, month_start(now));
        let count = self.store.incr(&key, 1)?;
        self.store.expire_at(&key, expiry(now))?;
        info!(user_id, count, "recorded suggestion");

        Ok(SuggestionOutcome::Recorded(count))
    }

    /// Suggestions `user_id` made in the month of `now`
    pub fn count(&self, user_id: &str, now: DateTime<Utc>) -> Result<i64, StoreError> {
        self.read(&key(user_id, month_start(now)))
    }

    /// Counts of the last twelve months, current month first
    ///
    /// Months without suggestions are listed with a count of 0.
    pub fn history(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        let start = month_start(now);
        let mut months = Vec::with_capacity(HISTORY_MONTHS as usize);

        for back in 0..HISTORY_MONTHS {
            let Some(month) = start.checked_sub_months(Months::new(back)) else {
                break;
            };
            let count = self.read(&key(user_id, month))?;
            months.push((month_label(month), count));
        }

        Ok(months)
    }

    /// Lowers the current month's count by `amount`, or resets it when `None`
    ///
    /// The count never drops below zero. Returns the new count.
    pub fn clear(
        &self,
        user_id: &str,
        amount: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let current = self.count(user_id, now)?;
        let next = match amount {
            Some(amount) => current.saturating_sub(amount).max(0),
            None => 0,
        };

        let key = key(user_id, month_start(now));
        self.store.set(&key, &next.to_string())?;
        self.store.expire_at(&key, expiry(now))?;
        info!(user_id, count = next, "cleared suggestions");

        Ok(next)
    }

    /// Drops every counter of every user; returns how many were removed
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for key in self.store.keys(PREFIX)? {
            if self.store.delete(&key)? {
                removed += 1;
            }
        }
        info!(removed, "cleared all suggestion counters");
        Ok(removed)
    }

    fn read(&self, key: &str) -> Result<i64, StoreError> {
        match self.store.get(key)? {
            None => Ok(0),
            Some(value) => value.parse().map_err(|_| StoreError::NotAnInteger {
                key: key.to_string(),
                value,
            }),
        }
    }
}

fn month_start(now: DateTime<Utc>) -> NaiveDate {
    let date = now.date_naive();
    date.with_day(1).unwrap_or(date)
}

fn month_label(month: NaiveDate) -> String {
    month.format("%Y-%m").to_string()
}

fn key(user_id: &str, month: NaiveDate) -> String {
    format!("{PREFIX}{user_id}:{}", month_label(month))
}

fn expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    let start = month_start(now);
    start
        .checked_add_months(Months::new(HISTORY_MONTHS))
        .unwrap_or(start)
        .and_time(chrono::NaiveTime::MIN)
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::store::tests::store_at;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 9, 30, 0).unwrap()
    }

    // The store clock is pinned so counters written in the tests never expire
    fn fixed_store() -> MemoryStore {
        store_at(at(2026, 6, 1)).0
    }

    #[test]
    fn test_quota_for_regular_users() {
        let store = fixed_store();
        let ledger = SuggestionLedger::new(&store);
        let now = at(2026, 3, 14);

        assert_eq!(ledger.record("u", now, false).unwrap(), SuggestionOutcome::Recorded(1));
        assert_eq!(ledger.record("u", now, false).unwrap(), SuggestionOutcome::Recorded(2));
        assert_eq!(ledger.record("u", now, false).unwrap(), SuggestionOutcome::Recorded(3));
        assert_eq!(
            ledger.record("u", now, false).unwrap(),
            SuggestionOutcome::QuotaExceeded(3)
        );
        assert_eq!(store.get("suggestions:u:2026-03").unwrap().as_deref(), Some("3"));

        // A new month starts from zero
        assert_eq!(
            ledger.record("u", at(2026, 4, 1), false).unwrap(),
            SuggestionOutcome::Recorded(1)
        );
    }

    #[test]
    fn test_exempt_users_have_no_quota() {
        let store = fixed_store();
        let ledger = SuggestionLedger::new(&store);
        let now = at(2026, 3, 14);

        for _ in 0..5 {
            ledger.record("admin", now, true).unwrap();
        }
        assert_eq!(ledger.count("admin", now).unwrap(), 5);
    }

    #[test]
    fn test_counters_live_for_twelve_months() {
        let (store, clock) = store_at(at(2026, 3, 14));
        let ledger = SuggestionLedger::new(&store);
        ledger.record("u", at(2026, 3, 14), false).unwrap();

        *clock.lock().unwrap() = at(2027, 2, 28);
        assert_eq!(ledger.count("u", at(2026, 3, 14)).unwrap(), 1);

        *clock.lock().unwrap() = at(2027, 3, 1);
        assert_eq!(ledger.count("u", at(2026, 3, 14)).unwrap(), 0);
    }

    #[test]
    fn test_history_covers_twelve_months() {
        let store = fixed_store();
        let ledger = SuggestionLedger::new(&store);
        ledger.record("u", at(2025, 12, 24), false).unwrap();
        ledger.record("u", at(2026, 2, 2), false).unwrap();
        ledger.record("u", at(2026, 2, 3), false).unwrap();

        let history = ledger.history("u", at(2026, 2, 10)).unwrap();
        assert_eq!(history.len(), 12);
        assert_eq!(history[0], ("2026-02".to_string(), 2));
        assert_eq!(history[1], ("2026-01".to_string(), 0));
        assert_eq!(history[2], ("2025-12".to_string(), 1));
        assert_eq!(history[11].0, "2025-03");
    }

    #[test]
    fn test_clear() {
        let store = fixed_store();
        let ledger = SuggestionLedger::new(&store);
        let now = at(2026, 5, 5);
        for _ in 0..3 {
            ledger.record("u", now, false).unwrap();
        }

        assert_eq!(ledger.clear("u", Some(2), now).unwrap(), 1);
        assert_eq!(ledger.clear("u", Some(10), now).unwrap(), 0);
        ledger.record("u", now, false).unwrap();
        assert_eq!(ledger.clear("u", None, now).unwrap(), 0);
        assert_eq!(ledger.count("u", now).unwrap(), 0);
    }

    #[test]
    fn test_clear_all() {
        let store = fixed_store();
        let ledger = SuggestionLedger::new(&store);
        ledger.record("a", at(2026, 1, 1), false).unwrap();
        ledger.record("b", at(2026, 1, 1), false).unwrap();
        store.set("whitelist:a", "1").unwrap();

        assert_eq!(ledger.clear_all().unwrap(), 2);
        assert_eq!(store.keys("").unwrap(), vec!["whitelist:a"]);
    }
}
