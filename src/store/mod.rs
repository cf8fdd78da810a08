//! Key-value backed bot bookkeeping
//!
//! The whitelist, the monthly suggestion counters and the per-guild
//! suggestion channels all live in a small string key-value store. The store
//! is injected through the [`KeyValueStore`] trait so deployments can plug in
//! a networked store while tests and the CLI use [`MemoryStore`].
mod channels;
mod suggestions;
mod whitelist;

pub use channels::SuggestionChannels;
pub use suggestions::{MONTHLY_SUGGESTION_LIMIT, SuggestionLedger, SuggestionOutcome};
pub use whitelist::Whitelist;

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed
    #[error("Store backend error: {0}")]
    Backend(String),

    /// `incr` was called on a value that is not an integer
    #[error("Value of key {key} is not an integer: {value}")]
    NotAnInteger { key: String, value: String },
}

/// A string key-value store with counters and absolute expiry
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Adds `amount` to the integer at `key` (missing keys count as 0) and
    /// returns the new value; an existing expiry is kept
    fn incr(&self, key: &str, amount: i64) -> Result<i64, StoreError>;

    /// Makes `key` disappear at `at`; returns false if the key does not exist
    fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Removes `key`; returns false if it did not exist
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// All live keys starting with `prefix`, sorted
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
    fn incr(&self, key: &str, amount: i64) -> Result<i64, StoreError> {
        (**self).incr(key, amount)
    }
    fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        (**self).expire_at(key, at)
    }
    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key)
    }
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).keys(prefix)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
    fn incr(&self, key: &str, amount: i64) -> Result<i64, StoreError> {
        (**self).incr(key, amount)
    }
    fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        (**self).expire_at(key, at)
    }
    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key)
    }
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).keys(prefix)
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// An in-process [`KeyValueStore`]
///
/// Expired keys are treated as absent and dropped lazily.
pub struct MemoryStore {
    values: Mutex<HashMap<String, StoredValue>>,
    clock: Clock,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Creates a store that reads the current time from `clock`
    pub fn with_clock<C>(clock: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            values: Mutex::new(HashMap::new()),
            clock: Arc::new(clock),
        }
    }

    fn live(&self) -> (MutexGuard<'_, HashMap<String, StoredValue>>, DateTime<Utc>) {
        let now = (self.clock)();
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.retain(|_, stored| stored.is_live(now));
        (values, now)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let (values, _) = self.live();
        Ok(values.get(key).map(|stored| stored.value.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (mut values, _) = self.live();
        // Like Redis SET, a plain write clears any expiry
        values.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    fn incr(&self, key: &str, amount: i64) -> Result<i64, StoreError> {
        let (mut values, _) = self.live();
        let stored = values.entry(key.to_string()).or_insert(StoredValue {
            value: "0".to_string(),
            expires_at: None,
        });

        let current: i64 = stored
            .value
            .parse()
            .map_err(|_| StoreError::NotAnInteger {
                key: key.to_string(),
                value: stored.value.clone(),
            })?;
        let next = current
            .checked_add(amount)
            .ok_or_else(|| StoreError::Backend(format!("increment of {key} overflows")))?;

        stored.value = next.to_string();
        Ok(next)
    }

    fn expire_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let (mut values, now) = self.live();
        let Some(stored) = values.get_mut(key) else {
            return Ok(false);
        };

        if at <= now {
            values.remove(key);
        } else {
            stored.expires_at = Some(at);
        }
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let (mut values, _) = self.live();
        Ok(values.remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let (values, _) = self.live();
        let mut keys: Vec<String> = values
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// A store whose clock can be moved by hand
    pub(crate) fn store_at(start: DateTime<Utc>) -> (MemoryStore, Arc<Mutex<DateTime<Utc>>>) {
        let now = Arc::new(Mutex::new(start));
        let clock = Arc::clone(&now);
        let store = MemoryStore::with_clock(move || *clock.lock().unwrap());
        (store, now)
    }

    fn jan(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_get_set_delete() {
        let store = MemoryStore::new();

        assert_eq!(store.get("a").unwrap(), None);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
    }

    #[test]
    fn test_incr() {
        let store = MemoryStore::new();

        assert_eq!(store.incr("n", 1).unwrap(), 1);
        assert_eq!(store.incr("n", 5).unwrap(), 6);
        assert_eq!(store.incr("n", -2).unwrap(), 4);

        store.set("s", "abc").unwrap();
        assert!(matches!(
            store.incr("s", 1),
            Err(StoreError::NotAnInteger { .. })
        ));
    }

    #[test]
    fn test_expire_at() {
        let (store, now) = store_at(jan(1));
        store.set("k", "v").unwrap();

        assert!(store.expire_at("k", jan(3)).unwrap());
        assert!(!store.expire_at("missing", jan(3)).unwrap());

        *now.lock().unwrap() = jan(2);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        // Counters keep their expiry
        store.set("n", "1").unwrap();
        store.expire_at("n", jan(3)).unwrap();
        store.incr("n", 1).unwrap();

        *now.lock().unwrap() = jan(3);
        assert_eq!(store.get("k").unwrap(), None);
        assert_eq!(store.get("n").unwrap(), None);
    }

    #[test]
    fn test_expire_in_the_past_deletes() {
        let (store, _) = store_at(jan(5));
        store.set("k", "v").unwrap();

        assert!(store.expire_at("k", jan(1)).unwrap());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_keys_by_prefix() {
        let store = MemoryStore::new();
        store.set("whitelist:2", "1").unwrap();
        store.set("whitelist:1", "1").unwrap();
        store.set("suggestions:1:2026-01", "1").unwrap();

        assert_eq!(
            store.keys("whitelist:").unwrap(),
            vec!["whitelist:1", "whitelist:2"]
        );
        assert_eq!(store.keys("").unwrap().len(), 3);
    }
}
