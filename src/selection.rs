//! Selection token cache
//!
//! The presentation layer shows the user a list of hits and later gets back
//! "play the one behind this button". Instead of putting file paths into
//! buttons it hands out opaque tokens and keeps the mapping here. The cache
//! is bounded: entries expire after a time-to-live and the oldest entry is
//! evicted once the capacity is reached.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry<T> {
    token: String,
    created: Instant,
    value: T,
}

/// A bounded token → value map with a time-to-live
#[derive(Debug)]
pub struct SelectionCache<T> {
    ttl: Duration,
    capacity: usize,
    // Insertion order, oldest first
    entries: Mutex<VecDeque<Entry<T>>>,
}

impl<T: Clone> SelectionCache<T> {
    /// Creates a cache keeping at most `capacity` entries for `ttl` each
    ///
    /// A capacity of zero is treated as one.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Stores `value` and returns the freshly generated token for it
    ///
    /// Tokens are ULIDs, unique and unguessable enough for button ids.
    pub fn insert(&self, value: T) -> String {
        self.insert_at(value, Instant::now())
    }

    /// Returns the value behind `token` unless it expired or was evicted
    pub fn get(&self, token: &str) -> Option<T> {
        self.get_at(token, Instant::now())
    }

    /// Removes `token`, returning its value if it was still live
    pub fn remove(&self, token: &str) -> Option<T> {
        let now = Instant::now();
        let mut entries = self.lock();
        let index = entries.iter().position(|entry| entry.token == token)?;
        let entry = entries.remove(index)?;
        (!self.is_expired(&entry, now)).then_some(entry.value)
    }

    /// Number of entries that have not expired yet
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .iter()
            .filter(|entry| !self.is_expired(entry, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_at(&self, value: T, now: Instant) -> String {
        let token = ulid::Ulid::new().to_string();
        let mut entries = self.lock();

        entries.retain(|entry| !self.is_expired(entry, now));
        while entries.len() >= self.capacity {
            entries.pop_front();
        }

        entries.push_back(Entry {
            token: token.clone(),
            created: now,
            value,
        });

        token
    }

    fn get_at(&self, token: &str, now: Instant) -> Option<T> {
        self.lock()
            .iter()
            .find(|entry| entry.token == token && !self.is_expired(entry, now))
            .map(|entry| entry.value.clone())
    }

    fn is_expired(&self, entry: &Entry<T>, now: Instant) -> bool {
        now.saturating_duration_since(entry.created) >= self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Entry<T>>> {
        // The queue is never left half-updated, so a poisoned lock is still usable
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
