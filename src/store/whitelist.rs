use super::{KeyValueStore, StoreError};

const PREFIX: &str = "whitelist:";

/// Users allowed to start playback and to suggest without a quota
#[derive(Debug)]
pub struct Whitelist<S> {
    store: S,
}

impl<S: KeyValueStore> Whitelist<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds `user_id`; adding twice is harmless
    pub fn add(&self, user_id: &str) -> Result<(), StoreError> {
        self.store.set(&key(user_id), "1")
    }

    /// Removes `user_id`, returning whether it was whitelisted
    pub fn remove(&self, user_id: &str) -> Result<bool, StoreError> {
        self.store.delete(&key(user_id))
    }

    pub fn is_whitelisted(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self.store.get(&key(user_id))?.is_some())
    }

    /// All whitelisted user ids, sorted
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .keys(PREFIX)?
            .into_iter()
            .filter_map(|key| key.strip_prefix(PREFIX).map(str::to_string))
            .collect())
    }
}

fn key(user_id: &str) -> String {
    format!("{PREFIX}{user_id}")
}
