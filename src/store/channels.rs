use super::{KeyValueStore, StoreError};

const PREFIX: &str = "suggestions_channels:";

/// The channel each guild routes suggestions to
#[derive(Debug)]
pub struct SuggestionChannels<S> {
    store: S,
}

impl<S: KeyValueStore> SuggestionChannels<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Routes suggestions of `guild_id` to `channel_id`, replacing any earlier channel
    pub fn set(&self, guild_id: &str, channel_id: &str) -> Result<(), StoreError> {
        self.store.set(&key(guild_id), channel_id)
    }

    pub fn get(&self, guild_id: &str) -> Result<Option<String>, StoreError> {
        self.store.get(&key(guild_id))
    }

    pub fn delete(&self, guild_id: &str) -> Result<bool, StoreError> {
        self.store.delete(&key(guild_id))
    }

    /// Every configured `(guild, channel)` pair, sorted by guild
    pub fn list(&self) -> Result<Vec<(String, String)>, StoreError> {
        let mut pairs = Vec::new();
        for key in self.store.keys(PREFIX)? {
            let Some(guild_id) = key.strip_prefix(PREFIX) else {
                continue;
            };
            // The key may have expired or been removed between the two calls
            if let Some(channel_id) = self.store.get(&key)? {
                pairs.push((guild_id.to_string(), channel_id));
            }
        }
        Ok(pairs)
    }
}

fn key(guild_id: &str) -> String {
    format!("{PREFIX}{guild_id}")
}
