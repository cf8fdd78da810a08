//! Cache storage module
//!
//! This module provides persistent caching functionality using the system's
//! standard cache directory. Data is serialized to JSON format for storage,
//! together with the time it was written so stale entries can be skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to determine cache directory location
    #[error("Failed to determine cache directory location")]
    CacheDirectoryNotFound,

    /// Failed to create or access cache directory
    #[error("Failed to create cache directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read cached data
    #[error("Failed to read cache file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write cached data
    #[error("Failed to write cache file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize cached data
    #[error("Failed to deserialize cache file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize data for caching
    #[error("Failed to serialize data: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// The on-disk layout of a cache file
#[derive(Deserialize)]
struct CacheEntry<T> {
    stored_at: DateTime<Utc>,
    data: T,
}

#[derive(Serialize)]
struct CacheEntryRef<'a, T> {
    stored_at: DateTime<Utc>,
    data: &'a T,
}

/// A generic cache storage for serializable data
///
/// Data is stored as one JSON file per identifier. With a time-to-live set,
/// entries older than it are treated as missing.
#[derive(Debug)]
pub struct CacheStorage<T> {
    /// The directory where cached data is stored
    cache_dir: PathBuf,
    ttl: Option<Duration>,
    _phantom: PhantomData<T>,
}

impl<T> CacheStorage<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    /// Opens or creates a cache storage with the given name
    ///
    /// The cache will be stored in the system's standard cache directory
    /// under a subdirectory named after the application and the provided name.
    /// The name will be sanitized (lowercased, non-alphanumeric characters
    /// replaced with underscores).
    ///
    /// # Arguments
    ///
    /// * `name` - The name for this cache storage
    /// * `ttl` - How long entries stay valid; `None` keeps them forever
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let cache: CacheStorage<MediaDetails> =
    ///     CacheStorage::open("metadata", Some(Duration::from_secs(86_400)))?;
    /// ```
    pub fn open(name: &str, ttl: Option<Duration>) -> Result<Self, CacheError> {
        let proj_dirs = crate::config::project_dirs()
            .ok_or(CacheError::CacheDirectoryNotFound)?;

        Self::open_in(proj_dirs.cache_dir(), name, ttl)
    }

    /// Opens a cache storage named `name` below `base_dir`
    pub fn open_in(base_dir: &Path, name: &str, ttl: Option<Duration>) -> Result<Self, CacheError> {
        let cache_dir = base_dir.join(sanitize_name(name));

        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::DirectoryCreationFailed {
            path: cache_dir.clone(),
            source: e,
        })?;

        Ok(Self {
            cache_dir,
            ttl,
            _phantom: PhantomData,
        })
    }

    /// Loads cached data for the given identifier
    ///
    /// Returns `None` if nothing is cached or the entry has outlived the
    /// time-to-live. Returns an error if the data exists but cannot be read
    /// or deserialized.
    pub fn load(&self, identifier: &str) -> Result<Option<T>, CacheError> {
        self.load_at(identifier, Utc::now())
    }

    fn load_at(&self, identifier: &str, now: DateTime<Utc>) -> Result<Option<T>, CacheError> {
        let file_path = self.file_path(identifier);

        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&file_path).map_err(|e| CacheError::ReadFailed {
            path: file_path.clone(),
            source: e,
        })?;

        let entry: CacheEntry<T> =
            serde_json::from_str(&content).map_err(|e| CacheError::DeserializationFailed {
                path: file_path.clone(),
                source: e,
            })?;

        if self.is_expired(entry.stored_at, now) {
            debug!(path = %file_path.display(), "cache entry expired");
            return Ok(None);
        }

        Ok(Some(entry.data))
    }

    /// Stores data in the cache with the given identifier
    pub fn store(&self, identifier: &str, data: &T) -> Result<(), CacheError> {
        self.store_at(identifier, data, Utc::now())
    }

    fn store_at(&self, identifier: &str, data: &T, now: DateTime<Utc>) -> Result<(), CacheError> {
        let file_path = self.file_path(identifier);

        let content = serde_json::to_string_pretty(&CacheEntryRef {
            stored_at: now,
            data,
        })?;

        fs::write(&file_path, content).map_err(|e| CacheError::WriteFailed {
            path: file_path,
            source: e,
        })?;

        Ok(())
    }

    /// Returns the path to the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn file_path(&self, identifier: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", sanitize_name(identifier)))
    }

    fn is_expired(&self, stored_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        // Entries from the future (clock changes) count as fresh
        now.signed_duration_since(stored_at)
            .to_std()
            .is_ok_and(|age| age >= ttl)
    }
}

/// Sanitizes a name for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
