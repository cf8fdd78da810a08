//! Cached metadata provider implementation
//!
//! This module provides a caching wrapper for metadata providers that
//! automatically stores and retrieves search results and title details from
//! a local cache.

use super::{MediaDetails, MediaKind, MetadataProvider, MetadataRetrievalError, SearchResult};
use crate::cache::{CacheError, CacheStorage};
use std::time::Duration;
use tracing::{debug, warn};

/// A caching wrapper for metadata providers
///
/// This provider wraps another metadata provider and caches the results
/// to avoid redundant network requests. The cache is persistent across
/// application runs; entries older than the cache's time-to-live are
/// fetched again.
pub struct CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// The underlying metadata provider
    provider: P,
    searches: CacheStorage<Vec<SearchResult>>,
    details: CacheStorage<MediaDetails>,
}

impl<P> CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// Creates a new cached metadata provider wrapping the given provider
    ///
    /// # Arguments
    ///
    /// * `provider` - The metadata provider to wrap
    /// * `searches` - The cache storage for search results
    /// * `details` - The cache storage for title details
    pub fn new(
        provider: P,
        searches: CacheStorage<Vec<SearchResult>>,
        details: CacheStorage<MediaDetails>,
    ) -> Self {
        Self {
            provider,
            searches,
            details,
        }
    }

    /// Wraps `provider` with caches in the system cache directory
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let mdblist = MdbListProvider::new(api_key);
    /// let cached = CachedMetadataProvider::open(mdblist, Some(Duration::from_secs(86_400)))?;
    /// ```
    pub fn open(provider: P, ttl: Option<Duration>) -> Result<Self, CacheError> {
        Ok(Self::new(
            provider,
            CacheStorage::open("searches", ttl)?,
            CacheStorage::open("details", ttl)?,
        ))
    }

    /// Generates a cache key for a search query
    fn search_key(query: &str, kind: MediaKind) -> String {
        format!("{kind}_{query}")
    }
}

impl<P> MetadataProvider for CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    fn search(
        &self,
        query: &str,
        kind: MediaKind,
    ) -> Result<Vec<SearchResult>, MetadataRetrievalError> {
        let cache_key = Self::search_key(query, kind);

        match self.searches.load(&cache_key) {
            Ok(Some(results)) => {
                debug!(query, %kind, "search served from cache");
                return Ok(results);
            }
            Ok(None) => {}
            // A broken cache must not prevent the lookup
            Err(e) => warn!(error = %e, "ignoring unreadable search cache entry"),
        }

        let results = self.provider.search(query, kind)?;

        if let Err(e) = self.searches.store(&cache_key, &results) {
            warn!(error = %e, "failed to cache search results");
        }

        Ok(results)
    }

    fn details(&self, imdb_id: &str) -> Result<MediaDetails, MetadataRetrievalError> {
        match self.details.load(imdb_id) {
            Ok(Some(details)) => {
                debug!(imdb_id, "details served from cache");
                return Ok(details);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "ignoring unreadable details cache entry"),
        }

        let details = self.provider.details(imdb_id)?;

        if let Err(e) = self.details.store(imdb_id, &details) {
            warn!(error = %e, "failed to cache details");
        }

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::path::Path;

    #[derive(Default)]
    struct CountingProvider {
        searches: Cell<usize>,
        lookups: Cell<usize>,
    }

    impl MetadataProvider for &CountingProvider {
        fn search(
            &self,
            query: &str,
            kind: MediaKind,
        ) -> Result<Vec<SearchResult>, MetadataRetrievalError> {
            self.searches.set(self.searches.get() + 1);
            Ok(vec![SearchResult {
                id: "tt0113277".into(),
                title: query.to_string(),
                year: Some(1995),
                kind: kind.to_string(),
                score_average: Some(83.0),
            }])
        }

        fn details(&self, imdb_id: &str) -> Result<MediaDetails, MetadataRetrievalError> {
            self.lookups.set(self.lookups.get() + 1);
            if imdb_id == "tt0000000" {
                return Err(MetadataRetrievalError::NotFound(imdb_id.to_string()));
            }
            Ok(MediaDetails {
                poster: "https://example.org/heat.jpg".into(),
                score_average: 83.0,
                kind: "movie".into(),
                description: "A heist".into(),
                runtime: 170,
                title: "Heat".into(),
                year: 1995,
                released: "1995-12-15".into(),
            })
        }
    }

    fn cached<'a>(
        provider: &'a CountingProvider,
        dir: &Path,
    ) -> CachedMetadataProvider<&'a CountingProvider> {
        CachedMetadataProvider::new(
            provider,
            CacheStorage::open_in(dir, "searches", None).unwrap(),
            CacheStorage::open_in(dir, "details", None).unwrap(),
        )
    }

    #[test]
    fn test_search_is_cached_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CountingProvider::default();
        let cached = cached(&provider, dir.path());

        let first = cached.search("Heat", MediaKind::Movie).unwrap();
        let second = cached.search("Heat", MediaKind::Movie).unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.searches.get(), 1);

        cached.search("Heat", MediaKind::Show).unwrap();
        assert_eq!(provider.searches.get(), 2);
    }

    #[test]
    fn test_details_are_cached() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CountingProvider::default();
        let cached = cached(&provider, dir.path());

        assert_eq!(cached.details("tt0113277").unwrap().title, "Heat");
        assert_eq!(cached.details("tt0113277").unwrap().runtime, 170);
        assert_eq!(provider.lookups.get(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CountingProvider::default();
        let cached = cached(&provider, dir.path());

        assert!(cached.details("tt0000000").is_err());
        assert!(cached.details("tt0000000").is_err());
        assert_eq!(provider.lookups.get(), 2);
    }
}
