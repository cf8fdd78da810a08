//! streamer_catalog - Find the right file to stream from a media library
//!
//! This library resolves free-text queries against a movies/TV folder tree,
//! orders show episodes the way the playback service expects them, and
//! drives that service: search, hand out selection tokens, then play.
//! Around that sit the bot's bookkeeping (whitelist, monthly suggestion
//! quota, suggestion channels) and cached title metadata from MDBList.

mod cache;
mod config;
mod dispatch;
mod duration;
mod media_fs;
mod metadata_retrieval;
mod playback;
mod resolver;
mod selection;
mod store;

pub use cache::{CacheError, CacheStorage};
pub use config::{Config, ConfigError, ConfigOverrides};
pub use dispatch::{DispatchError, MediaDispatcher, Requester, SearchHit, Selection, TimeLeft};
pub use duration::{format_time_left, parse_duration, parse_time_left_message};
pub use media_fs::{DirEntry, EntryKind, FsError, LocalFs, MediaFs, MemoryFs};
pub use metadata_retrieval::{
    CachedMetadataProvider, MdbListProvider, MediaDetails, MediaKind, MetadataProvider,
    MetadataRetrievalError, SearchResult,
};
pub use playback::{
    DEFAULT_PLAYBACK_URL, Endpoint, HttpPlaybackClient, PlayRequest, PlaybackClient,
    PlaybackError, PlaybackResponse,
};
pub use resolver::{
    CatalogResolver, EpisodeFile, MEDIA_EXTENSIONS, MediaFile, MediaRoot, MediaType, MovieFolder,
    ResolverError, SeasonFolder, ShowMatches, ShowTree, SortedSeason, SortedShow, SortedShows,
    contains_imdb_id, episode_number, folder_matches, has_media_extension, imdb_id_from_path,
    match_folders, normalize_folder_name, partial_ratio, season_number, season_within_boundary,
    truncate_sorted_episodes,
};
pub use selection::SelectionCache;
pub use store::{
    KeyValueStore, MONTHLY_SUGGESTION_LIMIT, MemoryStore, StoreError, SuggestionChannels,
    SuggestionLedger, SuggestionOutcome, Whitelist,
};

use thiserror::Error;

/// Top-level error type for streamer_catalog operations
#[derive(Debug, Error)]
pub enum StreamerError {
    /// Error while resolving queries against the library
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Error while reading the library
    #[error("Filesystem error: {0}")]
    Fs(#[from] FsError),

    /// Error talking to the playback service
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Error during metadata retrieval
    #[error("Metadata retrieval error: {0}")]
    MetadataRetrieval(#[from] MetadataRetrievalError),

    /// Error in the key-value store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error during cache operations
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error loading the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error in the search-and-play flow
    #[error("{0}")]
    Dispatch(#[from] DispatchError),
}
