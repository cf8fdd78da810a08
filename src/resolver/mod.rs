//! Media catalog resolver
//!
//! Resolves free-text queries against a media library laid out as
//!
//! ```text
//! <movies_path>/<movie folder>/<files>
//! <tv_path>/<show folder>/<season folder>/<episode files>
//! ```
//!
//! and turns the matching folders into movie file lists, show trees, sorted
//! episode lists and the other views the playback flow needs. Every call
//! re-reads the filesystem through a [`MediaFs`]; nothing is cached between
//! calls. "Nothing matched" is an empty result, filesystem failures are
//! errors.

mod episodes;
mod matcher;
mod movies;
mod shows;
mod tree;

pub use episodes::{
    contains_imdb_id, episode_number, imdb_id_from_path, season_number, season_within_boundary,
    truncate_sorted_episodes,
};
pub use matcher::{folder_matches, match_folders, normalize_folder_name, partial_ratio};
pub use tree::{
    EpisodeFile, MediaFile, MovieFolder, SeasonFolder, ShowMatches, ShowTree, SortedSeason,
    SortedShow, SortedShows,
};

use crate::media_fs::{FsError, LocalFs, MediaFs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Extensions (lower-case, without the dot) accepted as playable media
pub const MEDIA_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "m2ts"];

/// Minimum `partial_ratio` score for `find_media_file` to accept a file
const FIND_SCORE_THRESHOLD: f64 = 80.0;

/// Errors that can occur while resolving queries against the library
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The library could not be read
    #[error(transparent)]
    Fs(#[from] FsError),
}

/// The two library roots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRoot {
    /// Directory holding one folder per movie
    pub movies_path: PathBuf,
    /// Directory holding one folder per show, each with season folders
    pub tv_path: PathBuf,
}

impl MediaRoot {
    pub fn new(movies_path: impl Into<PathBuf>, tv_path: impl Into<PathBuf>) -> Self {
        Self {
            movies_path: movies_path.into(),
            tv_path: tv_path.into(),
        }
    }
}

/// Which part of the library a path belongs to
///
/// The serialized names are the ones the playback service expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "Movies")]
    Movies,
    #[serde(rename = "TV Shows")]
    TvShows,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaType::Movies => "Movies",
            MediaType::TvShows => "TV Shows",
            MediaType::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Returns true if `file_name` ends in one of [`MEDIA_EXTENSIONS`], ignoring case
pub fn has_media_extension(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    MEDIA_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// Resolves queries against a media library
///
/// # Examples
///
/// ```no_run
/// use streamer_catalog::{CatalogResolver, MediaRoot};
///
/// let resolver = CatalogResolver::new(MediaRoot::new("/media/Movies", "/media/TVShows"));
/// if let Some(file) = resolver.largest_media_file("avengers")? {
///     println!("{} -> {}", file.title, file.path.display());
/// }
/// # Ok::<(), streamer_catalog::ResolverError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CatalogResolver<F = LocalFs> {
    root: MediaRoot,
    fs: F,
}

impl CatalogResolver<LocalFs> {
    /// Creates a resolver over the real filesystem
    pub fn new(root: MediaRoot) -> Self {
        Self { root, fs: LocalFs }
    }
}

impl<F: MediaFs> CatalogResolver<F> {
    /// Creates a resolver reading the library through `fs`
    pub fn with_fs(root: MediaRoot, fs: F) -> Self {
        Self { root, fs }
    }

    pub fn root(&self) -> &MediaRoot {
        &self.root
    }

    /// Absolute paths of every movie folder followed by every show folder
    pub fn media_folders(&self) -> Result<Vec<PathBuf>, ResolverError> {
        let movies = self
            .movie_folders()?
            .into_iter()
            .map(|name| self.root.movies_path.join(name));
        let shows = self
            .show_folders()?
            .into_iter()
            .map(|name| self.root.tv_path.join(name));
        Ok(movies.chain(shows).collect())
    }

    /// Classifies `path` by the root it lives under
    pub fn media_type(&self, path: &Path) -> MediaType {
        if path.starts_with(&self.root.movies_path) {
            MediaType::Movies
        } else if path.starts_with(&self.root.tv_path) {
            MediaType::TvShows
        } else {
            MediaType::Unknown
        }
    }

    /// Finds a movie file or episode whose name fuzzily resembles `title`
    ///
    /// Movie folders are searched before shows; the first file scoring above
    /// the threshold wins. Only playable movie files are considered, show
    /// episodes are taken as listed.
    pub fn find_media_file(&self, title: &str) -> Result<Option<PathBuf>, ResolverError> {
        let wanted = title.to_lowercase();
        let scores = |name: &str| partial_ratio(&wanted, &name.to_lowercase()) > FIND_SCORE_THRESHOLD;

        for folder in self.movie_folders()? {
            let folder_path = self.root.movies_path.join(&folder);
            for file in self.regular_files(&folder_path)? {
                if has_media_extension(&file) && scores(&file) {
                    debug!(title, file = %file, "fuzzy matched movie file");
                    return Ok(Some(folder_path.join(file)));
                }
            }
        }

        for folder in self.show_folders()? {
            let show = self.read_show(&self.root.tv_path.join(&folder), &folder)?;
            for season in show.seasons {
                for episode in season.episodes {
                    if scores(&episode.file_name) {
                        debug!(title, file = %episode.file_name, "fuzzy matched episode");
                        return Ok(Some(episode.path));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Names of the immediate subdirectories of `dir`, in listing order
    fn subdirectories(&self, dir: &Path) -> Result<Vec<String>, ResolverError> {
        Ok(self
            .fs
            .list_dir(dir)?
            .into_iter()
            .filter(|entry| entry.is_dir())
            .map(|entry| entry.name)
            .collect())
    }

    /// Names of the regular files directly inside `dir`, in listing order
    fn regular_files(&self, dir: &Path) -> Result<Vec<String>, ResolverError> {
        Ok(self
            .fs
            .list_dir(dir)?
            .into_iter()
            .filter(|entry| entry.is_file())
            .map(|entry| entry.name)
            .collect())
    }
}
