//! Configuration loading
//!
//! The configuration is a JSON file, by default `config.json` in the
//! system's configuration directory for this application.

use crate::playback::DEFAULT_PLAYBACK_URL;
use crate::resolver::MediaRoot;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine the configuration directory location
    #[error("Failed to determine configuration directory location")]
    ConfigDirectoryNotFound,

    /// Failed to read the configuration file
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file
    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A required setting is neither in the file nor given on the command line
    #[error("Missing setting: {0}")]
    Missing(&'static str),
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub movies_path: PathBuf,
    pub tv_path: PathBuf,
    #[serde(default = "default_playback_url")]
    pub playback_url: String,
    #[serde(default)]
    pub mdblist_api_key: Option<String>,
    /// Seasons sorting after this name are not sent to the playback service
    #[serde(default = "default_truncation_boundary")]
    pub truncation_boundary: String,
    #[serde(default = "default_selection_ttl_secs")]
    pub selection_ttl_secs: u64,
    #[serde(default = "default_selection_capacity")]
    pub selection_capacity: usize,
    #[serde(default = "default_metadata_cache_ttl_secs")]
    pub metadata_cache_ttl_secs: u64,
}

fn default_playback_url() -> String {
    DEFAULT_PLAYBACK_URL.to_string()
}

fn default_truncation_boundary() -> String {
    "Season 10".to_string()
}

fn default_selection_ttl_secs() -> u64 {
    3600
}

fn default_selection_capacity() -> usize {
    256
}

fn default_metadata_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

/// The file layout, where even the library roots may be left out
#[derive(Deserialize)]
struct PartialConfig {
    movies_path: Option<PathBuf>,
    tv_path: Option<PathBuf>,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

/// Values given on the command line, taking precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub movies_path: Option<PathBuf>,
    pub tv_path: Option<PathBuf>,
}

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "streamer-catalog")
}

impl Config {
    /// Creates a configuration with default settings for the given roots
    pub fn new(movies_path: impl Into<PathBuf>, tv_path: impl Into<PathBuf>) -> Self {
        Self {
            movies_path: movies_path.into(),
            tv_path: tv_path.into(),
            playback_url: default_playback_url(),
            mdblist_api_key: None,
            truncation_boundary: default_truncation_boundary(),
            selection_ttl_secs: default_selection_ttl_secs(),
            selection_capacity: default_selection_capacity(),
            metadata_cache_ttl_secs: default_metadata_cache_ttl_secs(),
        }
    }

    /// Where the configuration is read from when no path is given
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = project_dirs().ok_or(ConfigError::ConfigDirectoryNotFound)?;
        Ok(dirs.config_dir().join("config.json"))
    }

    /// Loads the configuration from `path`, or from [`Self::default_path`]
    ///
    /// A missing file is not an error as long as `overrides` supply both
    /// library roots.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        let content = if path.exists() {
            debug!(path = %path.display(), "reading configuration");
            fs::read_to_string(&path).map_err(|e| ConfigError::ReadFailed {
                path: path.clone(),
                source: e,
            })?
        } else {
            debug!(path = %path.display(), "no configuration file");
            "{}".to_string()
        };

        Self::from_json(&content, &path, overrides)
    }

    fn from_json(
        content: &str,
        path: &Path,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let parse_error = |e: serde_json::Error| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        };

        let partial: PartialConfig = serde_json::from_str(content).map_err(parse_error)?;

        let movies_path = overrides
            .movies_path
            .or(partial.movies_path)
            .ok_or(ConfigError::Missing("movies_path"))?;
        let tv_path = overrides
            .tv_path
            .or(partial.tv_path)
            .ok_or(ConfigError::Missing("tv_path"))?;

        let mut full = partial.rest;
        full.insert("movies_path".into(), path_value(&movies_path));
        full.insert("tv_path".into(), path_value(&tv_path));

        serde_json::from_value(serde_json::Value::Object(full)).map_err(parse_error)
    }

    pub fn media_root(&self) -> MediaRoot {
        MediaRoot::new(self.movies_path.clone(), self.tv_path.clone())
    }

    pub fn selection_ttl(&self) -> Duration {
        Duration::from_secs(self.selection_ttl_secs)
    }

    pub fn metadata_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata_cache_ttl_secs)
    }
}

fn path_value(path: &Path) -> serde_json::Value {
    serde_json::Value::String(path.to_string_lossy().into_owned())
}
