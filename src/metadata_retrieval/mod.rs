/// Data structures and traits for movie and show metadata retrieval.
///
/// This module provides the search results and detail records shown next to
/// library hits (poster, score, runtime and so on), as well as the trait
/// metadata providers implement.
mod cached;
mod mdblist;
mod mdblist_types;

pub use cached::CachedMetadataProvider;
pub use mdblist::MdbListProvider;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The requested title was not found
    #[error("Title not found: {0}")]
    NotFound(String),

    /// The API returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),
}

/// What kind of title to search for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
        })
    }
}

/// A single hit of a title search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The IMDb id, usable with [`MetadataProvider::details`]
    pub id: String,
    pub title: String,
    pub year: Option<u32>,
    /// `"movie"` or `"show"`
    #[serde(rename = "type")]
    pub kind: String,
    pub score_average: Option<f64>,
}

/// Details of one movie or show
///
/// Fields the provider leaves out are empty strings or zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaDetails {
    /// URL of the poster image
    pub poster: String,
    /// Average score on a 0-100 scale
    pub score_average: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    /// Runtime in minutes
    pub runtime: u32,
    pub title: String,
    pub year: u32,
    /// Release date as given by the provider, e.g. `2012-05-04`
    pub released: String,
}

impl MediaDetails {
    /// The score on a 0-10 scale, as shown to users
    pub fn score_out_of_ten(&self) -> f64 {
        self.score_average / 10.0
    }
}

/// Trait for metadata providers that can look up movies and shows.
///
/// Implementors fetch data from catalog services such as MDBList.
pub trait MetadataProvider {
    /// Searches titles of the given kind matching `query`
    ///
    /// An empty list means nothing matched.
    fn search(
        &self,
        query: &str,
        kind: MediaKind,
    ) -> Result<Vec<SearchResult>, MetadataRetrievalError>;

    /// Fetches the details of the title with IMDb id `imdb_id`
    fn details(&self, imdb_id: &str) -> Result<MediaDetails, MetadataRetrievalError>;
}
