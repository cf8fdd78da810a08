/// MDBList API response types for deserialization.
///
/// These structures mirror the JSON response format from the MDBList API.
/// Nearly everything is optional since the API omits fields it has no value
/// for and answers lookups of unknown ids with `{"response": false}`.
use serde::Deserialize;

/// Response of a `s=` title search.
#[derive(Debug, Deserialize)]
pub(super) struct MdbSearchResponse {
    #[serde(default)]
    pub search: Vec<MdbSearchItem>,
    pub response: Option<bool>,
    pub error: Option<String>,
}

/// A single search hit.
#[derive(Debug, Deserialize)]
pub(super) struct MdbSearchItem {
    /// IMDb id of the title
    pub id: String,
    pub title: String,
    pub year: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub score_average: Option<f64>,
}

/// Response of an `i=` id lookup.
#[derive(Debug, Deserialize)]
pub(super) struct MdbDetails {
    pub title: Option<String>,
    pub year: Option<u32>,
    pub released: Option<String>,
    pub description: Option<String>,
    pub runtime: Option<u32>,
    pub score_average: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub poster: Option<String>,
    pub response: Option<bool>,
    pub error: Option<String>,
}
