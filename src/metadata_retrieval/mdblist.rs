/// MDBList metadata provider implementation.
use super::mdblist_types::{MdbDetails, MdbSearchResponse};
use super::{MediaDetails, MediaKind, MetadataProvider, MetadataRetrievalError, SearchResult};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Metadata provider for the MDBList API.
///
/// This provider queries https://mdblist.com/api/ for title searches and
/// IMDb id lookups. Every request needs an API key.
pub struct MdbListProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl MdbListProvider {
    /// Creates a new MDBList provider using `api_key`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: "https://mdblist.com/api/".to_string(),
            api_key: api_key.into(),
        }
    }

    /// Runs a GET against the API with the given extra query parameters.
    fn get<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T, MetadataRetrievalError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MetadataRetrievalError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json()
            .map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))
    }

    /// Converts an MDBList search response to our search results.
    fn convert_search(
        response: MdbSearchResponse,
        kind: MediaKind,
    ) -> Result<Vec<SearchResult>, MetadataRetrievalError> {
        if response.response == Some(false) && response.search.is_empty() {
            if let Some(error) = response.error {
                return Err(MetadataRetrievalError::InvalidData(error));
            }
        }

        Ok(response
            .search
            .into_iter()
            .map(|item| SearchResult {
                id: item.id,
                title: item.title,
                year: item.year,
                kind: item.kind.unwrap_or_else(|| kind.to_string()),
                score_average: item.score_average,
            })
            .collect())
    }

    /// Converts an MDBList detail record to our MediaDetails structure.
    fn convert_details(
        imdb_id: &str,
        details: MdbDetails,
    ) -> Result<MediaDetails, MetadataRetrievalError> {
        if details.response == Some(false) {
            debug!(imdb_id, error = ?details.error, "lookup answered without data");
            return Err(MetadataRetrievalError::NotFound(imdb_id.to_string()));
        }

        Ok(MediaDetails {
            poster: details.poster.unwrap_or_default(),
            score_average: details.score_average.unwrap_or_default(),
            kind: details.kind.unwrap_or_default(),
            description: details.description.unwrap_or_default(),
            runtime: details.runtime.unwrap_or_default(),
            title: details.title.unwrap_or_default(),
            year: details.year.unwrap_or_default(),
            released: details.released.unwrap_or_default(),
        })
    }
}

impl MetadataProvider for MdbListProvider {
    fn search(
        &self,
        query: &str,
        kind: MediaKind,
    ) -> Result<Vec<SearchResult>, MetadataRetrievalError> {
        let kind_name = kind.to_string();
        let response: MdbSearchResponse = self.get(&[("m", kind_name.as_str()), ("s", query)])?;
        Self::convert_search(response, kind)
    }

    fn details(&self, imdb_id: &str) -> Result<MediaDetails, MetadataRetrievalError> {
        let details: MdbDetails = self.get(&[("i", imdb_id)])?;
        Self::convert_details(imdb_id, details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_search() {
        let response: MdbSearchResponse = serde_json::from_str(
            r#"{
                "search": [
                    {"id": "tt0848228", "title": "The Avengers", "year": 2012,
                     "score": 80, "score_average": 78, "type": "movie",
                     "imdbid": "tt0848228", "tmdbid": 24428},
                    {"id": "tt0118661", "title": "The Avengers", "year": null}
                ],
                "total": 2,
                "response": true
            }"#,
        )
        .unwrap();

        let results = MdbListProvider::convert_search(response, MediaKind::Movie).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "tt0848228");
        assert_eq!(results[0].year, Some(2012));
        assert_eq!(results[0].score_average, Some(78.0));
        assert_eq!(results[1].kind, "movie");
        assert_eq!(results[1].year, None);
    }

    #[test]
    fn test_convert_search_error() {
        let response: MdbSearchResponse =
            serde_json::from_str(r#"{"response": false, "error": "Invalid API key!"}"#).unwrap();

        assert!(matches!(
            MdbListProvider::convert_search(response, MediaKind::Show),
            Err(MetadataRetrievalError::InvalidData(message)) if message == "Invalid API key!"
        ));
    }

    #[test]
    fn test_convert_details_fills_defaults() {
        let details: MdbDetails = serde_json::from_str(
            r#"{"title": "Mr. Robot", "year": 2015, "type": "show",
                "score_average": 85, "poster": "https://example.org/p.jpg",
                "ratings": [], "response": true}"#,
        )
        .unwrap();

        let details = MdbListProvider::convert_details("tt4158110", details).unwrap();
        assert_eq!(details.title, "Mr. Robot");
        assert_eq!(details.kind, "show");
        assert_eq!(details.runtime, 0);
        assert_eq!(details.description, "");
        assert_eq!(details.released, "");
    }

    #[test]
    fn test_convert_details_not_found() {
        let details: MdbDetails = serde_json::from_str(r#"{"response": false}"#).unwrap();

        assert!(matches!(
            MdbListProvider::convert_details("tt0000000", details),
            Err(MetadataRetrievalError::NotFound(id)) if id == "tt0000000"
        ));
    }
}
