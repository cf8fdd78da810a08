/// HTTP implementation of the playback client.
use super::{Endpoint, PlayRequest, PlaybackClient, PlaybackError, PlaybackResponse};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::debug;

/// Where the playback service listens unless configured otherwise
pub const DEFAULT_PLAYBACK_URL: &str = "http://localhost:3000";

/// Talks to the playback service over blocking HTTP
pub struct HttpPlaybackClient {
    client: Client,
    base_url: String,
}

impl Default for HttpPlaybackClient {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYBACK_URL)
    }
}

impl HttpPlaybackClient {
    /// Creates a client for the service at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint.path())
    }

    fn post(
        &self,
        endpoint: Endpoint,
        request: &PlayRequest,
    ) -> Result<PlaybackResponse, PlaybackError> {
        debug!(%endpoint, title = %request.title, "posting playback request");

        let response = self
            .client
            .post(self.url(endpoint))
            .json(request)
            .send()
            .map_err(|e| PlaybackError::RequestError {
                endpoint,
                message: e.to_string(),
            })?;

        Self::read_response(endpoint, response)
    }

    /// Converts a raw response into `{status, data}`
    ///
    /// Anything not declared as JSON is rejected, whatever the status.
    fn read_response(
        endpoint: Endpoint,
        response: Response,
    ) -> Result<PlaybackResponse, PlaybackError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !is_json_content_type(&content_type) {
            return Err(PlaybackError::UnexpectedContentType {
                endpoint,
                content_type,
            });
        }

        let data: Value = response.json().map_err(|e| PlaybackError::ParseError {
            endpoint,
            message: e.to_string(),
        })?;

        debug!(%endpoint, status, "playback service answered");
        Ok(PlaybackResponse { status, data })
    }
}

impl PlaybackClient for HttpPlaybackClient {
    fn command(&self, endpoint: Endpoint) -> Result<PlaybackResponse, PlaybackError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .map_err(|e| PlaybackError::RequestError {
                endpoint,
                message: e.to_string(),
            })?;

        Self::read_response(endpoint, response)
    }

    fn play(&self, request: &PlayRequest) -> Result<PlaybackResponse, PlaybackError> {
        self.post(Endpoint::Play, request)
    }

    fn play_scheduled(&self, request: &PlayRequest) -> Result<PlaybackResponse, PlaybackError> {
        self.post(Endpoint::PlayScheduled, request)
    }
}

/// `application/json`, optionally with parameters such as a charset
fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}
