//! Playback service client
//!
//! The actual streaming happens in a separate service. This module describes
//! its small HTTP surface: a handful of GET commands plus the two POST
//! endpoints that start playback, and the JSON request they accept.
mod http;

pub use http::{DEFAULT_PLAYBACK_URL, HttpPlaybackClient};

use crate::resolver::{MediaType, SortedShows};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to the playback service
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The request could not be sent or the response not received
    #[error("Request to /{endpoint} failed: {message}")]
    RequestError {
        endpoint: Endpoint,
        message: String,
    },

    /// The service answered with something other than JSON
    #[error("Unexpected content type from /{endpoint}: {content_type}")]
    UnexpectedContentType {
        endpoint: Endpoint,
        content_type: String,
    },

    /// The JSON body could not be parsed
    #[error("Failed to parse response from /{endpoint}: {message}")]
    ParseError {
        endpoint: Endpoint,
        message: String,
    },
}

/// An endpoint of the playback service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Status,
    Pause,
    Stop,
    Resume,
    Disconnect,
    TimeLeft,
    Play,
    PlayScheduled,
}

impl Endpoint {
    /// Path segment below the service's base URL
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Status => "status",
            Endpoint::Pause => "pause",
            Endpoint::Stop => "stop",
            Endpoint::Resume => "resume",
            Endpoint::Disconnect => "disconnect",
            Endpoint::TimeLeft => "timeleft",
            Endpoint::Play => "play",
            Endpoint::PlayScheduled => "play-scheduled",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// The body of a `play` or `play-scheduled` request
///
/// Movies carry no episode list; it is sent as `[]`. The optional fields are
/// left out of the JSON entirely when unset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayRequest {
    pub title: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(serialize_with = "episodes_or_empty_list")]
    pub sorted_episodes: Option<SortedShows>,
    pub guild_id: String,
    #[serde(rename = "author")]
    pub author_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// Seconds to keep playing, for scheduled playback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Runtime of the movie in seconds, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie_duration: Option<u64>,
}

fn episodes_or_empty_list<S: Serializer>(
    episodes: &Option<SortedShows>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match episodes {
        Some(shows) => shows.serialize(serializer),
        None => serializer.serialize_seq(Some(0))?.end(),
    }
}

/// `{status, data}` as returned by every endpoint
///
/// A non-2xx status is not an error at this level; callers decide what a
/// 400 or 500 means for their command.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackResponse {
    pub status: u16,
    pub data: Value,
}

impl PlaybackResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `message` field of the body, if there is one
    pub fn message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }
}

/// Client side of the playback service
pub trait PlaybackClient {
    /// Sends one of the body-less commands such as `pause` or `timeleft`
    fn command(&self, endpoint: Endpoint) -> Result<PlaybackResponse, PlaybackError>;

    /// Starts playback right away
    fn play(&self, request: &PlayRequest) -> Result<PlaybackResponse, PlaybackError>;

    /// Starts playback that stops after `request.duration` seconds
    fn play_scheduled(&self, request: &PlayRequest) -> Result<PlaybackResponse, PlaybackError>;
}

impl<T: PlaybackClient + ?Sized> PlaybackClient for &T {
    fn command(&self, endpoint: Endpoint) -> Result<PlaybackResponse, PlaybackError> {
        (**self).command(endpoint)
    }

    fn play(&self, request: &PlayRequest) -> Result<PlaybackResponse, PlaybackError> {
        (**self).play(request)
    }

    fn play_scheduled(&self, request: &PlayRequest) -> Result<PlaybackResponse, PlaybackError> {
        (**self).play_scheduled(request)
    }
}
