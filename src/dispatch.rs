//! Search-and-play flow
//!
//! Ties the resolver, the selection cache, the optional whitelist and the
//! playback client together: a search registers one token per hit, and a
//! later `play` turns a token into a request for the playback service.

use crate::duration::{format_time_left, parse_time_left_message};
use crate::media_fs::{LocalFs, MediaFs};
use crate::playback::{Endpoint, PlayRequest, PlaybackClient, PlaybackError, PlaybackResponse};
use crate::resolver::{
    CatalogResolver, MediaType, ResolverError, imdb_id_from_path, match_folders,
    truncate_sorted_episodes,
};
use crate::selection::SelectionCache;
use crate::store::{KeyValueStore, MemoryStore, StoreError, Whitelist};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors of the search-and-play flow
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The token was never issued, has expired or was evicted
    #[error("Unknown or expired selection: {0}")]
    UnknownToken(String),

    /// The requester is not on the whitelist
    #[error("User {0} is not whitelisted")]
    NotWhitelisted(String),

    /// Queries must not contain mass mentions
    #[error("Query must not contain @everyone or @here")]
    ForbiddenQuery,

    /// The selection is of the wrong kind for the command
    #[error("{folder} is {actual}, expected {expected}")]
    WrongMediaType {
        folder: String,
        expected: MediaType,
        actual: MediaType,
    },

    /// The selected folder holds nothing that could be played
    #[error("No playable media in {0}")]
    NothingPlayable(String),

    /// The playback service gave a time-left answer without a number
    #[error("Unexpected time left answer: {0}")]
    UnparseableTimeLeft(String),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Who asked for playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub guild_id: String,
    pub author_id: String,
}

impl Requester {
    pub fn new(guild_id: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            author_id: author_id.into(),
        }
    }
}

/// What a selection token stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Folder name below the movies or TV root
    pub folder: String,
    /// A representative file: the first movie file or the first episode
    pub path: PathBuf,
    pub media_type: MediaType,
}

/// One hit of [`MediaDispatcher::search`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Token to hand back to `play` or `play_scheduled`
    pub token: String,
    pub folder: String,
    pub media_type: MediaType,
    pub path: PathBuf,
    pub imdb_id: Option<String>,
}

/// The playback service's answer to `timeleft`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeLeft {
    Remaining { seconds: u64, formatted: String },
    /// Something plays, but it was not started as scheduled playback
    NotScheduled,
    /// Nothing plays at all
    NoStream,
}

/// Resolves selections and drives the playback service
pub struct MediaDispatcher<C, F = LocalFs, S = MemoryStore> {
    resolver: CatalogResolver<F>,
    client: C,
    selections: SelectionCache<Selection>,
    whitelist: Option<Whitelist<S>>,
    truncation_boundary: String,
}

impl<C, F> MediaDispatcher<C, F, MemoryStore>
where
    C: PlaybackClient,
    F: MediaFs,
{
    /// Creates a dispatcher that lets everybody play
    pub fn new(
        resolver: CatalogResolver<F>,
        client: C,
        selections: SelectionCache<Selection>,
        truncation_boundary: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            client,
            selections,
            whitelist: None,
            truncation_boundary: truncation_boundary.into(),
        }
    }
}

impl<C, F, S> MediaDispatcher<C, F, S>
where
    C: PlaybackClient,
    F: MediaFs,
    S: KeyValueStore,
{
    /// Restricts every command to whitelisted requesters
    pub fn with_whitelist<W: KeyValueStore>(self, whitelist: Whitelist<W>) -> MediaDispatcher<C, F, W> {
        MediaDispatcher {
            resolver: self.resolver,
            client: self.client,
            selections: self.selections,
            whitelist: Some(whitelist),
            truncation_boundary: self.truncation_boundary,
        }
    }

    pub fn resolver(&self) -> &CatalogResolver<F> {
        &self.resolver
    }

    /// Looks up a token without consuming it
    pub fn selection(&self, token: &str) -> Option<Selection> {
        self.selections.get(token)
    }

    /// Finds movie and show folders matching `query` and registers a token for each
    ///
    /// Movies come first. Folders without any playable file are skipped.
    pub fn search(&self, query: &str, requester: &Requester) -> Result<Vec<SearchHit>, DispatchError> {
        self.ensure_whitelisted(requester)?;
        if query.contains("@everyone") || query.contains("@here") {
            return Err(DispatchError::ForbiddenQuery);
        }

        let mut hits = Vec::new();

        for folder in match_folders(&self.resolver.movie_folders()?, query) {
            let first_file = self
                .resolver
                .movie_files(&folder)?
                .and_then(|movie| movie.files.into_iter().next());
            match first_file {
                Some(path) => hits.push(self.register(folder, path, MediaType::Movies)),
                None => warn!(folder = %folder, "movie folder without media files"),
            }
        }

        let show_folders = match_folders(&self.resolver.show_folders()?, query);
        if !show_folders.is_empty() {
            let matches = self.resolver.tv_show_files(&[query])?;
            let trees = matches.into_iter().flat_map(|bucket| bucket.folders);

            for tree in trees {
                let sorted = self.resolver.sort_show_tree(std::slice::from_ref(&tree));
                match sorted.first_episode() {
                    Some(path) => {
                        let path = path.to_path_buf();
                        hits.push(self.register(tree.name, path, MediaType::TvShows));
                    }
                    None => warn!(folder = %tree.name, "show folder without episodes"),
                }
            }
        }

        info!(query, hits = hits.len(), "search finished");
        Ok(hits)
    }

    /// Starts playback of the selection behind `token`
    ///
    /// Movies play their largest file. Shows send the whole sorted episode
    /// list, truncated at the configured season boundary, along with the
    /// requested season and episode.
    pub fn play(
        &self,
        token: &str,
        requester: &Requester,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Result<PlaybackResponse, DispatchError> {
        self.ensure_whitelisted(requester)?;
        let selection = self.lookup(token)?;

        let request = match selection.media_type {
            MediaType::Movies => self.movie_request(&selection, requester)?,
            MediaType::TvShows => {
                let Some(tree) = self.resolver.tv_show_files_extra(&selection.folder)? else {
                    return Err(DispatchError::NothingPlayable(selection.folder));
                };
                let sorted = self.resolver.sort_show_tree(&[tree]);
                let sorted = truncate_sorted_episodes(&sorted, &self.truncation_boundary);

                PlayRequest {
                    title: selection.folder.clone(),
                    path: selection.path.clone(),
                    media_type: MediaType::TvShows,
                    sorted_episodes: Some(sorted),
                    guild_id: requester.guild_id.clone(),
                    author_id: requester.author_id.clone(),
                    season,
                    episode,
                    duration: None,
                    movie_duration: None,
                }
            }
            MediaType::Unknown => {
                return Err(DispatchError::WrongMediaType {
                    folder: selection.folder,
                    expected: MediaType::Movies,
                    actual: MediaType::Unknown,
                });
            }
        };

        debug!(title = %request.title, media_type = %request.media_type, "requesting playback");
        Ok(self.client.play(&request)?)
    }

    /// Plays the movie behind `token` for `duration` seconds
    ///
    /// Only movies can be scheduled. `movie_duration` is the runtime of the
    /// movie in seconds, when the caller knows it.
    pub fn play_scheduled(
        &self,
        token: &str,
        requester: &Requester,
        duration: u64,
        movie_duration: Option<u64>,
    ) -> Result<PlaybackResponse, DispatchError> {
        self.ensure_whitelisted(requester)?;
        let selection = self.lookup(token)?;

        if selection.media_type != MediaType::Movies {
            return Err(DispatchError::WrongMediaType {
                folder: selection.folder,
                expected: MediaType::Movies,
                actual: selection.media_type,
            });
        }

        let request = PlayRequest {
            duration: Some(duration),
            movie_duration,
            ..self.movie_request(&selection, requester)?
        };

        debug!(title = %request.title, duration, "requesting scheduled playback");
        Ok(self.client.play_scheduled(&request)?)
    }

    pub fn pause(&self, requester: &Requester) -> Result<PlaybackResponse, DispatchError> {
        self.command(Endpoint::Pause, requester)
    }

    pub fn resume(&self, requester: &Requester) -> Result<PlaybackResponse, DispatchError> {
        self.command(Endpoint::Resume, requester)
    }

    pub fn stop(&self, requester: &Requester) -> Result<PlaybackResponse, DispatchError> {
        self.command(Endpoint::Stop, requester)
    }

    /// Current state of the playback service; open to everybody
    pub fn status(&self) -> Result<PlaybackResponse, DispatchError> {
        Ok(self.client.command(Endpoint::Status)?)
    }

    /// Asks how long scheduled playback still runs
    ///
    /// A 500 answer means nothing scheduled is playing and a 400 answer that
    /// nothing plays at all.
    pub fn time_left(&self, requester: &Requester) -> Result<TimeLeft, DispatchError> {
        let response = self.command(Endpoint::TimeLeft, requester)?;

        match response.status {
            500 => Ok(TimeLeft::NotScheduled),
            400 => Ok(TimeLeft::NoStream),
            _ => {
                let message = response.message().unwrap_or_default();
                let seconds = parse_time_left_message(message)
                    .ok_or_else(|| DispatchError::UnparseableTimeLeft(response.data.to_string()))?;
                Ok(TimeLeft::Remaining {
                    seconds,
                    formatted: format_time_left(seconds),
                })
            }
        }
    }

    fn command(
        &self,
        endpoint: Endpoint,
        requester: &Requester,
    ) -> Result<PlaybackResponse, DispatchError> {
        self.ensure_whitelisted(requester)?;
        Ok(self.client.command(endpoint)?)
    }

    fn movie_request(
        &self,
        selection: &Selection,
        requester: &Requester,
    ) -> Result<PlayRequest, DispatchError> {
        let Some(file) = self.resolver.largest_media_file(&selection.folder)? else {
            return Err(DispatchError::NothingPlayable(selection.folder.clone()));
        };

        Ok(PlayRequest {
            title: file.title,
            path: file.path,
            media_type: MediaType::Movies,
            sorted_episodes: None,
            guild_id: requester.guild_id.clone(),
            author_id: requester.author_id.clone(),
            season: None,
            episode: None,
            duration: None,
            movie_duration: None,
        })
    }

    fn register(&self, folder: String, path: PathBuf, media_type: MediaType) -> SearchHit {
        let imdb_id = imdb_id_from_path(&path);
        let token = self.selections.insert(Selection {
            folder: folder.clone(),
            path: path.clone(),
            media_type,
        });

        SearchHit {
            token,
            folder,
            media_type,
            path,
            imdb_id,
        }
    }

    fn lookup(&self, token: &str) -> Result<Selection, DispatchError> {
        self.selections
            .get(token)
            .ok_or_else(|| DispatchError::UnknownToken(token.to_string()))
    }

    fn ensure_whitelisted(&self, requester: &Requester) -> Result<(), DispatchError> {
        match &self.whitelist {
            Some(whitelist) if !whitelist.is_whitelisted(&requester.author_id)? => {
                warn!(author_id = %requester.author_id, "refused request of user not on whitelist");
                Err(DispatchError::NotWhitelisted(requester.author_id.clone()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media_fs::MemoryFs;
    use crate::resolver::{MediaRoot, SortedShows};
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::path::Path;
    use std::time::Duration;

    /// Records every call and answers with a canned response
    struct RecordingClient {
        calls: RefCell<Vec<(Endpoint, Option<PlayRequest>)>>,
        status: u16,
        data: Value,
    }

    impl RecordingClient {
        fn answering(status: u16, data: Value) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                status,
                data,
            }
        }

        fn ok() -> Self {
            Self::answering(200, json!({"message": "ok"}))
        }

        fn record(&self, endpoint: Endpoint, request: Option<&PlayRequest>) -> PlaybackResponse {
            self.calls.borrow_mut().push((endpoint, request.cloned()));
            PlaybackResponse {
                status: self.status,
                data: self.data.clone(),
            }
        }

        fn last_request(&self) -> PlayRequest {
            self.calls
                .borrow()
                .last()
                .and_then(|(_, request)| request.clone())
                .unwrap()
        }
    }

    impl PlaybackClient for RecordingClient {
        fn command(&self, endpoint: Endpoint) -> Result<PlaybackResponse, PlaybackError> {
            Ok(self.record(endpoint, None))
        }

        fn play(&self, request: &PlayRequest) -> Result<PlaybackResponse, PlaybackError> {
            Ok(self.record(Endpoint::Play, Some(request)))
        }

        fn play_scheduled(&self, request: &PlayRequest) -> Result<PlaybackResponse, PlaybackError> {
            Ok(self.record(Endpoint::PlayScheduled, Some(request)))
        }
    }

    fn library() -> MemoryFs {
        MemoryFs::new()
            .with_file(
                "/media/Movies/The.Avengers.2012/Avengers.2012 [imdbid-tt0848228].1080p.mkv",
                4000,
            )
            .with_file("/media/Movies/The.Avengers.2012/sample.mkv", 10)
            .with_file("/media/Movies/The.Avengers.2012/cover.jpg", 900_000)
            .with_dir("/media/Movies/Avengers.Extras")
            .with_file("/media/TVShows/Avengers Assemble/Season 2/S02E01.mkv", 1)
            .with_file("/media/TVShows/Avengers Assemble/Season 1/S01E02.mkv", 1)
            .with_file("/media/TVShows/Avengers Assemble/Season 1/S01E01.mkv", 1)
            .with_file("/media/TVShows/Avengers Assemble/Season 11/S11E01.mkv", 1)
    }

    fn dispatcher(client: &RecordingClient) -> MediaDispatcher<&RecordingClient, MemoryFs> {
        let fs = library().with_dir("/media/Movies").with_dir("/media/TVShows");
        MediaDispatcher::new(
            CatalogResolver::with_fs(MediaRoot::new("/media/Movies", "/media/TVShows"), fs),
            client,
            SelectionCache::new(Duration::from_secs(3600), 16),
            "Season 10",
        )
    }

    fn requester() -> Requester {
        Requester::new("guild", "author")
    }

    #[test]
    fn test_search_registers_movies_then_shows() {
        let client = RecordingClient::ok();
        let dispatcher = dispatcher(&client);

        let hits = dispatcher.search("avengers", &requester()).unwrap();
        let folders: Vec<(&str, MediaType)> = hits
            .iter()
            .map(|hit| (hit.folder.as_str(), hit.media_type))
            .collect();
        // The empty extras folder is skipped
        assert_eq!(
            folders,
            vec![
                ("The.Avengers.2012", MediaType::Movies),
                ("Avengers Assemble", MediaType::TvShows),
            ]
        );
        assert_eq!(hits[0].imdb_id.as_deref(), Some("tt0848228"));
        assert_eq!(
            hits[1].path,
            Path::new("/media/TVShows/Avengers Assemble/Season 1/S01E01.mkv")
        );
        assert_eq!(dispatcher.selection(&hits[1].token).unwrap().folder, "Avengers Assemble");
    }

    #[test]
    fn test_search_rejects_mass_mentions() {
        let client = RecordingClient::ok();
        let dispatcher = dispatcher(&client);

        assert!(matches!(
            dispatcher.search("@everyone avengers", &requester()),
            Err(DispatchError::ForbiddenQuery)
        ));
    }

    #[test]
    fn test_play_movie_uses_largest_file() {
        let client = RecordingClient::ok();
        let dispatcher = dispatcher(&client);
        let hits = dispatcher.search("avengers 2012", &requester());
        // Spaces are not normalized away
        assert!(hits.unwrap().is_empty());

        let hits = dispatcher.search("avengers.2012", &requester()).unwrap();
        let response = dispatcher.play(&hits[0].token, &requester(), None, None).unwrap();
        assert!(response.is_success());

        let request = client.last_request();
        assert_eq!(
            request.title,
            "Avengers.2012 [imdbid-tt0848228].1080p.mkv"
        );
        assert_eq!(request.media_type, MediaType::Movies);
        assert_eq!(request.sorted_episodes, None);
        assert_eq!(request.guild_id, "guild");
        assert_eq!(request.author_id, "author");
    }

    #[test]
    fn test_play_show_sends_truncated_sorted_episodes() {
        let client = RecordingClient::ok();
        let dispatcher = dispatcher(&client);
        let hits = dispatcher.search("assemble", &requester()).unwrap();

        dispatcher.play(&hits[0].token, &requester(), Some(1), Some(2)).unwrap();

        let request = client.last_request();
        assert_eq!(request.media_type, MediaType::TvShows);
        assert_eq!(request.title, "Avengers Assemble");
        assert_eq!((request.season, request.episode), (Some(1), Some(2)));

        let sorted: SortedShows = request.sorted_episodes.unwrap();
        let show = sorted.show("Avengers Assemble").unwrap();
        // "Season 2" sorts after "Season 10" as a string and is cut off
        assert_eq!(show.season_names(), vec!["Season 1"]);
        assert_eq!(
            show.seasons[0].episodes,
            vec![
                PathBuf::from("/media/TVShows/Avengers Assemble/Season 1/S01E01.mkv"),
                PathBuf::from("/media/TVShows/Avengers Assemble/Season 1/S01E02.mkv"),
            ]
        );
    }

    #[test]
    fn test_play_scheduled_is_for_movies_only() {
        let client = RecordingClient::ok();
        let dispatcher = dispatcher(&client);
        let hits = dispatcher.search("avengers", &requester()).unwrap();

        dispatcher
            .play_scheduled(&hits[0].token, &requester(), 3_600, Some(8_580))
            .unwrap();
        let request = client.last_request();
        assert_eq!(request.duration, Some(3_600));
        assert_eq!(request.movie_duration, Some(8_580));
        assert_eq!(client.calls.borrow().last().unwrap().0, Endpoint::PlayScheduled);

        assert!(matches!(
            dispatcher.play_scheduled(&hits[1].token, &requester(), 60, None),
            Err(DispatchError::WrongMediaType { actual: MediaType::TvShows, .. })
        ));
    }

    #[test]
    fn test_unknown_token() {
        let client = RecordingClient::ok();
        let dispatcher = dispatcher(&client);

        assert!(matches!(
            dispatcher.play("01HZZZZZZZZZZZZZZZZZZZZZZZ", &requester(), None, None),
            Err(DispatchError::UnknownToken(_))
        ));
        assert!(client.calls.borrow().is_empty());
    }

    #[test]
    fn test_whitelist_refuses_strangers() {
        let client = RecordingClient::ok();
        let store = MemoryStore::new();
        let whitelist = Whitelist::new(&store);
        whitelist.add("friend").unwrap();
        let dispatcher = dispatcher(&client).with_whitelist(Whitelist::new(&store));

        assert!(matches!(
            dispatcher.pause(&Requester::new("guild", "stranger")),
            Err(DispatchError::NotWhitelisted(user)) if user == "stranger"
        ));
        assert!(client.calls.borrow().is_empty());

        dispatcher.pause(&Requester::new("guild", "friend")).unwrap();
        assert_eq!(client.calls.borrow()[0].0, Endpoint::Pause);

        // Status is open to everybody
        dispatcher.status().unwrap();
    }

    #[test]
    fn test_time_left() {
        let client = RecordingClient::answering(200, json!({"message": "Time left: 3725.4"}));
        assert_eq!(
            dispatcher(&client).time_left(&requester()).unwrap(),
            TimeLeft::Remaining {
                seconds: 3725,
                formatted: "1 hours, 2 minutes, and 5 seconds".to_string(),
            }
        );

        let client = RecordingClient::answering(500, json!({}));
        assert_eq!(
            dispatcher(&client).time_left(&requester()).unwrap(),
            TimeLeft::NotScheduled
        );

        let client = RecordingClient::answering(400, json!({}));
        assert_eq!(
            dispatcher(&client).time_left(&requester()).unwrap(),
            TimeLeft::NoStream
        );

        let client = RecordingClient::answering(200, json!({"message": "soon"}));
        assert!(matches!(
            dispatcher(&client).time_left(&requester()),
            Err(DispatchError::UnparseableTimeLeft(_))
        ));
    }
}
