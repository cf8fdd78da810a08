//! Structures describing what the resolver found on disk.
//!
//! Ordered `Vec`s stand in for mappings throughout: folder and season order is
//! meaningful (listing order before sorting, numeric order after), and names
//! within one level are unique because they come from a single directory.
use serde::ser::{Serialize, Serializer};
use std::path::{Path, PathBuf};

/// A movie folder and its playable files, in listing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieFolder {
    /// The folder's name under the movies root
    pub name: String,
    /// Absolute paths of the media files directly inside the folder
    pub files: Vec<PathBuf>,
}

/// A single media file picked for playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// The file's base name
    pub title: String,
    pub path: PathBuf,
}

/// An episode file inside a season folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeFile {
    pub file_name: String,
    pub path: PathBuf,
}

/// A season folder and its files, in listing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonFolder {
    pub name: String,
    pub episodes: Vec<EpisodeFile>,
}

/// A show's on-disk layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowTree {
    /// The key the tree was requested under: the matched folder name for
    /// substring lookups, the requested show name for prefix lookups
    pub name: String,
    pub seasons: Vec<SeasonFolder>,
}

/// All show folders matching one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowMatches {
    pub query: String,
    /// Empty when nothing matched
    pub folders: Vec<ShowTree>,
}

/// A season's playable episodes in episode order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedSeason {
    pub name: String,
    pub episodes: Vec<PathBuf>,
}

/// A show with seasons in numeric order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedShow {
    pub name: String,
    pub seasons: Vec<SortedSeason>,
}

/// Sorted episode listings for one or more shows
///
/// Serializes as `{show: {season: [path, ...]}}` with keys in order, which
/// is the shape the playback service consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedShows {
    pub shows: Vec<SortedShow>,
}

impl SortedShows {
    pub fn is_empty(&self) -> bool {
        self.shows.is_empty()
    }

    /// Looks up a show by name
    pub fn show(&self, name: &str) -> Option<&SortedShow> {
        self.shows.iter().find(|show| show.name == name)
    }

    /// The first episode of the first season that has any
    pub fn first_episode(&self) -> Option<&Path> {
        self.shows
            .iter()
            .flat_map(|show| &show.seasons)
            .find_map(|season| season.episodes.first())
            .map(PathBuf::as_path)
    }

    /// Iterates over every episode path of every show
    pub fn episodes(&self) -> impl Iterator<Item = &Path> {
        self.shows
            .iter()
            .flat_map(|show| &show.seasons)
            .flat_map(|season| &season.episodes)
            .map(PathBuf::as_path)
    }
}

impl SortedShow {
    /// Season names in their current order
    pub fn season_names(&self) -> Vec<&str> {
        self.seasons.iter().map(|s| s.name.as_str()).collect()
    }
}

impl Serialize for SortedShows {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.shows
                .iter()
                .map(|show| (&show.name, SeasonMap(&show.seasons))),
        )
    }
}

struct SeasonMap<'a>(&'a [SortedSeason]);

impl Serialize for SeasonMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|season| (&season.name, &season.episodes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shows() -> SortedShows {
        SortedShows {
            shows: vec![SortedShow {
                name: "Lost".into(),
                seasons: vec![
                    SortedSeason {
                        name: "Season 2".into(),
                        episodes: vec![],
                    },
                    SortedSeason {
                        name: "Season 10".into(),
                        episodes: vec![PathBuf::from("/tv/Lost/Season 10/S10E01.mkv")],
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_serializes_as_ordered_nested_map() {
        let json = serde_json::to_string(&shows()).unwrap();
        assert_eq!(
            json,
            r#"{"Lost":{"Season 2":[],"Season 10":["/tv/Lost/Season 10/S10E01.mkv"]}}"#
        );
    }

    #[test]
    fn test_first_episode_skips_empty_seasons() {
        assert_eq!(
            shows().first_episode(),
            Some(Path::new("/tv/Lost/Season 10/S10E01.mkv"))
        );
        assert_eq!(SortedShows::default().first_episode(), None);
    }

    #[test]
    fn test_show_lookup() {
        let shows = shows();
        assert_eq!(
            shows.show("Lost").unwrap().season_names(),
            vec!["Season 2", "Season 10"]
        );
        assert!(shows.show("Heat").is_none());
        assert_eq!(shows.episodes().count(), 1);
    }
}
