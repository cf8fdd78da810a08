//! Episode ordering and season truncation
use super::tree::{EpisodeFile, ShowTree, SortedSeason, SortedShow, SortedShows};
use super::{CatalogResolver, has_media_extension};
use crate::media_fs::MediaFs;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

// S01E02 and friends. Case-sensitive: "s01e02" does not count.
static RE_SXXEXX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"S(\d+)E(\d+)").expect("valid episode pattern"));

static RE_IMDB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"imdbid-(tt\d+)").expect("valid imdb pattern"));

/// Extracts the episode number from a file name like `Show.S01E10.mkv`
///
/// Only the episode digits are used; the season digits are ignored.
/// Returns `None` if the name carries no `S<digits>E<digits>` marker.
/// Digit runs too long for a `u64` saturate, like [`season_number`].
pub fn episode_number(file_name: &str) -> Option<u64> {
    RE_SXXEXX
        .captures(file_name)
        .map(|caps| caps[2].parse().unwrap_or(u64::MAX))
}

/// Numeric value of all digits in a season folder name
///
/// `"Season 10"` is 10, `"S01 (2019)"` is 12019 and a name without digits,
/// such as `"Specials"`, is 0.
pub fn season_number(season_name: &str) -> u64 {
    let digits: String = season_name.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        0
    } else {
        digits.parse().unwrap_or(u64::MAX)
    }
}

/// Whether a season survives truncation at `boundary`
///
/// This is a plain string comparison, not a numeric one: with a boundary of
/// `"Season 10"`, `"Season 2"` is dropped because `'2' > '1'`.
pub fn season_within_boundary(season_name: &str, boundary: &str) -> bool {
    season_name <= boundary
}

/// Keeps only the seasons passing [`season_within_boundary`]
///
/// Bounds the size of the episode lists sent to the playback service.
/// Dropped seasons disappear entirely; shows are kept even if all their
/// seasons are dropped.
pub fn truncate_sorted_episodes(sorted: &SortedShows, boundary: &str) -> SortedShows {
    SortedShows {
        shows: sorted
            .shows
            .iter()
            .map(|show| SortedShow {
                name: show.name.clone(),
                seasons: show
                    .seasons
                    .iter()
                    .filter(|season| season_within_boundary(&season.name, boundary))
                    .cloned()
                    .collect(),
            })
            .collect(),
    }
}

/// Extracts an IMDb id such as `tt4158110` from an `imdbid-tt4158110` tag
pub fn imdb_id_from_path(path: &Path) -> Option<String> {
    RE_IMDB_ID
        .captures(&path.to_string_lossy())
        .map(|caps| caps[1].to_string())
}

/// Returns true if any episode path contains `imdb_id`
pub fn contains_imdb_id(sorted: &SortedShows, imdb_id: &str) -> bool {
    sorted
        .episodes()
        .any(|path| path.to_string_lossy().contains(imdb_id))
}

impl<F: MediaFs> CatalogResolver<F> {
    /// Orders a season's episodes by episode number
    ///
    /// Files that no longer exist or lack a media extension are dropped.
    /// Names without an episode marker go last, keeping their relative order.
    pub fn sort_episodes(&self, episodes: &[EpisodeFile]) -> Vec<PathBuf> {
        let mut valid: Vec<(Option<u64>, &PathBuf)> = episodes
            .iter()
            .filter(|episode| self.is_valid_media_file(&episode.path))
            .map(|episode| {
                let base_name = episode
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy())
                    .unwrap_or_default();
                (episode_number(&base_name), &episode.path)
            })
            .collect();

        // Stable: equal keys keep listing order
        valid.sort_by_key(|(number, _)| (number.is_none(), *number));
        valid.into_iter().map(|(_, path)| path.clone()).collect()
    }

    /// Sorts every season of every show
    ///
    /// Seasons are ordered by [`season_number`] and their episodes by
    /// [`Self::sort_episodes`].
    pub fn sort_show_tree(&self, trees: &[ShowTree]) -> SortedShows {
        SortedShows {
            shows: trees
                .iter()
                .map(|tree| {
                    let mut seasons: Vec<_> = tree.seasons.iter().collect();
                    seasons.sort_by_key(|season| season_number(&season.name));

                    SortedShow {
                        name: tree.name.clone(),
                        seasons: seasons
                            .into_iter()
                            .map(|season| SortedSeason {
                                name: season.name.clone(),
                                episodes: self.sort_episodes(&season.episodes),
                            })
                            .collect(),
                    }
                })
                .collect(),
        }
    }

    fn is_valid_media_file(&self, path: &Path) -> bool {
        let has_extension = path
            .file_name()
            .is_some_and(|name| has_media_extension(&name.to_string_lossy()));
        has_extension && self.fs.is_file(path)
    }
}
