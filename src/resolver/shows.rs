//! TV show folder lookups
//!
//! Two lookups exist with deliberately different matching rules:
//! [`CatalogResolver::tv_show_files`] matches folders by normalized substring
//! like every other search, while [`CatalogResolver::tv_show_files_extra`]
//! takes the first folder that starts with the exact, case-sensitive show
//! name. The playback flow relies on the latter.
use super::matcher::{first_prefixed, folder_matches};
use super::tree::{EpisodeFile, SeasonFolder, ShowMatches, ShowTree};
use super::{CatalogResolver, ResolverError};
use crate::media_fs::MediaFs;
use std::path::Path;
use tracing::{debug, warn};

impl<F: MediaFs> CatalogResolver<F> {
    /// Names of the folders under the TV root, in listing order
    pub fn show_folders(&self) -> Result<Vec<String>, ResolverError> {
        self.subdirectories(&self.root.tv_path)
    }

    /// Collects the show trees of every folder matching each query
    ///
    /// Every folder is tested against every query, so a folder can appear
    /// under several queries. Each distinct query gets an entry, in the order
    /// given, even when nothing matched it.
    ///
    /// # Arguments
    ///
    /// * `queries` - Free-text show queries, matched as in `match_folders`
    pub fn tv_show_files<S: AsRef<str>>(
        &self,
        queries: &[S],
    ) -> Result<Vec<ShowMatches>, ResolverError> {
        let mut buckets: Vec<ShowMatches> = Vec::with_capacity(queries.len());
        for query in queries.iter().map(AsRef::as_ref) {
            if !buckets.iter().any(|bucket| bucket.query == query) {
                buckets.push(ShowMatches {
                    query: query.to_string(),
                    folders: Vec::new(),
                });
            }
        }

        for folder in self.show_folders()? {
            let hits: Vec<usize> = buckets
                .iter()
                .enumerate()
                .filter(|(_, bucket)| folder_matches(&folder, &bucket.query))
                .map(|(index, _)| index)
                .collect();

            if hits.is_empty() {
                continue;
            }

            let tree = self.read_show(&self.root.tv_path.join(&folder), &folder)?;
            for index in hits {
                buckets[index].folders.push(tree.clone());
            }
        }

        for bucket in &buckets {
            debug!(query = %bucket.query, matches = bucket.folders.len(), "matched show folders");
        }

        Ok(buckets)
    }

    /// Reads the first show folder whose name starts with `show_name`
    ///
    /// The returned tree is keyed by `show_name` rather than by the folder's
    /// full name. When no folder matches, a warning is logged and `None`
    /// returned.
    pub fn tv_show_files_extra(&self, show_name: &str) -> Result<Option<ShowTree>, ResolverError> {
        let folders = self.show_folders()?;
        self.read_prefixed(&folders, show_name)
    }

    /// Batch form of [`Self::tv_show_files_extra`]
    ///
    /// Names without a matching folder are left out of the result; repeated
    /// names are read once.
    pub fn tv_show_files_extra_batch<S: AsRef<str>>(
        &self,
        show_names: &[S],
    ) -> Result<Vec<ShowTree>, ResolverError> {
        let folders = self.show_folders()?;

        let mut trees: Vec<ShowTree> = Vec::new();
        for show_name in show_names.iter().map(AsRef::as_ref) {
            if trees.iter().any(|tree| tree.name == show_name) {
                continue;
            }
            if let Some(tree) = self.read_prefixed(&folders, show_name)? {
                trees.push(tree);
            }
        }

        Ok(trees)
    }

    fn read_prefixed(
        &self,
        folders: &[String],
        show_name: &str,
    ) -> Result<Option<ShowTree>, ResolverError> {
        let Some(folder) = first_prefixed(folders, show_name) else {
            warn!(show_name, "no show folder starts with name");
            return Ok(None);
        };

        let tree = self.read_show(&self.root.tv_path.join(folder), show_name)?;
        Ok(Some(tree))
    }

    /// Reads the season folders and episode files below `show_path`
    ///
    /// Episodes are every regular file in a season folder; nothing is
    /// filtered by extension at this level.
    pub(super) fn read_show(&self, show_path: &Path, name: &str) -> Result<ShowTree, ResolverError> {
        let mut seasons = Vec::new();

        for season in self.subdirectories(show_path)? {
            let season_path = show_path.join(&season);
            let episodes = self
                .regular_files(&season_path)?
                .into_iter()
                .map(|file_name| EpisodeFile {
                    path: season_path.join(&file_name),
                    file_name,
                })
                .collect();

            seasons.push(SeasonFolder {
                name: season,
                episodes,
            });
        }

        Ok(ShowTree {
            name: name.to_string(),
            seasons,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::media_fs::MemoryFs;
    use crate::resolver::tests::resolver;
    use std::path::PathBuf;

    fn library() -> MemoryFs {
        MemoryFs::new()
            .with_file("/media/TVShows/Mr.Robot/Season 1/Mr.Robot.S01E01.mkv", 1)
            .with_file("/media/TVShows/Mr.Robot/Season 1/Mr.Robot.S01E01.nfo", 1)
            .with_file("/media/TVShows/Mr.Robot/Season 2/Mr.Robot.S02E01.mkv", 1)
            .with_file("/media/TVShows/Mr.Robot/poster.jpg", 1)
            .with_dir("/media/TVShows/Mr.Robot/Season 1/Extras")
            .with_file("/media/TVShows/Lost/Season 1/Lost.S01E01.mkv", 1)
            .with_file("/media/TVShows/Lost Girl/Season 1/Lost.Girl.S01E01.mkv", 1)
            .with_file("/media/TVShows/notes.txt", 1)
    }

    #[test]
    fn test_tree_shape() {
        let resolver = resolver(library());

        let matches = resolver.tv_show_files(&["mrrobot"]).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].query, "mrrobot");

        let tree = &matches[0].folders[0];
        assert_eq!(tree.name, "Mr.Robot");
        assert_eq!(tree.seasons.len(), 2);

        let season_one = &tree.seasons[0];
        assert_eq!(season_one.name, "Season 1");
        let names: Vec<&str> = season_one
            .episodes
            .iter()
            .map(|e| e.file_name.as_str())
            .collect();
        // No extension filtering here, and the Extras folder is not an episode
        assert_eq!(names, vec!["Mr.Robot.S01E01.mkv", "Mr.Robot.S01E01.nfo"]);
        assert_eq!(
            season_one.episodes[0].path,
            PathBuf::from("/media/TVShows/Mr.Robot/Season 1/Mr.Robot.S01E01.mkv")
        );
    }

    #[test]
    fn test_folder_can_match_several_queries() {
        let resolver = resolver(library());

        let matches = resolver.tv_show_files(&["lost", "girl", "lost", "wire"]).unwrap();

        let summary: Vec<(&str, Vec<&str>)> = matches
            .iter()
            .map(|m| {
                (
                    m.query.as_str(),
                    m.folders.iter().map(|f| f.name.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("lost", vec!["Lost", "Lost Girl"]),
                ("girl", vec!["Lost Girl"]),
                ("wire", vec![]),
            ]
        );
    }

    #[test]
    fn test_extra_uses_exact_prefix() {
        let resolver = resolver(library());

        let tree = resolver.tv_show_files_extra("Mr.Rob").unwrap().unwrap();
        assert_eq!(tree.name, "Mr.Rob");
        assert_eq!(tree.seasons.len(), 2);

        assert_eq!(resolver.tv_show_files_extra("mr.robot").unwrap(), None);
        assert_eq!(resolver.tv_show_files_extra("Robot").unwrap(), None);
        // A file under the TV root is never a show
        assert_eq!(resolver.tv_show_files_extra("notes").unwrap(), None);
    }

    #[test]
    fn test_extra_takes_first_listed_folder() {
        let resolver = resolver(library());

        let tree = resolver.tv_show_files_extra("Lost").unwrap().unwrap();
        assert_eq!(tree.seasons[0].episodes[0].file_name, "Lost.S01E01.mkv");
    }

    #[test]
    fn test_extra_batch_skips_missing_shows() {
        let resolver = resolver(library());

        let trees = resolver
            .tv_show_files_extra_batch(&["Lost Girl", "Wire", "Mr.Robot", "Lost Girl"])
            .unwrap();
        let names: Vec<&str> = trees.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Lost Girl", "Mr.Robot"]);
        assert_eq!(
            trees[0].seasons[0].episodes[0].file_name,
            "Lost.Girl.S01E01.mkv"
        );
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let resolver = resolver(library());

        assert_eq!(
            resolver.tv_show_files(&["lost", "mrrobot"]).unwrap(),
            resolver.tv_show_files(&["lost", "mrrobot"]).unwrap()
        );
        assert_eq!(
            resolver.tv_show_files_extra("Mr.Robot").unwrap(),
            resolver.tv_show_files_extra("Mr.Robot").unwrap()
        );
    }

    #[test]
    fn test_empty_library() {
        let resolver = resolver(MemoryFs::new());

        let matches = resolver.tv_show_files(&["anything"]).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].folders.is_empty());
        assert!(resolver.tv_show_files_extra_batch(&["anything"]).unwrap().is_empty());
    }
}
