//! Movie folder lookups
use super::matcher::match_folders;
use super::tree::{MediaFile, MovieFolder};
use super::{CatalogResolver, ResolverError, has_media_extension};
use crate::media_fs::MediaFs;
use std::path::PathBuf;
use tracing::debug;

impl<F: MediaFs> CatalogResolver<F> {
    /// Names of the folders under the movies root, in listing order
    pub fn movie_folders(&self) -> Result<Vec<String>, ResolverError> {
        self.subdirectories(&self.root.movies_path)
    }

    /// Lists the playable files of the first movie folder matching `query`
    ///
    /// Folders are matched with [`match_folders`]. When several folders match,
    /// only the first in listing order is used. Only regular files directly
    /// inside the folder with a media extension are returned.
    ///
    /// # Returns
    ///
    /// `None` if no folder matches or the matched folder holds no media files.
    pub fn movie_files(&self, query: &str) -> Result<Option<MovieFolder>, ResolverError> {
        let folders = self.movie_folders()?;
        let matches = match_folders(&folders, query);
        debug!(query, matches = matches.len(), "matched movie folders");

        let Some(name) = matches.into_iter().next() else {
            return Ok(None);
        };

        let folder_path = self.root.movies_path.join(&name);
        let files: Vec<PathBuf> = self
            .regular_files(&folder_path)?
            .into_iter()
            .filter(|file| has_media_extension(file))
            .map(|file| folder_path.join(file))
            .collect();

        if files.is_empty() {
            debug!(folder = %name, "movie folder has no media files");
            return Ok(None);
        }

        Ok(Some(MovieFolder { name, files }))
    }

    /// Picks the largest media file of the first movie folder matching `query`
    ///
    /// Usually the best encode in the folder. Ties go to the file listed
    /// first.
    ///
    /// # Errors
    ///
    /// Fails if a file's size cannot be read, e.g. because it was deleted
    /// after the folder was listed.
    pub fn largest_media_file(&self, query: &str) -> Result<Option<MediaFile>, ResolverError> {
        let Some(folder) = self.movie_files(query)? else {
            return Ok(None);
        };

        let mut largest: Option<(&PathBuf, u64)> = None;
        for path in &folder.files {
            let size = self.fs.file_size(path)?;
            if largest.is_none_or(|(_, max)| size > max) {
                largest = Some((path, size));
            }
        }

        Ok(largest.map(|(path, _)| MediaFile {
            title: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.clone(),
        }))
    }
}
