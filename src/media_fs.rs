//! Filesystem provider module
//!
//! This module abstracts the few filesystem reads the catalog resolver needs:
//! listing the immediate entries of a directory, checking whether a path is a
//! regular file and reading file sizes. `LocalFs` talks to the real
//! filesystem, `MemoryFs` serves a fixed in-memory tree whose listing order is
//! exactly the order entries were added in.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur while reading the media library
#[derive(Debug, Error)]
pub enum FsError {
    /// The path vanished or never existed
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Any other failure reading the path (permissions, device errors, ...)
    #[error("Failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl FsError {
    /// Classifies an `io::Error` raised while accessing `path`
    pub(crate) fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            FsError::NotFound(path.to_path_buf())
        } else {
            FsError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// The kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    /// Sockets, broken symlinks and anything else that is neither
    Other,
}

/// An immediate child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// The entry's file name (not the full path)
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Read access to a media library
///
/// Implementations must return directory entries in a stable order for an
/// unchanged tree; callers pick "the first match" by this order.
pub trait MediaFs {
    /// Lists the immediate entries of `dir`
    ///
    /// # Errors
    ///
    /// Returns `FsError::NotFound` if `dir` does not exist and
    /// `FsError::Io` if it cannot be read.
    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, FsError>;

    /// Returns true if `path` currently exists and is a regular file
    fn is_file(&self, path: &Path) -> bool;

    /// Returns the size of the regular file at `path` in bytes
    fn file_size(&self, path: &Path) -> Result<u64, FsError>;
}

impl<T: MediaFs + ?Sized> MediaFs for &T {
    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, FsError> {
        (**self).list_dir(dir)
    }

    fn is_file(&self, path: &Path) -> bool {
        (**self).is_file(path)
    }

    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        (**self).file_size(path)
    }
}

/// The real filesystem
///
/// Symlinks are followed, so a link to a directory lists as a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl MediaFs for LocalFs {
    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, FsError> {
        let read_dir = fs::read_dir(dir).map_err(|e| FsError::from_io(dir, e))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| FsError::from_io(dir, e))?;
            let path = entry.path();

            // Names are joined back onto their directory later, so a lossy
            // name would point at a file that does not exist
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(dir = %dir.display(), name = ?raw, "skipping entry with non UTF-8 name");
                    continue;
                }
            };

            let kind = match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => EntryKind::Directory,
                Ok(meta) if meta.is_file() => EntryKind::File,
                _ => EntryKind::Other,
            };

            entries.push(DirEntry { name, kind });
        }

        Ok(entries)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        let meta = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
        Ok(meta.len())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Dir(Vec<String>),
    File(u64),
}

/// An in-memory media library
///
/// Directories list their children in insertion order. Adding a path
/// creates any missing parent directories.
///
/// # Examples
///
/// ```
/// use streamer_catalog::MemoryFs;
///
/// let fs = MemoryFs::new()
///     .with_file("/media/Movies/Heat.1995/Heat.1995.mkv", 4_000)
///     .with_dir("/media/TVShows");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    nodes: HashMap<PathBuf, Node>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory (and its parents), returning the tree for chaining
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.add_dir(path.as_ref());
        self
    }

    /// Adds a regular file of `size` bytes (and its parents)
    pub fn with_file(mut self, path: impl AsRef<Path>, size: u64) -> Self {
        self.add_file(path.as_ref(), size);
        self
    }

    pub fn add_dir(&mut self, path: &Path) {
        if matches!(self.nodes.get(path), Some(Node::Dir(_))) {
            return;
        }
        if !self.nodes.contains_key(path) {
            self.link_to_parent(path);
        }
        self.nodes.insert(path.to_path_buf(), Node::Dir(Vec::new()));
    }

    pub fn add_file(&mut self, path: &Path, size: u64) {
        if !self.nodes.contains_key(path) {
            self.link_to_parent(path);
        }
        self.nodes.insert(path.to_path_buf(), Node::File(size));
    }

    /// Removes a file or an empty directory, as if it vanished between calls
    pub fn remove(&mut self, path: &Path) {
        if self.nodes.remove(path).is_none() {
            return;
        }
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            let name = name.to_string_lossy();
            if let Some(Node::Dir(children)) = self.nodes.get_mut(parent) {
                children.retain(|child| *child != name);
            }
        }
    }

    fn link_to_parent(&mut self, path: &Path) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        if parent.as_os_str().is_empty() {
            return;
        }
        self.add_dir(parent);
        if let Some(Node::Dir(children)) = self.nodes.get_mut(parent) {
            children.push(name.to_string_lossy().into_owned());
        }
    }
}

impl MediaFs for MemoryFs {
    fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntry>, FsError> {
        match self.nodes.get(dir) {
            Some(Node::Dir(children)) => Ok(children
                .iter()
                .map(|name| {
                    let kind = match self.nodes.get(&dir.join(name)) {
                        Some(Node::Dir(_)) => EntryKind::Directory,
                        Some(Node::File(_)) => EntryKind::File,
                        None => EntryKind::Other,
                    };
                    DirEntry {
                        name: name.clone(),
                        kind,
                    }
                })
                .collect()),
            Some(Node::File(_)) => Err(FsError::Io {
                path: dir.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            }),
            None => Err(FsError::NotFound(dir.to_path_buf())),
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.nodes.get(path), Some(Node::File(_)))
    }

    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        match self.nodes.get(path) {
            Some(Node::File(size)) => Ok(*size),
            Some(Node::Dir(_)) => Err(FsError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::IsADirectory, "is a directory"),
            }),
            None => Err(FsError::NotFound(path.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_local_list_distinguishes_dirs_and_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Season 1")).unwrap();
        File::create(dir.path().join("poster.jpg")).unwrap();

        let mut entries = LocalFs.list_dir(dir.path()).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(names(&entries), vec!["Season 1", "poster.jpg"]);
        assert!(entries[0].is_dir());
        assert!(entries[1].is_file());
    }

    #[test]
    fn test_local_missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");

        let result = LocalFs.list_dir(&missing);
        assert!(matches!(result, Err(FsError::NotFound(p)) if p == missing));
    }

    #[test]
    fn test_local_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.mkv");
        File::create(&path).unwrap().write_all(&[0u8; 42]).unwrap();

        assert_eq!(LocalFs.file_size(&path).unwrap(), 42);
        assert!(LocalFs.is_file(&path));
        assert!(!LocalFs.is_file(dir.path()));
        assert!(matches!(
            LocalFs.file_size(&dir.path().join("nope.mkv")),
            Err(FsError::NotFound(_))
        ));
    }

    // Other unix filesystems may refuse such names outright
    #[cfg(target_os = "linux")]
    #[test]
    fn test_local_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Heat.mkv"), [0u8; 10]).unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"Heat.\xff.mkv")), [0u8; 5]).unwrap();

        let entries = LocalFs.list_dir(dir.path()).unwrap();
        assert_eq!(names(&entries), vec!["Heat.mkv"]);
    }

    #[test]
    fn test_memory_listing_keeps_insertion_order() {
        let fs = MemoryFs::new()
            .with_file("/m/b.mkv", 1)
            .with_dir("/m/sub")
            .with_file("/m/a.mkv", 2);

        let entries = fs.list_dir(Path::new("/m")).unwrap();
        assert_eq!(names(&entries), vec!["b.mkv", "sub", "a.mkv"]);
        assert!(entries[1].is_dir());
    }

    #[test]
    fn test_memory_creates_parents() {
        let fs = MemoryFs::new().with_file("/media/TV/Show/Season 1/S01E01.mkv", 5);

        assert_eq!(names(&fs.list_dir(Path::new("/media")).unwrap()), vec!["TV"]);
        assert_eq!(
            names(&fs.list_dir(Path::new("/media/TV/Show")).unwrap()),
            vec!["Season 1"]
        );
    }

    #[test]
    fn test_memory_errors() {
        let mut fs = MemoryFs::new().with_file("/m/a.mkv", 3);

        assert!(matches!(fs.list_dir(Path::new("/m/a.mkv")), Err(FsError::Io { .. })));
        assert!(matches!(fs.list_dir(Path::new("/x")), Err(FsError::NotFound(_))));

        fs.remove(Path::new("/m/a.mkv"));
        assert!(!fs.is_file(Path::new("/m/a.mkv")));
        assert!(fs.list_dir(Path::new("/m")).unwrap().is_empty());
        assert!(matches!(
            fs.file_size(Path::new("/m/a.mkv")),
            Err(FsError::NotFound(_))
        ));
    }
}
