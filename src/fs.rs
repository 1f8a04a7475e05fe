//! Local file system abstraction for testability.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Abstraction over the local storage a traversal writes into.
pub trait FileSystem: Send + Sync {
    /// Writer returned by [`FileSystem::create_file`].
    type File: Write;

    /// Checks if anything exists at the given path.
    fn exists(&self, path: &Path) -> bool;

    /// Creates all directories in the given path.
    fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Creates (or truncates) a file for writing.
    fn create_file(&self, path: &Path) -> std::io::Result<Self::File>;

    /// Renames a file, replacing the destination.
    fn rename_file(&self, from: &Path, to: &Path) -> std::io::Result<()>;

    /// Removes a file.
    fn remove_file(&self, path: &Path) -> std::io::Result<()>;
}

/// Default file system implementation using `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Creates a new `StdFileSystem` instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FileSystem for StdFileSystem {
    type File = BufWriter<File>;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn create_file(&self, path: &Path) -> std::io::Result<Self::File> {
        File::create(path).map(BufWriter::new)
    }

    fn rename_file(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        std::fs::remove_file(path)
    }
}

/// Returns the `.part` path bytes are streamed into before the final rename.
#[must_use]
pub fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}
