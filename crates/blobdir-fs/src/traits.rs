use std::path::{Path, PathBuf};

use blobdir_types::Version;

use crate::error::FsResult;

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// The entry's file name (no directory component).
    pub name: String,
    /// Length in bytes; zero for directories.
    pub len: u64,
    /// Modification time in milliseconds since the UNIX epoch.
    pub modified: Version,
}

/// Primitive filesystem capability used by the store and the watcher.
///
/// All implementations must satisfy these invariants:
/// - Each method is a single blocking operation with no retry.
/// - `write` creates the file or replaces its entire content.
/// - `copy_with_attributes` overwrites the target and carries over the
///   source's modification time.
/// - `rename` moves a single entry; callers check for an existing target.
pub trait FileSystem: Send + Sync {
    /// Returns `true` if anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Read the whole file.
    fn read(&self, path: &Path) -> FsResult<Vec<u8>>;

    /// Create or replace the file with `content`.
    fn write(&self, path: &Path, content: &[u8]) -> FsResult<()>;

    /// Copy `from` over `to`, preserving permissions and modification time.
    fn copy_with_attributes(&self, from: &Path, to: &Path) -> FsResult<()>;

    /// Move `from` to `to`.
    fn rename(&self, from: &Path, to: &Path) -> FsResult<()>;

    /// Delete the file at `path`.
    fn remove(&self, path: &Path) -> FsResult<()>;

    /// Last modification time in milliseconds.
    fn modified(&self, path: &Path) -> FsResult<Version>;

    /// Overwrite the modification time of the file at `path`.
    fn set_modified(&self, path: &Path, modified: Version) -> FsResult<()>;

    /// Absolute form of an existing `path` with `.` and `..` resolved.
    fn canonicalize(&self, path: &Path) -> FsResult<PathBuf>;

    /// Enumerate the direct children of `dir`.
    fn list_dir(&self, dir: &Path) -> FsResult<Vec<DirEntryInfo>>;
}
