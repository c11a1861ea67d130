use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use blobdir_types::Version;
use tracing::trace;
use walkdir::WalkDir;

use crate::error::{FsError, FsOp, FsResult};
use crate::traits::{DirEntryInfo, FileSystem};

/// The real disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

fn to_version(time: SystemTime) -> Version {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as Version
}

fn from_version(version: Version) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(version)
}

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> FsResult<Vec<u8>> {
        fs::read(path).map_err(|e| FsError::io(FsOp::Read, path, e))
    }

    fn write(&self, path: &Path, content: &[u8]) -> FsResult<()> {
        trace!(path = %path.display(), bytes = content.len(), "write");
        fs::write(path, content).map_err(|e| FsError::io(FsOp::Write, path, e))
    }

    fn copy_with_attributes(&self, from: &Path, to: &Path) -> FsResult<()> {
        trace!(from = %from.display(), to = %to.display(), "copy");
        let modified = self.modified(from)?;
        // fs::copy carries permissions; the modification time is set explicitly.
        fs::copy(from, to).map_err(|e| FsError::io(FsOp::Copy, to, e))?;
        self.set_modified(to, modified)
    }

    fn rename(&self, from: &Path, to: &Path) -> FsResult<()> {
        trace!(from = %from.display(), to = %to.display(), "rename");
        fs::rename(from, to).map_err(|e| FsError::io(FsOp::Rename, to, e))
    }

    fn remove(&self, path: &Path) -> FsResult<()> {
        trace!(path = %path.display(), "remove");
        fs::remove_file(path).map_err(|e| FsError::io(FsOp::Remove, path, e))
    }

    fn modified(&self, path: &Path) -> FsResult<Version> {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .map(to_version)
            .map_err(|e| FsError::io(FsOp::Stat, path, e))
    }

    fn set_modified(&self, path: &Path, modified: Version) -> FsResult<()> {
        File::options()
            .write(true)
            .open(path)
            .and_then(|f| f.set_modified(from_version(modified)))
            .map_err(|e| FsError::io(FsOp::SetModified, path, e))
    }

    fn canonicalize(&self, path: &Path) -> FsResult<PathBuf> {
        fs::canonicalize(path).map_err(|e| FsError::io(FsOp::Stat, path, e))
    }

    fn list_dir(&self, dir: &Path) -> FsResult<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| FsError::io(FsOp::ListDir, dir, e.into()))?;
            let metadata = entry
                .metadata()
                .map_err(|e| FsError::io(FsOp::Stat, entry.path(), e.into()))?;
            let modified = metadata
                .modified()
                .map(to_version)
                .map_err(|e| FsError::io(FsOp::Stat, entry.path(), e))?;
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                len: if metadata.is_dir() { 0 } else { metadata.len() },
                modified,
            });
        }
        Ok(entries)
    }
}
