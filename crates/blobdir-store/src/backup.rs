//! Backup copies that make a mutation reversible.
//!
//! A backup is taken right before a mutation that could partially fail and
//! is owned by that one in-flight operation. It is discarded on success, or
//! copied back over the original path on failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use blobdir_fs::{FileSystem, FsResult};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A shadow copy of a stored file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backup {
    /// The file the copy was taken from.
    pub original: PathBuf,
    /// Where the copy lives inside the backup directory.
    pub path: PathBuf,
}

/// The directory that holds in-flight backup copies.
pub struct BackupArea {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl BackupArea {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    /// The backup directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A fresh backup path for `original`.
    ///
    /// Names look like `photo.jpg_2024-05-01_13_45_09_<uuid>`: the timestamp
    /// keeps them readable for operators, the UUID v7 keeps two operations
    /// within the same second apart.
    pub fn backup_path_for(&self, original: &Path) -> PathBuf {
        let file_name = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stamp = Utc::now().format("%Y-%m-%d_%H_%M_%S");
        let token = Uuid::now_v7().simple();
        self.dir.join(format!("{file_name}_{stamp}_{token}"))
    }

    /// Copy `original` into the backup directory, preserving its attributes.
    pub fn take(&self, original: &Path) -> FsResult<Backup> {
        let path = self.backup_path_for(original);
        self.fs.copy_with_attributes(original, &path)?;
        debug!(file = %original.display(), backup = %path.display(), "backed up file");
        Ok(Backup {
            original: original.to_path_buf(),
            path,
        })
    }

    /// Copy the backup over its original path, then drop it.
    ///
    /// If the copy fails the backup stays where it is so that it can still be
    /// recovered by hand.
    pub fn restore(&self, backup: &Backup) -> FsResult<()> {
        info!(file = %backup.original.display(), backup = %backup.path.display(), "rolling back");
        self.fs.copy_with_attributes(&backup.path, &backup.original)?;
        info!(file = %backup.original.display(), "restored file from backup");
        self.discard(backup);
        Ok(())
    }

    /// Delete the backup. Failure is logged and otherwise ignored.
    pub fn discard(&self, backup: &Backup) {
        match self.fs.remove(&backup.path) {
            Ok(()) => debug!(backup = %backup.path.display(), "deleted backup file"),
            Err(e) => warn!(backup = %backup.path.display(), error = %e, "failed to delete backup file"),
        }
    }
}

impl std::fmt::Debug for BackupArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupArea").field("dir", &self.dir).finish()
    }
}
