//! The transactional file store.
//!
//! The filesystem only offers single-operation atomicity, so every mutation
//! that can partially fail follows the same protocol:
//!
//! 1. Validate the request. Nothing is touched on disk before this passes.
//! 2. Copy the current file into the backup area.
//! 3. Mutate (rename first, then replace content).
//! 4. On success, discard the backup. On failure, copy the backup over the
//!    *original* path, undo a rename that already landed, and report a
//!    server error.
//!
//! After any failure the externally visible state (name, content, and
//! version) is exactly what it was before the call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use blobdir_fs::{FileSystem, FsError};
use blobdir_types::{validate_file_name, ErrorLabel, FilePatch, ReadMode, StoredFile};
use tracing::{debug, error, info};

use crate::backup::{Backup, BackupArea};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::locks::NameLocks;

/// Create/read/update/delete over a single directory with all-or-nothing
/// semantics and optimistic concurrency control.
///
/// Mutations on the same name are serialized through [`NameLocks`]; reads
/// take no lock.
pub struct FileStore {
    fs: Arc<dyn FileSystem>,
    store_dir: PathBuf,
    backups: BackupArea,
    locks: NameLocks,
}

impl FileStore {
    pub fn new(fs: Arc<dyn FileSystem>, config: StoreConfig) -> Self {
        let backups = BackupArea::new(Arc::clone(&fs), config.backup_dir);
        Self {
            fs,
            store_dir: config.store_dir,
            backups,
            locks: NameLocks::new(),
        }
    }

    /// The primary store directory.
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// The directory holding in-flight backups.
    pub fn backup_dir(&self) -> &Path {
        self.backups.dir()
    }

    /// Returns `true` if a file with this name exists.
    pub fn exists(&self, name: &str) -> StoreResult<bool> {
        let path = self.path_of(name)?;
        Ok(self.fs.exists(&path))
    }

    /// Read a file's metadata, and its content when `mode` asks for it.
    ///
    /// Returns `Ok(None)` if the file does not exist. Failing to stat or read
    /// a file that existed a moment earlier is a server error.
    pub fn get(&self, name: &str, mode: ReadMode) -> StoreResult<Option<StoredFile>> {
        let path = self.path_of(name)?;
        if !self.fs.exists(&path) {
            return Ok(None);
        }

        let version = self.fs.modified(&path).map_err(|e| {
            StoreError::server(format!("couldn't read modification time of {name}"), e)
        })?;

        let content = if mode.wants_content() {
            let bytes = self.fs.read(&path).map_err(|e| {
                StoreError::server(format!("couldn't read content of {}", path.display()), e)
            })?;
            Some(bytes)
        } else {
            None
        };

        Ok(Some(StoredFile {
            name: name.to_string(),
            content,
            version,
        }))
    }

    /// Write a new file, or overwrite an existing one.
    ///
    /// An existing file is backed up first and restored if the write fails.
    pub fn create(&self, file: &StoredFile) -> StoreResult<()> {
        let content = match &file.content {
            Some(c) if !c.is_empty() => c,
            _ => {
                return Err(StoreError::client(
                    ErrorLabel::MissingContent,
                    "the file content doesn't exist",
                ))
            }
        };
        validate_name(&file.name)?;
        let path = self.path_of(&file.name)?;

        let _guard = self.locks.acquire(&[file.name.as_str()]);

        let backup = if self.fs.exists(&path) {
            debug!(file = %file.name, "file already exists, will overwrite");
            Some(self.take_backup(&path)?)
        } else {
            None
        };

        if let Err(e) = self.fs.write(&path, content) {
            error!(file = %path.display(), error = %e, "failed to create file");
            let message = format!("couldn't create file {}", file.name);
            return Err(match backup {
                Some(backup) => self.rollback(&backup, None, message, e),
                None => StoreError::server(message, e),
            });
        }

        if let Some(backup) = backup {
            self.backups.discard(&backup);
        }
        debug!(file = %file.name, bytes = content.len(), "created file");
        Ok(())
    }

    /// Rename a file and/or replace its content.
    ///
    /// The patch's version must equal the file's current modification time.
    /// The rename is attempted before the content write; on failure both are
    /// undone and the file is left under its original name with its original
    /// content.
    pub fn update(&self, name: &str, patch: &FilePatch) -> StoreResult<()> {
        if name.trim().is_empty() {
            return Err(StoreError::client(
                ErrorLabel::InvalidFilename,
                "the filename is empty",
            ));
        }
        if patch.is_empty() {
            return Err(StoreError::client(
                ErrorLabel::InvalidRequest,
                "the name or the content is mandatory",
            ));
        }
        let target = match patch.name.as_deref() {
            Some(new_name) => {
                validate_name(new_name)?;
                Some((new_name, self.path_of(new_name)?))
            }
            None => None,
        };
        let expected = patch.expected_version().ok_or_else(|| {
            StoreError::client(
                ErrorLabel::InvalidRequest,
                "the last modified version is mandatory",
            )
        })?;

        let current = self.path_of(name)?;

        let mut names = vec![name];
        if let Some((new_name, _)) = &target {
            names.push(*new_name);
        }
        let _guard = self.locks.acquire(&names);

        if !self.fs.exists(&current) {
            return Err(StoreError::client(
                ErrorLabel::MissingFile,
                format!("the file {name} doesn't exist"),
            ));
        }

        let actual = self.fs.modified(&current).map_err(|e| {
            StoreError::server(format!("couldn't read modification time of {name}"), e)
        })?;
        if actual != expected {
            return Err(StoreError::client(
                ErrorLabel::ConcurrencyConflict,
                format!("the file {name} was modified since last read"),
            ));
        }

        let backup = self.take_backup(&current)?;
        let mut destination = current.clone();

        if let Some((new_name, target)) = target {
            if self.fs.exists(&target) {
                self.backups.discard(&backup);
                return Err(StoreError::client(
                    ErrorLabel::FilenameConflict,
                    format!("the file {new_name} already exists"),
                ));
            }
            if let Err(e) = self.fs.rename(&current, &target) {
                error!(from = %current.display(), to = %target.display(), error = %e, "failed to rename file");
                let message = format!("couldn't rename file {name} to {new_name}");
                return Err(self.rollback(&backup, None, message, e));
            }
            debug!(from = %name, to = %new_name, "renamed file");
            destination = target;
        }

        if let Some(content) = &patch.content {
            if let Err(e) = self.fs.write(&destination, content) {
                error!(file = %destination.display(), error = %e, "failed to update content");
                let stray = (destination != current).then_some(destination.as_path());
                let message = format!("couldn't update content of file {name}");
                return Err(self.rollback(&backup, stray, message, e));
            }
            debug!(file = %destination.display(), bytes = content.len(), "replaced content");
        }

        self.backups.discard(&backup);
        Ok(())
    }

    /// Physically remove a file.
    pub fn delete(&self, name: &str) -> StoreResult<()> {
        let path = self.path_of(name)?;
        let _guard = self.locks.acquire(&[name]);

        if !self.fs.exists(&path) {
            return Err(StoreError::client(
                ErrorLabel::MissingFile,
                format!("the file {name} doesn't exist"),
            ));
        }

        self.fs.remove(&path).map_err(|e| {
            StoreError::server(format!("couldn't delete file: {}", path.display()), e)
        })?;
        info!(file = %name, "deleted file");
        Ok(())
    }

    /// Resolve `name` inside the store directory.
    ///
    /// Names must be a single path component; anything that could escape
    /// the store directory is an invalid filename.
    fn path_of(&self, name: &str) -> StoreResult<PathBuf> {
        if name.trim().is_empty() {
            return Err(StoreError::client(
                ErrorLabel::InvalidFilename,
                "the filename is empty",
            ));
        }
        if name.contains(['/', '\\', '\0']) || name == "." || name == ".." {
            return Err(StoreError::client(
                ErrorLabel::InvalidFilename,
                format!("the filename {name:?} is not a plain file name"),
            ));
        }
        Ok(self.store_dir.join(name))
    }

    fn take_backup(&self, path: &Path) -> StoreResult<Backup> {
        self.backups.take(path).map_err(|e| {
            error!(file = %path.display(), error = %e, "failed to back up file");
            StoreError::server(format!("couldn't backup file {}", path.display()), e)
        })
    }

    /// Undo a failed mutation and build the error reporting it.
    ///
    /// `stray` is a file the mutation left at a new path; it is removed only
    /// once the original has been restored.
    fn rollback(
        &self,
        backup: &Backup,
        stray: Option<&Path>,
        message: String,
        cause: FsError,
    ) -> StoreError {
        let mut problems = Vec::new();

        match self.backups.restore(backup) {
            Ok(()) => {
                if let Some(stray) = stray {
                    if let Err(e) = self.fs.remove(stray) {
                        error!(file = %stray.display(), error = %e, "failed to undo rename");
                        problems.push(format!("couldn't delete file: {}: {e}", stray.display()));
                    }
                }
            }
            Err(e) => {
                error!(backup = %backup.path.display(), error = %e, "failed to restore backup");
                problems.push(format!(
                    "couldn't restore backup file {}: {e}",
                    backup.path.display()
                ));
            }
        }

        if problems.is_empty() {
            StoreError::server(message, cause)
        } else {
            StoreError::server(
                format!("{message}; rollback incomplete: {}", problems.join("; ")),
                cause,
            )
        }
    }
}

fn validate_name(name: &str) -> StoreResult<()> {
    validate_file_name(name).map_err(|e| StoreError::client(ErrorLabel::InvalidFilename, e.to_string()))
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("store_dir", &self.store_dir)
            .field("backups", &self.backups)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobdir_fs::{FsOp, InMemoryFileSystem, LocalFileSystem};
    use blobdir_types::Version;

    const T: Version = 1_600_000_000_000;

    fn setup() -> (Arc<InMemoryFileSystem>, FileStore) {
        let fs = Arc::new(InMemoryFileSystem::with_dirs(&["/store", "/backup"]));
        let store = FileStore::new(fs.clone(), StoreConfig::new("/store", "/backup"));
        (fs, store)
    }

    fn at(name: &str) -> PathBuf {
        Path::new("/store").join(name)
    }

    fn backups(fs: &InMemoryFileSystem) -> Vec<String> {
        fs.file_names(Path::new("/backup"))
    }

    fn backup_copies(fs: &InMemoryFileSystem) -> usize {
        fs.calls_of(FsOp::Copy)
            .iter()
            .filter(|p| p.starts_with("/backup"))
            .count()
    }

    // -----------------------------------------------------------------------
    // get
    // -----------------------------------------------------------------------

    #[test]
    fn get_missing_returns_none() {
        let (_fs, store) = setup();
        assert!(store.get("nope.txt", ReadMode::WithContent).unwrap().is_none());
    }

    #[test]
    fn get_with_content() {
        let (fs, store) = setup();
        fs.insert_file(&at("a.txt"), b"hello", T);

        let file = store.get("a.txt", ReadMode::WithContent).unwrap().unwrap();
        assert_eq!(file.name, "a.txt");
        assert_eq!(file.content.as_deref(), Some(&b"hello"[..]));
        assert_eq!(file.version, T);
    }

    #[test]
    fn get_metadata_only_skips_read() {
        let (fs, store) = setup();
        fs.insert_file(&at("a.txt"), b"hello", T);

        let file = store.get("a.txt", ReadMode::MetadataOnly).unwrap().unwrap();
        assert!(file.content.is_none());
        assert_eq!(file.version, T);
        assert!(fs.calls_of(FsOp::Read).is_empty());
    }

    #[test]
    fn get_stat_failure_is_server_error() {
        let (fs, store) = setup();
        fs.insert_file(&at("a.txt"), b"hello", T);
        fs.fail_on(FsOp::Stat, at("a.txt"));

        let err = store.get("a.txt", ReadMode::MetadataOnly).unwrap_err();
        assert_eq!(err.label(), ErrorLabel::GeneralError);
    }

    #[test]
    fn get_rejects_path_traversal() {
        let (_fs, store) = setup();
        let err = store.get("../backup", ReadMode::WithContent).unwrap_err();
        assert_eq!(err.label(), ErrorLabel::InvalidFilename);
    }

    // -----------------------------------------------------------------------
    // delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_file() {
        let (fs, store) = setup();
        fs.insert_file(&at("toDelete"), b"x", T);

        store.delete("toDelete").unwrap();
        assert!(!fs.exists(&at("toDelete")));
        assert_eq!(fs.calls_of(FsOp::Remove), vec![at("toDelete")]);
    }

    #[test]
    fn delete_missing_file() {
        let (fs, store) = setup();
        let err = store.delete("missing").unwrap_err();
        assert_eq!(err.label(), ErrorLabel::MissingFile);
        assert!(fs.calls_of(FsOp::Remove).is_empty());
    }

    #[test]
    fn delete_failure_names_path() {
        let (fs, store) = setup();
        fs.insert_file(&at("toDelete"), b"x", T);
        fs.fail_on(FsOp::Remove, at("toDelete"));

        let err = store.delete("toDelete").unwrap_err();
        assert_eq!(err.label(), ErrorLabel::GeneralError);
        assert_eq!(err.message(), "couldn't delete file: /store/toDelete");
    }

    // -----------------------------------------------------------------------
    // create
    // -----------------------------------------------------------------------

    #[test]
    fn create_without_content() {
        let (fs, store) = setup();
        for file in [StoredFile::metadata("file.jpg", 0), StoredFile::new("file.jpg", Vec::new())] {
            let err = store.create(&file).unwrap_err();
            assert_eq!(err.label(), ErrorLabel::MissingContent);
        }
        assert!(fs.mutations().is_empty());
    }

    #[test]
    fn create_with_invalid_names() {
        let (fs, store) = setup();
        for name in ["".to_string(), "a".repeat(65), "!!".to_string()] {
            let err = store.create(&StoredFile::new(name, b"content".to_vec())).unwrap_err();
            assert_eq!(err.label(), ErrorLabel::InvalidFilename);
        }
        assert!(fs.mutations().is_empty());
    }

    #[test]
    fn create_new_file() {
        let (fs, store) = setup();
        store.create(&StoredFile::new("file.jpg", b"content".to_vec())).unwrap();

        assert_eq!(fs.contents(&at("file.jpg")).unwrap(), b"content");
        assert_eq!(fs.calls_of(FsOp::Write), vec![at("file.jpg")]);
        assert_eq!(backup_copies(&fs), 0);
        assert!(fs.calls_of(FsOp::Remove).is_empty());
    }

    #[test]
    fn create_with_maximum_length_and_extension() {
        let (fs, store) = setup();
        let name = format!("{}.jpg", "a".repeat(64));
        store.create(&StoredFile::new(name.clone(), b"content".to_vec())).unwrap();
        assert!(fs.exists(&at(&name)));
    }

    #[test]
    fn create_over_existing_file_backs_up_then_cleans() {
        let (fs, store) = setup();
        fs.insert_file(&at("file.jpg"), b"old", T);

        store.create(&StoredFile::new("file.jpg", b"new".to_vec())).unwrap();

        assert_eq!(fs.contents(&at("file.jpg")).unwrap(), b"new");
        assert_eq!(backup_copies(&fs), 1);
        assert!(backups(&fs).is_empty());
    }

    #[test]
    fn create_failure_without_backup() {
        let (fs, store) = setup();
        fs.fail_on(FsOp::Write, at("file.jpg"));

        let err = store.create(&StoredFile::new("file.jpg", b"content".to_vec())).unwrap_err();
        assert_eq!(err.label(), ErrorLabel::GeneralError);
        assert_eq!(err.message(), "couldn't create file file.jpg");
        assert_eq!(backup_copies(&fs), 0);
        assert!(!fs.exists(&at("file.jpg")));
    }

    #[test]
    fn create_failure_restores_existing_file() {
        let (fs, store) = setup();
        fs.insert_file(&at("file.jpg"), b"old", T);
        fs.fail_on(FsOp::Write, at("file.jpg"));

        let err = store.create(&StoredFile::new("file.jpg", b"new".to_vec())).unwrap_err();
        assert_eq!(err.label(), ErrorLabel::GeneralError);
        assert_eq!(fs.contents(&at("file.jpg")).unwrap(), b"old");
        assert_eq!(fs.modified(&at("file.jpg")).unwrap(), T);
        assert!(backups(&fs).is_empty());
    }

    #[test]
    fn create_rollback_failure_keeps_original_cause() {
        let (fs, store) = setup();
        fs.insert_file(&at("file.jpg"), b"old", T);
        fs.fail_on(FsOp::Write, at("file.jpg"));
        fs.fail_on(FsOp::Copy, at("file.jpg"));

        let err = store.create(&StoredFile::new("file.jpg", b"new".to_vec())).unwrap_err();
        assert!(err.message().starts_with("couldn't create file file.jpg"));
        assert!(err.message().contains("rollback incomplete"));
        match err {
            StoreError::Server { source: Some(cause), .. } => assert_eq!(cause.op(), FsOp::Write),
            other => panic!("unexpected error: {other:?}"),
        }
        // The backup survives for manual recovery.
        assert_eq!(backups(&fs).len(), 1);
    }

    #[test]
    fn create_backup_failure_leaves_file_untouched() {
        let (fs, store) = setup();
        fs.insert_file(&at("file.jpg"), b"old", T);
        fs.fail_under(FsOp::Copy, "/backup");

        let err = store.create(&StoredFile::new("file.jpg", b"new".to_vec())).unwrap_err();
        assert_eq!(err.label(), ErrorLabel::GeneralError);
        assert!(fs.calls_of(FsOp::Write).is_empty());
        assert_eq!(fs.contents(&at("file.jpg")).unwrap(), b"old");
    }

    #[test]
    fn create_backup_cleanup_failure_is_not_surfaced() {
        let (fs, store) = setup();
        fs.insert_file(&at("file.jpg"), b"old", T);
        fs.fail_under(FsOp::Remove, "/backup");

        store.create(&StoredFile::new("file.jpg", b"new".to_vec())).unwrap();
        assert_eq!(fs.contents(&at("file.jpg")).unwrap(), b"new");
    }

    // -----------------------------------------------------------------------
    // update: validation
    // -----------------------------------------------------------------------

    #[test]
    fn update_blank_name() {
        let (fs, store) = setup();
        let err = store.update("  ", &FilePatch::rename("x", T)).unwrap_err();
        assert_eq!(err.label(), ErrorLabel::InvalidFilename);
        assert!(fs.calls().is_empty());
    }

    #[test]
    fn update_without_name_or_content() {
        let (fs, store) = setup();
        let patch = FilePatch {
            version: Some(T),
            ..Default::default()
        };
        let err = store.update("fileName", &patch).unwrap_err();
        assert_eq!(err.label(), ErrorLabel::InvalidRequest);
        assert!(fs.calls().is_empty());
    }

    #[test]
    fn update_invalid_new_name() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"x", T);
        let err = store.update("fileName", &FilePatch::rename("!!", T)).unwrap_err();
        assert_eq!(err.label(), ErrorLabel::InvalidFilename);
        assert!(fs.mutations().is_empty());
    }

    #[test]
    fn update_new_name_with_path_separator_in_extension() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"x", T);
        let patch = FilePatch {
            name: Some("a.b/c".into()),
            content: None,
            version: Some(0),
        };
        let err = store.update("fileName", &patch).unwrap_err();
        assert_eq!(err.label(), ErrorLabel::InvalidFilename);
        assert!(fs.mutations().is_empty());
    }

    #[test]
    fn update_without_version() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"x", T);
        for version in [None, Some(0)] {
            let patch = FilePatch {
                name: Some("newFileName".into()),
                content: None,
                version,
            };
            let err = store.update("fileName", &patch).unwrap_err();
            assert_eq!(err.label(), ErrorLabel::InvalidRequest);
        }
        assert!(fs.mutations().is_empty());
    }

    #[test]
    fn update_missing_file() {
        let (fs, store) = setup();
        let err = store.update("fileName", &FilePatch::rename("newFileName", T)).unwrap_err();
        assert_eq!(err.label(), ErrorLabel::MissingFile);
        assert!(fs.mutations().is_empty());
    }

    #[test]
    fn update_with_stale_version() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"x", T);

        let err = store
            .update("fileName", &FilePatch::rename("newFileName", T + 1000))
            .unwrap_err();
        assert_eq!(err.label(), ErrorLabel::ConcurrencyConflict);
        assert!(fs.mutations().is_empty());
        assert!(fs.exists(&at("fileName")));
    }

    // -----------------------------------------------------------------------
    // update: rename
    // -----------------------------------------------------------------------

    #[test]
    fn update_rename() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"x", T);

        store.update("fileName", &FilePatch::rename("newFileName", T)).unwrap();

        assert!(!fs.exists(&at("fileName")));
        assert_eq!(fs.contents(&at("newFileName")).unwrap(), b"x");
        assert!(fs.calls_of(FsOp::Write).is_empty());
        assert_eq!(backup_copies(&fs), 1);
        assert!(backups(&fs).is_empty());
    }

    #[test]
    fn update_rename_onto_existing_file() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"x", T);
        fs.insert_file(&at("newFileName"), b"y", T);

        let err = store
            .update("fileName", &FilePatch::rename("newFileName", T))
            .unwrap_err();
        assert_eq!(err.label(), ErrorLabel::FilenameConflict);
        assert!(fs.calls_of(FsOp::Rename).is_empty());
        assert!(backups(&fs).is_empty());
        assert_eq!(fs.contents(&at("fileName")).unwrap(), b"x");
        assert_eq!(fs.contents(&at("newFileName")).unwrap(), b"y");
    }

    #[test]
    fn update_rename_failure_restores_original() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"x", T);
        fs.fail_on(FsOp::Rename, at("newFileName"));

        let err = store
            .update("fileName", &FilePatch::rename("newFileName", T))
            .unwrap_err();
        assert_eq!(err.label(), ErrorLabel::GeneralError);
        assert_eq!(err.message(), "couldn't rename file fileName to newFileName");
        assert_eq!(fs.contents(&at("fileName")).unwrap(), b"x");
        assert!(!fs.exists(&at("newFileName")));
        assert!(backups(&fs).is_empty());
    }

    // -----------------------------------------------------------------------
    // update: content
    // -----------------------------------------------------------------------

    #[test]
    fn update_content() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"before", T);

        store
            .update("fileName", &FilePatch::replace_content(b"after".to_vec(), T))
            .unwrap();

        assert_eq!(fs.contents(&at("fileName")).unwrap(), b"after");
        assert!(fs.modified(&at("fileName")).unwrap() != T);
        assert!(backups(&fs).is_empty());
    }

    #[test]
    fn update_content_failure_restores_backup() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"before", T);
        fs.fail_on(FsOp::Write, at("fileName"));

        let err = store
            .update("fileName", &FilePatch::replace_content(b"x".to_vec(), T))
            .unwrap_err();
        assert_eq!(err.label(), ErrorLabel::GeneralError);
        assert_eq!(err.message(), "couldn't update content of file fileName");
        assert_eq!(fs.contents(&at("fileName")).unwrap(), b"before");
        assert_eq!(fs.modified(&at("fileName")).unwrap(), T);
        assert!(backups(&fs).is_empty());
    }

    #[test]
    fn update_rename_and_content() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"before", T);

        let patch = FilePatch::rename("newFileName", T).with_content(b"after".to_vec());
        store.update("fileName", &patch).unwrap();

        assert!(!fs.exists(&at("fileName")));
        assert_eq!(fs.contents(&at("newFileName")).unwrap(), b"after");
        assert!(backups(&fs).is_empty());
    }

    #[test]
    fn content_failure_after_rename_reverts_name_and_content() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"before", T);
        fs.fail_on(FsOp::Write, at("newFileName"));

        let patch = FilePatch::rename("newFileName", T).with_content(b"after".to_vec());
        let err = store.update("fileName", &patch).unwrap_err();

        assert_eq!(err.label(), ErrorLabel::GeneralError);
        assert_eq!(fs.contents(&at("fileName")).unwrap(), b"before");
        assert_eq!(fs.modified(&at("fileName")).unwrap(), T);
        assert!(!fs.exists(&at("newFileName")));
        assert!(backups(&fs).is_empty());
    }

    #[test]
    fn update_backup_failure_mutates_nothing() {
        let (fs, store) = setup();
        fs.insert_file(&at("fileName"), b"before", T);
        fs.fail_under(FsOp::Copy, "/backup");

        let err = store
            .update("fileName", &FilePatch::rename("newFileName", T))
            .unwrap_err();
        assert_eq!(err.label(), ErrorLabel::GeneralError);
        assert!(fs.calls_of(FsOp::Rename).is_empty());
        assert!(fs.calls_of(FsOp::Write).is_empty());
    }

    // -----------------------------------------------------------------------
    // concurrency and real disk
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_creates_leave_no_backups() {
        let (fs, store) = setup();
        let store = Arc::new(store);
        fs.insert_file(&at("shared.bin"), b"seed", T);

        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .create(&StoredFile::new("shared.bin", vec![i; 16]))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert!(backups(&fs).is_empty());
        assert_eq!(fs.contents(&at("shared.bin")).unwrap().len(), 16);
    }

    #[test]
    fn lifecycle_on_local_disk() {
        let root = tempfile::tempdir().unwrap();
        let store_dir = root.path().join("store");
        let backup_dir = root.path().join("backup");
        std::fs::create_dir(&store_dir).unwrap();
        std::fs::create_dir(&backup_dir).unwrap();
        let store = FileStore::new(
            Arc::new(LocalFileSystem::new()),
            StoreConfig::new(&store_dir, &backup_dir),
        );

        store.create(&StoredFile::new("report.pdf", b"v1".to_vec())).unwrap();
        let meta = store.get("report.pdf", ReadMode::MetadataOnly).unwrap().unwrap();

        let patch = FilePatch::rename("summary.pdf", meta.version).with_content(b"v2".to_vec());
        store.update("report.pdf", &patch).unwrap();

        assert!(!store.exists("report.pdf").unwrap());
        let file = store.get("summary.pdf", ReadMode::WithContent).unwrap().unwrap();
        assert_eq!(file.content.as_deref(), Some(&b"v2"[..]));
        assert_eq!(std::fs::read_dir(&backup_dir).unwrap().count(), 0);

        store.delete("summary.pdf").unwrap();
        assert!(store.get("summary.pdf", ReadMode::WithContent).unwrap().is_none());
    }
}
