//! Transactional file store for blobdir.
//!
//! [`FileStore`] implements create/read/update/delete of named files on top
//! of a [`blobdir_fs::FileSystem`], giving callers all-or-nothing semantics
//! even though the filesystem only guarantees single-operation atomicity.
//!
//! # Design Rules
//!
//! 1. Validation precedes mutation: an invalid request never touches disk.
//! 2. Backup-then-mutate: a file is copied aside before it is changed.
//! 3. Rollback restores the pre-operation name, content, and version.
//! 4. Updates are guarded by the file's modification time (optimistic lock).
//! 5. Mutations on the same name are serialized; different names proceed in
//!    parallel.
//! 6. Backup cleanup after success is best-effort and only logged.

pub mod backup;
pub mod config;
pub mod error;
pub mod locks;
pub mod store;

pub use backup::{Backup, BackupArea};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use locks::{NameGuard, NameLocks};
pub use store::FileStore;
