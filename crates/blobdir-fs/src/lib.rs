//! Filesystem access for blobdir.
//!
//! The store and the change notifier never touch `std::fs` directly; they
//! depend on the [`FileSystem`] capability so that the backend can be swapped
//! and failures can be injected in tests.
//!
//! # Backends
//!
//! - [`LocalFileSystem`] -- the real disk, via `std::fs` and `walkdir`
//! - [`InMemoryFileSystem`] -- `BTreeMap`-based tree with an operation
//!   journal and fault injection, for tests and embedding
//!
//! # Design Rules
//!
//! 1. Every primitive is a single, blocking operation; no primitive retries.
//! 2. Every error names the operation and the path it was applied to.
//! 3. `copy_with_attributes` preserves the modification time, so a restored
//!    file keeps its version.

pub mod error;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{FsError, FsOp, FsResult};
pub use local::LocalFileSystem;
pub use memory::{FsCall, InMemoryFileSystem};
pub use traits::{DirEntryInfo, FileSystem};
