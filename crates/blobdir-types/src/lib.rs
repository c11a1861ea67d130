//! Foundation types for blobdir.
//!
//! blobdir exposes named binary blobs ("files") kept as plain entries in a
//! single directory. This crate holds the value types shared by every other
//! blobdir crate.
//!
//! # Key Types
//!
//! - [`StoredFile`] — A named byte payload with its modification version
//! - [`FilePatch`] — Rename and/or content replacement guarded by a version
//! - [`ReadMode`] — Whether a read returns content or metadata only
//! - [`Version`] — Millisecond modification time, the optimistic-lock token
//! - [`ErrorLabel`] — Machine readable failure label exposed to callers

pub mod error;
pub mod file;
pub mod name;

pub use error::{ErrorLabel, TypeError};
pub use file::{FilePatch, ReadMode, StoredFile, Version};
pub use name::{file_stem, validate_file_name, MAX_STEM_LEN};
