//! Error types for the index crate.

use blobdir_fs::FsError;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The name pattern is not a valid regular expression.
    #[error("invalid name pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Enumerating the directory failed.
    #[error("directory scan failed: {0}")]
    Scan(#[from] FsError),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
