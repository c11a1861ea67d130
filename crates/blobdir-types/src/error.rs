use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine readable label attached to every failure crossing the store
/// boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorLabel {
    /// Any server-side failure (I/O during write, backup, restore, rename, stat).
    GeneralError,
    /// Create was called without content, or with empty content.
    MissingContent,
    /// The name (ignoring its extension) does not match the identifier rule.
    InvalidFilename,
    /// The named file does not exist.
    MissingFile,
    /// The request is structurally incomplete.
    InvalidRequest,
    /// The supplied version no longer matches the file on disk.
    ConcurrencyConflict,
    /// A rename target already exists.
    FilenameConflict,
}

impl ErrorLabel {
    /// The wire form of the label, e.g. `MISSING_FILE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralError => "GENERAL_ERROR",
            Self::MissingContent => "MISSING_CONTENT",
            Self::InvalidFilename => "INVALID_FILENAME",
            Self::MissingFile => "MISSING_FILE",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::FilenameConflict => "FILENAME_CONFLICT",
        }
    }
}

impl fmt::Display for ErrorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid filename {name:?}: {reason}")]
    InvalidFileName { name: String, reason: String },
}
