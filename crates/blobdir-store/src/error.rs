use blobdir_fs::FsError;
use blobdir_types::ErrorLabel;

/// Errors returned by the file store.
///
/// Raw filesystem errors never cross the store boundary on their own; every
/// failure is either a client error (the request is invalid or stale) or a
/// server error (an I/O step failed), and both carry an [`ErrorLabel`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The caller's request is invalid or stale.
    #[error("{label}: {message}")]
    Client { label: ErrorLabel, message: String },

    /// A filesystem step failed.
    #[error("{message}")]
    Server {
        message: String,
        #[source]
        source: Option<FsError>,
    },
}

impl StoreError {
    pub(crate) fn client(label: ErrorLabel, message: impl Into<String>) -> Self {
        Self::Client {
            label,
            message: message.into(),
        }
    }

    pub(crate) fn server(message: impl Into<String>, source: FsError) -> Self {
        Self::Server {
            message: message.into(),
            source: Some(source),
        }
    }

    /// The machine readable label.
    pub fn label(&self) -> ErrorLabel {
        match self {
            Self::Client { label, .. } => *label,
            Self::Server { .. } => ErrorLabel::GeneralError,
        }
    }

    /// Returns `true` for errors caused by the request rather than the server.
    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client { .. })
    }

    /// Human readable description without the label prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Client { message, .. } | Self::Server { message, .. } => message,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
