use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use blobdir_index::IndexError;
use blobdir_store::StoreError;
use blobdir_types::ErrorLabel;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Label written as the response body.
    pub fn label(&self) -> ErrorLabel {
        match self {
            Self::Store(e) => e.label(),
            Self::Index(IndexError::InvalidPattern { .. }) | Self::BadRequest(_) => {
                ErrorLabel::InvalidRequest
            }
            Self::NotFound(_) => ErrorLabel::MissingFile,
            Self::Index(IndexError::Scan(_)) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                ErrorLabel::GeneralError
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.label() {
            ErrorLabel::GeneralError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorLabel::MissingFile => StatusCode::NOT_FOUND,
            ErrorLabel::ConcurrencyConflict | ErrorLabel::FilenameConflict => StatusCode::CONFLICT,
            ErrorLabel::MissingContent | ErrorLabel::InvalidFilename | ErrorLabel::InvalidRequest => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(error = %self, %status, "request rejected");
        }
        (status, self.label().as_str()).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
