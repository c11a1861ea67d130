//! HTTP server for blobdir.
//!
//! Exposes the transactional file store and the directory index under
//! `/file-service/v1/files`. Store errors are answered with their label as
//! the body: `400` for invalid requests, `404` for missing files, `409` for
//! version and name conflicts, and `500 GENERAL_ERROR` for I/O failures.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use router::{build_router, FILES_PREFIX};
pub use server::BlobdirServer;
