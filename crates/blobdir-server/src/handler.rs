//! Request handlers for the file routes.
//!
//! The store is synchronous, so every store call is moved onto the blocking
//! pool. Listing and counting are answered from the directory index.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use blobdir_index::{DirectoryIndex, NamePattern};
use blobdir_store::{FileStore, StoreResult};
use blobdir_types::{FilePatch, ReadMode, StoredFile};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const X_LAST_MODIFIED: HeaderName = HeaderName::from_static("x-last-modified");
pub const X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

/// Name of the multipart field carrying an uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FileStore>,
    pub index: Arc<DirectoryIndex>,
    /// Upper bound on request bodies, uploads included.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(store: Arc<FileStore>, index: Arc<DirectoryIndex>) -> Self {
        Self {
            store,
            index,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }

    pub fn with_upload_limit(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

async fn blocking<T, F>(store: &Arc<FileStore>, f: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&FileStore) -> StoreResult<T> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| ServerError::Internal(format!("store task failed: {e}")))?
        .map_err(ServerError::from)
}

async fn fetch(state: &AppState, name: String, mode: ReadMode) -> ServerResult<StoredFile> {
    let lookup = name.clone();
    blocking(&state.store, move |store| store.get(&lookup, mode))
        .await?
        .ok_or(ServerError::NotFound(name))
}

fn header_value(value: impl ToString) -> ServerResult<HeaderValue> {
    HeaderValue::from_str(&value.to_string()).map_err(|e| ServerError::Internal(e.to_string()))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness check.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /{name}`: the file with its content as JSON.
pub async fn get_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<Json<StoredFile>> {
    Ok(Json(fetch(&state, name, ReadMode::WithContent).await?))
}

/// `GET /{name}/download`: the raw bytes as an attachment.
pub async fn download_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<Response> {
    let file = fetch(&state, name, ReadMode::WithContent).await?;
    let disposition = header_value(format!("attachment; filename=\"{}\"", file.name))?;
    let headers = [
        (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
        (CONTENT_DISPOSITION, disposition),
    ];
    Ok((headers, file.content.unwrap_or_default()).into_response())
}

/// `HEAD /{name}`: the version, without reading content.
pub async fn file_metadata(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<Response> {
    let file = fetch(&state, name, ReadMode::MetadataOnly).await?;
    Ok(([(X_LAST_MODIFIED, header_value(file.version)?)], StatusCode::OK).into_response())
}

/// `POST /{name}`: rename and/or replace content.
pub async fn update_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(patch): Json<FilePatch>,
) -> ServerResult<StatusCode> {
    blocking(&state.store, move |store| store.update(&name, &patch)).await?;
    Ok(StatusCode::ACCEPTED)
}

/// `PUT /`: create or overwrite from JSON.
pub async fn create_file(
    State(state): State<AppState>,
    Json(file): Json<StoredFile>,
) -> ServerResult<StatusCode> {
    blocking(&state.store, move |store| store.create(&file)).await?;
    Ok(StatusCode::CREATED)
}

/// `PUT /upload`: create or overwrite from a multipart form.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ServerResult<StatusCode> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        upload = Some(StoredFile::new(name, bytes.to_vec()));
        break;
    }

    let file = upload
        .ok_or_else(|| ServerError::BadRequest(format!("missing multipart field {UPLOAD_FIELD:?}")))?;
    blocking(&state.store, move |store| store.create(&file)).await?;
    Ok(StatusCode::CREATED)
}

/// `DELETE /{name}`
pub async fn delete_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ServerResult<StatusCode> {
    blocking(&state.store, move |store| store.delete(&name)).await?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub regex: Option<String>,
}

/// `GET /?regex=…`: indexed names fully matching the pattern.
///
/// Without a pattern every name matches. An empty result is a 404 with a
/// count of zero.
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ServerResult<Response> {
    let pattern = NamePattern::new(query.regex.as_deref().unwrap_or(".*"))?;
    let names = state.index.list_names_matching(&pattern);

    let mut headers = HeaderMap::new();
    headers.insert(X_TOTAL_COUNT, header_value(names.len())?);
    if names.is_empty() {
        return Ok((StatusCode::NOT_FOUND, headers).into_response());
    }
    Ok((headers, Json(names)).into_response())
}

/// `HEAD /`: the indexed file count.
pub async fn count_files(State(state): State<AppState>) -> ServerResult<Response> {
    Ok(([(X_TOTAL_COUNT, header_value(state.index.count())?)], StatusCode::OK).into_response())
}
