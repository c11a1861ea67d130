use axum::extract::DefaultBodyLimit;
use axum::routing::{get, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Prefix under which the file routes are mounted.
pub const FILES_PREFIX: &str = "/file-service/v1/files";

/// Build the axum router with all blobdir endpoints.
pub fn build_router(state: AppState) -> Router {
    let limit = state.max_upload_bytes;
    let files = Router::new()
        .route("/", get(handler::list_files).head(handler::count_files).put(handler::create_file))
        .route("/upload", put(handler::upload_file))
        .route(
            "/:name",
            get(handler::get_file)
                .head(handler::file_metadata)
                .post(handler::update_file)
                .delete(handler::delete_file),
        )
        .route("/:name/download", get(handler::download_file));

    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .nest(FILES_PREFIX, files)
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
