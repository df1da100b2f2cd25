use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Multipart framing needs some headroom over the file itself
    let upload_limit = state.config.max_upload_size as usize + 64 * 1024;

    let mut router = Router::new()
        // Files
        .route("/files", get(handlers::list_files))
        .route(
            "/files",
            post(handlers::create_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/starred", get(handlers::list_starred_files))
        .route("/files/:id", delete(handlers::delete_file))
        .route("/files/:id/name", put(handlers::rename_file))
        .route(
            "/files/:id/content",
            put(handlers::replace_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/:id/star", put(handlers::star_file))
        .route("/files/:id/star", delete(handlers::unstar_file))
        .route("/files/:id/download", get(handlers::download_file))
        .route("/blobs/:blob_id/view", get(handlers::view_blob))
        // Internal
        .route("/_internal/health", get(handlers::health));

    // The local backend hands out URLs pointing back at this node
    if state.local_blobs().is_some() {
        router = router.route(
            "/v1/storage/buckets/:bucket/files/:id/:action",
            get(handlers::serve_blob),
        );
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
