use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::blob_store::{BlobStore, BlobStoreError};
use crate::AppState;

/// Serve blob content from the local blob store.
/// Route: GET /v1/storage/buckets/:bucket/files/:id/:action
///
/// `preview` serves the original content; the width/height hint is not applied.
pub async fn serve_blob(
    State(state): State<Arc<AppState>>,
    Path((bucket, id, action)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let store = state
        .local_blobs()
        .filter(|store| store.bucket() == bucket)
        .ok_or_else(|| ApiError::not_found("Bucket not found"))?;

    let disposition = match action.as_str() {
        "preview" | "view" => "inline",
        "download" => "attachment",
        _ => return Err(ApiError::not_found("Unknown file action")),
    };

    let (blob, data) = store.get(&id).await.map_err(|e| match e {
        BlobStoreError::NotFound(_) => ApiError::not_found("File content not found"),
        _ => ApiError::internal(format!("Failed to retrieve file: {e}")),
    })?;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        blob.mime_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        header::HeaderValue::from(blob.byte_size),
    );

    let filename = blob.name.replace('"', "");
    if let Ok(value) = format!("{disposition}; filename=\"{filename}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Blob ids are never reused, so content under one id never changes
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
