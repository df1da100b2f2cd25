use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, State};
use axum::response::Redirect;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, AppQuery, CallerToken, JSend};
use crate::blob_store::BlobUpload;
use crate::metadata::FileRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub created_at: String,
    pub email: String,
    pub file: String,
    pub folder_id: Option<String>,
    pub id: String,
    pub mime_type: String,
    pub name: String,
    pub preview_url: String,
    pub starred: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListFilesParams {
    #[serde(default)]
    pub folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameFileRequest {
    pub name: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_file(
    State(state): State<Arc<AppState>>,
    CallerToken(token): CallerToken,
    mut multipart: Multipart,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let mut upload: Option<BlobUpload> = None;
    let mut email: Option<String> = None;
    let mut name: Option<String> = None;
    let mut folder_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => upload = Some(read_upload(field, state.config.max_upload_size).await?),
            "email" => email = Some(read_text(field, "email").await?),
            "name" => name = Some(read_text(field, "name").await?),
            "folder_id" => folder_id = Some(read_text(field, "folder_id").await?),
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let upload = upload.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let email = email.ok_or_else(|| ApiError::bad_request("email field is required"))?;
    let name = name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| upload.file_name.clone());

    let record = state
        .facade(token.as_deref())
        .add_new_file(upload, &name, &email, folder_id.as_deref())
        .await?;

    Ok(JSend::success(file_to_response(&record)))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    CallerToken(token): CallerToken,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<JSend<Vec<FileResponse>>>, ApiError> {
    let files = state
        .facade(token.as_deref())
        .get_all_data(params.folder_id.as_deref())
        .await?;

    Ok(JSend::success(files.iter().map(file_to_response).collect()))
}

pub async fn list_starred_files(
    State(state): State<Arc<AppState>>,
    CallerToken(token): CallerToken,
) -> Result<Json<JSend<Vec<FileResponse>>>, ApiError> {
    let files = state
        .facade(token.as_deref())
        .get_all_starred_files()
        .await?;

    Ok(JSend::success(files.iter().map(file_to_response).collect()))
}

pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    CallerToken(token): CallerToken,
    Path(id): Path<String>,
    AppJson(req): AppJson<RenameFileRequest>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    let record = state
        .facade(token.as_deref())
        .update_file_name(&id, &req.name)
        .await?;

    Ok(JSend::success(file_to_response(&record)))
}

pub async fn replace_file(
    State(state): State<Arc<AppState>>,
    CallerToken(token): CallerToken,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let mut upload: Option<BlobUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        if field.name() == Some("file") {
            upload = Some(read_upload(field, state.config.max_upload_size).await?);
        }
    }

    let upload = upload.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let record = state
        .facade(token.as_deref())
        .update_file(&id, upload)
        .await?;

    Ok(JSend::success(file_to_response(&record)))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    CallerToken(token): CallerToken,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    state.facade(token.as_deref()).delete_file(&id).await?;
    Ok(JSend::success(()))
}

pub async fn star_file(
    State(state): State<Arc<AppState>>,
    CallerToken(token): CallerToken,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let record = state.facade(token.as_deref()).star_file(&id).await?;
    Ok(JSend::success(file_to_response(&record)))
}

pub async fn unstar_file(
    State(state): State<Arc<AppState>>,
    CallerToken(token): CallerToken,
    Path(id): Path<String>,
) -> Result<Json<JSend<FileResponse>>, ApiError> {
    let record = state.facade(token.as_deref()).unstar_file(&id).await?;
    Ok(JSend::success(file_to_response(&record)))
}

/// Send the client on to the blob's download URL.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    CallerToken(token): CallerToken,
    Path(id): Path<String>,
) -> Result<Redirect, ApiError> {
    let url = state.facade(token.as_deref()).download_file(&id).await?;
    Ok(Redirect::to(&url))
}

/// Send the client on to a blob's view URL.
pub async fn view_blob(
    State(state): State<Arc<AppState>>,
    CallerToken(token): CallerToken,
    Path(blob_id): Path<String>,
) -> Result<Redirect, ApiError> {
    let url = state.facade(token.as_deref()).get_file_view(&blob_id).await?;
    Ok(Redirect::to(&url))
}

// ============================================================================
// Helpers
// ============================================================================

async fn read_upload(field: Field<'_>, max_upload_size: u64) -> Result<BlobUpload, ApiError> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field.content_type().unwrap_or("").to_string();

    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

    if data.len() as u64 > max_upload_size {
        return Err(ApiError::payload_too_large(format!(
            "File exceeds maximum upload size of {max_upload_size} bytes"
        )));
    }

    Ok(BlobUpload::new(file_name, content_type, data))
}

async fn read_text(field: Field<'_>, label: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid {label}: {e}")))
}

fn file_to_response(file: &FileRecord) -> FileResponse {
    FileResponse {
        created_at: file.created_at.to_rfc3339(),
        email: file.email.clone(),
        file: file.file.clone(),
        folder_id: file.folder_id.clone(),
        id: file.id.clone(),
        mime_type: file.mime_type.clone(),
        name: file.name.clone(),
        preview_url: file.preview_url.clone(),
        starred: file.starred,
    }
}
