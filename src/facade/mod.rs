//! The file record facade: the only entry point for reading or mutating
//! file state.
//!
//! Every operation checks the caller's session, talks to the blob store and
//! the metadata store in a fixed order, reports its outcome on the
//! notification channel and returns a typed result. Blob writes always land
//! before the metadata write that references them.

pub mod notify;
pub mod session;

pub use notify::{Level, Notification, Notifier, TracingNotifier};
pub use session::{Session, SessionError, SessionProvider, StaticSession};

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::blob_store::{is_valid_id, BlobStore, BlobStoreError, BlobUpload};
use crate::metadata::models::attr;
use crate::metadata::{
    FilePatch, FileRecord, MetadataError, MetadataStore, Permission, Query, Role,
};

#[derive(Debug, Error)]
pub enum FacadeError {
    #[error("User is not authenticated")]
    AuthRequired,
    #[error("Not permitted: {0}")]
    Forbidden(String),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Blob(#[from] BlobStoreError),
    #[error(transparent)]
    Metadata(MetadataError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<MetadataError> for FacadeError {
    fn from(e: MetadataError) -> Self {
        match e {
            MetadataError::NotFound(id) => FacadeError::NotFound(id),
            other => FacadeError::Metadata(other),
        }
    }
}

impl FacadeError {
    /// True when a blob store, metadata store or session lookup call failed.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            FacadeError::Blob(_) | FacadeError::Metadata(_) | FacadeError::Session(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    List,
    Delete,
    Rename,
    Replace,
    Download,
    View,
    Star,
    Unstar,
    ListStarred,
}

impl Operation {
    fn success_message(self) -> Option<&'static str> {
        match self {
            Operation::Upload => Some("File uploaded successfully"),
            Operation::Delete => Some("File deleted successfully"),
            Operation::Rename => Some("File name updated successfully"),
            Operation::Replace => Some("File updated successfully"),
            Operation::Star => Some("File starred successfully"),
            Operation::Unstar => Some("File unstarred successfully"),
            Operation::List | Operation::Download | Operation::View | Operation::ListStarred => {
                None
            }
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Operation::Upload => "Failed to upload file",
            Operation::List => "Failed to retrieve data",
            Operation::Delete => "Failed to delete file",
            Operation::Rename => "Failed to update file name",
            Operation::Replace => "Failed to update file",
            Operation::Download => "Failed to download file",
            Operation::View => "Failed to open file",
            Operation::Star => "Failed to star file",
            Operation::Unstar => "Failed to unstar file",
            Operation::ListStarred => "Failed to get starred files",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FacadeConfig {
    pub preview_width: u32,
    pub preview_height: u32,
    /// When true, view URLs are handed out without a session check.
    pub public_view_links: bool,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            preview_width: 400,
            preview_height: 400,
            public_view_links: true,
        }
    }
}

/// A fresh identifier usable as a document or blob id.
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Clone)]
pub struct FileRecords {
    session: Arc<dyn SessionProvider>,
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    notifier: Arc<dyn Notifier>,
    config: FacadeConfig,
}

impl FileRecords {
    pub fn new(
        session: Arc<dyn SessionProvider>,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        notifier: Arc<dyn Notifier>,
        config: FacadeConfig,
    ) -> Self {
        Self {
            session,
            blobs,
            metadata,
            notifier,
            config,
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Store `upload` as a new blob and create the record pointing at it.
    /// `folder_id` of `None` or `""` files the record at the root.
    pub async fn add_new_file(
        &self,
        upload: BlobUpload,
        name: &str,
        owner_email: &str,
        folder_id: Option<&str>,
    ) -> Result<FileRecord, FacadeError> {
        let result = self
            .create_record(upload, name, owner_email, folder_id)
            .await;
        self.report(Operation::Upload, result)
    }

    /// All of the caller's records, optionally narrowed to one folder.
    pub async fn get_all_data(
        &self,
        folder_id: Option<&str>,
    ) -> Result<Vec<FileRecord>, FacadeError> {
        let result = async {
            let session = self.require_session().await?;
            let mut queries = vec![Query::equal(attr::EMAIL, session.email.as_str())];
            // An empty folder id is the root, as on upload
            if let Some(folder_id) = folder_id.filter(|f| !f.is_empty()) {
                queries.push(Query::equal(attr::FOLDER_ID, folder_id));
            }
            Ok::<_, FacadeError>(self.metadata.list(&queries).await?)
        }
        .await;
        self.report(Operation::List, result)
    }

    /// Remove the record, then its blob. A failed blob delete is logged only.
    pub async fn delete_file(&self, id: &str) -> Result<(), FacadeError> {
        let result = async {
            let session = self.require_session().await?;
            let record = self.owned_record(&session, id).await?;
            self.metadata.delete(id).await?;
            self.discard_blob(&record.file).await;
            tracing::debug!(file_id = %id, blob_id = %record.file, "Deleted file");
            Ok::<_, FacadeError>(())
        }
        .await;
        self.report(Operation::Delete, result)
    }

    pub async fn update_file_name(&self, id: &str, name: &str) -> Result<FileRecord, FacadeError> {
        let result = async {
            let session = self.require_session().await?;
            self.owned_record(&session, id).await?;
            Ok::<_, FacadeError>(self.metadata.update(id, &FilePatch::rename(name)).await?)
        }
        .await;
        self.report(Operation::Rename, result)
    }

    /// Replace the record's content with `upload`. Name, folder and star are
    /// left as they were.
    pub async fn update_file(
        &self,
        id: &str,
        upload: BlobUpload,
    ) -> Result<FileRecord, FacadeError> {
        let result = self.replace_blob(id, upload).await;
        self.report(Operation::Replace, result)
    }

    /// Download URL for the record's blob.
    pub async fn download_file(&self, id: &str) -> Result<String, FacadeError> {
        let result = async {
            let session = self.require_session().await?;
            let record = self.owned_record(&session, id).await?;
            Ok::<_, FacadeError>(self.blobs.download_url(&record.file))
        }
        .await;
        self.report(Operation::Download, result)
    }

    /// View URL for a blob id. No record lookup happens here.
    pub async fn get_file_view(&self, blob_id: &str) -> Result<String, FacadeError> {
        let result = async {
            if !self.config.public_view_links {
                self.require_session().await?;
            }
            if !is_valid_id(blob_id) {
                return Err(FacadeError::NotFound(blob_id.to_string()));
            }
            Ok::<_, FacadeError>(self.blobs.view_url(blob_id))
        }
        .await;
        self.report(Operation::View, result)
    }

    pub async fn star_file(&self, id: &str) -> Result<FileRecord, FacadeError> {
        let result = self.set_starred(id, true).await;
        self.report(Operation::Star, result)
    }

    pub async fn unstar_file(&self, id: &str) -> Result<FileRecord, FacadeError> {
        let result = self.set_starred(id, false).await;
        self.report(Operation::Unstar, result)
    }

    pub async fn get_all_starred_files(&self) -> Result<Vec<FileRecord>, FacadeError> {
        let result = async {
            let session = self.require_session().await?;
            let queries = [
                Query::equal(attr::STARRED, true),
                Query::equal(attr::EMAIL, session.email.as_str()),
            ];
            Ok::<_, FacadeError>(self.metadata.list(&queries).await?)
        }
        .await;
        self.report(Operation::ListStarred, result)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn create_record(
        &self,
        upload: BlobUpload,
        name: &str,
        owner_email: &str,
        folder_id: Option<&str>,
    ) -> Result<FileRecord, FacadeError> {
        let session = self.require_session().await?;
        if session.email != owner_email {
            return Err(FacadeError::Forbidden(format!(
                "cannot create files for {owner_email}"
            )));
        }

        let blob = self.blobs.create(&unique_id(), upload).await?;
        let preview_url = self.preview_url(&blob.id);

        let record = FileRecord {
            id: unique_id(),
            file: blob.id.clone(),
            name: name.to_string(),
            mime_type: blob.mime_type,
            created_at: Utc::now(),
            email: owner_email.to_string(),
            preview_url,
            folder_id: folder_id.filter(|f| !f.is_empty()).map(str::to_string),
            starred: false,
            permissions: vec![Permission::write(Role::Any)],
        };

        match self.metadata.create(&record).await {
            Ok(created) => {
                tracing::debug!(file_id = %created.id, blob_id = %blob.id, "Created file");
                Ok(created)
            }
            Err(e) => {
                self.discard_blob(&blob.id).await;
                Err(e.into())
            }
        }
    }

    async fn replace_blob(&self, id: &str, upload: BlobUpload) -> Result<FileRecord, FacadeError> {
        let session = self.require_session().await?;
        let existing = self.owned_record(&session, id).await?;

        let blob = self.blobs.create(&unique_id(), upload).await?;
        let patch = FilePatch::replace_blob(
            blob.id.as_str(),
            blob.mime_type.as_str(),
            self.preview_url(&blob.id),
        );

        match self.metadata.update(id, &patch).await {
            Ok(updated) => {
                self.discard_blob(&existing.file).await;
                tracing::debug!(file_id = %id, blob_id = %blob.id, "Replaced file content");
                Ok(updated)
            }
            Err(e) => {
                self.discard_blob(&blob.id).await;
                Err(e.into())
            }
        }
    }

    async fn set_starred(&self, id: &str, starred: bool) -> Result<FileRecord, FacadeError> {
        let session = self.require_session().await?;
        self.owned_record(&session, id).await?;
        Ok(self.metadata.update(id, &FilePatch::starred(starred)).await?)
    }

    async fn require_session(&self) -> Result<Session, FacadeError> {
        self.session.current().await?.ok_or(FacadeError::AuthRequired)
    }

    async fn owned_record(&self, session: &Session, id: &str) -> Result<FileRecord, FacadeError> {
        let record = self.metadata.get(id).await?;
        if !record.is_owned_by(&session.email) {
            return Err(FacadeError::Forbidden(format!(
                "file {id} belongs to another user"
            )));
        }
        Ok(record)
    }

    fn preview_url(&self, blob_id: &str) -> String {
        self.blobs
            .preview_url(blob_id, self.config.preview_width, self.config.preview_height)
    }

    async fn discard_blob(&self, blob_id: &str) {
        if let Err(e) = self.blobs.delete(blob_id).await {
            tracing::warn!(blob_id = %blob_id, error = %e, "Failed to delete blob from blob store");
        }
    }

    fn report<T>(
        &self,
        operation: Operation,
        result: Result<T, FacadeError>,
    ) -> Result<T, FacadeError> {
        match &result {
            Ok(_) => {
                if let Some(message) = operation.success_message() {
                    self.notifier.notify(&Notification::success(message));
                }
            }
            Err(e) => {
                tracing::warn!(operation = ?operation, error = %e, "File operation failed");
                let message = match e {
                    FacadeError::AuthRequired => "User is not authenticated",
                    _ => operation.failure_message(),
                };
                self.notifier.notify(&Notification::failure(message));
            }
        }
        result
    }
}
