pub mod db;
mod files;
pub mod models;
mod tables;

pub use db::{Database, DatabaseError};
pub use models::{FilePatch, FileRecord, Permission, Query, Role};
pub use tables::*;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Document store holding one collection of file records.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn create(&self, record: &FileRecord) -> Result<FileRecord, MetadataError>;
    async fn get(&self, id: &str) -> Result<FileRecord, MetadataError>;
    async fn update(&self, id: &str, patch: &FilePatch) -> Result<FileRecord, MetadataError>;
    async fn delete(&self, id: &str) -> Result<(), MetadataError>;
    /// Documents matching every query, in store-defined order.
    async fn list(&self, queries: &[Query]) -> Result<Vec<FileRecord>, MetadataError>;
}

#[async_trait]
impl MetadataStore for Database {
    async fn create(&self, record: &FileRecord) -> Result<FileRecord, MetadataError> {
        self.put_file(record)?;
        Ok(record.clone())
    }

    async fn get(&self, id: &str) -> Result<FileRecord, MetadataError> {
        self.get_file(id)?
            .ok_or_else(|| MetadataError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, patch: &FilePatch) -> Result<FileRecord, MetadataError> {
        self.update_file(id, patch)?
            .ok_or_else(|| MetadataError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), MetadataError> {
        if self.delete_file(id)? {
            Ok(())
        } else {
            Err(MetadataError::NotFound(id.to_string()))
        }
    }

    async fn list(&self, queries: &[Query]) -> Result<Vec<FileRecord>, MetadataError> {
        Ok(self.list_files(queries)?)
    }
}
