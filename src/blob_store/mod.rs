mod local;

pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blob not found: {0}")]
    NotFound(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

const OCTET_STREAM: &str = "application/octet-stream";

/// Ids every store accepts: up to 36 characters of `[A-Za-z0-9._-]`,
/// starting with a letter or digit. Such an id is always a single literal
/// URL path segment.
pub fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    id.len() <= 36
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Content handed to the blob store by a caller.
#[derive(Debug, Clone)]
pub struct BlobUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl BlobUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// MIME type from the declared content type, or guessed from the file
    /// name when the declared one is missing or generic.
    pub fn mime_type(&self) -> String {
        Some(self.content_type.trim())
            .filter(|ct| !ct.is_empty() && *ct != OCTET_STREAM)
            .map(|ct| ct.to_string())
            .or_else(|| {
                mime_guess::from_path(&self.file_name)
                    .first()
                    .map(|m| m.to_string())
            })
            .unwrap_or_else(|| OCTET_STREAM.to_string())
    }
}

/// Descriptor of a blob held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredBlob {
    #[serde(rename = "$id")]
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(rename = "sizeOriginal")]
    pub byte_size: u64,
}

/// Binary object storage for one bucket. Blob ids are opaque and only
/// meaningful through the metadata store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn create(&self, id: &str, upload: BlobUpload) -> Result<StoredBlob, BlobStoreError>;
    async fn get(&self, id: &str) -> Result<(StoredBlob, Bytes), BlobStoreError>;
    /// Deleting a missing blob is not an error.
    async fn delete(&self, id: &str) -> Result<(), BlobStoreError>;
    async fn exists(&self, id: &str) -> Result<bool, BlobStoreError>;

    /// URL of a rendered preview, with a width/height render hint.
    fn preview_url(&self, id: &str, width: u32, height: u32) -> String;
    fn download_url(&self, id: &str) -> String;
    fn view_url(&self, id: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_declared() {
        let upload = BlobUpload::new("report.bin", "application/pdf", Bytes::new());
        assert_eq!(upload.mime_type(), "application/pdf");
    }

    #[test]
    fn test_mime_type_guessed_from_name() {
        let upload = BlobUpload::new("photo.png", "", Bytes::new());
        assert_eq!(upload.mime_type(), "image/png");

        let upload = BlobUpload::new("report.pdf", OCTET_STREAM, Bytes::new());
        assert_eq!(upload.mime_type(), "application/pdf");
    }

    #[test]
    fn test_valid_ids() {
        assert!(is_valid_id("65f0c2a1b3"));
        assert!(is_valid_id("report.v2_final-1"));
        assert!(is_valid_id(&crate::facade::unique_id()));

        assert!(!is_valid_id(""));
        assert!(!is_valid_id(".."));
        assert!(!is_valid_id("../../account"));
        assert!(!is_valid_id("a/b"));
        assert!(!is_valid_id("_hidden"));
        assert!(!is_valid_id("a%2F"));
        assert!(!is_valid_id(&"a".repeat(37)));
    }

    #[test]
    fn test_mime_type_fallback() {
        let upload = BlobUpload::new("no-extension", "", Bytes::new());
        assert_eq!(upload.mime_type(), OCTET_STREAM);
    }
}
