use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::{BlobStore, BlobStoreError, BlobUpload, StoredBlob};

/// Local filesystem blob store for development and testing.
///
/// Content lives at `<base>/<id>` with a JSON descriptor beside it. Derived
/// URLs point at this service's own blob routes under `public_url`.
pub struct LocalStore {
    base_path: PathBuf,
    public_url: String,
    bucket: String,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(
        base_path: P,
        public_url: &str,
        bucket: &str,
    ) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            public_url: public_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.base_path.join(id)
    }

    fn descriptor_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{id}.json"))
    }

    fn file_url(&self, id: &str, action: &str) -> String {
        format!(
            "{}/v1/storage/buckets/{}/files/{}/{}",
            self.public_url, self.bucket, id, action
        )
    }
}

/// Ids become file names, so anything that could escape the base directory
/// is rejected.
fn check_id(id: &str) -> Result<(), BlobStoreError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(BlobStoreError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn create(&self, id: &str, upload: BlobUpload) -> Result<StoredBlob, BlobStoreError> {
        check_id(id)?;
        let blob = StoredBlob {
            id: id.to_string(),
            mime_type: upload.mime_type(),
            name: upload.file_name,
            byte_size: upload.data.len() as u64,
        };

        tokio::fs::write(self.blob_path(id), &upload.data).await?;
        let descriptor = serde_json::to_vec(&blob)
            .map_err(|e| BlobStoreError::Backend(format!("Failed to encode descriptor: {e}")))?;
        tokio::fs::write(self.descriptor_path(id), descriptor).await?;

        Ok(blob)
    }

    async fn get(&self, id: &str) -> Result<(StoredBlob, Bytes), BlobStoreError> {
        check_id(id)?;
        let path = self.blob_path(id);
        if !path.exists() {
            return Err(BlobStoreError::NotFound(id.to_string()));
        }

        let descriptor = tokio::fs::read(self.descriptor_path(id)).await?;
        let blob: StoredBlob = serde_json::from_slice(&descriptor)
            .map_err(|e| BlobStoreError::Backend(format!("Corrupt descriptor for {id}: {e}")))?;
        let data = tokio::fs::read(&path).await?;
        Ok((blob, Bytes::from(data)))
    }

    async fn delete(&self, id: &str) -> Result<(), BlobStoreError> {
        check_id(id)?;
        for path in [self.blob_path(id), self.descriptor_path(id)] {
            if path.exists() {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool, BlobStoreError> {
        if check_id(id).is_err() {
            return Ok(false);
        }
        Ok(self.blob_path(id).exists())
    }

    fn preview_url(&self, id: &str, width: u32, height: u32) -> String {
        format!(
            "{}?width={}&height={}",
            self.file_url(id, "preview"),
            width,
            height
        )
    }

    fn download_url(&self, id: &str) -> String {
        self.file_url(id, "download")
    }

    fn view_url(&self, id: &str) -> String {
        self.file_url(id, "view")
    }
}
