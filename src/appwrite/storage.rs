use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Method;

use super::{check_id, send, AppwriteClient, CallError};
use crate::blob_store::{BlobStore, BlobStoreError, BlobUpload, StoredBlob};

fn blob_error(id: &str, e: CallError) -> BlobStoreError {
    if e.is_not_found() {
        BlobStoreError::NotFound(id.to_string())
    } else {
        BlobStoreError::Backend(e.to_string())
    }
}

#[async_trait]
impl BlobStore for AppwriteClient {
    async fn create(&self, id: &str, upload: BlobUpload) -> Result<StoredBlob, BlobStoreError> {
        check_id(id).map_err(|e| BlobStoreError::Backend(e.to_string()))?;
        let mime_type = upload.mime_type();
        let part = Part::bytes(upload.data.to_vec())
            .file_name(upload.file_name)
            .mime_str(&mime_type)
            .map_err(|e| BlobStoreError::Backend(format!("Invalid MIME type: {e}")))?;
        let form = Form::new().text("fileId", id.to_string()).part("file", part);

        let resp = send(self.request(Method::POST, &self.files_path()).multipart(form))
            .await
            .map_err(|e| BlobStoreError::Backend(format!("Upload failed ({e})")))?;

        resp.json()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))
    }

    async fn get(&self, id: &str) -> Result<(StoredBlob, Bytes), BlobStoreError> {
        check_id(id).map_err(|e| blob_error(id, e))?;
        let path = format!("{}/{}", self.files_path(), id);
        let blob: StoredBlob = send(self.request(Method::GET, &path))
            .await
            .map_err(|e| blob_error(id, e))?
            .json()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;

        let data = send(self.request(Method::GET, &format!("{path}/download")))
            .await
            .map_err(|e| blob_error(id, e))?
            .bytes()
            .await
            .map_err(|e| BlobStoreError::Backend(e.to_string()))?;

        Ok((blob, data))
    }

    async fn delete(&self, id: &str) -> Result<(), BlobStoreError> {
        let path = format!("{}/{}", self.files_path(), id);
        let result = match check_id(id) {
            Ok(()) => send(self.request(Method::DELETE, &path)).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(_) => Ok(()),
            // Already gone
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(BlobStoreError::Backend(format!("Delete failed ({e})"))),
        }
    }

    async fn exists(&self, id: &str) -> Result<bool, BlobStoreError> {
        let path = format!("{}/{}", self.files_path(), id);
        let result = match check_id(id) {
            Ok(()) => send(self.request(Method::GET, &path)).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(BlobStoreError::Backend(e.to_string())),
        }
    }

    fn preview_url(&self, id: &str, width: u32, height: u32) -> String {
        format!(
            "{}?width={}&height={}&project={}",
            self.file_url(id, "preview"),
            width,
            height,
            self.project_id
        )
    }

    fn download_url(&self, id: &str) -> String {
        format!("{}?project={}", self.file_url(id, "download"), self.project_id)
    }

    fn view_url(&self, id: &str) -> String {
        format!("{}?project={}", self.file_url(id, "view"), self.project_id)
    }
}
