//! Client for an Appwrite-compatible REST backend.
//!
//! One [`AppwriteClient`] covers all three collaborators of the facade: the
//! account endpoint answers session lookups, a storage bucket holds blobs and
//! a database collection holds file records.

mod account;
mod databases;
mod storage;
#[cfg(test)]
mod tests;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use thiserror::Error;

use crate::blob_store::is_valid_id;
use crate::config::{AppwriteConfig, CollectionIds};

/// Appwrite client bound to one bucket and one collection.
#[derive(Clone)]
pub struct AppwriteClient {
    client: Client,
    endpoint: String,
    project_id: String,
    api_key: Option<String>,
    jwt: Option<String>,
    ids: CollectionIds,
}

impl AppwriteClient {
    pub fn new(settings: &AppwriteConfig, ids: &CollectionIds) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            project_id: settings.project_id.clone(),
            api_key: settings.api_key.clone(),
            jwt: None,
            ids: ids.clone(),
        })
    }

    /// Copy of this client acting on behalf of the user the JWT was issued to.
    pub fn with_jwt(&self, jwt: &str) -> Self {
        Self {
            jwt: Some(jwt.to_string()),
            ..self.clone()
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.endpoint, path))
            .header("X-Appwrite-Project", &self.project_id);

        // A user JWT takes precedence over the server key
        if let Some(ref jwt) = self.jwt {
            builder = builder.header("X-Appwrite-JWT", jwt);
        } else if let Some(ref key) = self.api_key {
            builder = builder.header("X-Appwrite-Key", key);
        }
        builder
    }

    fn files_path(&self) -> String {
        format!("/storage/buckets/{}/files", self.ids.bucket_id)
    }

    fn file_url(&self, id: &str, action: &str) -> String {
        format!(
            "{}{}/{}/{}",
            self.endpoint,
            self.files_path(),
            id,
            action
        )
    }

    fn documents_path(&self) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.ids.database_id, self.ids.collection_id
        )
    }
}

/// Failed HTTP exchange: either the transport or a non-success status.
#[derive(Debug, Error)]
enum CallError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}: {1}")]
    Status(StatusCode, String),
    #[error("invalid id: {0}")]
    InvalidId(String),
}

impl CallError {
    /// An id that can never name a resource counts as missing.
    fn is_not_found(&self) -> bool {
        matches!(
            self,
            CallError::Status(StatusCode::NOT_FOUND, _) | CallError::InvalidId(_)
        )
    }
}

/// Ids are spliced into request paths, so only literal segments pass.
fn check_id(id: &str) -> Result<(), CallError> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(CallError::InvalidId(id.to_string()))
    }
}

async fn send(builder: RequestBuilder) -> Result<Response, CallError> {
    let resp = builder.send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(CallError::Status(status, body));
    }
    Ok(resp)
}
