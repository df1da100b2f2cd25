use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{check_id, send, AppwriteClient, CallError};
use crate::metadata::{FilePatch, FileRecord, MetadataError, MetadataStore, Permission, Query};

/// Attribute payload of a file document; system fields travel separately.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileAttributes<'a> {
    file: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    mime_type: &'a str,
    created_at: DateTime<Utc>,
    email: &'a str,
    preview_url: &'a str,
    folder_id: Option<&'a str>,
    starred: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateDocument<'a> {
    document_id: &'a str,
    data: FileAttributes<'a>,
    permissions: &'a [Permission],
}

#[derive(Serialize)]
struct UpdateDocument<'a> {
    data: &'a FilePatch,
}

#[derive(Deserialize)]
struct DocumentList {
    documents: Vec<FileRecord>,
}

fn document_error(id: &str, e: CallError) -> MetadataError {
    if e.is_not_found() {
        MetadataError::NotFound(id.to_string())
    } else {
        MetadataError::Backend(e.to_string())
    }
}

impl AppwriteClient {
    fn document_path(&self, id: &str) -> String {
        format!("{}/{}", self.documents_path(), id)
    }
}

#[async_trait]
impl MetadataStore for AppwriteClient {
    async fn create(&self, record: &FileRecord) -> Result<FileRecord, MetadataError> {
        check_id(&record.id).map_err(|e| MetadataError::Backend(e.to_string()))?;
        let body = CreateDocument {
            document_id: &record.id,
            data: FileAttributes {
                file: &record.file,
                name: &record.name,
                mime_type: &record.mime_type,
                created_at: record.created_at,
                email: &record.email,
                preview_url: &record.preview_url,
                folder_id: record.folder_id.as_deref(),
                starred: record.starred,
            },
            permissions: &record.permissions,
        };

        send(self.request(Method::POST, &self.documents_path()).json(&body))
            .await
            .map_err(|e| document_error(&record.id, e))?
            .json()
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))
    }

    async fn get(&self, id: &str) -> Result<FileRecord, MetadataError> {
        check_id(id).map_err(|e| document_error(id, e))?;
        send(self.request(Method::GET, &self.document_path(id)))
            .await
            .map_err(|e| document_error(id, e))?
            .json()
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))
    }

    async fn update(&self, id: &str, patch: &FilePatch) -> Result<FileRecord, MetadataError> {
        check_id(id).map_err(|e| document_error(id, e))?;
        send(
            self.request(Method::PATCH, &self.document_path(id))
                .json(&UpdateDocument { data: patch }),
        )
        .await
        .map_err(|e| document_error(id, e))?
        .json()
        .await
        .map_err(|e| MetadataError::Backend(e.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), MetadataError> {
        check_id(id).map_err(|e| document_error(id, e))?;
        send(self.request(Method::DELETE, &self.document_path(id)))
            .await
            .map_err(|e| document_error(id, e))?;
        Ok(())
    }

    async fn list(&self, queries: &[Query]) -> Result<Vec<FileRecord>, MetadataError> {
        let params: Vec<(&str, String)> = queries
            .iter()
            .map(|q| ("queries[]", q.to_wire()))
            .collect();

        let request = self.request(Method::GET, &self.documents_path()).query(&params);
        let list: DocumentList = send(request)
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))?
            .json()
            .await
            .map_err(|e| MetadataError::Backend(e.to_string()))?;
        Ok(list.documents)
    }
}
