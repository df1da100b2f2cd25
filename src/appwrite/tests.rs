use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::Query as QueryParams;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::*;
use crate::blob_store::BlobStore;
use crate::facade::{FacadeError, SessionProvider};
use crate::metadata::models::attr;
use crate::metadata::{MetadataError, MetadataStore, Query, Role};

fn ids() -> CollectionIds {
    CollectionIds {
        bucket_id: "bucket".to_string(),
        database_id: "db".to_string(),
        collection_id: "col".to_string(),
    }
}

fn client() -> AppwriteClient {
    let settings = AppwriteConfig {
        endpoint: "https://cloud.example.com/v1/".to_string(),
        project_id: "proj".to_string(),
        api_key: None,
    };
    AppwriteClient::new(&settings, &ids()).unwrap()
}

/// Serve `router` on an ephemeral port and point a client at it.
async fn serve(router: Router) -> AppwriteClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let settings = AppwriteConfig {
        endpoint: format!("http://{addr}/v1"),
        project_id: "proj".to_string(),
        api_key: Some("server-key".to_string()),
    };
    AppwriteClient::new(&settings, &ids()).unwrap()
}

/// A document as the hosted API returns it, system attributes included.
fn hosted_document(id: &str) -> Value {
    json!({
        "$id": id,
        "$collectionId": "col",
        "$databaseId": "db",
        "$createdAt": "2024-03-12T10:15:30.000+00:00",
        "$updatedAt": "2024-03-12T10:15:30.000+00:00",
        "$permissions": ["read(\"team:t1\")", "update(\"any\")", "delete(\"any\")"],
        "file": "blob-1",
        "name": "report.pdf",
        "type": "application/pdf",
        "createdAt": "2024-03-12T10:15:29.512+00:00",
        "email": "a@x.com",
        "previewUrl": "https://cloud.example.com/v1/storage/buckets/bucket/files/blob-1/preview",
        "folderId": null,
        "starred": true
    })
}

#[test]
fn test_derived_urls() {
    let c = client();
    let files = "https://cloud.example.com/v1/storage/buckets/bucket/files";
    assert_eq!(
        c.preview_url("abc", 400, 400),
        format!("{files}/abc/preview?width=400&height=400&project=proj")
    );
    assert_eq!(
        c.download_url("abc"),
        format!("{files}/abc/download?project=proj")
    );
    assert_eq!(c.view_url("abc"), format!("{files}/abc/view?project=proj"));
}

#[test]
fn test_documents_path() {
    assert_eq!(
        client().documents_path(),
        "/databases/db/collections/col/documents"
    );
}

#[test]
fn test_with_jwt_keeps_settings() {
    let c = client().with_jwt("token");
    assert_eq!(c.jwt.as_deref(), Some("token"));
    assert_eq!(c.project_id, "proj");
}

#[test]
fn test_call_error_not_found() {
    assert!(CallError::Status(StatusCode::NOT_FOUND, String::new()).is_not_found());
    assert!(CallError::InvalidId("../x".to_string()).is_not_found());
    assert!(!CallError::Status(StatusCode::BAD_GATEWAY, String::new()).is_not_found());
    assert_eq!(
        CallError::Status(StatusCode::CONFLICT, "exists".to_string()).to_string(),
        "409 Conflict: exists"
    );
}

#[tokio::test]
async fn test_account_unauthorized_is_no_session() {
    let router = Router::new().route("/v1/account", get(|| async { StatusCode::UNAUTHORIZED }));
    let client = serve(router).await;

    assert_eq!(client.current().await.unwrap(), None);
}

#[tokio::test]
async fn test_account_with_jwt() {
    let router = Router::new().route(
        "/v1/account",
        get(|headers: HeaderMap| async move {
            let jwt = headers.get("x-appwrite-jwt").and_then(|v| v.to_str().ok());
            if jwt != Some("user-token") || headers.contains_key("x-appwrite-key") {
                return Err(StatusCode::UNAUTHORIZED);
            }
            Ok(Json(json!({
                "$id": "u1",
                "email": "a@x.com",
                "name": "Alice",
                "registration": "2024-01-01T00:00:00.000+00:00",
                "emailVerification": true
            })))
        }),
    );
    let client = serve(router).await;

    assert_eq!(client.current().await.unwrap(), None);

    let session = client.with_jwt("user-token").current().await.unwrap().unwrap();
    assert_eq!(session.user_id, "u1");
    assert_eq!(session.email, "a@x.com");
}

#[tokio::test]
async fn test_account_server_error_is_lookup_failure() {
    let router = Router::new().route(
        "/v1/account",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let client = serve(router).await;

    assert!(client.current().await.is_err());
}

#[tokio::test]
async fn test_missing_document_is_not_found() {
    let router = Router::new().route(
        "/v1/databases/db/collections/col/documents/:id",
        get(|| async { (StatusCode::NOT_FOUND, Json(json!({"code": 404}))) }),
    );
    let client = serve(router).await;

    let err = MetadataStore::get(&client, "gone").await.unwrap_err();
    assert!(matches!(err, MetadataError::NotFound(ref id) if id == "gone"));
    assert!(matches!(
        FacadeError::from(err),
        FacadeError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_get_hosted_document() {
    let router = Router::new().route(
        "/v1/databases/db/collections/col/documents/:id",
        get(|| async { Json(hosted_document("doc-1")) }),
    );
    let client = serve(router).await;

    let record = MetadataStore::get(&client, "doc-1").await.unwrap();
    assert_eq!(record.id, "doc-1");
    assert_eq!(record.file, "blob-1");
    assert!(record.starred);
    assert_eq!(record.permissions[0].role, Role::Other("team:t1".to_string()));
}

#[tokio::test]
async fn test_list_sends_queries_and_parses_documents() {
    let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::default();
    let recorder = Arc::clone(&seen);
    let router = Router::new().route(
        "/v1/databases/db/collections/col/documents",
        get(move |QueryParams(params): QueryParams<Vec<(String, String)>>| {
            let recorder = Arc::clone(&recorder);
            async move {
                *recorder.lock().unwrap() = params;
                Json(json!({
                    "total": 2,
                    "documents": [hosted_document("doc-1"), hosted_document("doc-2")]
                }))
            }
        }),
    );
    let client = serve(router).await;

    let records = client
        .list(&[
            Query::equal(attr::STARRED, true),
            Query::equal(attr::EMAIL, "a@x.com"),
        ])
        .await
        .unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["doc-1", "doc-2"]);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (
                "queries[]".to_string(),
                r#"{"method":"equal","attribute":"starred","values":[true]}"#.to_string()
            ),
            (
                "queries[]".to_string(),
                r#"{"method":"equal","attribute":"email","values":["a@x.com"]}"#.to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn test_blob_delete_of_missing_blob_succeeds() {
    let router = Router::new().route(
        "/v1/storage/buckets/bucket/files/:id",
        delete(|| async { StatusCode::NOT_FOUND }),
    );
    let client = serve(router).await;

    BlobStore::delete(&client, "gone").await.unwrap();
}

#[tokio::test]
async fn test_path_like_ids_never_leave_the_client() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let router = Router::new().fallback(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { StatusCode::OK }
    });
    let client = serve(router).await;

    for id in ["../../account", "a/b", ".."] {
        let err = MetadataStore::get(&client, id).await.unwrap_err();
        assert!(matches!(err, MetadataError::NotFound(_)), "{id}");
        assert!(MetadataStore::delete(&client, id).await.is_err());
        assert!(!client.exists(id).await.unwrap());
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
