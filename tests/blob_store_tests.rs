use bytes::Bytes;
use file_records::blob_store::{BlobStore, BlobStoreError, BlobUpload, LocalStore};

fn test_store() -> (tempfile::TempDir, LocalStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path(), "http://localhost:8080/", "files").unwrap();
    (dir, store)
}

fn upload(name: &str, content_type: &str, data: &'static str) -> BlobUpload {
    BlobUpload::new(name, content_type, Bytes::from(data))
}

#[tokio::test]
async fn test_local_store_create_get() {
    let (_dir, store) = test_store();

    let blob = store
        .create("blob-1", upload("hello.txt", "text/plain", "hello world"))
        .await
        .unwrap();
    assert_eq!(blob.id, "blob-1");
    assert_eq!(blob.name, "hello.txt");
    assert_eq!(blob.mime_type, "text/plain");
    assert_eq!(blob.byte_size, 11);

    let (descriptor, data) = store.get("blob-1").await.unwrap();
    assert_eq!(descriptor, blob);
    assert_eq!(data, Bytes::from("hello world"));
}

#[tokio::test]
async fn test_local_store_guesses_mime_type() {
    let (_dir, store) = test_store();

    let blob = store
        .create("blob-2", upload("report.pdf", "", "%PDF"))
        .await
        .unwrap();
    assert_eq!(blob.mime_type, "application/pdf");
}

#[tokio::test]
async fn test_local_store_exists() {
    let (_dir, store) = test_store();

    assert!(!store.exists("missing").await.unwrap());

    store
        .create("present", upload("a.bin", "", "data"))
        .await
        .unwrap();
    assert!(store.exists("present").await.unwrap());
}

#[tokio::test]
async fn test_local_store_delete() {
    let (dir, store) = test_store();

    store
        .create("to-delete", upload("a.txt", "text/plain", "data"))
        .await
        .unwrap();
    store.delete("to-delete").await.unwrap();

    assert!(!store.exists("to-delete").await.unwrap());
    // Descriptor goes too
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_local_store_delete_nonexistent() {
    let (_dir, store) = test_store();

    // Deleting a nonexistent blob should not error
    store.delete("nonexistent").await.unwrap();
}

#[tokio::test]
async fn test_local_store_get_not_found() {
    let (_dir, store) = test_store();

    let result = store.get("missing").await;
    assert!(matches!(result, Err(BlobStoreError::NotFound(_))));
}

#[tokio::test]
async fn test_local_store_rejects_path_ids() {
    let (_dir, store) = test_store();

    let result = store
        .create("../escape", upload("a.txt", "text/plain", "x"))
        .await;
    assert!(result.is_err());
    assert!(!store.exists("../escape").await.unwrap());
}

#[test]
fn test_local_store_urls() {
    let (_dir, store) = test_store();

    assert_eq!(
        store.preview_url("abc", 400, 400),
        "http://localhost:8080/v1/storage/buckets/files/files/abc/preview?width=400&height=400"
    );
    assert_eq!(
        store.download_url("abc"),
        "http://localhost:8080/v1/storage/buckets/files/files/abc/download"
    );
    assert_eq!(
        store.view_url("abc"),
        "http://localhost:8080/v1/storage/buckets/files/files/abc/view"
    );
}
