//! Shared test helpers: local backends in a temp dir and instrumented stores.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::blob_store::{BlobStore, BlobStoreError, BlobUpload, LocalStore, StoredBlob};
use crate::config::Config;
use crate::facade::{
    FacadeConfig, FileRecords, Notification, Notifier, SessionProvider, StaticSession,
};
use crate::metadata::{Database, FilePatch, FileRecord, MetadataError, MetadataStore, Query};
use crate::{AppState, Backend};

pub const PUBLIC_URL: &str = "http://localhost:8080";
pub const BUCKET: &str = "files";

/// Keeps every notification it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.notifications.lock().unwrap().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.notifications.lock().unwrap().push(notification.clone());
    }
}

/// Counts calls before delegating to the wrapped store.
pub struct Counting<S> {
    pub inner: S,
    pub calls: AtomicUsize,
}

impl<S> Counting<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for Counting<S> {
    async fn create(&self, id: &str, upload: BlobUpload) -> Result<StoredBlob, BlobStoreError> {
        self.hit();
        self.inner.create(id, upload).await
    }

    async fn get(&self, id: &str) -> Result<(StoredBlob, Bytes), BlobStoreError> {
        self.hit();
        self.inner.get(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), BlobStoreError> {
        self.hit();
        self.inner.delete(id).await
    }

    async fn exists(&self, id: &str) -> Result<bool, BlobStoreError> {
        self.hit();
        self.inner.exists(id).await
    }

    fn preview_url(&self, id: &str, width: u32, height: u32) -> String {
        self.inner.preview_url(id, width, height)
    }

    fn download_url(&self, id: &str) -> String {
        self.inner.download_url(id)
    }

    fn view_url(&self, id: &str) -> String {
        self.inner.view_url(id)
    }
}

#[async_trait]
impl<S: MetadataStore> MetadataStore for Counting<S> {
    async fn create(&self, record: &FileRecord) -> Result<FileRecord, MetadataError> {
        self.hit();
        self.inner.create(record).await
    }

    async fn get(&self, id: &str) -> Result<FileRecord, MetadataError> {
        self.hit();
        self.inner.get(id).await
    }

    async fn update(&self, id: &str, patch: &FilePatch) -> Result<FileRecord, MetadataError> {
        self.hit();
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &str) -> Result<(), MetadataError> {
        self.hit();
        self.inner.delete(id).await
    }

    async fn list(&self, queries: &[Query]) -> Result<Vec<FileRecord>, MetadataError> {
        self.hit();
        self.inner.list(queries).await
    }
}

/// Reads pass through; creates and updates fail.
pub struct ReadOnlyMetadata(pub Database);

#[async_trait]
impl MetadataStore for ReadOnlyMetadata {
    async fn create(&self, _record: &FileRecord) -> Result<FileRecord, MetadataError> {
        Err(MetadataError::Backend("collection is read-only".to_string()))
    }

    async fn get(&self, id: &str) -> Result<FileRecord, MetadataError> {
        self.0.get(id).await
    }

    async fn update(&self, _id: &str, _patch: &FilePatch) -> Result<FileRecord, MetadataError> {
        Err(MetadataError::Backend("collection is read-only".to_string()))
    }

    async fn delete(&self, _id: &str) -> Result<(), MetadataError> {
        Err(MetadataError::Backend("collection is read-only".to_string()))
    }

    async fn list(&self, queries: &[Query]) -> Result<Vec<FileRecord>, MetadataError> {
        self.0.list(queries).await
    }
}

/// Local blob store and database in a temp dir, with a recording notifier.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub blobs: Arc<Counting<LocalStore>>,
    pub db: Database,
    pub metadata: Arc<Counting<Database>>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let blobs = LocalStore::new(dir.path().join("files"), PUBLIC_URL, BUCKET)
            .expect("Failed to create test blob store");
        let db = Database::open(dir.path().join("data")).expect("Failed to open test database");

        Self {
            blobs: Arc::new(Counting::new(blobs)),
            metadata: Arc::new(Counting::new(db.clone())),
            db,
            dir,
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn facade_with(&self, session: StaticSession, config: FacadeConfig) -> FileRecords {
        let session: Arc<dyn SessionProvider> = Arc::new(session);
        FileRecords::new(
            session,
            self.blobs.clone(),
            self.metadata.clone(),
            self.notifier.clone(),
            config,
        )
    }

    /// Facade acting as `email`.
    pub fn facade_for(&self, email: &str) -> FileRecords {
        self.facade_with(StaticSession::signed_in(email), FacadeConfig::default())
    }

    /// Facade with nobody signed in.
    pub fn anonymous(&self) -> FileRecords {
        self.facade_with(StaticSession::anonymous(), FacadeConfig::default())
    }

    pub async fn blob_exists(&self, id: &str) -> bool {
        self.blobs.inner.exists(id).await.unwrap()
    }
}

pub fn upload(file_name: &str, content_type: &str, data: &'static str) -> BlobUpload {
    BlobUpload::new(file_name, content_type, Bytes::from(data))
}

/// AppState over the local backend, signed in as `email`.
pub fn test_state(temp_dir: &tempfile::TempDir, email: Option<&str>) -> Arc<AppState> {
    let mut config = Config::default();
    config.node.data_dir = temp_dir.path().join("data").to_string_lossy().to_string();
    config.local.storage_path = temp_dir.path().join("files").to_string_lossy().to_string();
    config.local.session_email = email.map(|e| e.to_string());

    let backend = Backend::local(&config).expect("Failed to create local backend");
    Arc::new(AppState::new(config, backend, Arc::new(RecordingNotifier::default())))
}
