//! file-records - file record facade over a metadata store and a blob store
//!
//! This crate provides file upload, listing, renaming, replacing, starring,
//! downloading and deletion with:
//! - A facade that orders blob and metadata writes and reports every outcome
//! - Swappable backends (local filesystem + redb, or an Appwrite-compatible REST API)
//! - REST API with multipart upload support

pub mod api;
pub mod appwrite;
pub mod blob_store;
pub mod config;
pub mod facade;
pub mod metadata;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use appwrite::AppwriteClient;
use blob_store::LocalStore;
use config::{BackendKind, Config};
use facade::{FileRecords, Notifier, SessionProvider, StaticSession};
use metadata::Database;

/// The stores and session source the facade runs against.
#[derive(Clone)]
pub enum Backend {
    Local {
        blobs: Arc<LocalStore>,
        metadata: Database,
        session: StaticSession,
    },
    Appwrite(AppwriteClient),
}

impl Backend {
    pub fn local(config: &Config) -> anyhow::Result<Self> {
        let blobs = LocalStore::new(
            &config.local.storage_path,
            &config.node.public_url,
            &config.ids.bucket_id,
        )?;
        let metadata = Database::open(&config.node.data_dir)?;
        let session = match config.local.session_email {
            Some(ref email) => StaticSession::signed_in(email),
            None => StaticSession::anonymous(),
        };

        Ok(Backend::Local {
            blobs: Arc::new(blobs),
            metadata,
            session,
        })
    }

    pub fn appwrite(config: &Config) -> anyhow::Result<Self> {
        let client = AppwriteClient::new(&config.appwrite, &config.ids)?;
        Ok(Backend::Appwrite(client))
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        match config.backend {
            BackendKind::Local => Self::local(config),
            BackendKind::Appwrite => Self::appwrite(config),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub backend: Backend,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: Config, backend: Backend, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            backend,
            notifier,
        }
    }

    /// Facade for one request. `jwt` identifies the caller on the Appwrite
    /// backend; the local backend always runs as its configured identity.
    pub fn facade(&self, jwt: Option<&str>) -> FileRecords {
        match self.backend {
            Backend::Local {
                ref blobs,
                ref metadata,
                ref session,
            } => {
                let session: Arc<dyn SessionProvider> = Arc::new(session.clone());
                FileRecords::new(
                    session,
                    blobs.clone(),
                    Arc::new(metadata.clone()),
                    Arc::clone(&self.notifier),
                    self.config.facade.clone(),
                )
            }
            Backend::Appwrite(ref client) => {
                let client = Arc::new(match jwt {
                    Some(jwt) => client.with_jwt(jwt),
                    None => client.clone(),
                });
                FileRecords::new(
                    client.clone(),
                    client.clone(),
                    client,
                    Arc::clone(&self.notifier),
                    self.config.facade.clone(),
                )
            }
        }
    }

    /// The local blob store, when this node serves blob content itself.
    pub fn local_blobs(&self) -> Option<&LocalStore> {
        match self.backend {
            Backend::Local { ref blobs, .. } => Some(blobs),
            Backend::Appwrite(_) => None,
        }
    }
}
