use thiserror::Error;

use crate::facade::FacadeConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub backend: BackendKind,
    pub local: LocalConfig,
    pub appwrite: AppwriteConfig,
    pub ids: CollectionIds,
    pub facade: FacadeConfig,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    /// Base URL this service is reachable at; local blob URLs are built on it.
    pub public_url: String,
    pub data_dir: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    Local,
    Appwrite,
}

#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Directory for local blob content
    pub storage_path: String,
    /// Identity every request runs as. None means nobody is signed in.
    pub session_email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppwriteConfig {
    /// API root including the version segment, e.g. https://cloud.appwrite.io/v1
    pub endpoint: String,
    pub project_id: String,
    /// Server key, used when a request carries no user JWT
    pub api_key: Option<String>,
}

/// Opaque identifiers of the bucket and collection holding file data.
#[derive(Debug, Clone)]
pub struct CollectionIds {
    pub bucket_id: String,
    pub database_id: String,
    pub collection_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            backend: BackendKind::default(),
            local: LocalConfig::default(),
            appwrite: AppwriteConfig::default(),
            ids: CollectionIds::default(),
            facade: FacadeConfig::default(),
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            public_url: "http://localhost:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            storage_path: "./files".to_string(),
            session_email: None,
        }
    }
}

impl Default for CollectionIds {
    fn default() -> Self {
        Self {
            bucket_id: "files".to_string(),
            database_id: "main".to_string(),
            collection_id: "files".to_string(),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let backend = match env_or("BACKEND", "local").to_lowercase().as_str() {
            "appwrite" => BackendKind::Appwrite,
            _ => BackendKind::Local,
        };

        let public_view_links = std::env::var("PUBLIC_VIEW_LINKS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.facade.public_view_links);

        let config = Config {
            node: NodeConfig {
                bind_address: env_or("BIND_ADDRESS", &defaults.node.bind_address),
                public_url: env_or("PUBLIC_URL", &defaults.node.public_url),
                data_dir: env_or("DATA_DIR", &defaults.node.data_dir),
            },
            backend,
            local: LocalConfig {
                storage_path: env_or("LOCAL_STORAGE_PATH", &defaults.local.storage_path),
                session_email: std::env::var("LOCAL_SESSION_EMAIL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
            },
            appwrite: AppwriteConfig {
                endpoint: env_or("APPWRITE_ENDPOINT", ""),
                project_id: env_or("APPWRITE_PROJECT_ID", ""),
                api_key: std::env::var("APPWRITE_API_KEY").ok(),
            },
            ids: CollectionIds {
                bucket_id: env_or("BUCKET_ID", &defaults.ids.bucket_id),
                database_id: env_or("DATABASE_ID", &defaults.ids.database_id),
                collection_id: env_or("COLLECTION_ID", &defaults.ids.collection_id),
            },
            facade: FacadeConfig {
                preview_width: env_parse("PREVIEW_WIDTH", defaults.facade.preview_width),
                preview_height: env_parse("PREVIEW_HEIGHT", defaults.facade.preview_height),
                public_view_links,
            },
            max_upload_size: env_parse("MAX_UPLOAD_SIZE", defaults.max_upload_size),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("BUCKET_ID", &self.ids.bucket_id),
            ("DATABASE_ID", &self.ids.database_id),
            ("COLLECTION_ID", &self.ids.collection_id),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} cannot be empty"
                )));
            }
        }

        if self.facade.preview_width == 0 || self.facade.preview_height == 0 {
            return Err(ConfigError::ValidationError(
                "PREVIEW_WIDTH and PREVIEW_HEIGHT must be positive".to_string(),
            ));
        }

        match self.backend {
            BackendKind::Appwrite => {
                if self.appwrite.endpoint.is_empty() {
                    return Err(ConfigError::ValidationError(
                        "APPWRITE_ENDPOINT is required when BACKEND=appwrite".to_string(),
                    ));
                }
                if self.appwrite.project_id.is_empty() {
                    return Err(ConfigError::ValidationError(
                        "APPWRITE_PROJECT_ID is required when BACKEND=appwrite".to_string(),
                    ));
                }
            }
            BackendKind::Local => {
                if self.local.session_email.is_none() {
                    tracing::warn!(
                        "LOCAL_SESSION_EMAIL is not set; every request will be unauthenticated"
                    );
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.facade.preview_width, 400);
        assert_eq!(config.facade.preview_height, 400);
        assert!(config.facade.public_view_links);
    }

    #[test]
    fn test_appwrite_requires_endpoint_and_project() {
        let mut config = Config {
            backend: BackendKind::Appwrite,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.appwrite.endpoint = "https://cloud.example.com/v1".to_string();
        assert!(config.validate().is_err());

        config.appwrite.project_id = "proj".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_collection_id_rejected() {
        let mut config = Config::default();
        config.ids.collection_id = " ".to_string();
        assert!(config.validate().is_err());
    }
}
