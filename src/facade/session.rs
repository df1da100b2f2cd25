use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session lookup failed: {0}")]
    Backend(String),
}

/// The caller's authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Answers "who is the caller". `Ok(None)` means nobody is signed in;
/// `Err` means the lookup itself failed.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current(&self) -> Result<Option<Session>, SessionError>;
}

/// Fixed identity, configured up front.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    session: Option<Session>,
}

impl StaticSession {
    pub fn signed_in(email: &str) -> Self {
        Self {
            session: Some(Session {
                user_id: email.to_string(),
                email: email.to_string(),
                name: String::new(),
            }),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.session.clone())
    }
}
