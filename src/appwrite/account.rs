use async_trait::async_trait;
use reqwest::{Method, StatusCode};

use super::{send, AppwriteClient, CallError};
use crate::facade::{Session, SessionError, SessionProvider};

#[async_trait]
impl SessionProvider for AppwriteClient {
    async fn current(&self) -> Result<Option<Session>, SessionError> {
        let resp = match send(self.request(Method::GET, "/account")).await {
            Ok(resp) => resp,
            Err(CallError::Status(StatusCode::UNAUTHORIZED, _)) => return Ok(None),
            Err(e) => return Err(SessionError::Backend(e.to_string())),
        };

        let session: Session = resp
            .json()
            .await
            .map_err(|e| SessionError::Backend(e.to_string()))?;
        Ok(Some(session))
    }
}
