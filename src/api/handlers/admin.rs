use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::JSend;
use crate::config::BackendKind;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub backend: String,
    pub status: String,
    pub version: String,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<JSend<HealthResponse>> {
    let backend = match state.config.backend {
        BackendKind::Local => "local",
        BackendKind::Appwrite => "appwrite",
    };

    JSend::success(HealthResponse {
        backend: backend.to_string(),
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
