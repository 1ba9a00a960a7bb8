//! Banner and health check

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::constants::{SERVICE_NAME, SERVICE_VERSION};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// `webhook` or `polling`
    pub transport_mode: String,
    /// Whether Notion credentials and a parent page are configured
    pub notion_configured: bool,
    pub direct_upload_enabled: bool,
    pub session_window_seconds: u64,
}

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "status": "running",
    }))
}

/// Liveness plus a summary of the relay configuration
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let config = &state.config;
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
        transport_mode: config.transport_mode().as_str().to_string(),
        notion_configured: !config.notion_key().is_empty()
            && !config.notion_parent_page_id().is_empty(),
        direct_upload_enabled: config.api_secret().is_some(),
        session_window_seconds: config.session_window().as_secs(),
    })
}
