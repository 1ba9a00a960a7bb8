//! Telegram webhook registration status

use std::sync::Arc;

use axum::{extract::State, Json};
use courier_core::AppError;
use courier_telegram::WebhookInfo;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookStatusResponse {
    /// Registered URL, empty when none
    pub webhook_url: String,
    pub has_custom_certificate: bool,
    pub pending_update_count: i64,
    /// Unix time of the last delivery error
    pub last_error_date: Option<i64>,
    pub last_error_message: Option<String>,
    pub max_connections: Option<i64>,
    pub allowed_updates: Option<Vec<String>>,
}

impl From<WebhookInfo> for WebhookStatusResponse {
    fn from(info: WebhookInfo) -> Self {
        Self {
            webhook_url: info.url,
            has_custom_certificate: info.has_custom_certificate,
            pending_update_count: info.pending_update_count,
            last_error_date: info.last_error_date,
            last_error_message: info.last_error_message,
            max_connections: info.max_connections,
            allowed_updates: info.allowed_updates,
        }
    }
}

/// Current `getWebhookInfo` as seen by Telegram
#[utoipa::path(
    get,
    path = "/webhook_status",
    tag = "health",
    responses(
        (status = 200, description = "Webhook state reported by Telegram", body = WebhookStatusResponse),
        (status = 502, description = "Telegram could not be reached", body = ErrorResponse)
    )
)]
pub async fn webhook_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WebhookStatusResponse>, HttpAppError> {
    let info = state.webhook_info.webhook_info().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch webhook status");
        AppError::ChatPlatform(e.to_string())
    })?;
    tracing::info!(
        pending_update_count = info.pending_update_count,
        last_error = ?info.last_error_message,
        "Webhook status fetched"
    );
    Ok(Json(info.into()))
}
