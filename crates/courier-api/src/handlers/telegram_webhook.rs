//! Telegram webhook receiver

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use courier_core::AppError;
use courier_telegram::Update;

use crate::constants::TELEGRAM_SECRET_HEADER;
use crate::error::HttpAppError;
use crate::state::AppState;
use crate::validation::header_matches_secret;

/// Accept an update and relay it in the background.
///
/// Telegram redelivers updates that are not acknowledged quickly, so the
/// response does not wait for the upload. The relay runs on the state's task
/// tracker so shutdown can wait for it.
pub async fn receive_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Update>, JsonRejection>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    if let Some(secret) = state.config.webhook_secret() {
        if !header_matches_secret(&headers, TELEGRAM_SECRET_HEADER, secret) {
            return Err(AppError::Unauthorized("Invalid webhook secret token".to_string()).into());
        }
    }

    let Json(update) = payload?;
    tracing::info!(update_id = update.update_id, "Received webhook update");

    let relay = state.relay.clone();
    state.relay_tasks.spawn(async move {
        relay.handle_update(update).await;
    });

    Ok(Json(serde_json::json!({ "ok": true })))
}
