//! Route configuration and setup.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method},
    routing::{get, post},
    Json, Router,
};
use courier_core::Config;
use courier_infra::request_id_middleware;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api_doc;
use crate::constants::{
    HEALTH_PATH, MAX_DIRECT_UPLOAD_BYTES, OPENAPI_PATH, UPLOAD_BLOCK_PATH, UPLOAD_PAGE_PATH,
    WEBHOOK_STATUS_PATH,
};
use crate::handlers::{direct_upload, health, telegram_webhook, webhook_status};
use crate::state::AppState;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(api_doc::openapi_spec())
}

fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-signature"),
        ])
}

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(1_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        webhook_path = %config.webhook_path(),
        "Registering routes"
    );

    let app = Router::new()
        .route("/", get(health::root))
        .route(HEALTH_PATH, get(health::health_check))
        .route(OPENAPI_PATH, get(openapi_json))
        .route(WEBHOOK_STATUS_PATH, get(webhook_status::webhook_status))
        .route(config.webhook_path(), post(telegram_webhook::receive_update))
        .route(UPLOAD_PAGE_PATH, post(direct_upload::upload_page))
        .route(UPLOAD_BLOCK_PATH, post(direct_upload::upload_block))
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(MAX_DIRECT_UPLOAD_BYTES))
        .layer(DefaultBodyLimit::disable())
        .layer(setup_cors())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware));

    Ok(app)
}
