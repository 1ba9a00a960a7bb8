//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod transport;
pub mod validation;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use courier_core::Config;
use courier_infra::LogFormat;
use courier_notion::{NotionClient, NotionConfig};
use courier_pipeline::{
    ContentClassifier, Destination, DirectUploadGateway, FileFetcher, RetryPolicy, UploadDriver,
};
use courier_telegram::{TelegramClient, TelegramFileFetcher};
use tokio_util::task::TaskTracker;

use crate::constants::{SERVICE_NAME, SERVICE_VERSION};
use crate::services::{RelayService, ReplySink, WebhookInfoSource};
use crate::state::AppState;

/// Everything the transport needs to start serving
pub struct App {
    pub state: Arc<AppState>,
    pub router: Router,
    pub telegram: Arc<TelegramClient>,
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<App> {
    courier_infra::init_telemetry(
        SERVICE_NAME,
        SERVICE_VERSION,
        config.environment(),
        LogFormat::from_env(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    // Fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;
    tracing::info!(
        transport_mode = config.transport_mode().as_str(),
        "Configuration loaded and validated successfully"
    );

    let telegram = Arc::new(TelegramClient::new(
        config.telegram_bot_token(),
        config.telegram_api_base_url(),
        config.http_timeout(),
    )?);
    let notion = NotionClient::new(
        NotionConfig::new(
            config.notion_key(),
            config.notion_version(),
            config.notion_api_base_url(),
        )
        .with_timeout(config.http_timeout()),
    )?;
    let fetcher = Arc::new(TelegramFileFetcher::new(
        telegram.clone(),
        config.platform_transfer_ceiling(),
    ));

    let state = build_state(
        &config,
        Arc::new(notion),
        fetcher,
        telegram.clone(),
        telegram.clone(),
    )?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok(App {
        state,
        router,
        telegram,
    })
}

/// Wire the pipeline around the given collaborators
pub fn build_state(
    config: &Config,
    destination: Arc<dyn Destination>,
    fetcher: Arc<dyn FileFetcher>,
    replies: Arc<dyn ReplySink>,
    webhook_info: Arc<dyn WebhookInfoSource>,
) -> Result<Arc<AppState>> {
    let policy = RetryPolicy::from_settings(config.retry());
    let driver = Arc::new(UploadDriver::new(destination, policy));
    let classifier = ContentClassifier::new(config.platform_transfer_ceiling(), fetcher);
    let relay = RelayService::new(
        config.clone(),
        driver.clone(),
        classifier,
        replies,
        webhook_info.clone(),
    )
    .context("Failed to build relay service")?;

    Ok(Arc::new(AppState {
        config: config.clone(),
        gateway: DirectUploadGateway::new(driver),
        relay: Arc::new(relay),
        webhook_info,
        relay_tasks: TaskTracker::new(),
    }))
}
