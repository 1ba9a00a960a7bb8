//! Configuration validation
//!
//! Runs the config's own checks, then warns about settings that are legal but
//! probably not intended.

use anyhow::Result;
use courier_core::{Config, TransportMode};

use crate::constants::{
    HEALTH_PATH, OPENAPI_PATH, UPLOAD_BLOCK_PATH, UPLOAD_PAGE_PATH, WEBHOOK_STATUS_PATH,
};

const RESERVED_PATHS: &[&str] = &[
    "/",
    HEALTH_PATH,
    OPENAPI_PATH,
    UPLOAD_PAGE_PATH,
    UPLOAD_BLOCK_PATH,
    WEBHOOK_STATUS_PATH,
];

pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if RESERVED_PATHS.contains(&config.webhook_path()) {
        return Err(anyhow::anyhow!(
            "WEBHOOK_PATH '{}' collides with a built-in route",
            config.webhook_path()
        ));
    }

    match config.transport_mode() {
        TransportMode::Webhook => {
            if config.webhook_secret().is_none() {
                tracing::warn!(
                    "TELEGRAM_WEBHOOK_SECRET not set - webhook requests are not authenticated"
                );
            }
            if config.api_secret().is_none() {
                tracing::info!("API_SECRET not set - direct upload API is disabled");
            }
        }
        TransportMode::Polling => {
            if config.api_secret().is_some() {
                tracing::warn!(
                    "API_SECRET is set but the direct upload API is only served in webhook mode"
                );
            }
        }
    }

    if config.is_production() && !config.has_access_list() {
        tracing::warn!(
            "AUTHORIZED_USERS and ADMIN_USERS are empty - every Telegram user can write to Notion"
        );
    }

    Ok(())
}
