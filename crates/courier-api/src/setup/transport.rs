//! Inbound transport
//!
//! Webhook mode registers the public URL with Telegram and serves HTTP.
//! Polling mode clears any webhook and drains the long-poll stream; no HTTP
//! listener is started.

use std::sync::Arc;

use anyhow::{Context, Result};
use courier_core::{Config, TransportMode};
use courier_telegram::{poll_updates, PollingOptions, TelegramClient};
use futures::StreamExt;

use super::{server, App};
use crate::state::AppState;

/// Public URL Telegram should post updates to
pub fn webhook_endpoint(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with(path) {
        base.to_string()
    } else {
        format!("{}{}", base, path)
    }
}

/// Serve updates until shutdown, then flush telemetry.
pub async fn run(config: &Config, app: App) -> Result<()> {
    let result = serve(config, app).await;
    courier_infra::shutdown_telemetry().await;
    result
}

async fn serve(config: &Config, app: App) -> Result<()> {
    match config.transport_mode() {
        TransportMode::Webhook => {
            let base = config
                .webhook_url()
                .context("WEBHOOK_URL is required in webhook mode")?;
            let endpoint = webhook_endpoint(base, config.webhook_path());
            app.telegram
                .set_webhook(&endpoint, config.webhook_secret())
                .await
                .context("Failed to register Telegram webhook")?;
            tracing::info!(url = %endpoint, "Telegram webhook registered");
            app.state.relay.notify_admins().await;

            server::start_server(config, app.router, &app.state.relay_tasks).await
        }
        TransportMode::Polling => {
            app.telegram
                .delete_webhook()
                .await
                .context("Failed to clear Telegram webhook before polling")?;
            app.state.relay.notify_admins().await;
            run_polling(config, app.state, app.telegram).await
        }
    }
}

async fn run_polling(config: &Config, state: Arc<AppState>, telegram: Arc<TelegramClient>) -> Result<()> {
    let options = PollingOptions {
        timeout_secs: config.poll_timeout_seconds(),
        ..PollingOptions::default()
    };
    tracing::info!(timeout_secs = options.timeout_secs, "Starting Telegram long polling");

    let updates = poll_updates(telegram, options);
    futures::pin_mut!(updates);
    let shutdown = server::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            next = updates.next() => {
                let Some(update) = next else { break };
                let relay = state.relay.clone();
                state.relay_tasks.spawn(async move {
                    relay.handle_update(update).await;
                });
            }
        }
    }

    tracing::info!("Polling stopped");
    server::drain_relay_tasks(&state.relay_tasks).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_endpoint() {
        assert_eq!(
            webhook_endpoint("https://relay.example.com/", "/telegram/webhook"),
            "https://relay.example.com/telegram/webhook"
        );
        assert_eq!(
            webhook_endpoint("https://relay.example.com/telegram/webhook", "/telegram/webhook"),
            "https://relay.example.com/telegram/webhook"
        );
    }
}
