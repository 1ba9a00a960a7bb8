//! Server startup and graceful shutdown

use anyhow::{Context, Result};
use axum::Router;
use courier_core::Config;
use tokio_util::task::TaskTracker;

/// Start the server with graceful shutdown.
///
/// Returns once the listener has stopped and every relay on `relay_tasks`
/// has finished.
pub async fn start_server(config: &Config, app: Router, relay_tasks: &TaskTracker) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        webhook_path = %config.webhook_path(),
        direct_upload_enabled = config.api_secret().is_some(),
        text_chunk_limit = config.text_chunk_limit(),
        file_chunk_limit = config.file_chunk_limit(),
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drain_relay_tasks(relay_tasks).await;
    Ok(())
}

/// Stop accepting relays and wait for the running ones
pub async fn drain_relay_tasks(relay_tasks: &TaskTracker) {
    relay_tasks.close();
    if !relay_tasks.is_empty() {
        tracing::info!(in_flight = relay_tasks.len(), "Waiting for running relays");
    }
    relay_tasks.wait().await;
    tracing::info!("All relays finished");
}

/// Resolves on Ctrl+C (SIGINT) or SIGTERM.
///
/// If a handler cannot be installed that signal is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
