//! Application state shared by handlers and the polling loop.

use std::sync::Arc;

use courier_core::Config;
use courier_pipeline::DirectUploadGateway;
use tokio_util::task::TaskTracker;

use crate::services::{RelayService, WebhookInfoSource};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Direct upload API entry point
    pub gateway: DirectUploadGateway,
    /// Telegram update handling, shared by webhook and polling delivery
    pub relay: Arc<RelayService>,
    pub webhook_info: Arc<dyn WebhookInfoSource>,
    /// Background relays started by the webhook; drained on shutdown
    pub relay_tasks: TaskTracker,
}
