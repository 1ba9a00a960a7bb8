//! Shared setup for API integration tests
//!
//! The app is wired exactly as in production except for the collaborators at
//! the edges: an in-memory destination, a canned file fetcher and a reply
//! recorder.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use courier_api::services::{ReplySink, WebhookInfoSource};
use courier_api::setup::{build_state, routes::setup_routes};
use courier_api::state::AppState;
use courier_core::{Config, RelayConfig, RetrySettings};
use courier_pipeline::memory::MemoryDestination;
use courier_pipeline::{FetchError, FileFetcher};
use courier_telegram::{TelegramError, WebhookInfo};

pub const API_SECRET: &str = "test-api-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

#[derive(Default)]
pub struct RecordingReplies {
    sent: Mutex<Vec<(i64, Option<i64>, String)>>,
}

impl RecordingReplies {
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl ReplySink for RecordingReplies {
    async fn reply(&self, chat_id: i64, reply_to: Option<i64>, text: &str) -> Result<(), TelegramError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id, reply_to, text.to_string()));
        Ok(())
    }
}

/// Fixed `getWebhookInfo` answer; `None` fails like an unreachable Bot API
pub struct StubWebhook(pub Option<WebhookInfo>);

impl StubWebhook {
    pub fn registered() -> Self {
        StubWebhook(Some(WebhookInfo {
            url: "https://relay.example.com/telegram/webhook".to_string(),
            pending_update_count: 1,
            max_connections: Some(40),
            allowed_updates: Some(vec!["message".to_string(), "edited_message".to_string()]),
            ..WebhookInfo::default()
        }))
    }
}

#[async_trait]
impl WebhookInfoSource for StubWebhook {
    async fn webhook_info(&self) -> Result<WebhookInfo, TelegramError> {
        self.0.clone().ok_or_else(|| TelegramError::Api {
            code: 401,
            description: "Unauthorized".to_string(),
            retry_after: None,
        })
    }
}

/// Serves the same bytes for every file id
pub struct CannedFetcher(pub Bytes);

#[async_trait]
impl FileFetcher for CannedFetcher {
    async fn fetch(&self, _file_id: &str) -> Result<Bytes, FetchError> {
        Ok(self.0.clone())
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub destination: Arc<MemoryDestination>,
    pub replies: Arc<RecordingReplies>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Wait for background relay work to show up at the destination
    pub async fn wait_for_appends(&self, expected: usize) {
        for _ in 0..100 {
            if self.destination.appends().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "expected {} appends, saw {}",
            expected,
            self.destination.appends().len()
        );
    }

    pub async fn wait_for_replies(&self, expected: usize) {
        for _ in 0..100 {
            if self.replies.texts().len() >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("expected {} replies, saw {:?}", expected, self.replies.texts());
    }
}

/// Defaults for tests: secrets set, no retry delays
pub fn test_config() -> RelayConfig {
    RelayConfig {
        api_secret: Some(API_SECRET.to_string()),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        retry: RetrySettings {
            max_attempts: 3,
            initial_delay_ms: 0,
            max_delay_ms: 0,
        },
        ..RelayConfig::default()
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config(), MemoryDestination::new()).await
}

pub async fn setup_test_app_with(relay: RelayConfig, destination: MemoryDestination) -> TestApp {
    setup_test_app_full(relay, destination, StubWebhook::registered()).await
}

pub async fn setup_test_app_full(
    relay: RelayConfig,
    destination: MemoryDestination,
    webhook: StubWebhook,
) -> TestApp {
    let config = Config(Box::new(relay));
    let destination = Arc::new(destination);
    let replies = Arc::new(RecordingReplies::default());
    let fetcher = Arc::new(CannedFetcher(Bytes::from_static(b"fetched file body")));

    let state = build_state(
        &config,
        destination.clone(),
        fetcher,
        replies.clone(),
        Arc::new(webhook),
    )
    .expect("Failed to build app state");
    let router = setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        destination,
        replies,
    }
}
