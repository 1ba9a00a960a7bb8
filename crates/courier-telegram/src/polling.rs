//! Long-poll update stream

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream};

use crate::client::TelegramClient;
use crate::types::Update;

#[derive(Debug, Clone)]
pub struct PollingOptions {
    /// Seconds Telegram holds each `getUpdates` call open
    pub timeout_secs: u64,
    pub initial_offset: Option<i64>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            initial_offset: None,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl PollingOptions {
    fn backoff(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

struct PollState {
    client: Arc<TelegramClient>,
    options: PollingOptions,
    offset: Option<i64>,
    pending: VecDeque<Update>,
    failures: u32,
}

/// Endless stream of updates from `getUpdates`.
///
/// Nothing is requested until the stream is polled. Each received update
/// advances the offset so it is acknowledged on the next call. Errors are
/// logged and retried with exponential backoff, honouring `retry_after`.
pub fn poll_updates(
    client: Arc<TelegramClient>,
    options: PollingOptions,
) -> impl Stream<Item = Update> + Send + 'static {
    let state = PollState {
        client,
        offset: options.initial_offset,
        options,
        pending: VecDeque::new(),
        failures: 0,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(update) = state.pending.pop_front() {
                return Some((update, state));
            }

            match state
                .client
                .get_updates(state.offset, state.options.timeout_secs)
                .await
            {
                Ok(updates) => {
                    if state.failures > 0 {
                        tracing::info!(failures = state.failures, "Telegram polling recovered");
                    }
                    state.failures = 0;
                    for update in updates {
                        state.offset = Some(update.update_id + 1);
                        state.pending.push_back(update);
                    }
                }
                Err(e) => {
                    state.failures += 1;
                    let delay = e
                        .retry_after()
                        .unwrap_or_else(|| state.options.backoff(state.failures));
                    tracing::warn!(
                        error = %e,
                        failures = state.failures,
                        delay_ms = delay.as_millis() as u64,
                        "getUpdates failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use mockito::Matcher;
    use serde_json::json;

    fn update(id: i64, text: &str) -> serde_json::Value {
        json!({
            "update_id": id,
            "message": { "message_id": id, "chat": { "id": 1, "type": "private" }, "text": text }
        })
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let options = PollingOptions {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            ..PollingOptions::default()
        };
        assert_eq!(options.backoff(1), Duration::from_millis(100));
        assert_eq!(options.backoff(2), Duration::from_millis(200));
        assert_eq!(options.backoff(3), Duration::from_millis(400));
        assert_eq!(options.backoff(4), Duration::from_millis(500));
        assert_eq!(options.backoff(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_stream_advances_offset() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/bott/getUpdates")
            .match_body(Matcher::PartialJson(json!({ "offset": 1 })))
            .with_status(200)
            .with_body(json!({ "ok": true, "result": [update(10, "a"), update(11, "b")] }).to_string())
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/bott/getUpdates")
            .match_body(Matcher::PartialJson(json!({ "offset": 12 })))
            .with_status(200)
            .with_body(json!({ "ok": true, "result": [update(12, "c")] }).to_string())
            .expect_at_least(1)
            .create_async()
            .await;

        let client = TelegramClient::new("t", server.url(), Duration::from_secs(5)).unwrap();
        let options = PollingOptions {
            timeout_secs: 0,
            initial_offset: Some(1),
            ..PollingOptions::default()
        };
        let updates: Vec<Update> = poll_updates(Arc::new(client), options)
            .take(3)
            .collect()
            .await;

        let ids: Vec<i64> = updates.iter().map(|u| u.update_id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_nothing_is_requested_until_polled() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bott/getUpdates")
            .expect(0)
            .create_async()
            .await;

        let client = TelegramClient::new("t", server.url(), Duration::from_secs(5)).unwrap();
        let stream = poll_updates(Arc::new(client), PollingOptions::default());
        drop(stream);
        mock.assert_async().await;
    }
}
