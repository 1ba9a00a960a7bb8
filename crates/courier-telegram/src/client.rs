use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{Message, TelegramFile, Update, WebhookInfo};

#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("Telegram API error {code}: {description}")]
    Api {
        code: i64,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("Telegram request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected Telegram response: {0}")]
    Decode(String),
}

impl TelegramError {
    /// Server-suggested wait before the next call, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TelegramError::Api {
                retry_after: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
    parameters: Option<ResponseParameters>,
}

/// Telegram Bot API client
pub struct TelegramClient {
    http_client: Client,
    token: String,
    base_url: String,
}

impl Debug for TelegramClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// `timeout` bounds every call; long polls add their own wait on top.
    pub fn new(token: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for Telegram")?;

        Ok(Self {
            http_client,
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
        extra_wait: Option<Duration>,
    ) -> Result<T, TelegramError> {
        let mut request = self.http_client.post(self.method_url(method)).json(&body);
        if let Some(wait) = extra_wait {
            // Client timeout would otherwise cut long polls short
            request = request.timeout(wait + Duration::from_secs(10));
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let parsed: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| {
            TelegramError::Decode(format!("{} (HTTP {}): {}", method, status.as_u16(), e))
        })?;

        if !parsed.ok {
            return Err(TelegramError::Api {
                code: parsed
                    .error_code
                    .unwrap_or_else(|| i64::from(status.as_u16())),
                description: parsed
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
                retry_after: parsed.parameters.and_then(|p| p.retry_after),
            });
        }

        parsed
            .result
            .ok_or_else(|| TelegramError::Decode(format!("{} returned no result", method)))
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        let mut body = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "edited_message"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", body, Some(Duration::from_secs(timeout_secs)))
            .await
    }

    pub async fn get_file(&self, file_id: &str) -> Result<TelegramFile, TelegramError> {
        self.call("getFile", json!({ "file_id": file_id }), None)
            .await
    }

    /// Download a file by the `file_path` returned from `getFile`
    pub async fn download_file(&self, file_path: &str) -> Result<Bytes, TelegramError> {
        let url = format!("{}/file/bot{}/{}", self.base_url, self.token, file_path);
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let description = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TelegramError::Api {
                code: i64::from(status.as_u16()),
                description,
                retry_after: None,
            });
        }

        Ok(response.bytes().await?)
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<Message, TelegramError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        if let Some(reply_to) = reply_to_message_id {
            body["reply_parameters"] = json!({
                "message_id": reply_to,
                "allow_sending_without_reply": true,
            });
        }
        self.call("sendMessage", body, None).await
    }

    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<bool, TelegramError> {
        let mut body = json!({
            "url": url,
            "allowed_updates": ["message", "edited_message"],
        });
        if let Some(secret) = secret_token {
            body["secret_token"] = json!(secret);
        }
        self.call("setWebhook", body, None).await
    }

    pub async fn delete_webhook(&self) -> Result<bool, TelegramError> {
        self.call("deleteWebhook", json!({ "drop_pending_updates": false }), None)
            .await
    }

    pub async fn get_webhook_info(&self) -> Result<WebhookInfo, TelegramError> {
        self.call("getWebhookInfo", json!({}), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> TelegramClient {
        TelegramClient::new("123:abc", server.url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_updates_passes_offset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/getUpdates")
            .match_body(Matcher::PartialJson(json!({ "offset": 11, "timeout": 0 })))
            .with_status(200)
            .with_body(
                json!({
                    "ok": true,
                    "result": [{
                        "update_id": 11,
                        "message": {
                            "message_id": 1,
                            "chat": { "id": 9, "type": "private" },
                            "text": "hi"
                        }
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let updates = client(&server).get_updates(Some(11), 0).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 11);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_carries_retry_after() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/sendMessage")
            .with_status(429)
            .with_body(
                json!({
                    "ok": false,
                    "error_code": 429,
                    "description": "Too Many Requests: retry after 3",
                    "parameters": { "retry_after": 3 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server).send_message(1, "hello", None).await.unwrap_err();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        assert!(matches!(err, TelegramError::Api { code: 429, .. }));
    }

    #[tokio::test]
    async fn test_send_message_replies_to_original() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/sendMessage")
            .match_body(Matcher::PartialJson(json!({
                "chat_id": 77,
                "text": "Saved",
                "reply_parameters": { "message_id": 5 }
            })))
            .with_status(200)
            .with_body(
                json!({
                    "ok": true,
                    "result": { "message_id": 6, "chat": { "id": 77, "type": "private" }, "text": "Saved" }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let sent = client(&server).send_message(77, "Saved", Some(5)).await.unwrap();
        assert_eq!(sent.message_id, 6);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_webhook_sends_secret() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/setWebhook")
            .match_body(Matcher::PartialJson(json!({
                "url": "https://relay.example.com/telegram/webhook",
                "secret_token": "s3cret"
            })))
            .with_status(200)
            .with_body(json!({ "ok": true, "result": true }).to_string())
            .create_async()
            .await;

        let ok = client(&server)
            .set_webhook("https://relay.example.com/telegram/webhook", Some("s3cret"))
            .await
            .unwrap();
        assert!(ok);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_webhook_info() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bot123:abc/getWebhookInfo")
            .with_status(200)
            .with_body(
                json!({
                    "ok": true,
                    "result": {
                        "url": "https://relay.example.com/telegram/webhook",
                        "has_custom_certificate": false,
                        "pending_update_count": 2,
                        "last_error_date": 1_700_000_000,
                        "last_error_message": "Connection refused",
                        "max_connections": 40,
                        "allowed_updates": ["message", "edited_message"]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let info = client(&server).get_webhook_info().await.unwrap();
        assert_eq!(info.url, "https://relay.example.com/telegram/webhook");
        assert_eq!(info.pending_update_count, 2);
        assert_eq!(info.last_error_message.as_deref(), Some("Connection refused"));
        assert_eq!(info.max_connections, Some(40));
        assert_eq!(info.allowed_updates.map(|u| u.len()), Some(2));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_webhook_info_without_webhook() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/getWebhookInfo")
            .with_status(200)
            .with_body(json!({ "ok": true, "result": { "url": "", "pending_update_count": 0 } }).to_string())
            .create_async()
            .await;

        let info = client(&server).get_webhook_info().await.unwrap();
        assert!(info.url.is_empty());
        assert_eq!(info.last_error_date, None);
        assert_eq!(info.allowed_updates, None);
    }

    #[tokio::test]
    async fn test_download_file_reads_bytes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/file/bot123:abc/documents/file_1.pdf")
            .with_status(200)
            .with_body(b"%PDF-1.7".to_vec())
            .create_async()
            .await;

        let bytes = client(&server)
            .download_file("documents/file_1.pdf")
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_garbled_response_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/bot123:abc/deleteWebhook")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let err = client(&server).delete_webhook().await.unwrap_err();
        assert!(matches!(err, TelegramError::Decode(_)));
    }
}
