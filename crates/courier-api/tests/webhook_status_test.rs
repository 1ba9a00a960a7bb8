mod helpers;

use courier_pipeline::memory::MemoryDestination;
use helpers::{setup_test_app, setup_test_app_full, test_config, StubWebhook};

#[tokio::test]
async fn test_webhook_status_reports_telegram_state() {
    let app = setup_test_app().await;

    let response = app.client().get("/webhook_status").await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    assert_eq!(body["webhook_url"], "https://relay.example.com/telegram/webhook");
    assert_eq!(body["has_custom_certificate"], false);
    assert_eq!(body["pending_update_count"], 1);
    assert_eq!(body["max_connections"], 40);
    assert_eq!(body["allowed_updates"][1], "edited_message");
    assert!(body["last_error_date"].is_null());
    assert!(body["last_error_message"].is_null());
}

#[tokio::test]
async fn test_webhook_status_when_telegram_fails() {
    let app = setup_test_app_full(test_config(), MemoryDestination::new(), StubWebhook(None)).await;

    let response = app.client().get("/webhook_status").await;
    assert_eq!(response.status_code(), 502);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "CHAT_PLATFORM_ERROR");
}
