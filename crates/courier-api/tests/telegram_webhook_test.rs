mod helpers;

use std::time::Duration;

use courier_api::setup::server::drain_relay_tasks;
use courier_core::RelayConfig;
use courier_pipeline::memory::MemoryDestination;
use helpers::{setup_test_app, setup_test_app_with, test_config, WEBHOOK_SECRET};
use serde_json::json;

const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

fn text_update(update_id: i64, chat_id: i64, text: &str) -> serde_json::Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id * 10,
            "from": { "id": 42, "is_bot": false, "first_name": "Ada" },
            "chat": { "id": chat_id, "type": "private" },
            "date": 1_700_000_000,
            "text": text
        }
    })
}

#[tokio::test]
async fn test_text_message_is_relayed() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/telegram/webhook")
        .add_header(SECRET_HEADER, WEBHOOK_SECRET)
        .json(&text_update(1, 100, "hello from the chat"))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["ok"], true);

    app.wait_for_appends(1).await;
    let pages = app.destination.pages();
    assert_eq!(pages.len(), 1);
    assert!(pages[0].title.starts_with("Telegram message "));
    assert_eq!(app.destination.content_of(&pages[0].id), b"hello from the chat");

    app.wait_for_replies(1).await;
    assert!(app.replies.texts()[0].starts_with("Saved to Notion"));
}

#[tokio::test]
async fn test_photo_message_uploads_fetched_file() {
    let app = setup_test_app().await;

    let update = json!({
        "update_id": 7,
        "message": {
            "message_id": 70,
            "from": { "id": 42, "is_bot": false, "first_name": "Ada" },
            "chat": { "id": 100, "type": "private" },
            "date": 1_700_000_000,
            "photo": [
                { "file_id": "small", "file_unique_id": "s", "width": 90, "height": 90, "file_size": 100 },
                { "file_id": "large", "file_unique_id": "l", "width": 800, "height": 800, "file_size": 17 }
            ]
        }
    });
    let response = app
        .client()
        .post("/telegram/webhook")
        .add_header(SECRET_HEADER, WEBHOOK_SECRET)
        .json(&update)
        .await;
    assert_eq!(response.status_code(), 200);

    app.wait_for_appends(1).await;
    let appends = app.destination.appends();
    assert_eq!(appends[0].data, b"fetched file body");
    assert!(appends[0].filename.is_some());
}

#[tokio::test]
async fn test_wrong_secret_is_rejected() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/telegram/webhook")
        .add_header(SECRET_HEADER, "not-the-secret")
        .json(&text_update(2, 100, "hello"))
        .await;
    assert_eq!(response.status_code(), 401);

    let response = app
        .client()
        .post("/telegram/webhook")
        .json(&text_update(3, 100, "hello"))
        .await;
    assert_eq!(response.status_code(), 401);

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(app.destination.pages().is_empty());
}

#[tokio::test]
async fn test_malformed_update_is_bad_request() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/telegram/webhook")
        .add_header(SECRET_HEADER, WEBHOOK_SECRET)
        .json(&json!({ "message": "not an update" }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_unauthorized_user_gets_reply_only() {
    let relay = RelayConfig {
        authorized_users: [1].into_iter().collect(),
        ..test_config()
    };
    let app = setup_test_app_with(relay, MemoryDestination::new()).await;

    let response = app
        .client()
        .post("/telegram/webhook")
        .add_header(SECRET_HEADER, WEBHOOK_SECRET)
        .json(&text_update(4, 100, "let me in"))
        .await;
    assert_eq!(response.status_code(), 200);

    app.wait_for_replies(1).await;
    assert!(app.replies.texts()[0].contains("not allowed"));
    assert!(app.destination.pages().is_empty());
}

#[tokio::test]
async fn test_messages_within_window_share_a_page() {
    let app = setup_test_app().await;

    for (id, text) in [(10, "first"), (11, "second")] {
        let response = app
            .client()
            .post("/telegram/webhook")
            .add_header(SECRET_HEADER, WEBHOOK_SECRET)
            .json(&text_update(id, 200, text))
            .await;
        assert_eq!(response.status_code(), 200);
    }

    app.wait_for_appends(2).await;
    let pages = app.destination.pages();
    assert_eq!(pages.len(), 1);
    let content = app.destination.content_of(&pages[0].id);
    assert_eq!(content.len(), "firstsecond".len());
}

#[tokio::test]
async fn test_shutdown_waits_for_running_relays() {
    let destination = MemoryDestination::new().with_append_delay(Duration::from_millis(100));
    let app = setup_test_app_with(test_config(), destination).await;

    for (id, chat) in [(20, 300), (21, 301)] {
        let response = app
            .client()
            .post("/telegram/webhook")
            .add_header(SECRET_HEADER, WEBHOOK_SECRET)
            .json(&text_update(id, chat, "late message"))
            .await;
        assert_eq!(response.status_code(), 200);
    }

    drain_relay_tasks(&app.state.relay_tasks).await;

    // No waiting: the drain only returns after both relays replied
    assert_eq!(app.destination.pages().len(), 2);
    assert_eq!(app.destination.appends().len(), 2);
    assert_eq!(app.replies.texts().len(), 2);
}
