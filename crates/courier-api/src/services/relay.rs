//! Chat relay
//!
//! Single entry point for Telegram updates regardless of how they arrive.
//! Each message is authorized, classified, uploaded to the chat's session page
//! and acknowledged with a reply.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use courier_core::{Config, TargetSpec, UploadResult};
use courier_pipeline::{
    ByteSource, ChunkLimit, ClassificationError, ContentClassifier, InboundEvent, InboundItem,
    ItemLocks, PayloadFormat, UploadDriver, UploadRequest,
};
use courier_telegram::{Message, Update};

use super::replies::{self, ReplySink};
use super::sessions::SessionRegistry;
use super::status::{self, SystemSnapshot, WebhookInfoSource};
use crate::constants::SERVICE_VERSION;

/// What happened to one update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Nothing to relay (no message, or a service update)
    Ignored,
    Unauthorized,
    Command(String),
    Rejected(ClassificationError),
    Uploaded {
        result: UploadResult,
        caption: Option<UploadResult>,
    },
}

pub struct RelayService {
    config: Config,
    driver: Arc<UploadDriver>,
    classifier: ContentClassifier,
    replies: Arc<dyn ReplySink>,
    webhook: Arc<dyn WebhookInfoSource>,
    sessions: SessionRegistry,
    chat_locks: ItemLocks,
    text_limit: ChunkLimit,
    file_limit: ChunkLimit,
    started_at: Instant,
}

fn chat_key(chat_id: i64) -> String {
    format!("chat:{}", chat_id)
}

fn session_title() -> String {
    format!("Telegram message {}", Utc::now().format("%Y-%m-%d %H:%M:%S"))
}

impl RelayService {
    pub fn new(
        config: Config,
        driver: Arc<UploadDriver>,
        classifier: ContentClassifier,
        replies: Arc<dyn ReplySink>,
        webhook: Arc<dyn WebhookInfoSource>,
    ) -> anyhow::Result<Self> {
        let text_limit = ChunkLimit::for_text(config.text_chunk_limit())
            .map_err(|e| anyhow::anyhow!("TEXT_CHUNK_LIMIT: {}", e))?;
        let file_limit = ChunkLimit::new(config.file_chunk_limit())
            .map_err(|e| anyhow::anyhow!("FILE_CHUNK_LIMIT: {}", e))?;
        let sessions = SessionRegistry::new(config.session_window());

        Ok(Self {
            config,
            driver,
            classifier,
            replies,
            webhook,
            sessions,
            chat_locks: ItemLocks::new(),
            text_limit,
            file_limit,
            started_at: Instant::now(),
        })
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Admin `/status` text: process facts plus the live webhook state
    pub async fn status_report(&self) -> String {
        let system = SystemSnapshot {
            version: SERVICE_VERSION,
            transport_mode: self.config.transport_mode().as_str(),
            uptime: self.started_at.elapsed(),
            active_sessions: self.sessions.len(),
        };
        let webhook = self.webhook.webhook_info().await;
        if let Err(e) = &webhook {
            tracing::warn!(error = %e, "Failed to fetch webhook info for status");
        }
        status::status_report(&system, webhook.as_ref())
    }

    /// Tell every admin the bot is up. Returns how many notices were delivered.
    pub async fn notify_admins(&self) -> usize {
        let text = status::online_notice(SERVICE_VERSION, self.config.transport_mode().as_str());
        let mut delivered = 0;
        for admin_id in self.config.admin_ids() {
            match self.replies.reply(admin_id, None, &text).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(admin_id = admin_id, error = %e, "Failed to notify admin");
                }
            }
        }
        tracing::info!(delivered = delivered, "Admins notified of startup");
        delivered
    }

    #[tracing::instrument(skip(self, update), fields(update_id = update.update_id))]
    pub async fn handle_update(&self, update: Update) -> RelayOutcome {
        let Some(message) = update.message() else {
            tracing::debug!("Update carries no message, ignoring");
            return RelayOutcome::Ignored;
        };
        self.handle_message(message).await
    }

    async fn handle_message(&self, message: &Message) -> RelayOutcome {
        let chat_id = message.chat.id;

        let authorized = message
            .sender_id()
            .is_some_and(|user_id| self.config.is_user_authorized(user_id));
        if !authorized {
            tracing::warn!(chat_id = chat_id, user_id = ?message.sender_id(), "Unauthorized sender");
            self.send_reply(chat_id, message.message_id, replies::UNAUTHORIZED_TEXT)
                .await;
            return RelayOutcome::Unauthorized;
        }

        if let Some(command) = message.command() {
            let text = match command {
                "start" => Some(replies::START_TEXT.to_string()),
                "help" => Some(replies::HELP_TEXT.to_string()),
                "status" => {
                    let is_admin = message
                        .sender_id()
                        .is_some_and(|user_id| self.config.is_admin(user_id));
                    if !is_admin {
                        tracing::warn!(chat_id = chat_id, user_id = ?message.sender_id(), "Non-admin asked for status");
                        self.send_reply(chat_id, message.message_id, status::ADMIN_ONLY_TEXT)
                            .await;
                        return RelayOutcome::Unauthorized;
                    }
                    Some(self.status_report().await)
                }
                _ => None,
            };
            if let Some(text) = text {
                self.send_reply(chat_id, message.message_id, &text).await;
                return RelayOutcome::Command(command.to_string());
            }
        }

        let event = InboundEvent::from(message);
        let item = match self.classifier.classify(&event).await {
            Ok(item) => item,
            Err(e) => {
                tracing::info!(chat_id = chat_id, error = %e, "Message rejected");
                self.send_reply(
                    chat_id,
                    message.message_id,
                    &replies::classification_reply(&e),
                )
                .await;
                return RelayOutcome::Rejected(e);
            }
        };

        let outcome = self.relay_item(chat_id, item).await;
        if let RelayOutcome::Uploaded { result, caption } = &outcome {
            let mut text = replies::upload_reply(result);
            if let Some(caption) = caption.as_ref().filter(|c| !c.is_completed()) {
                text.push_str("\nCaption: ");
                text.push_str(&replies::upload_reply(caption));
            }
            self.send_reply(chat_id, message.message_id, &text).await;
        }
        outcome
    }

    async fn relay_item(&self, chat_id: i64, item: InboundItem) -> RelayOutcome {
        let key = chat_key(chat_id);
        // Session lookup and the run happen under one per-chat lock so that
        // two quick messages do not both create a page.
        let _chat_guard = self.chat_locks.acquire(&key).await;

        let target = match self.sessions.active_page(chat_id, Instant::now()) {
            Some(page_id) => TargetSpec::existing(page_id),
            None => TargetSpec::create_page(self.config.notion_parent_page_id(), session_title()),
        };
        let limit = if item.kind.is_text() {
            self.text_limit
        } else {
            self.file_limit
        };
        let caption = item.caption.clone();

        let result = self
            .driver
            .run(UploadRequest::from_item(key.clone(), item, target, limit))
            .await;
        if let Some(page_id) = result.target_id() {
            self.sessions.record(chat_id, page_id, Instant::now());
        }

        let caption = match (caption, &result) {
            (Some(caption), UploadResult::Completed { target_id, .. }) => {
                let request = UploadRequest {
                    item_key: key,
                    source: ByteSource::from(caption),
                    format: PayloadFormat::Text,
                    target: TargetSpec::existing(target_id.clone()),
                    limit: self.text_limit,
                };
                Some(self.driver.run(request).await)
            }
            _ => None,
        };

        RelayOutcome::Uploaded { result, caption }
    }

    async fn send_reply(&self, chat_id: i64, reply_to: i64, text: &str) {
        if let Err(e) = self.replies.reply(chat_id, Some(reply_to), text).await {
            tracing::warn!(chat_id = chat_id, error = %e, "Failed to send reply");
        }
    }
}
