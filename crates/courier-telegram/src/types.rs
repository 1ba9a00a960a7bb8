//! Bot API objects, limited to the fields the relay reads

use courier_pipeline::{AttachmentMeta, InboundEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub edited_message: Option<Message>,
}

impl Update {
    /// The message to relay; edits are treated as new content
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref().or(self.edited_message.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Video {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Audio {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Voice {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub video: Option<Video>,
    #[serde(default)]
    pub audio: Option<Audio>,
    #[serde(default)]
    pub voice: Option<Voice>,
}

impl Message {
    pub fn sender_id(&self) -> Option<i64> {
        self.from.as_ref().map(|user| user.id)
    }

    /// Bot command name without the leading slash or `@botname` suffix
    pub fn command(&self) -> Option<&str> {
        let text = self.text.as_deref()?.trim_start();
        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        Some(word.split('@').next().unwrap_or(word))
    }
}

/// Result of `getFile`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramFile {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_path: Option<String>,
}

/// Result of `getWebhookInfo`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebhookInfo {
    /// Empty when no webhook is registered
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub has_custom_certificate: bool,
    #[serde(default)]
    pub pending_update_count: i64,
    /// Unix time of the most recent delivery error
    #[serde(default)]
    pub last_error_date: Option<i64>,
    #[serde(default)]
    pub last_error_message: Option<String>,
    #[serde(default)]
    pub max_connections: Option<i64>,
    #[serde(default)]
    pub allowed_updates: Option<Vec<String>>,
}

impl From<&Message> for InboundEvent {
    fn from(message: &Message) -> Self {
        InboundEvent {
            message_id: message.message_id,
            text: message.text.clone(),
            caption: message.caption.clone(),
            photo: message
                .photo
                .iter()
                .map(|size| AttachmentMeta {
                    file_id: size.file_id.clone(),
                    file_size: size.file_size,
                    file_name: None,
                    mime_type: None,
                })
                .collect(),
            document: message.document.as_ref().map(|d| AttachmentMeta {
                file_id: d.file_id.clone(),
                file_size: d.file_size,
                file_name: d.file_name.clone(),
                mime_type: d.mime_type.clone(),
            }),
            video: message.video.as_ref().map(|v| AttachmentMeta {
                file_id: v.file_id.clone(),
                file_size: v.file_size,
                file_name: v.file_name.clone(),
                mime_type: v.mime_type.clone(),
            }),
            audio: message.audio.as_ref().map(|a| AttachmentMeta {
                file_id: a.file_id.clone(),
                file_size: a.file_size,
                file_name: a.file_name.clone(),
                mime_type: a.mime_type.clone(),
            }),
            voice: message.voice.as_ref().map(|v| AttachmentMeta {
                file_id: v.file_id.clone(),
                file_size: v.file_size,
                file_name: None,
                mime_type: v.mime_type.clone(),
            }),
        }
    }
}
