//! Chat acknowledgements

use async_trait::async_trait;
use courier_core::{page_url, UploadResult};
use courier_pipeline::ClassificationError;
use courier_telegram::{TelegramClient, TelegramError};

pub const START_TEXT: &str = "Hi! Send me text, photos, documents, videos, audio or voice notes \
and I will save them to Notion.";

pub const HELP_TEXT: &str = "Send any message to save it to Notion.\n\
- Text is stored as paragraphs.\n\
- Photos, documents, videos, audio and voice notes are uploaded as files (20 MB max).\n\
- Captions are saved after the file.\n\
Messages sent close together go to the same page.\n\n\
Commands: /start, /help (admins: /status)";

pub const UNAUTHORIZED_TEXT: &str = "Sorry, you are not allowed to use this bot.";

/// Where acknowledgements and admin notices go
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// `reply_to` quotes the originating message; `None` sends a plain message
    async fn reply(&self, chat_id: i64, reply_to: Option<i64>, text: &str) -> Result<(), TelegramError>;
}

#[async_trait]
impl ReplySink for TelegramClient {
    async fn reply(&self, chat_id: i64, reply_to: Option<i64>, text: &str) -> Result<(), TelegramError> {
        self.send_message(chat_id, text, reply_to).await?;
        Ok(())
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Acknowledgement for a finished run
pub fn upload_reply(result: &UploadResult) -> String {
    match result {
        UploadResult::Completed {
            target_id,
            bytes_written,
            chunk_count,
        } => {
            let chunks = if *chunk_count == 1 {
                "1 chunk".to_string()
            } else {
                format!("{} chunks", chunk_count)
            };
            format!(
                "Saved to Notion ({}, {}).\n{}",
                chunks,
                format_size(*bytes_written),
                page_url(target_id)
            )
        }
        UploadResult::Failed {
            target_id,
            chunks_appended,
            chunk_count,
            message,
            ..
        } => {
            let progress = match chunk_count {
                Some(total) => format!("saved {} of {} chunks", chunks_appended, total),
                None => "nothing was saved".to_string(),
            };
            let mut reply = format!("Upload failed, {}: {}", progress, message);
            if let Some(id) = target_id {
                reply.push('\n');
                reply.push_str(&page_url(id));
            }
            reply
        }
    }
}

pub fn classification_reply(err: &ClassificationError) -> String {
    match err {
        ClassificationError::Unsupported => {
            "This message type is not supported. Send text, a photo, a document, video, audio or a voice note.".to_string()
        }
        _ => format!("Cannot save this message: {}.", err),
    }
}
