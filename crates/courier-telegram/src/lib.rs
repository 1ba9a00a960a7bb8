//! Telegram Bot API transport
//!
//! Client for the Bot API methods the relay uses, the update types it reads,
//! a [`FileFetcher`](courier_pipeline::FileFetcher) that downloads attachments
//! under the transfer ceiling, and the long-poll update stream.

mod client;
mod fetcher;
mod polling;
mod types;

pub use client::{TelegramClient, TelegramError};
pub use fetcher::TelegramFileFetcher;
pub use polling::{poll_updates, PollingOptions};
pub use types::{
    Audio, Chat, Document, Message, PhotoSize, TelegramFile, Update, User, Video, Voice, WebhookInfo,
};
