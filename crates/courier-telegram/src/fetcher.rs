use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use courier_pipeline::{FetchError, FileFetcher};

use crate::client::{TelegramClient, TelegramError};

/// Downloads attachments through `getFile`, refusing anything above the ceiling
pub struct TelegramFileFetcher {
    client: Arc<TelegramClient>,
    ceiling: u64,
}

impl TelegramFileFetcher {
    pub fn new(client: Arc<TelegramClient>, ceiling: u64) -> Self {
        Self { client, ceiling }
    }
}

fn fetch_error(file_id: &str, err: TelegramError) -> FetchError {
    match &err {
        TelegramError::Api { description, .. } => {
            let lower = description.to_lowercase();
            if lower.contains("too big") {
                FetchError::TooLarge(file_id.to_string())
            } else if lower.contains("not found") || lower.contains("wrong file_id") || lower.contains("invalid file_id") {
                FetchError::NotFound(file_id.to_string())
            } else {
                FetchError::Transport(err.to_string())
            }
        }
        _ => FetchError::Transport(err.to_string()),
    }
}

#[async_trait]
impl FileFetcher for TelegramFileFetcher {
    async fn fetch(&self, file_id: &str) -> Result<Bytes, FetchError> {
        let file = self
            .client
            .get_file(file_id)
            .await
            .map_err(|e| fetch_error(file_id, e))?;

        if file.file_size.is_some_and(|size| size > self.ceiling) {
            return Err(FetchError::TooLarge(file_id.to_string()));
        }
        let path = file
            .file_path
            .ok_or_else(|| FetchError::NotFound(file_id.to_string()))?;

        let bytes = self
            .client
            .download_file(&path)
            .await
            .map_err(|e| fetch_error(file_id, e))?;
        if bytes.len() as u64 > self.ceiling {
            return Err(FetchError::TooLarge(file_id.to_string()));
        }

        tracing::debug!(file_id = %file_id, bytes = bytes.len(), "Downloaded Telegram file");
        Ok(bytes)
    }
}
