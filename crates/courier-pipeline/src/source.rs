//! Byte sources and classified inbound items

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use courier_core::ContentKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file exceeds the transfer ceiling: {0}")]
    TooLarge(String),

    #[error("download failed: {0}")]
    Transport(String),
}

/// Downloads attachment bytes from the chat platform on demand
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, file_id: &str) -> Result<Bytes, FetchError>;
}

/// Handle to payload bytes, either already in memory or fetched lazily
#[derive(Clone)]
pub enum ByteSource {
    Buffered(Bytes),
    Remote {
        file_id: String,
        fetcher: Arc<dyn FileFetcher>,
    },
}

impl ByteSource {
    pub fn remote(file_id: impl Into<String>, fetcher: Arc<dyn FileFetcher>) -> Self {
        ByteSource::Remote {
            file_id: file_id.into(),
            fetcher,
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, ByteSource::Buffered(_))
    }

    pub async fn fetch(&self) -> Result<Bytes, FetchError> {
        match self {
            ByteSource::Buffered(bytes) => Ok(bytes.clone()),
            ByteSource::Remote { file_id, fetcher } => fetcher.fetch(file_id).await,
        }
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteSource::Buffered(bytes) => f
                .debug_tuple("Buffered")
                .field(&format_args!("{} bytes", bytes.len()))
                .finish(),
            ByteSource::Remote { file_id, .. } => f
                .debug_struct("Remote")
                .field("file_id", file_id)
                .finish_non_exhaustive(),
        }
    }
}

impl From<String> for ByteSource {
    fn from(text: String) -> Self {
        ByteSource::Buffered(Bytes::from(text))
    }
}

impl From<Bytes> for ByteSource {
    fn from(bytes: Bytes) -> Self {
        ByteSource::Buffered(bytes)
    }
}

/// One classified unit of chat content
#[derive(Debug, Clone)]
pub struct InboundItem {
    pub kind: ContentKind,
    pub source: ByteSource,
    /// Size reported by the platform, or measured when the platform omitted it
    pub declared_size: Option<u64>,
    /// Suggested filename; `None` for text
    pub filename: Option<String>,
    pub mime_type: String,
    /// Caption sent along with an attachment
    pub caption: Option<String>,
}

impl InboundItem {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            kind: ContentKind::Text,
            declared_size: Some(text.len() as u64),
            source: ByteSource::from(text),
            filename: None,
            mime_type: "text/plain".to_string(),
            caption: None,
        }
    }
}
