//! Destination abstraction
//!
//! The driver only needs two capabilities from the document service: create a
//! page, and append one chunk to an existing page or block.

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DestinationError {
    /// Network failure, timeout or a busy signal; worth retrying
    #[error("transient destination error: {message}")]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// Auth failure, missing target or a payload the service rejects
    #[error("destination rejected request: {message}")]
    Terminal {
        status: Option<u16>,
        message: String,
    },
}

impl DestinationError {
    pub fn transient(message: impl Into<String>) -> Self {
        DestinationError::Transient {
            status: None,
            message: message.into(),
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        DestinationError::Terminal {
            status: None,
            message: message.into(),
        }
    }

    /// Classify an HTTP error status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            408 | 409 | 429 | 500..=599 => DestinationError::Transient {
                status: Some(status),
                message,
            },
            _ => DestinationError::Terminal {
                status: Some(status),
                message,
            },
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, DestinationError::Transient { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            DestinationError::Transient { status, .. } | DestinationError::Terminal { status, .. } => {
                *status
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DestinationError::Transient { message, .. }
            | DestinationError::Terminal { message, .. } => message,
        }
    }
}

/// Payload of one chunk
#[derive(Debug, Clone)]
pub enum ChunkContent<'a> {
    Text(&'a str),
    File {
        data: Bytes,
        filename: &'a str,
        mime_type: &'a str,
    },
}

impl ChunkContent<'_> {
    pub fn len(&self) -> usize {
        match self {
            ChunkContent::Text(text) => text.len(),
            ChunkContent::File { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One append request: chunk `index` of `count`
#[derive(Debug, Clone)]
pub struct ChunkUpload<'a> {
    pub index: usize,
    pub count: usize,
    pub content: ChunkContent<'a>,
}

#[async_trait]
pub trait Destination: Send + Sync {
    /// Create a child page and return its id
    async fn create_page(&self, parent_id: &str, title: &str) -> Result<String, DestinationError>;

    /// Append one chunk to the end of `target_id`
    async fn append_chunk(
        &self,
        target_id: &str,
        chunk: &ChunkUpload<'_>,
    ) -> Result<(), DestinationError>;

    /// Whether a file split into parts can be reassembled into a single file.
    ///
    /// When false, each part of a split file is appended as a file of its own.
    fn assembles_parts(&self) -> bool {
        false
    }

    /// Open a multi-part file upload of `part_count` parts and return its id
    async fn begin_parts(
        &self,
        _filename: &str,
        _mime_type: &str,
        _part_count: usize,
    ) -> Result<String, DestinationError> {
        Err(DestinationError::terminal("multi-part file upload is not supported"))
    }

    /// Send one part of an open upload; `part.index` is zero-based
    async fn send_part(
        &self,
        _upload_id: &str,
        _part: &ChunkUpload<'_>,
    ) -> Result<(), DestinationError> {
        Err(DestinationError::terminal("multi-part file upload is not supported"))
    }

    /// Complete the upload and append the assembled file to `target_id`
    async fn finish_parts(
        &self,
        _target_id: &str,
        _upload_id: &str,
        _filename: &str,
        _mime_type: &str,
    ) -> Result<(), DestinationError> {
        Err(DestinationError::terminal("multi-part file upload is not supported"))
    }
}
