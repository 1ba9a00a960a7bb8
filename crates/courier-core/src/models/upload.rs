use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a run appends its chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetSpec {
    /// Append to a page or block that already exists
    Existing { id: String },
    /// Create a child page under `parent_id` first
    CreatePage { parent_id: String, title: String },
}

impl TargetSpec {
    pub fn existing(id: impl Into<String>) -> Self {
        TargetSpec::Existing { id: id.into() }
    }

    pub fn create_page(parent_id: impl Into<String>, title: impl Into<String>) -> Self {
        TargetSpec::CreatePage {
            parent_id: parent_id.into(),
            title: title.into(),
        }
    }
}

/// Why a run ended in `Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UploadErrorKind {
    /// The destination refused to create the target
    TargetCreation,
    /// The payload bytes could not be obtained
    Fetch,
    /// A chunk kept failing with transient errors until the retry budget ran out
    RetriesExhausted,
    /// The destination rejected a chunk with a non-retriable error
    Rejected,
}

impl UploadErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadErrorKind::TargetCreation => "target_creation",
            UploadErrorKind::Fetch => "fetch",
            UploadErrorKind::RetriesExhausted => "retries_exhausted",
            UploadErrorKind::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for UploadErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one upload run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadResult {
    Completed {
        target_id: String,
        bytes_written: u64,
        chunk_count: usize,
    },
    Failed {
        /// Resolved target, absent when creation itself failed
        target_id: Option<String>,
        /// Number of chunks the destination acknowledged before the failure
        chunks_appended: usize,
        /// Total chunks in the plan, absent when planning was never reached
        chunk_count: Option<usize>,
        /// Index of the chunk that could not be appended
        failed_index: Option<usize>,
        error: UploadErrorKind,
        message: String,
    },
}

impl UploadResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, UploadResult::Completed { .. })
    }

    pub fn target_id(&self) -> Option<&str> {
        match self {
            UploadResult::Completed { target_id, .. } => Some(target_id),
            UploadResult::Failed { target_id, .. } => target_id.as_deref(),
        }
    }

    /// Zero-based index of the last chunk the destination acknowledged
    pub fn last_successful_index(&self) -> Option<usize> {
        match self {
            UploadResult::Completed { chunk_count, .. } => chunk_count.checked_sub(1),
            UploadResult::Failed {
                chunks_appended, ..
            } => chunks_appended.checked_sub(1),
        }
    }
}

/// Public URL of a Notion page id (dashes stripped)
pub fn page_url(page_id: &str) -> String {
    format!("https://www.notion.so/{}", page_id.replace('-', ""))
}
