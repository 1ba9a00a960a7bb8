//! Upload driver
//!
//! Runs one upload from target resolution to a terminal [`UploadResult`]:
//!
//! 1. resolve the target (reuse an id or create a page)
//! 2. fetch the bytes and plan chunks against the measured length
//! 3. append chunks strictly in ascending index order, retrying transient failures
//!
//! A file split into several chunks goes to destinations that can reassemble
//! it as parts of one upload: parts are sent in ascending order and a single
//! file is appended once the last part is in.
//!
//! Nothing is rolled back on failure; the result records how far the run got.

use std::sync::Arc;

use bytes::Bytes;
use courier_core::{TargetSpec, UploadErrorKind, UploadResult};

use crate::destination::{ChunkContent, ChunkUpload, Destination};
use crate::locks::ItemLocks;
use crate::planner::{ChunkLimit, ChunkPlan};
use crate::retry::{retry_transient, RetryFailure, RetryPolicy};
use crate::source::{ByteSource, InboundItem};

/// How chunk payloads are presented to the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadFormat {
    Text,
    File { filename: String, mime_type: String },
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Runs sharing a key are serialized
    pub item_key: String,
    pub source: ByteSource,
    pub format: PayloadFormat,
    pub target: TargetSpec,
    pub limit: ChunkLimit,
}

impl UploadRequest {
    pub fn from_item(
        item_key: impl Into<String>,
        item: InboundItem,
        target: TargetSpec,
        limit: ChunkLimit,
    ) -> Self {
        let format = match item.filename {
            Some(filename) if !item.kind.is_text() => PayloadFormat::File {
                filename,
                mime_type: item.mime_type,
            },
            _ => PayloadFormat::Text,
        };
        Self {
            item_key: item_key.into(),
            source: item.source,
            format,
            target,
            limit,
        }
    }
}

pub struct UploadDriver {
    destination: Arc<dyn Destination>,
    policy: RetryPolicy,
    locks: ItemLocks,
}

impl UploadDriver {
    pub fn new(destination: Arc<dyn Destination>, policy: RetryPolicy) -> Self {
        Self {
            destination,
            policy,
            locks: ItemLocks::new(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn locks(&self) -> &ItemLocks {
        &self.locks
    }

    #[tracing::instrument(skip(self, request), fields(item_key = %request.item_key))]
    pub async fn run(&self, request: UploadRequest) -> UploadResult {
        let _guard = self.locks.acquire(&request.item_key).await;

        // Created -> TargetReady
        let target_id = match self.resolve_target(&request.target).await {
            Ok(id) => id,
            Err(message) => {
                tracing::error!(error = %message, "Failed to resolve upload target");
                return UploadResult::Failed {
                    target_id: None,
                    chunks_appended: 0,
                    chunk_count: None,
                    failed_index: None,
                    error: UploadErrorKind::TargetCreation,
                    message,
                };
            }
        };

        // TargetReady -> Appending(0); declared sizes are advisory, so measure here.
        let bytes = match request.source.fetch().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(target_id = %target_id, error = %e, "Failed to fetch payload");
                return fetch_failure(target_id, e.to_string());
            }
        };

        let text = match request.format {
            PayloadFormat::Text => match std::str::from_utf8(&bytes) {
                Ok(text) => Some(text),
                Err(e) => {
                    return fetch_failure(target_id, format!("text payload is not UTF-8: {}", e))
                }
            },
            PayloadFormat::File { .. } => None,
        };

        let plan = match text {
            Some(text) => ChunkPlan::for_text(text, request.limit),
            None => ChunkPlan::for_length(bytes.len() as u64, request.limit),
        };

        tracing::info!(
            target_id = %target_id,
            total_bytes = plan.total_size(),
            chunk_count = plan.len(),
            limit = plan.limit(),
            "Starting chunked append"
        );

        match &request.format {
            PayloadFormat::File {
                filename,
                mime_type,
            } if plan.len() > 1 && self.destination.assembles_parts() => {
                self.upload_parts(&target_id, &bytes, filename, mime_type, &plan)
                    .await
            }
            format => self.append_all(&target_id, &bytes, text, format, &plan).await,
        }
    }

    async fn resolve_target(&self, target: &TargetSpec) -> Result<String, String> {
        match target {
            TargetSpec::Existing { id } => Ok(id.clone()),
            TargetSpec::CreatePage { parent_id, title } => {
                let destination = &self.destination;
                let page_id = retry_transient(&self.policy, |_| {
                    destination.create_page(parent_id, title)
                })
                .await
                .map_err(|failure| failure.error.to_string())?;
                tracing::info!(page_id = %page_id, "Created target page");
                Ok(page_id)
            }
        }
    }

    async fn append_all(
        &self,
        target_id: &str,
        bytes: &Bytes,
        text: Option<&str>,
        format: &PayloadFormat,
        plan: &ChunkPlan,
    ) -> UploadResult {
        let count = plan.len();
        let part_names = part_filenames(format, count);

        for chunk in plan.iter() {
            let content = match (text, format) {
                (Some(text), _) => ChunkContent::Text(&text[chunk.range()]),
                (None, PayloadFormat::File { mime_type, .. }) => ChunkContent::File {
                    data: bytes.slice(chunk.range()),
                    filename: &part_names[chunk.index],
                    mime_type,
                },
                (None, PayloadFormat::Text) => ChunkContent::Text(""),
            };
            let upload = ChunkUpload {
                index: chunk.index,
                count,
                content,
            };

            let destination = &self.destination;
            let upload_ref = &upload;
            let outcome = retry_transient(&self.policy, |attempt| {
                tracing::debug!(
                    target_id = %target_id,
                    chunk_index = chunk.index,
                    chunk_count = count,
                    bytes = chunk.len(),
                    attempt = attempt,
                    "Appending chunk"
                );
                destination.append_chunk(target_id, upload_ref)
            })
            .await;

            if let Err(failure) = outcome {
                return chunk_failure(target_id, chunk.index, count, failure);
            }
        }

        completed(target_id, plan)
    }

    /// Send a split file as ordered parts of one upload, then append it once.
    ///
    /// The file only shows up at the target when the upload is finished, so a
    /// failure to finish is charged to the last part.
    async fn upload_parts(
        &self,
        target_id: &str,
        bytes: &Bytes,
        filename: &str,
        mime_type: &str,
        plan: &ChunkPlan,
    ) -> UploadResult {
        let count = plan.len();
        let destination = &self.destination;

        let upload_id = match retry_transient(&self.policy, |_| {
            destination.begin_parts(filename, mime_type, count)
        })
        .await
        {
            Ok(id) => id,
            Err(failure) => return chunk_failure(target_id, 0, count, failure),
        };
        tracing::info!(upload_id = %upload_id, part_count = count, "Opened multi-part upload");

        for chunk in plan.iter() {
            let part = ChunkUpload {
                index: chunk.index,
                count,
                content: ChunkContent::File {
                    data: bytes.slice(chunk.range()),
                    filename,
                    mime_type,
                },
            };
            let upload_id = upload_id.as_str();
            let part_ref = &part;
            let outcome = retry_transient(&self.policy, |attempt| {
                tracing::debug!(
                    upload_id = %upload_id,
                    chunk_index = chunk.index,
                    chunk_count = count,
                    bytes = chunk.len(),
                    attempt = attempt,
                    "Sending file part"
                );
                destination.send_part(upload_id, part_ref)
            })
            .await;
            if let Err(failure) = outcome {
                return chunk_failure(target_id, chunk.index, count, failure);
            }
        }

        let finished = retry_transient(&self.policy, |_| {
            destination.finish_parts(target_id, &upload_id, filename, mime_type)
        })
        .await;
        if let Err(failure) = finished {
            return chunk_failure(target_id, count - 1, count, failure);
        }

        completed(target_id, plan)
    }
}

fn completed(target_id: &str, plan: &ChunkPlan) -> UploadResult {
    tracing::info!(
        target_id = %target_id,
        bytes_written = plan.total_size(),
        chunk_count = plan.len(),
        "Upload completed"
    );

    UploadResult::Completed {
        target_id: target_id.to_string(),
        bytes_written: plan.total_size(),
        chunk_count: plan.len(),
    }
}

/// Stop the run at chunk `index`; everything before it is in place.
fn chunk_failure(target_id: &str, index: usize, count: usize, failure: RetryFailure) -> UploadResult {
    let error = if failure.exhausted {
        UploadErrorKind::RetriesExhausted
    } else {
        UploadErrorKind::Rejected
    };
    tracing::error!(
        target_id = %target_id,
        chunk_index = index,
        chunk_count = count,
        attempts = failure.attempts,
        error = %failure.error,
        "Chunk upload failed, stopping run"
    );
    UploadResult::Failed {
        target_id: Some(target_id.to_string()),
        chunks_appended: index,
        chunk_count: Some(count),
        failed_index: Some(index),
        error,
        message: failure.error.to_string(),
    }
}

fn fetch_failure(target_id: String, message: String) -> UploadResult {
    UploadResult::Failed {
        target_id: Some(target_id),
        chunks_appended: 0,
        chunk_count: None,
        failed_index: None,
        error: UploadErrorKind::Fetch,
        message,
    }
}

/// `report.pdf` split in 3 becomes `report.part1of3.pdf`, ...
fn part_filenames(format: &PayloadFormat, count: usize) -> Vec<String> {
    let PayloadFormat::File { filename, .. } = format else {
        return Vec::new();
    };
    if count <= 1 {
        return vec![filename.clone()];
    }
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename.as_str(), None),
    };
    (1..=count)
        .map(|n| match ext {
            Some(ext) => format!("{}.part{}of{}.{}", stem, n, count, ext),
            None => format!("{}.part{}of{}", stem, n, count),
        })
        .collect()
}
