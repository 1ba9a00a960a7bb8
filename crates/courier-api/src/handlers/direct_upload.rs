//! Direct upload API
//!
//! Multipart uploads that bypass the chat platform. The file (if any) goes
//! first, then the text content, both to the same target.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use courier_core::{page_url, AppError, TargetSpec, UploadResult};
use courier_pipeline::{ChunkLimit, DirectPayload};
use serde::Serialize;
use utoipa::ToSchema;

use crate::constants::SIGNATURE_HEADER;
use crate::error::{upload_failure, ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::validation::require_api_signature;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub page_id: String,
    pub page_url: String,
    /// Chunks appended across file and content
    pub chunks: usize,
    pub bytes_written: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadMode {
    NewPage,
    AppendBlock,
}

#[derive(Debug)]
struct FilePart {
    data: Bytes,
    filename: String,
    mime_type: String,
}

#[derive(Debug, Default)]
struct UploadForm {
    title: Option<String>,
    content: Option<String>,
    file: Option<FilePart>,
    chunk_size: Option<i64>,
    page_id: Option<String>,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, HttpAppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string).unwrap_or_default();
        match name.as_str() {
            "file" => {
                if form.file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    )
                    .into());
                }
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let mime_type = field
                    .content_type()
                    .map(str::to_string)
                    .filter(|ct| ct != "application/octet-stream")
                    .or_else(|| mime_guess::from_path(&filename).first_raw().map(str::to_string))
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await?;
                form.file = Some(FilePart {
                    data,
                    filename,
                    mime_type,
                });
            }
            // Text fields keep their whitespace; only emptiness is checked
            "content" => {
                let text = field.text().await?;
                form.content = (!text.is_empty()).then_some(text);
            }
            "title" => form.title = non_empty(field.text().await?),
            "page_id" => form.page_id = non_empty(field.text().await?),
            "chunk_size" => {
                if let Some(raw) = non_empty(field.text().await?) {
                    let size = raw.parse::<i64>().map_err(|_| {
                        AppError::InvalidInput(format!("chunk_size must be an integer, got '{}'", raw))
                    })?;
                    form.chunk_size = Some(size);
                }
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

/// Add progress from payloads that completed before the failing one
fn with_prior_progress(error: AppError, prior_chunks: usize) -> AppError {
    match error {
        AppError::PartialUpload {
            chunks_appended,
            chunk_count,
            page_id,
            message,
        } => AppError::PartialUpload {
            chunks_appended: chunks_appended + prior_chunks,
            chunk_count: chunk_count.map(|count| count + prior_chunks),
            page_id,
            message,
        },
        other => other,
    }
}

async fn upload(
    state: &AppState,
    headers: &HeaderMap,
    multipart: Multipart,
    mode: UploadMode,
) -> Result<Json<UploadResponse>, HttpAppError> {
    let config = &state.config;
    require_api_signature(headers, SIGNATURE_HEADER, config.api_secret())?;

    let form = read_form(multipart).await?;
    if form.content.is_none() && form.file.is_none() {
        return Err(AppError::InvalidInput(
            "Either 'content' or 'file' must be provided".to_string(),
        )
        .into());
    }

    // Reject bad limits before anything is written
    let file_limit = form.chunk_size.unwrap_or(config.file_chunk_limit());
    let text_limit = form.chunk_size.unwrap_or(config.text_chunk_limit());
    if form.file.is_some() {
        ChunkLimit::new(file_limit)?;
    }
    if form.content.is_some() {
        ChunkLimit::for_text(text_limit)?;
    }

    let mut target = match mode {
        UploadMode::NewPage => TargetSpec::create_page(
            config.notion_parent_page_id(),
            form.title
                .clone()
                .unwrap_or_else(|| format!("Upload {}", Utc::now().format("%Y-%m-%d %H:%M:%S"))),
        ),
        UploadMode::AppendBlock => TargetSpec::existing(
            form.page_id
                .clone()
                .unwrap_or_else(|| config.notion_parent_page_id().to_string()),
        ),
    };

    tracing::info!(
        mode = ?mode,
        has_file = form.file.is_some(),
        has_content = form.content.is_some(),
        chunk_size = ?form.chunk_size,
        "Processing direct upload"
    );

    let mut payloads = Vec::with_capacity(2);
    if let Some(file) = form.file {
        payloads.push((
            DirectPayload::File {
                data: file.data,
                filename: file.filename,
                mime_type: file.mime_type,
            },
            file_limit,
        ));
    }
    if let Some(content) = form.content {
        payloads.push((DirectPayload::Text(content), text_limit));
    }

    let mut chunks = 0;
    let mut bytes_written = 0;
    let mut page_id = None;
    for (payload, limit) in payloads {
        let result = state.gateway.submit(payload, target.clone(), limit).await?;
        if let Some(error) = upload_failure(&result) {
            return Err(with_prior_progress(error, chunks).into());
        }
        if let UploadResult::Completed {
            target_id,
            bytes_written: written,
            chunk_count,
        } = result
        {
            chunks += chunk_count;
            bytes_written += written;
            target = TargetSpec::existing(target_id.clone());
            page_id = Some(target_id);
        }
    }

    let page_id = page_id.ok_or_else(|| AppError::Internal("Upload produced no target".to_string()))?;
    tracing::info!(page_id = %page_id, chunks = chunks, bytes_written = bytes_written, "Direct upload completed");

    Ok(Json(UploadResponse {
        message: "Content/File uploaded successfully".to_string(),
        page_url: page_url(&page_id),
        page_id,
        chunks,
        bytes_written,
    }))
}

/// Upload content as a new page under the configured parent
#[utoipa::path(
    post,
    path = "/api/upload_page",
    tag = "upload",
    params(
        ("X-Signature" = String, Header, description = "Shared API secret")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Fields: title, content, file, chunk_size"),
    responses(
        (status = 200, description = "Content uploaded", body = UploadResponse),
        (status = 400, description = "Invalid input or chunk size", body = ErrorResponse),
        (status = 401, description = "Invalid signature", body = ErrorResponse),
        (status = 502, description = "Notion failed part way", body = ErrorResponse),
        (status = 503, description = "Direct upload disabled", body = ErrorResponse)
    )
)]
pub async fn upload_page(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    upload(&state, &headers, multipart, UploadMode::NewPage).await
}

/// Append content to an existing page (the configured parent by default)
#[utoipa::path(
    post,
    path = "/api/upload_block",
    tag = "upload",
    params(
        ("X-Signature" = String, Header, description = "Shared API secret")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Fields: page_id, content, file, chunk_size"),
    responses(
        (status = 200, description = "Content appended", body = UploadResponse),
        (status = 400, description = "Invalid input or chunk size", body = ErrorResponse),
        (status = 401, description = "Invalid signature", body = ErrorResponse),
        (status = 502, description = "Notion failed part way", body = ErrorResponse),
        (status = 503, description = "Direct upload disabled", body = ErrorResponse)
    )
)]
pub async fn upload_block(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, HttpAppError> {
    upload(&state, &headers, multipart, UploadMode::AppendBlock).await
}
