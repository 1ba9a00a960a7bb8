//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors from
//! the pipeline crates convert into `AppError` here so every failure renders
//! the same JSON body.

use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courier_core::{AppError, ErrorMetadata, LogLevel, UploadErrorKind, UploadResult};
use courier_pipeline::{ClassificationError, FetchError, PlanError};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Chunks written before a partial upload stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_appended: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    /// Page that holds the partial content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Failed to read multipart: {}",
            err.body_text()
        )))
    }
}

impl From<PlanError> for HttpAppError {
    fn from(err: PlanError) -> Self {
        HttpAppError(AppError::InvalidInput(err.to_string()))
    }
}

impl From<ClassificationError> for HttpAppError {
    fn from(err: ClassificationError) -> Self {
        let app = match err {
            ClassificationError::Unsupported => AppError::UnsupportedContent(err.to_string()),
            ClassificationError::UnsupportedMime { .. } => {
                AppError::UnsupportedContent(err.to_string())
            }
            ClassificationError::OversizedDeclared { .. } => {
                AppError::PayloadTooLarge(err.to_string())
            }
            ClassificationError::Fetch(FetchError::TooLarge(_)) => {
                AppError::PayloadTooLarge(err.to_string())
            }
            ClassificationError::Fetch(FetchError::NotFound(_)) => AppError::NotFound(err.to_string()),
            ClassificationError::Fetch(FetchError::Transport(_)) => {
                AppError::ChatPlatform(err.to_string())
            }
        };
        HttpAppError(app)
    }
}

/// Error for a run that did not complete; `None` when it did.
pub fn upload_failure(result: &UploadResult) -> Option<AppError> {
    let UploadResult::Failed {
        target_id,
        chunks_appended,
        chunk_count,
        error,
        message,
        ..
    } = result
    else {
        return None;
    };

    let app = match error {
        UploadErrorKind::TargetCreation => AppError::Destination(message.clone()),
        UploadErrorKind::Fetch => AppError::Internal(message.clone()),
        UploadErrorKind::RetriesExhausted | UploadErrorKind::Rejected => AppError::PartialUpload {
            chunks_appended: *chunks_appended,
            chunk_count: *chunk_count,
            page_id: target_id.clone(),
            message: message.clone(),
        },
    };
    Some(app)
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl ErrorResponse {
    fn from_app_error(app_error: &AppError, with_details: bool) -> Self {
        let (chunks_appended, chunk_count, page_id) = match app_error {
            AppError::PartialUpload {
                chunks_appended,
                chunk_count,
                page_id,
                ..
            } => (Some(*chunks_appended), *chunk_count, page_id.clone()),
            _ => (None, None, None),
        };

        Self {
            error: app_error.client_message(),
            details: with_details.then(|| app_error.detailed_message()),
            error_type: with_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
            chunks_appended,
            chunk_count,
            page_id,
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details stay hidden in production and for sensitive errors.
        let with_details = !is_production_env() && !app_error.is_sensitive();
        let body = ErrorResponse::from_app_error(app_error, with_details);

        (status, Json(body)).into_response()
    }
}
