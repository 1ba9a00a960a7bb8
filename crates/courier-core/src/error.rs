//! Error types module
//!
//! This module provides the application-level error type used by the HTTP and
//! relay layers. Library crates keep their own narrow error enums and convert
//! into `AppError` at the boundary.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like upstream hiccups
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DESTINATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service disabled: {0}")]
    ServiceDisabled(String),

    #[error("Destination error: {0}")]
    Destination(String),

    #[error("Chat platform error: {0}")]
    ChatPlatform(String),

    #[error("Upload incomplete: {chunks_appended} chunk(s) appended: {message}")]
    PartialUpload {
        chunks_appended: usize,
        chunk_count: Option<usize>,
        page_id: Option<String>,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the page ID exists and is shared with the integration"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Send the file through the direct upload API instead"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedContent(_) => (
            415,
            "UNSUPPORTED_CONTENT",
            false,
            Some("Send text, a photo, a document, video, audio or a voice note"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the X-Signature header"),
            false,
            LogLevel::Debug,
        ),
        AppError::ServiceDisabled(_) => (
            503,
            "SERVICE_DISABLED",
            false,
            Some("Configure API_SECRET to enable this endpoint"),
            false,
            LogLevel::Warn,
        ),
        AppError::Destination(_) => (
            502,
            "DESTINATION_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::ChatPlatform(_) => (
            502,
            "CHAT_PLATFORM_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::PartialUpload { .. } => (
            502,
            "PARTIAL_UPLOAD",
            true,
            Some("Inspect the target page and resend the remaining content"),
            false,
            LogLevel::Warn,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::UnsupportedContent(_) => "UnsupportedContent",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::ServiceDisabled(_) => "ServiceDisabled",
            AppError::Destination(_) => "Destination",
            AppError::ChatPlatform(_) => "ChatPlatform",
            AppError::PartialUpload { .. } => "PartialUpload",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::UnsupportedContent(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::ServiceDisabled(ref msg) => msg.clone(),
            AppError::Destination(_) => "Failed to write to Notion".to_string(),
            AppError::ChatPlatform(_) => "Failed to reach Telegram".to_string(),
            AppError::PartialUpload {
                chunks_appended,
                chunk_count,
                ..
            } => match chunk_count {
                Some(total) => format!(
                    "Upload stopped after {} of {} chunks",
                    chunks_appended, total
                ),
                None => format!("Upload stopped after {} chunks", chunks_appended),
            },
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
