//! Courier Core Library
//!
//! This crate provides the domain models, error types and configuration
//! shared by every Courier component.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, RelayConfig, RetrySettings, TransportMode};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{page_url, ContentKind, TargetSpec, UploadErrorKind, UploadResult};
