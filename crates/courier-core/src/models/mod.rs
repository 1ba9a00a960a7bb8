//! Data models for the upload pipeline
//!
//! Types shared between the pipeline, the destination clients and the HTTP layer.

mod content;
mod upload;

pub use content::*;
pub use upload::*;
