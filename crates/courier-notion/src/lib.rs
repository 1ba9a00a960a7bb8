//! Notion destination
//!
//! HTTP client for the subset of the Notion API the relay writes through:
//! page creation, block appends and single-part file uploads. [`NotionClient`]
//! implements the pipeline's `Destination` trait.

mod blocks;
mod client;
mod destination;

pub use blocks::{block_type_for_mime, file_block, page_payload, paragraph};
pub use client::{FileUpload, NotionClient, NotionConfig, NotionError};
