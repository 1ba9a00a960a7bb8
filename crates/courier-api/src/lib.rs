//! Courier API Library
//!
//! HTTP surface, relay service and application setup for the Telegram to
//! Notion relay.

mod api_doc;
pub mod constants;
mod handlers;
mod validation;

pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
