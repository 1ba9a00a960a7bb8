//! Relay services

pub mod relay;
pub mod replies;
pub mod sessions;
pub mod status;

pub use relay::{RelayOutcome, RelayService};
pub use replies::ReplySink;
pub use sessions::SessionRegistry;
pub use status::WebhookInfoSource;
