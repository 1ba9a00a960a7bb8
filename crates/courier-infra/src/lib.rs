//! Courier Infrastructure Library
//!
//! Shared infrastructure for the relay service:
//! - Middleware (request ID)
//! - Tracing subscriber setup

pub mod middleware;
pub mod telemetry;

pub use middleware::{get_request_id, request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};
