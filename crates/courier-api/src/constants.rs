//! API constants

/// Service name reported in logs and the banner
pub const SERVICE_NAME: &str = "courier";

pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// API base path prefix
pub const API_BASE: &str = "/api";

pub const UPLOAD_PAGE_PATH: &str = "/api/upload_page";
pub const UPLOAD_BLOCK_PATH: &str = "/api/upload_block";
pub const OPENAPI_PATH: &str = "/api/openapi.json";
pub const HEALTH_PATH: &str = "/healthz";
pub const WEBHOOK_STATUS_PATH: &str = "/webhook_status";

/// Shared secret header for the direct upload API
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Header Telegram sends when the webhook was registered with a secret token
pub const TELEGRAM_SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

/// Request body cap for direct uploads (512 MiB)
pub const MAX_DIRECT_UPLOAD_BYTES: usize = 512 * 1024 * 1024;
