pub mod direct_upload;
pub mod health;
pub mod telegram_webhook;
pub mod webhook_status;
