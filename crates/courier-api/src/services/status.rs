//! Admin status reporting

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use courier_telegram::{TelegramClient, TelegramError, WebhookInfo};

pub const ADMIN_ONLY_TEXT: &str = "Sorry, this command is for admins only.";

/// Source of the bot's webhook registration
#[async_trait]
pub trait WebhookInfoSource: Send + Sync {
    async fn webhook_info(&self) -> Result<WebhookInfo, TelegramError>;
}

#[async_trait]
impl WebhookInfoSource for TelegramClient {
    async fn webhook_info(&self) -> Result<WebhookInfo, TelegramError> {
        self.get_webhook_info().await
    }
}

/// Process facts shown next to the webhook state
#[derive(Debug, Clone)]
pub struct SystemSnapshot<'a> {
    pub version: &'a str,
    pub transport_mode: &'a str,
    pub uptime: Duration,
    pub active_sessions: usize,
}

pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3_600, (secs % 3_600) / 60);
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, secs % 60)
    }
}

fn format_unix(timestamp: i64) -> String {
    match Utc.timestamp_opt(timestamp, 0).single() {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => timestamp.to_string(),
    }
}

/// Reply text for `/status`
pub fn status_report(system: &SystemSnapshot<'_>, webhook: Result<&WebhookInfo, &TelegramError>) -> String {
    let mut report = format!(
        "System status ({})\n\
         - Version: {}\n\
         - Uptime: {}\n\
         - Transport: {}\n\
         - Active chat sessions: {}\n\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        system.version,
        format_uptime(system.uptime),
        system.transport_mode,
        system.active_sessions,
    );

    match webhook {
        Ok(info) => {
            let url = if info.url.is_empty() { "not set" } else { info.url.as_str() };
            report.push_str(&format!(
                "Webhook:\n\
                 - URL: {}\n\
                 - Pending updates: {}\n\
                 - Max connections: {}\n\
                 - Last error: {}",
                url,
                info.pending_update_count,
                info.max_connections
                    .map_or_else(|| "default".to_string(), |n| n.to_string()),
                match (&info.last_error_message, info.last_error_date) {
                    (Some(message), Some(at)) => format!("{} ({})", message, format_unix(at)),
                    (Some(message), None) => message.clone(),
                    _ => "none".to_string(),
                },
            ));
        }
        Err(e) => report.push_str(&format!("Webhook: unavailable ({})", e)),
    }
    report
}

pub fn online_notice(version: &str, transport_mode: &str) -> String {
    format!("Bot is online (courier {}, {} mode).", version, transport_mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SystemSnapshot<'static> {
        SystemSnapshot {
            version: "0.1.0",
            transport_mode: "webhook",
            uptime: Duration::from_secs(3 * 3_600 + 125),
            active_sessions: 2,
        }
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(59)), "0m 59s");
        assert_eq!(format_uptime(Duration::from_secs(3 * 3_600 + 125)), "3h 2m");
        assert_eq!(format_uptime(Duration::from_secs(2 * 86_400 + 60)), "2d 0h 1m");
    }

    #[test]
    fn test_report_includes_webhook_state() {
        let info = WebhookInfo {
            url: "https://relay.example.com/telegram/webhook".to_string(),
            pending_update_count: 4,
            last_error_date: Some(0),
            last_error_message: Some("Connection refused".to_string()),
            ..WebhookInfo::default()
        };
        let report = status_report(&snapshot(), Ok(&info));

        assert!(report.contains("Version: 0.1.0"));
        assert!(report.contains("Uptime: 3h 2m"));
        assert!(report.contains("Active chat sessions: 2"));
        assert!(report.contains("URL: https://relay.example.com/telegram/webhook"));
        assert!(report.contains("Pending updates: 4"));
        assert!(report.contains("Connection refused (1970-01-01 00:00:00 UTC)"));
    }

    #[test]
    fn test_report_survives_webhook_error() {
        let err = TelegramError::Api {
            code: 401,
            description: "Unauthorized".to_string(),
            retry_after: None,
        };
        let report = status_report(&snapshot(), Err(&err));
        assert!(report.contains("Transport: webhook"));
        assert!(report.contains("Webhook: unavailable"));
    }
}
