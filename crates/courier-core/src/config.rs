//! Configuration module
//!
//! Process-wide settings for the relay, loaded once from the environment at
//! startup and shared read-only afterwards.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

// Common constants
const SERVER_PORT: u16 = 8443;
const HTTP_TIMEOUT_SECS: u64 = 30;
const NOTION_VERSION: &str = "2022-06-28";
const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";
const TELEGRAM_API_BASE_URL: &str = "https://api.telegram.org";
const WEBHOOK_PATH: &str = "/telegram/webhook";

/// Inbound transport: exactly one is active per process
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportMode {
    Webhook,
    Polling,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Webhook => "webhook",
            TransportMode::Polling => "polling",
        }
    }
}

impl std::str::FromStr for TransportMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "webhook" => Ok(TransportMode::Webhook),
            "polling" | "poll" | "long_poll" => Ok(TransportMode::Polling),
            other => Err(anyhow::anyhow!(
                "Invalid TRANSPORT_MODE '{}': expected 'webhook' or 'polling'",
                other
            )),
        }
    }
}

/// Backoff settings for chunk appends
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Base configuration for the HTTP side of the process
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub http_timeout_seconds: u64,
}

/// Relay configuration
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub base: BaseConfig,
    // Telegram
    pub telegram_bot_token: String,
    pub telegram_api_base_url: String,
    pub transport_mode: TransportMode,
    pub webhook_url: Option<String>,
    pub webhook_path: String,
    pub webhook_secret: Option<String>,
    pub poll_timeout_seconds: u64,
    pub platform_transfer_ceiling: u64,
    // Notion
    pub notion_key: String,
    pub notion_version: String,
    pub notion_api_base_url: String,
    pub notion_parent_page_id: String,
    // Access control
    pub authorized_users: HashSet<i64>,
    pub admin_users: HashSet<i64>,
    pub api_secret: Option<String>,
    // Upload pipeline
    pub text_chunk_limit: i64,
    pub file_chunk_limit: i64,
    pub retry: RetrySettings,
    /// Seconds a chat keeps appending to the same page. 0 = one page per item.
    pub session_window_seconds: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<RelayConfig>);

impl Config {
    fn as_relay(&self) -> &RelayConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_relay().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = RelayConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_relay().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.as_relay().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.as_relay().base.environment
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.as_relay().base.http_timeout_seconds)
    }

    pub fn telegram_bot_token(&self) -> &str {
        &self.as_relay().telegram_bot_token
    }

    pub fn telegram_api_base_url(&self) -> &str {
        &self.as_relay().telegram_api_base_url
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.as_relay().transport_mode
    }

    pub fn webhook_url(&self) -> Option<&str> {
        self.as_relay().webhook_url.as_deref()
    }

    pub fn webhook_path(&self) -> &str {
        &self.as_relay().webhook_path
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.as_relay().webhook_secret.as_deref()
    }

    pub fn poll_timeout_seconds(&self) -> u64 {
        self.as_relay().poll_timeout_seconds
    }

    pub fn platform_transfer_ceiling(&self) -> u64 {
        self.as_relay().platform_transfer_ceiling
    }

    pub fn notion_key(&self) -> &str {
        &self.as_relay().notion_key
    }

    pub fn notion_version(&self) -> &str {
        &self.as_relay().notion_version
    }

    pub fn notion_api_base_url(&self) -> &str {
        &self.as_relay().notion_api_base_url
    }

    pub fn notion_parent_page_id(&self) -> &str {
        &self.as_relay().notion_parent_page_id
    }

    pub fn api_secret(&self) -> Option<&str> {
        self.as_relay().api_secret.as_deref()
    }

    pub fn text_chunk_limit(&self) -> i64 {
        self.as_relay().text_chunk_limit
    }

    pub fn file_chunk_limit(&self) -> i64 {
        self.as_relay().file_chunk_limit
    }

    pub fn retry(&self) -> &RetrySettings {
        &self.as_relay().retry
    }

    pub fn session_window(&self) -> Duration {
        Duration::from_secs(self.as_relay().session_window_seconds)
    }

    /// Everyone is allowed when neither list is configured; admins always are.
    pub fn is_user_authorized(&self, user_id: i64) -> bool {
        let relay = self.as_relay();
        if relay.authorized_users.is_empty() && relay.admin_users.is_empty() {
            return true;
        }
        relay.authorized_users.contains(&user_id) || relay.admin_users.contains(&user_id)
    }

    /// Admins only; an empty admin list means nobody
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.as_relay().admin_users.contains(&user_id)
    }

    /// Admin ids in ascending order
    pub fn admin_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.as_relay().admin_users.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn has_access_list(&self) -> bool {
        let relay = self.as_relay();
        !relay.authorized_users.is_empty() || !relay.admin_users.is_empty()
    }
}

fn required_var(name: &str) -> Result<String, anyhow::Error> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", name))
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma-separated list of numeric user ids, skipping malformed entries
pub fn parse_user_ids(raw: &str) -> HashSet<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const TEXT_CHUNK_LIMIT: i64 = 2000;
        const FILE_CHUNK_LIMIT: i64 = 10 * 1024 * 1024;
        const PLATFORM_TRANSFER_CEILING: u64 = 20 * 1024 * 1024;
        const POLL_TIMEOUT_SECS: u64 = 30;
        const SESSION_WINDOW_SECS: u64 = 30;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse::<u16>()
            .unwrap_or(SERVER_PORT);

        let http_timeout_seconds = env::var("HTTP_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .unwrap_or(HTTP_TIMEOUT_SECS);

        let telegram_bot_token = required_var("TELEGRAM_BOT_TOKEN")?;
        let notion_key = required_var("NOTION_KEY")?;
        let notion_parent_page_id = required_var("NOTION_PARENT_PAGE_ID")
            .or_else(|_| required_var("PAGE_ID"))
            .map_err(|_| {
                anyhow::anyhow!("NOTION_PARENT_PAGE_ID (or PAGE_ID) environment variable is required")
            })?;

        let transport_mode = match optional_var("TRANSPORT_MODE") {
            Some(mode) => mode.parse::<TransportMode>()?,
            None => {
                if optional_var("USE_WEBHOOK").is_some_and(|v| parse_bool(&v)) {
                    TransportMode::Webhook
                } else {
                    TransportMode::Polling
                }
            }
        };

        let webhook_url = optional_var("WEBHOOK_URL")
            .or_else(|| optional_var("NOTION_TELEGRAM_BOT_WEBHOOK_URL"));

        let retry_defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_attempts: env::var("UPLOAD_MAX_ATTEMPTS")
                .unwrap_or_else(|_| retry_defaults.max_attempts.to_string())
                .parse::<u32>()
                .unwrap_or(retry_defaults.max_attempts),
            initial_delay_ms: env::var("UPLOAD_RETRY_INITIAL_DELAY_MS")
                .unwrap_or_else(|_| retry_defaults.initial_delay_ms.to_string())
                .parse::<u64>()
                .unwrap_or(retry_defaults.initial_delay_ms),
            max_delay_ms: env::var("UPLOAD_RETRY_MAX_DELAY_MS")
                .unwrap_or_else(|_| retry_defaults.max_delay_ms.to_string())
                .parse::<u64>()
                .unwrap_or(retry_defaults.max_delay_ms),
        };

        let base = BaseConfig {
            server_port,
            environment,
            http_timeout_seconds,
        };

        Ok(Self {
            base,
            telegram_bot_token,
            telegram_api_base_url: env::var("TELEGRAM_API_BASE_URL")
                .unwrap_or_else(|_| TELEGRAM_API_BASE_URL.to_string()),
            transport_mode,
            webhook_url,
            webhook_path: env::var("WEBHOOK_PATH").unwrap_or_else(|_| WEBHOOK_PATH.to_string()),
            webhook_secret: optional_var("TELEGRAM_WEBHOOK_SECRET"),
            poll_timeout_seconds: env::var("POLL_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| POLL_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(POLL_TIMEOUT_SECS),
            platform_transfer_ceiling: env::var("PLATFORM_TRANSFER_CEILING")
                .unwrap_or_else(|_| PLATFORM_TRANSFER_CEILING.to_string())
                .parse::<u64>()
                .unwrap_or(PLATFORM_TRANSFER_CEILING),
            notion_key,
            notion_version: env::var("NOTION_VERSION")
                .unwrap_or_else(|_| NOTION_VERSION.to_string()),
            notion_api_base_url: env::var("NOTION_API_BASE_URL")
                .unwrap_or_else(|_| NOTION_API_BASE_URL.to_string()),
            notion_parent_page_id,
            authorized_users: parse_user_ids(&env::var("AUTHORIZED_USERS").unwrap_or_default()),
            admin_users: parse_user_ids(&env::var("ADMIN_USERS").unwrap_or_default()),
            api_secret: optional_var("API_SECRET"),
            text_chunk_limit: env::var("TEXT_CHUNK_LIMIT")
                .unwrap_or_else(|_| TEXT_CHUNK_LIMIT.to_string())
                .parse::<i64>()
                .unwrap_or(TEXT_CHUNK_LIMIT),
            file_chunk_limit: env::var("FILE_CHUNK_LIMIT")
                .unwrap_or_else(|_| FILE_CHUNK_LIMIT.to_string())
                .parse::<i64>()
                .unwrap_or(FILE_CHUNK_LIMIT),
            retry,
            session_window_seconds: env::var("SESSION_WINDOW_SECONDS")
                .unwrap_or_else(|_| SESSION_WINDOW_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(SESSION_WINDOW_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        // Text chunks are split on char boundaries, so a limit must fit any UTF-8 char.
        if self.text_chunk_limit < 4 {
            return Err(anyhow::anyhow!(
                "TEXT_CHUNK_LIMIT must be at least 4 bytes, got {}",
                self.text_chunk_limit
            ));
        }

        if self.file_chunk_limit <= 0 {
            return Err(anyhow::anyhow!(
                "FILE_CHUNK_LIMIT must be positive, got {}",
                self.file_chunk_limit
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(anyhow::anyhow!("UPLOAD_MAX_ATTEMPTS cannot be 0"));
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(anyhow::anyhow!(
                "UPLOAD_RETRY_INITIAL_DELAY_MS ({}) exceeds UPLOAD_RETRY_MAX_DELAY_MS ({})",
                self.retry.initial_delay_ms,
                self.retry.max_delay_ms
            ));
        }

        if self.platform_transfer_ceiling == 0 {
            return Err(anyhow::anyhow!("PLATFORM_TRANSFER_CEILING cannot be 0"));
        }

        if self.transport_mode == TransportMode::Webhook {
            match self.webhook_url.as_deref() {
                None => {
                    return Err(anyhow::anyhow!(
                        "WEBHOOK_URL is required when TRANSPORT_MODE=webhook"
                    ))
                }
                Some(url) if !url.starts_with("https://") => {
                    return Err(anyhow::anyhow!(
                        "WEBHOOK_URL must be an https URL, got '{}'",
                        url
                    ))
                }
                Some(_) => {}
            }
            if !self.webhook_path.starts_with('/') {
                return Err(anyhow::anyhow!("WEBHOOK_PATH must start with '/'"));
            }
        }

        if let Some(secret) = self.api_secret.as_deref() {
            if secret.len() < 16 {
                return Err(anyhow::anyhow!(
                    "API_SECRET must be at least 16 characters long"
                ));
            }
        }

        Ok(())
    }
}

impl Default for RelayConfig {
    /// Development defaults with placeholder credentials; used by tests and local tooling.
    fn default() -> Self {
        Self {
            base: BaseConfig {
                server_port: SERVER_PORT,
                environment: "development".to_string(),
                http_timeout_seconds: HTTP_TIMEOUT_SECS,
            },
            telegram_bot_token: "test-token".to_string(),
            telegram_api_base_url: TELEGRAM_API_BASE_URL.to_string(),
            transport_mode: TransportMode::Polling,
            webhook_url: None,
            webhook_path: WEBHOOK_PATH.to_string(),
            webhook_secret: None,
            poll_timeout_seconds: 30,
            platform_transfer_ceiling: 20 * 1024 * 1024,
            notion_key: "secret_test".to_string(),
            notion_version: NOTION_VERSION.to_string(),
            notion_api_base_url: NOTION_API_BASE_URL.to_string(),
            notion_parent_page_id: "parent-page".to_string(),
            authorized_users: HashSet::new(),
            admin_users: HashSet::new(),
            api_secret: None,
            text_chunk_limit: 2000,
            file_chunk_limit: 10 * 1024 * 1024,
            retry: RetrySettings::default(),
            session_window_seconds: 30,
        }
    }
}
