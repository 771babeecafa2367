//! Application configuration loaded from environment variables.
//!
//! The configuration is read once at startup and stays immutable for the
//! process lifetime. Every setting has a default except `TARGET_URL`.

use std::env;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Floor applied to the poll interval to prevent tight-loop hammering.
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;

/// Root application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the page to watch (required)
    pub target_url: String,

    /// CSS selector matching one element per item
    pub item_selector: Option<String>,

    /// CSS selector for the title element within an item
    pub title_selector: Option<String>,

    /// CSS selector for the link element within an item
    pub link_selector: Option<String>,

    /// CSS selector for the content element within an item
    pub content_selector: Option<String>,

    /// Keywords an item must contain to be eligible for notification
    pub keywords: Vec<String>,

    /// Whether keyword filtering is applied at all
    pub use_keywords: bool,

    /// Seconds between poll cycles
    pub poll_interval_secs: u64,

    /// Mark all initially-present items as seen without notifying
    pub seed_existing: bool,

    /// Maximum number of seen records retained after pruning
    pub max_items: usize,

    /// HTTP transport settings
    pub fetch: FetchConfig,

    /// Telegram notification settings
    pub telegram: TelegramConfig,

    /// Path to the SQLite state database
    pub state_db_path: String,

    /// Log level filter for the daemon
    pub log_level: String,
}

/// HTTP transport settings.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    pub user_agent: String,

    /// Accept-Language header
    pub accept_language: String,

    /// Optional Referer header
    pub referer: Option<String>,

    /// Optional raw Cookie header
    pub cookie: Option<String>,

    /// Retry once with fallback headers on HTTP 403
    pub retry_on_403: bool,

    /// Verify TLS certificates
    pub verify_ssl: bool,

    /// Custom CA bundle path, takes precedence over `verify_ssl`
    pub ca_bundle_path: Option<String>,

    /// Optional proxy for http:// requests
    pub http_proxy: Option<String>,

    /// Optional proxy for https:// requests
    pub https_proxy: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Telegram notification settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token
    pub bot_token: String,

    /// Destination chat ID
    pub chat_id: String,

    /// Delay after each successful send, a crude outbound rate limit
    pub send_delay_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let keywords = env::var("KEYWORDS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            target_url: env::var("TARGET_URL").unwrap_or_default().trim().to_string(),
            item_selector: env_opt("ITEM_SELECTOR"),
            title_selector: env_opt("TITLE_SELECTOR"),
            link_selector: env_opt("LINK_SELECTOR"),
            content_selector: env_opt("CONTENT_SELECTOR"),
            keywords,
            use_keywords: env_bool("USE_KEYWORDS", false),
            poll_interval_secs: env_u64("POLL_INTERVAL_SECONDS", defaults::poll_interval()),
            seed_existing: env_bool("SEED_EXISTING", true),
            max_items: env_u64("MAX_ITEMS", defaults::max_items()) as usize,
            fetch: FetchConfig::from_env(),
            telegram: TelegramConfig::from_env(),
            state_db_path: env::var("STATE_DB_PATH")
                .unwrap_or_else(|_| defaults::state_db_path()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| defaults::log_level()),
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.target_url.trim().is_empty() {
            return Err(AppError::config("TARGET_URL is required"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::config("FETCH_TIMEOUT_SECONDS must be > 0"));
        }
        Ok(())
    }

    /// Inter-cycle delay with the minimum floor applied.
    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(MIN_POLL_INTERVAL_SECS))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            item_selector: None,
            title_selector: None,
            link_selector: None,
            content_selector: None,
            keywords: Vec::new(),
            use_keywords: false,
            poll_interval_secs: defaults::poll_interval(),
            seed_existing: true,
            max_items: defaults::max_items() as usize,
            fetch: FetchConfig::default(),
            telegram: TelegramConfig::default(),
            state_db_path: defaults::state_db_path(),
            log_level: defaults::log_level(),
        }
    }
}

impl FetchConfig {
    fn from_env() -> Self {
        Self {
            user_agent: env::var("USER_AGENT").unwrap_or_else(|_| defaults::user_agent()),
            accept_language: env::var("ACCEPT_LANGUAGE")
                .unwrap_or_else(|_| defaults::accept_language()),
            referer: env_opt("REFERER"),
            cookie: env_opt("COOKIE"),
            retry_on_403: env_bool("RETRY_ON_403", true),
            verify_ssl: env_bool("VERIFY_SSL", true),
            ca_bundle_path: env_opt("CA_BUNDLE_PATH"),
            http_proxy: env_opt("HTTP_PROXY"),
            https_proxy: env_opt("HTTPS_PROXY"),
            timeout_secs: env_u64("FETCH_TIMEOUT_SECONDS", defaults::fetch_timeout()),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            accept_language: defaults::accept_language(),
            referer: None,
            cookie: None,
            retry_on_403: true,
            verify_ssl: true,
            ca_bundle_path: None,
            http_proxy: None,
            https_proxy: None,
            timeout_secs: defaults::fetch_timeout(),
        }
    }
}

impl TelegramConfig {
    fn from_env() -> Self {
        Self {
            bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .unwrap_or_default()
                .trim()
                .to_string(),
            chat_id: env::var("TELEGRAM_CHAT_ID")
                .unwrap_or_default()
                .trim()
                .to_string(),
            send_delay_secs: env_u64("TELEGRAM_SEND_DELAY_SECONDS", defaults::send_delay()),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            send_delay_secs: defaults::send_delay(),
        }
    }
}

/// Read an optional env var, treating empty values as absent.
fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read a boolean env var, falling back on missing or unparsable values.
fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => parse_bool(&value, default),
        Err(_) => default,
    }
}

/// Read an integer env var, falling back on missing or unparsable values.
fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => true,
        "0" | "false" | "no" | "n" | "off" => false,
        _ => default,
    }
}

mod defaults {
    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            .into()
    }
    pub fn accept_language() -> String {
        "en-US,en;q=0.9".into()
    }
    pub fn poll_interval() -> u64 {
        60
    }
    pub fn fetch_timeout() -> u64 {
        15
    }
    pub fn send_delay() -> u64 {
        1
    }
    pub fn max_items() -> u64 {
        30
    }
    pub fn state_db_path() -> String {
        "state.db".into()
    }
    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_missing_target() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_target_url() {
        let config = Config {
            target_url: "https://example.com/board".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn poll_delay_applies_floor() {
        let config = Config {
            poll_interval_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.poll_delay(), Duration::from_secs(5));

        let config = Config {
            poll_interval_secs: 120,
            ..Config::default()
        };
        assert_eq!(config.poll_delay(), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("1", false));
        assert!(parse_bool("TRUE", false));
        assert!(parse_bool(" yes ", false));
        assert!(!parse_bool("0", true));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("gibberish", true));
        assert!(!parse_bool("gibberish", false));
    }
}
