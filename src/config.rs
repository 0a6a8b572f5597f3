use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Meme feed
    pub feed_base_url: String,
    pub proxy_url: String,
    pub fetch_timeout: Duration,
    pub retry_limit: u32,
    pub retry_delay: Duration,

    // Local storage
    pub database_path: PathBuf,
    pub likes_refresh_interval: Duration,

    // Client reporting (chat bot)
    pub bot_api_url: String,
    pub bot_token: Option<String>,
    pub bot_chat_id: Option<String>,

    // Media download
    pub opener_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Meme feed
            feed_base_url: required_env("FEED_BASE_URL")?,
            proxy_url: env_or_default("PROXY_URL", "https://api.allorigins.win/get"),
            fetch_timeout: Duration::from_secs(parse_env_u64("FETCH_TIMEOUT_SECS", 30)?),
            retry_limit: parse_env_u32("RETRY_LIMIT", 5)?,
            retry_delay: Duration::from_secs(parse_env_u64("RETRY_DELAY_SECS", 5)?),

            // Local storage
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/memefeed.sqlite")),
            likes_refresh_interval: Duration::from_secs(parse_env_u64("LIKES_REFRESH_SECS", 6)?),

            // Client reporting
            bot_api_url: env_or_default("BOT_API_URL", "https://api.telegram.org"),
            bot_token: optional_env("BOT_TOKEN"),
            bot_chat_id: optional_env("BOT_CHAT_ID"),

            // Media download
            opener_path: env_or_default("OPENER_PATH", "xdg-open"),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "FEED_BASE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.proxy_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "PROXY_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.retry_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "RETRY_LIMIT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration with sane defaults for tests, independent of the
    /// process environment.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            feed_base_url: "https://memes.example.com".to_string(),
            proxy_url: "https://proxy.example.com/get".to_string(),
            fetch_timeout: Duration::from_secs(10),
            retry_limit: 5,
            retry_delay: Duration::from_millis(10),
            database_path: PathBuf::from(":memory:"),
            likes_refresh_interval: Duration::from_millis(50),
            bot_api_url: "https://bot.example.com".to_string(),
            bot_token: Some("test-token".to_string()),
            bot_chat_id: Some("42".to_string()),
            opener_path: "true".to_string(),
        }
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
