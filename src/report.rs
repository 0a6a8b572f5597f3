//! One-time client report.
//!
//! On first launch the client sends its device metadata to a chat-bot
//! endpoint. The send is gated by a persisted flag claimed atomically in
//! storage before the request goes out, so the report fires at most once per
//! install even across concurrent launches.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::config::Config;
use crate::feed::{proxy_wrap, USER_AGENT};
use crate::store::{Storage, CLIENT_REPORTED_KEY};

/// Client metadata included in the report message.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub os_version: String,
    pub app_version: String,
    pub product_name: String,
    pub model_name: String,
}

impl DeviceInfo {
    /// Collect metadata from the build and the process environment.
    /// Fields the platform cannot provide report as "Unknown".
    #[must_use]
    pub fn detect() -> Self {
        Self {
            os_version: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            product_name: env_or_unknown("DEVICE_PRODUCT"),
            model_name: env_or_unknown("DEVICE_MODEL"),
        }
    }

    /// The plain-text message body sent to the bot.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "New Client Connected\n\nOS Version: {}\nApplication Version: {}\nProduct Name: {}\nModel Name: {}",
            self.os_version, self.app_version, self.product_name, self.model_name
        )
    }
}

fn env_or_unknown(name: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

pub struct ClientReporter {
    http: reqwest::Client,
    config: Config,
    storage: Storage,
}

impl ClientReporter {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: Config, storage: Storage) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            config,
            storage,
        })
    }

    /// Send the client report if it has never been sent from this install.
    ///
    /// Returns `true` when this call claimed the report, `false` when a
    /// previous launch already did. A failed send after a successful claim
    /// is logged and not retried.
    ///
    /// # Errors
    ///
    /// Returns an error when the bot endpoint is not configured or the flag
    /// cannot be claimed.
    pub async fn report_once(&self, info: &DeviceInfo) -> Result<bool> {
        let (token, chat_id) = match (
            self.config.bot_token.as_deref(),
            self.config.bot_chat_id.as_deref(),
        ) {
            (Some(token), Some(chat_id)) => (token, chat_id),
            _ => anyhow::bail!("Bot token or chat id not configured"),
        };

        if !self.storage.claim_flag(CLIENT_REPORTED_KEY).await? {
            debug!("Client report already sent, skipping");
            return Ok(false);
        }

        let bot_url = format!(
            "{}/bot{token}/sendMessage?chat_id={chat_id}&text={}",
            self.config.bot_api_url,
            urlencoding::encode(&info.message())
        );
        let url = proxy_wrap(&self.config.proxy_url, &bot_url);

        match self.http.get(&url).header("User-Agent", USER_AGENT).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Client report sent");
            }
            Ok(response) => {
                warn!(status = %response.status(), "Client report rejected");
            }
            Err(e) => {
                warn!("Failed to send client report: {e:#}");
            }
        }

        Ok(true)
    }
}
