use anyhow::{Context, Result};
use rand::Rng;
use serde::Deserialize;

use crate::config::Config;
use crate::model::{FeedPage, Meme};

/// User agent string used for feed and bot requests.
pub const USER_AGENT: &str = concat!("memefeed/", env!("CARGO_PKG_VERSION"));

/// Wrap a target URL in the CORS proxy: `<proxy>?url=<encoded target>`.
#[must_use]
pub fn proxy_wrap(proxy_url: &str, target: &str) -> String {
    format!("{proxy_url}?url={}", urlencoding::encode(target))
}

/// Timestamp/nonce pair appended to feed URLs to defeat intermediary caching.
#[must_use]
pub fn cache_buster() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let nonce: u32 = rand::thread_rng().gen_range(0..10_000_000);
    format!("{millis}-{nonce}")
}

/// Proxy response envelope: the feed payload arrives as a JSON string in
/// `contents`.
#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    contents: String,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    body: FeedBody,
    #[serde(rename = "totalPages")]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct FeedBody {
    memes: Vec<Meme>,
}

/// HTTP client for the remote meme feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    base_url: String,
    proxy_url: String,
}

impl FeedClient {
    /// Create a feed client from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.feed_base_url.clone(),
            proxy_url: config.proxy_url.clone(),
        })
    }

    /// Build the proxied URL for one feed page.
    #[must_use]
    pub fn page_url(&self, page: u32) -> String {
        let feed_url = format!(
            "{}/api/memes?page={page}&{}",
            self.base_url,
            cache_buster()
        );
        proxy_wrap(&self.proxy_url, &feed_url)
    }

    /// Fetch one page of the feed, returning the canonical meme records and
    /// the total page count.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure, a non-success status, or a
    /// malformed payload.
    pub async fn fetch_page(&self, page: u32) -> Result<FeedPage> {
        let url = self.page_url(page);
        let response = self
            .http
            .get(&url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .context("Failed to fetch meme feed")?;

        if !response.status().is_success() {
            anyhow::bail!("Feed fetch failed with status {}", response.status());
        }

        let envelope: ProxyEnvelope = response
            .json()
            .await
            .context("Failed to read proxy envelope")?;
        let parsed: FeedResponse = serde_json::from_str(&envelope.contents)
            .context("Failed to parse feed payload")?;

        Ok(FeedPage {
            memes: parsed.body.memes.into_iter().map(Meme::canonical).collect(),
            total_pages: parsed.total_pages,
        })
    }
}
