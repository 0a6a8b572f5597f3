use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::client::FeedClient;
use crate::config::Config;
use crate::model::Meme;

/// Feed lifecycle states.
///
/// `Idle` is the only state that accepts a new load. `Retrying` loops back
/// into `Loading` after the retry delay, bounded by the retry limit, after
/// which `Failed` is absorbing: the feed stops growing and no further
/// automatic fetch happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Idle,
    Loading,
    Retrying,
    Failed,
}

/// In-session accumulation of fetched meme pages.
///
/// Pages append in fetch order and are never deduplicated against the
/// accumulated list; each page number is fetched at most once per session.
/// The state is discarded with the session, only likes persist.
pub struct FeedSession {
    client: FeedClient,
    cancel: CancellationToken,
    memes: Vec<Meme>,
    current_page: u32,
    total_pages: u32,
    retry_count: u32,
    retry_limit: u32,
    retry_delay: Duration,
    phase: FeedPhase,
}

impl FeedSession {
    #[must_use]
    pub fn new(client: FeedClient, config: &Config, cancel: CancellationToken) -> Self {
        Self {
            client,
            cancel,
            memes: Vec::new(),
            current_page: 1,
            total_pages: 1,
            retry_count: 0,
            retry_limit: config.retry_limit,
            retry_delay: config.retry_delay,
            phase: FeedPhase::Idle,
        }
    }

    /// Fetch page `page` and append its records to the accumulated list.
    ///
    /// On success the retry counter resets and the total page count is taken
    /// from the response. On failure the same page is retried after the
    /// retry delay until the retry limit is reached, at which point the
    /// session parks in [`FeedPhase::Failed`] without returning an error.
    /// Cancelling the session's token aborts a pending retry wait.
    pub async fn load_page(&mut self, page: u32) {
        loop {
            self.phase = FeedPhase::Loading;
            match self.client.fetch_page(page).await {
                Ok(fetched) => {
                    let count = fetched.memes.len();
                    self.memes.extend(fetched.memes);
                    self.total_pages = fetched.total_pages;
                    self.retry_count = 0;
                    self.phase = FeedPhase::Idle;
                    info!(
                        page,
                        count,
                        total = self.memes.len(),
                        total_pages = self.total_pages,
                        "Feed page loaded"
                    );
                    return;
                }
                Err(e) => {
                    self.retry_count += 1;
                    if self.retry_count >= self.retry_limit {
                        self.phase = FeedPhase::Failed;
                        error!(page, attempts = self.retry_count, "Reached maximum retry limit: {e:#}");
                        return;
                    }

                    self.phase = FeedPhase::Retrying;
                    warn!(
                        page,
                        attempt = self.retry_count,
                        delay_secs = self.retry_delay.as_secs(),
                        "Feed fetch failed, will retry: {e:#}"
                    );
                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            self.phase = FeedPhase::Idle;
                            return;
                        }
                        () = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }
    }

    /// Load the first page. Called once when the session starts.
    pub async fn load_initial(&mut self) {
        self.load_page(self.current_page).await;
    }

    /// Advance to the next page and fetch it.
    ///
    /// No-op unless the session is idle and a next page exists.
    pub async fn load_more(&mut self) {
        if self.phase != FeedPhase::Idle || !self.has_more() {
            return;
        }
        self.current_page += 1;
        self.load_page(self.current_page).await;
    }

    #[must_use]
    pub fn memes(&self) -> &[Meme] {
        &self.memes
    }

    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Whether a further page is available to load.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == FeedPhase::Loading
    }

    #[must_use]
    pub fn phase(&self) -> FeedPhase {
        self.phase
    }

    #[must_use]
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }
}
