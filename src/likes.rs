//! The user's liked-meme set and its storage synchronization.
//!
//! Storage is the sole source of truth; each view holds an in-memory mirror
//! that is allowed to be briefly stale. A watcher task re-reads the mirror
//! whenever the liked-set key changes in storage and on a fixed-interval
//! fallback, so external writes (another view over the same database) become
//! visible within a bounded window.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::{LikedMeme, Meme};
use crate::store::{Storage, LIKED_MEMES_KEY};

#[derive(Clone)]
pub struct LikeSet {
    storage: Storage,
    mirror: Arc<Mutex<Vec<LikedMeme>>>,
}

impl LikeSet {
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            mirror: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replace the mirror wholesale with the stored liked set (empty if
    /// absent). Read failures are logged and leave the mirror untouched.
    pub async fn refresh(&self) {
        match self.storage.get_json::<Vec<LikedMeme>>(LIKED_MEMES_KEY).await {
            Ok(stored) => {
                *self.mirror.lock().expect("mirror lock poisoned") = stored.unwrap_or_default();
            }
            Err(e) => warn!("Failed to load liked memes: {e:#}"),
        }
    }

    /// Like `item` if it is not in the set, unlike it if it is (matched by
    /// image URL). The updated set is written to storage first and the
    /// mirror only follows a successful write; on failure the previous state
    /// is kept. Returns whether the item is liked afterwards.
    pub async fn toggle(&self, item: &Meme) -> bool {
        let (updated, now_liked) = {
            let mirror = self.mirror.lock().expect("mirror lock poisoned");
            if mirror.iter().any(|liked| liked.meme.same_meme(item)) {
                let updated: Vec<LikedMeme> = mirror
                    .iter()
                    .filter(|liked| !liked.meme.same_meme(item))
                    .cloned()
                    .collect();
                (updated, false)
            } else {
                let mut updated = mirror.clone();
                updated.push(LikedMeme {
                    meme: item.clone(),
                    liked_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                });
                (updated, true)
            }
        };

        match self.storage.set_json(LIKED_MEMES_KEY, &updated).await {
            Ok(()) => {
                *self.mirror.lock().expect("mirror lock poisoned") = updated;
                now_liked
            }
            Err(e) => {
                warn!("Failed to update liked memes: {e:#}");
                self.is_liked(item)
            }
        }
    }

    /// Unconditionally drop `item` from the set (matched by image URL).
    /// A no-op when the item is not present.
    pub async fn remove(&self, item: &Meme) {
        let updated: Vec<LikedMeme> = {
            let mirror = self.mirror.lock().expect("mirror lock poisoned");
            mirror
                .iter()
                .filter(|liked| !liked.meme.same_meme(item))
                .cloned()
                .collect()
        };

        match self.storage.set_json(LIKED_MEMES_KEY, &updated).await {
            Ok(()) => *self.mirror.lock().expect("mirror lock poisoned") = updated,
            Err(e) => warn!("Failed to update liked memes: {e:#}"),
        }
    }

    /// Whether `item` is currently liked, per the mirror.
    #[must_use]
    pub fn is_liked(&self, item: &Meme) -> bool {
        self.mirror
            .lock()
            .expect("mirror lock poisoned")
            .iter()
            .any(|liked| liked.meme.same_meme(item))
    }

    /// Snapshot of the mirrored liked set.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LikedMeme> {
        self.mirror.lock().expect("mirror lock poisoned").clone()
    }

    /// Spawn the background watcher keeping the mirror in sync with storage.
    ///
    /// Performs an immediate refresh, then refreshes on every liked-set
    /// change notification and on the interval fallback. The task ends when
    /// `cancel` is cancelled; a view tears its watcher down on unmount so no
    /// two watchers run for the same view.
    pub fn spawn_watcher(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let likes = self.clone();
        let mut changes = self.storage.subscribe();

        tokio::spawn(async move {
            likes.refresh().await;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately; the refresh above already
            // covered it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("Like watcher stopped");
                        return;
                    }
                    changed = changes.recv() => {
                        match changed {
                            Ok(key) if key == LIKED_MEMES_KEY => likes.refresh().await,
                            Ok(_) => {}
                            // Lagged or closed channel: fall back to the
                            // interval refresh below.
                            Err(_) => {}
                        }
                    }
                    _ = ticker.tick() => likes.refresh().await,
                }
            }
        })
    }
}
