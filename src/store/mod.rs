//! Durable string-keyed storage for the client.
//!
//! Values are JSON-encoded strings, keyed by name, persisted in SQLite so
//! they survive across sessions. Every write publishes the affected key on a
//! broadcast channel so views mirroring a key can re-read immediately
//! instead of waiting out a polling interval.

mod migrations;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::sync::broadcast;
use tracing::info;

/// Storage key for the persisted liked set.
pub const LIKED_MEMES_KEY: &str = "@likedMemes";
/// Storage key for the meme selected for the detail view.
pub const SELECTED_MEME_KEY: &str = "@selectedMeme";
/// Storage key for the one-time client report flag.
pub const CLIENT_REPORTED_KEY: &str = "clientSend";

#[derive(Debug, Clone)]
pub struct Storage {
    pool: SqlitePool,
    changes: broadcast::Sender<String>,
}

impl Storage {
    /// Open (or create) the storage database, running migrations if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or migrations fail.
    pub async fn new(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Concurrent writers (like toggle vs. watcher refresh) would
            // otherwise hit immediate SQLITE_BUSY errors.
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        migrations::run(&pool).await?;
        info!("Storage migrations complete");

        let (changes, _) = broadcast::channel(16);
        Ok(Self { pool, changes })
    }

    /// Read the raw string value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read key {key}"))?;

        Ok(row.map(|(value,)| value))
    }

    /// Write `value` under `key`, replacing any existing value, and notify
    /// subscribers.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write key {key}"))?;

        self.notify(key);
        Ok(())
    }

    /// Delete `key` if present and notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to remove key {key}"))?;

        self.notify(key);
        Ok(())
    }

    /// Read and JSON-decode the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value is not valid
    /// JSON for `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to decode stored value for key {key}"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// JSON-encode `value` and write it under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to encode value for key {key}"))?;
        self.set(key, &raw).await
    }

    /// Atomically claim a one-shot flag: returns `true` exactly once per
    /// database, `false` on every later call. The flag is set before the
    /// caller performs the gated side effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn claim_flag(&self, key: &str) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?, 'true', datetime('now'))
            ON CONFLICT(key) DO NOTHING
            ",
        )
        .bind(key)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to claim flag {key}"))?;

        let claimed = result.rows_affected() == 1;
        if claimed {
            self.notify(key);
        }
        Ok(claimed)
    }

    /// Subscribe to change notifications. Each successful write sends the
    /// affected key.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }

    fn notify(&self, key: &str) {
        // No receivers is fine; views subscribe only while mounted.
        let _ = self.changes.send(key.to_string());
    }
}
