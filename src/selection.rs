//! Detail selection flow.
//!
//! The feed and likes views persist the tapped meme under a well-known key
//! just before navigating; the detail view reads it back once on arrival.

use anyhow::{Context, Result};

use crate::model::Meme;
use crate::store::{Storage, SELECTED_MEME_KEY};

/// Persist `item` as the current selection.
///
/// The write is awaited before any navigation happens, so a failed write
/// aborts the navigation: callers must only proceed on `Ok`.
///
/// # Errors
///
/// Returns an error if the write fails.
pub async fn select(storage: &Storage, item: &Meme) -> Result<()> {
    storage
        .set_json(SELECTED_MEME_KEY, item)
        .await
        .context("Failed to save selected meme")
}

/// Read the current selection once, as the detail view does on mount.
///
/// Returns `None` when nothing has ever been selected; the detail view
/// treats that as an explicit empty state rather than waiting forever.
///
/// # Errors
///
/// Returns an error if the read fails or the stored value is malformed.
pub async fn load_selected(storage: &Storage) -> Result<Option<Meme>> {
    storage
        .get_json(SELECTED_MEME_KEY)
        .await
        .context("Failed to load selected meme")
}
