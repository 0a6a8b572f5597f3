//! Media download via the platform's external link handler.
//!
//! There is no in-app transfer logic: downloading a meme means handing its
//! media URL to the system opener and letting the default handler deal with
//! it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::model::{MediaKind, Meme};

/// Seam for opening a URL with an external handler.
#[async_trait]
pub trait LinkOpener: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the handler cannot be launched or reports failure.
    async fn open(&self, url: &str) -> Result<()>;
}

/// Opens URLs by spawning a configured opener command (`xdg-open` by
/// default).
pub struct CommandOpener {
    program: String,
}

impl CommandOpener {
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

#[async_trait]
impl LinkOpener for CommandOpener {
    async fn open(&self, url: &str) -> Result<()> {
        let status = tokio::process::Command::new(&self.program)
            .arg(url)
            .status()
            .await
            .with_context(|| format!("Failed to run opener {}", self.program))?;

        if !status.success() {
            anyhow::bail!("Opener {} exited with {status}", self.program);
        }
        Ok(())
    }
}

/// The URL to hand to the external handler for `meme`: the image URL for
/// image memes, the video URL for video memes. `None` when a video meme is
/// missing its video URL.
#[must_use]
pub fn download_url(meme: &Meme) -> Option<&str> {
    match meme.kind {
        MediaKind::Image => Some(&meme.image),
        MediaKind::Video => meme.video.as_deref(),
    }
}

/// Open `meme`'s media with the external handler. A meme without a usable
/// media URL is skipped.
///
/// # Errors
///
/// Returns an error if the opener fails.
pub async fn download(meme: &Meme, opener: &dyn LinkOpener) -> Result<()> {
    match download_url(meme) {
        Some(url) => opener.open(url).await,
        None => {
            debug!(title = %meme.title, "Meme has no media URL, nothing to download");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meme(kind: MediaKind, video: Option<&str>) -> Meme {
        Meme {
            kind,
            image: "https://cdn.example.com/a.png".to_string(),
            title: "a".to_string(),
            description: "b".to_string(),
            video: video.map(ToString::to_string),
            height: 300,
            padding: 12,
        }
    }

    #[test]
    fn test_download_url_image() {
        let m = meme(MediaKind::Image, None);
        assert_eq!(download_url(&m), Some("https://cdn.example.com/a.png"));
    }

    #[test]
    fn test_download_url_video() {
        let m = meme(MediaKind::Video, Some("https://cdn.example.com/a.mp4"));
        assert_eq!(download_url(&m), Some("https://cdn.example.com/a.mp4"));
    }

    #[test]
    fn test_download_url_video_missing() {
        let m = meme(MediaKind::Video, None);
        assert_eq!(download_url(&m), None);
    }
}
