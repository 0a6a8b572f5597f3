use serde::{Deserialize, Serialize};

/// Kind of media a meme carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// One feed item.
///
/// The `image` URL doubles as the meme's identity: two records with the same
/// `image` are the same meme for liking, removal and selection, regardless of
/// any other field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meme {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub image: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_padding")]
    pub padding: u32,
}

impl Meme {
    /// Fill in canonical defaults for fields the feed may omit or leave
    /// empty. The feed sometimes sends `video: ""` for image memes.
    #[must_use]
    pub fn canonical(mut self) -> Self {
        if self.video.as_deref() == Some("") {
            self.video = None;
        }
        self
    }

    /// Whether `other` refers to the same meme (identity is the image URL).
    #[must_use]
    pub fn same_meme(&self, other: &Self) -> bool {
        self.image == other.image
    }
}

const fn default_height() -> u32 {
    300
}

const fn default_padding() -> u32 {
    12
}

/// A meme the user has liked, stamped with the like time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikedMeme {
    #[serde(flatten)]
    pub meme: Meme,
    #[serde(rename = "likedAt")]
    pub liked_at: String,
}

/// One page of the remote meme feed.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub memes: Vec<Meme>,
    pub total_pages: u32,
}
