//! Remote meme feed: HTTP client and per-session pagination state.

mod client;
mod session;

pub use client::{cache_buster, proxy_wrap, FeedClient, USER_AGENT};
pub use session::{FeedPhase, FeedSession};
