//! Integration tests for the liked-set synchronization flow.

use std::time::Duration;

use memefeed::likes::LikeSet;
use memefeed::model::{LikedMeme, MediaKind, Meme};
use memefeed::store::{Storage, LIKED_MEMES_KEY};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

async fn setup_storage() -> (Storage, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let storage = Storage::new(&db_path)
        .await
        .expect("Failed to create storage");
    (storage, temp_dir)
}

fn meme(image: &str) -> Meme {
    Meme {
        kind: MediaKind::Image,
        image: image.to_string(),
        title: image.to_string(),
        description: "d".to_string(),
        video: None,
        height: 300,
        padding: 12,
    }
}

fn liked(image: &str) -> LikedMeme {
    LikedMeme {
        meme: meme(image),
        liked_at: "2024-01-01T00:00:00.000Z".to_string(),
    }
}

#[tokio::test]
async fn test_toggle_likes_then_unlikes() {
    let (storage, _temp_dir) = setup_storage().await;
    storage
        .set(LIKED_MEMES_KEY, "[]")
        .await
        .expect("seed failed");

    let likes = LikeSet::new(storage.clone());
    likes.refresh().await;

    let item = meme("a.png");
    assert!(likes.toggle(&item).await);
    assert!(likes.is_liked(&item));

    // The stored set gained the item, stamped with a parseable timestamp.
    let stored: Vec<LikedMeme> = storage
        .get_json(LIKED_MEMES_KEY)
        .await
        .expect("get failed")
        .expect("liked set missing");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].meme.image, "a.png");
    assert!(chrono::DateTime::parse_from_rfc3339(&stored[0].liked_at).is_ok());

    // Toggling again restores the empty set.
    assert!(!likes.toggle(&item).await);
    assert!(!likes.is_liked(&item));
    assert_eq!(
        storage
            .get(LIKED_MEMES_KEY)
            .await
            .expect("get failed")
            .as_deref(),
        Some("[]")
    );
}

#[tokio::test]
async fn test_toggle_twice_preserves_other_likes() {
    let (storage, _temp_dir) = setup_storage().await;
    storage
        .set_json(LIKED_MEMES_KEY, &vec![liked("keep.png")])
        .await
        .expect("seed failed");

    let likes = LikeSet::new(storage.clone());
    likes.refresh().await;

    let item = meme("transient.png");
    likes.toggle(&item).await;
    likes.toggle(&item).await;

    let stored: Vec<LikedMeme> = storage
        .get_json(LIKED_MEMES_KEY)
        .await
        .expect("get failed")
        .expect("liked set missing");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].meme.image, "keep.png");
}

#[tokio::test]
async fn test_remove_absent_item_is_noop() {
    let (storage, _temp_dir) = setup_storage().await;
    storage
        .set_json(LIKED_MEMES_KEY, &vec![liked("keep.png")])
        .await
        .expect("seed failed");

    let likes = LikeSet::new(storage.clone());
    likes.refresh().await;

    likes.remove(&meme("never-liked.png")).await;

    let stored: Vec<LikedMeme> = storage
        .get_json(LIKED_MEMES_KEY)
        .await
        .expect("get failed")
        .expect("liked set missing");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].meme.image, "keep.png");
}

#[tokio::test]
async fn test_remove_drops_item() {
    let (storage, _temp_dir) = setup_storage().await;
    storage
        .set_json(LIKED_MEMES_KEY, &vec![liked("a.png"), liked("b.png")])
        .await
        .expect("seed failed");

    let likes = LikeSet::new(storage.clone());
    likes.refresh().await;

    likes.remove(&meme("a.png")).await;

    assert!(!likes.is_liked(&meme("a.png")));
    assert!(likes.is_liked(&meme("b.png")));
    let stored: Vec<LikedMeme> = storage
        .get_json(LIKED_MEMES_KEY)
        .await
        .expect("get failed")
        .expect("liked set missing");
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_identity_is_the_image_url() {
    let (storage, _temp_dir) = setup_storage().await;
    let likes = LikeSet::new(storage);
    likes.refresh().await;

    likes.toggle(&meme("same.png")).await;

    // A record with the same image but different metadata is the same meme.
    let variant = Meme {
        title: "different title".to_string(),
        description: "different description".to_string(),
        ..meme("same.png")
    };
    assert!(likes.is_liked(&variant));

    likes.toggle(&variant).await;
    assert!(likes.snapshot().is_empty());
}

#[tokio::test]
async fn test_refresh_replaces_mirror_wholesale() {
    let (storage, _temp_dir) = setup_storage().await;
    storage
        .set_json(LIKED_MEMES_KEY, &vec![liked("a.png")])
        .await
        .expect("seed failed");

    let likes = LikeSet::new(storage.clone());
    likes.refresh().await;
    assert!(likes.is_liked(&meme("a.png")));

    // An external writer clears the stored set; the mirror is stale until
    // the next refresh.
    storage
        .set(LIKED_MEMES_KEY, "[]")
        .await
        .expect("set failed");
    assert!(likes.is_liked(&meme("a.png")));

    likes.refresh().await;
    assert!(!likes.is_liked(&meme("a.png")));
}

#[tokio::test]
async fn test_watcher_mirrors_external_writes() {
    let (storage, _temp_dir) = setup_storage().await;
    let likes = LikeSet::new(storage.clone());

    let cancel = CancellationToken::new();
    let watcher = likes.spawn_watcher(Duration::from_millis(50), cancel.child_token());

    storage
        .set_json(LIKED_MEMES_KEY, &vec![liked("external.png")])
        .await
        .expect("set failed");

    // The change notification (or the interval fallback) refreshes the
    // mirror shortly after the write.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !likes.is_liked(&meme("external.png")) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "watcher never picked up the external write"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), watcher)
        .await
        .expect("watcher should stop on cancel")
        .expect("watcher panicked");
}
