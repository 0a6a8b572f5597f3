//! Integration tests for the detail selection flow.

use memefeed::model::{MediaKind, Meme};
use memefeed::selection::{load_selected, select};
use memefeed::store::Storage;
use tempfile::TempDir;

async fn setup_storage() -> (Storage, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let storage = Storage::new(&db_path)
        .await
        .expect("Failed to create storage");
    (storage, temp_dir)
}

fn sample_meme(image: &str) -> Meme {
    Meme {
        kind: MediaKind::Video,
        image: image.to_string(),
        title: "title".to_string(),
        description: "description".to_string(),
        video: Some("https://cdn.example.com/v.mp4".to_string()),
        height: 420,
        padding: 16,
    }
}

#[tokio::test]
async fn test_select_then_load_roundtrip() {
    let (storage, _temp_dir) = setup_storage().await;
    let meme = sample_meme("https://cdn.example.com/a.png");

    select(&storage, &meme).await.expect("select failed");

    let loaded = load_selected(&storage)
        .await
        .expect("load failed")
        .expect("selection missing");
    assert_eq!(loaded, meme);
}

#[tokio::test]
async fn test_load_selected_without_selection() {
    let (storage, _temp_dir) = setup_storage().await;

    let loaded = load_selected(&storage).await.expect("load failed");
    assert_eq!(loaded, None);
}

#[tokio::test]
async fn test_select_overwrites_previous_selection() {
    let (storage, _temp_dir) = setup_storage().await;

    select(&storage, &sample_meme("https://cdn.example.com/a.png"))
        .await
        .expect("select failed");
    select(&storage, &sample_meme("https://cdn.example.com/b.png"))
        .await
        .expect("select failed");

    let loaded = load_selected(&storage)
        .await
        .expect("load failed")
        .expect("selection missing");
    assert_eq!(loaded.image, "https://cdn.example.com/b.png");
}
