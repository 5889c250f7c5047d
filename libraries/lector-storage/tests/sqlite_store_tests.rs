
use lector_core::{ContentType, GlobalPlaybackRecord, PersistentStore, UnitId};
use lector_storage::{global_record, SqliteStore};
use test_helpers::TestDb;

#[tokio::test]
async fn test_set_and_get_value() {
    let db = TestDb::new().await;

    db.store.set("some/key", b"hello".to_vec()).await.unwrap();
    let value = db.store.get("some/key").await.unwrap();

    assert_eq!(value, Some(b"hello".to_vec()));
}

#[tokio::test]
async fn test_get_missing_value() {
    let db = TestDb::new().await;

    let value = db.store.get("missing").await.unwrap();

    assert_eq!(value, None);
}

#[tokio::test]
async fn test_update_existing_value() {
    let db = TestDb::new().await;

    db.store.set("k", b"one".to_vec()).await.unwrap();
    db.store.set("k", b"two".to_vec()).await.unwrap();

    assert_eq!(db.store.get("k").await.unwrap(), Some(b"two".to_vec()));
}

#[tokio::test]
async fn test_remove_value_is_idempotent() {
    let db = TestDb::new().await;

    db.store.set("k", b"one".to_vec()).await.unwrap();
    db.store.remove("k").await.unwrap();
    db.store.remove("k").await.unwrap();

    assert_eq!(db.store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let db = TestDb::new().await;
    let record = GlobalPlaybackRecord {
        content_id: Some(UnitId::generate()),
        title: "Part One".to_string(),
        content_type: ContentType::Document,
        is_playing: true,
    };
    global_record::save(&db.store, &record).await.unwrap();
    db.store.pool().close().await;

    let reopened = SqliteStore::open(&db.url).await.unwrap();
    let restored = global_record::restore(&reopened).await.unwrap();

    assert_eq!(restored.content_id, record.content_id);
    assert_eq!(restored.title, "Part One");
    assert!(!restored.is_playing);
}
