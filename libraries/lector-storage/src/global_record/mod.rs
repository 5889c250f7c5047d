//! Global "now playing" record persistence
//!
//! The record is a singleton; only the playback registry writes it.

use crate::{json, keys};
use lector_core::{GlobalPlaybackRecord, PersistentStore, Result};

/// Load the persisted record as written
pub async fn load(store: &dyn PersistentStore) -> Result<Option<GlobalPlaybackRecord>> {
    json::get(store, keys::GLOBAL_RECORD).await
}

/// Create or replace the persisted record
pub async fn save(store: &dyn PersistentStore, record: &GlobalPlaybackRecord) -> Result<()> {
    json::put(store, keys::GLOBAL_RECORD, record).await
}

/// Load the record for a fresh process
///
/// No speech engine survives a restart, so `is_playing` is always false.
/// Returns the default (empty) record if none was persisted.
pub async fn restore(store: &dyn PersistentStore) -> Result<GlobalPlaybackRecord> {
    let mut record = load(store).await?.unwrap_or_default();
    record.is_playing = false;
    Ok(record)
}
