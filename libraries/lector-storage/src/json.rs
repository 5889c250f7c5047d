//! JSON helpers shared by the storage slices

use crate::error::StorageError;
use lector_core::{PersistentStore, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Read and decode a JSON value
pub(crate) async fn get<T: DeserializeOwned>(
    store: &dyn PersistentStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| StorageError::serialization(key, e))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Encode and write a JSON value
pub(crate) async fn put<T: Serialize>(
    store: &dyn PersistentStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec(value).map_err(|e| StorageError::serialization(key, e))?;
    store.set(key, bytes).await
}
