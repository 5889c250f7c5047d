//! In-memory stores for tests and ephemeral sessions

use async_trait::async_trait;
use lector_core::{ContentStore, DocumentId, PersistentStore, PlayableUnit, Result, UnitId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// [`PersistentStore`] kept in a shared hash map
///
/// Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Library {
    units: HashMap<UnitId, PlayableUnit>,
    documents: HashMap<DocumentId, Vec<UnitId>>,
}

/// [`ContentStore`] over units registered at runtime
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    library: Arc<RwLock<Library>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-segment) a document, replacing its previous units
    pub async fn insert_document(&self, document: DocumentId, units: Vec<PlayableUnit>) {
        let mut library = self.library.write().await;
        if let Some(old) = library.documents.remove(&document) {
            for id in old {
                library.units.remove(&id);
            }
        }

        let ids = units.iter().map(PlayableUnit::id).collect();
        for unit in units {
            library.units.insert(unit.id(), unit);
        }
        library.documents.insert(document, ids);
    }

    /// Register a standalone unit (an article)
    pub async fn insert_unit(&self, unit: PlayableUnit) {
        let mut library = self.library.write().await;
        if let Some(document) = unit.source_id() {
            let ids = library.documents.entry(document).or_default();
            if !ids.contains(&unit.id()) {
                ids.push(unit.id());
            }
        }
        library.units.insert(unit.id(), unit);
    }

    /// Forget a unit; returns it if it was known
    pub async fn remove_unit(&self, id: UnitId) -> Option<PlayableUnit> {
        let mut library = self.library.write().await;
        let unit = library.units.remove(&id)?;
        if let Some(document) = unit.source_id() {
            if let Some(ids) = library.documents.get_mut(&document) {
                ids.retain(|other| *other != id);
            }
        }
        Some(unit)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn unit(&self, id: UnitId) -> Result<Option<PlayableUnit>> {
        Ok(self.library.read().await.units.get(&id).cloned())
    }

    async fn units_of(&self, document: DocumentId) -> Result<Vec<PlayableUnit>> {
        let library = self.library.read().await;
        Ok(library
            .documents
            .get(&document)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| library.units.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}
