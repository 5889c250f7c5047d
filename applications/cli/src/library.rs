//! Document import
//!
//! Text files are segmented into chapters and registered with an in-memory
//! content store. Identifiers are derived from the file path and chapter
//! titles so resume records stay valid across runs.

use crate::error::{CliError, Result};
use lector_core::{ChapterSegmenter, DocumentId, PlayableUnit, UnitId};
use lector_playback::display::{estimate_ms, format_time};
use lector_segment::{units_from_text, HeadingSegmenter};
use lector_storage::MemoryContentStore;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// A document that was imported into the library
#[derive(Debug, Clone)]
pub struct ImportedDocument {
    pub document_id: DocumentId,
    pub units: Vec<PlayableUnit>,
}

impl ImportedDocument {
    /// Title and estimated reading time of each chapter, by unit id
    pub fn chapter_lengths(&self, chars_per_second: f64) -> HashMap<UnitId, (String, String)> {
        self.units
            .iter()
            .map(|unit| {
                let length = format_time(estimate_ms(unit.char_len(), chars_per_second));
                (unit.id(), (unit.title().to_string(), length))
            })
            .collect()
    }
}

/// Stable document id for a file path
pub fn document_id_for(path: &Path) -> DocumentId {
    let key = path.to_string_lossy();
    DocumentId::new(Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()))
}

/// Stable unit id for the `index`-th chapter of a document
pub fn unit_id_for(document: DocumentId, index: usize, title: &str) -> UnitId {
    let name = format!("{index}:{title}");
    UnitId::new(Uuid::new_v5(&document.as_uuid(), name.as_bytes()))
}

/// Content library backed by [`MemoryContentStore`]
pub struct Library {
    content: Arc<MemoryContentStore>,
    segmenter: Box<dyn ChapterSegmenter>,
}

impl Library {
    pub fn new() -> Self {
        Self::with_segmenter(Box::new(HeadingSegmenter::new()))
    }

    pub fn with_segmenter(segmenter: Box<dyn ChapterSegmenter>) -> Self {
        Self {
            content: Arc::new(MemoryContentStore::new()),
            segmenter,
        }
    }

    /// Store the coordinator reads units from
    pub fn content(&self) -> Arc<MemoryContentStore> {
        Arc::clone(&self.content)
    }

    /// Read, segment and register a text file
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or segmentation produces invalid
    /// chapter boundaries.
    pub async fn import(&self, path: &Path) -> Result<ImportedDocument> {
        let canonical = tokio::fs::canonicalize(path).await?;
        let raw_text = tokio::fs::read_to_string(&canonical).await?;
        let document_id = document_id_for(&canonical);

        let units = self.import_text(document_id, &raw_text).await?;
        tracing::info!(
            path = %canonical.display(),
            document_id = %document_id,
            chapters = units.len(),
            "Imported document"
        );
        Ok(ImportedDocument { document_id, units })
    }

    /// Segment and register text under a known document id
    pub async fn import_text(
        &self,
        document_id: DocumentId,
        raw_text: &str,
    ) -> Result<Vec<PlayableUnit>> {
        let units: Vec<PlayableUnit> = units_from_text(document_id, raw_text, self.segmenter.as_ref())
            .map_err(CliError::from)?
            .into_iter()
            .enumerate()
            .map(|(index, unit)| {
                let id = unit_id_for(document_id, index, unit.title());
                PlayableUnit::with_id(id, Some(document_id), unit.title(), unit.text())
            })
            .collect();

        self.content.insert_document(document_id, units.clone()).await;
        Ok(units)
    }
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}
