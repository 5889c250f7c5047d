//! Resume points
//!
//! Two-level resume: an exact [`ResumeRecord`] per unit, plus a
//! [`ChapterPointer`] and an overall progress value per parent document.
//! When a unit has no record of its own, the document's overall progress
//! is mapped back onto its chapters.

use crate::{json, keys};
use chrono::{DateTime, Utc};
use lector_core::{
    ChapterPointer, DocumentId, PersistentStore, PlayableUnit, ResumeRecord, Result, UnitId,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a save request
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The record was written
    Written(ResumeRecord),
    /// A newer record was already stored; nothing was written
    Stale { stored_at: DateTime<Utc> },
}

/// Where to pick up reading
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeTarget {
    /// Unit to open
    pub unit_id: UnitId,
    /// Index of that unit in the ordered chapter list
    pub chapter_index: usize,
    /// Cursor inside the unit, in chars
    pub position_chars: usize,
    /// Local progress inside the unit (0..=1)
    pub progress_fraction: f64,
    /// True if taken from the unit's own record rather than overall progress
    pub exact: bool,
}

/// Reads and writes resume state through a [`PersistentStore`]
#[derive(Clone)]
pub struct ResumeStore {
    store: Arc<dyn PersistentStore>,
}

impl ResumeStore {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    /// Save the position inside `unit`, issued now
    ///
    /// `chapter_index` is the unit's index among its document's chapters and
    /// is ignored for standalone units.
    pub async fn save(
        &self,
        unit: &PlayableUnit,
        chapter_index: usize,
        position_chars: usize,
        progress_fraction: f64,
    ) -> Result<SaveOutcome> {
        self.save_issued(
            unit,
            chapter_index,
            position_chars,
            progress_fraction,
            Utc::now(),
        )
        .await
    }

    /// Save the position inside `unit` with an explicit issuance time
    ///
    /// A write issued before the currently stored record is dropped.
    pub async fn save_issued(
        &self,
        unit: &PlayableUnit,
        chapter_index: usize,
        position_chars: usize,
        progress_fraction: f64,
        issued_at: DateTime<Utc>,
    ) -> Result<SaveOutcome> {
        if let Some(existing) = self.load(unit.id()).await? {
            if existing.saved_at > issued_at {
                debug!(
                    unit_id = %unit.id(),
                    stored_at = %existing.saved_at,
                    issued_at = %issued_at,
                    "Dropping out-of-order resume write"
                );
                return Ok(SaveOutcome::Stale {
                    stored_at: existing.saved_at,
                });
            }
        }

        let record = ResumeRecord {
            unit_id: unit.id(),
            position_chars: position_chars.min(unit.char_len()),
            progress_fraction: clamp_fraction(progress_fraction),
            saved_at: issued_at,
        };
        json::put(self.store.as_ref(), &keys::resume_record(unit.id()), &record).await?;

        if let Some(document) = unit.source_id() {
            let pointer = ChapterPointer {
                document_id: document,
                last_chapter_id: Some(unit.id()),
                last_chapter_index: chapter_index,
            };
            json::put(
                self.store.as_ref(),
                &keys::chapter_pointer(document),
                &pointer,
            )
            .await?;
        }

        debug!(
            unit_id = %record.unit_id,
            position = record.position_chars,
            progress = record.progress_fraction,
            "Saved resume record"
        );
        Ok(SaveOutcome::Written(record))
    }

    /// Resume record of a unit, if any
    pub async fn load(&self, unit_id: UnitId) -> Result<Option<ResumeRecord>> {
        json::get(self.store.as_ref(), &keys::resume_record(unit_id)).await
    }

    /// Forget the resume record of a unit
    pub async fn clear(&self, unit_id: UnitId) -> Result<()> {
        self.store.remove(&keys::resume_record(unit_id)).await
    }

    /// Last active chapter of a document
    pub async fn chapter_pointer(&self, document: DocumentId) -> Result<Option<ChapterPointer>> {
        json::get(self.store.as_ref(), &keys::chapter_pointer(document)).await
    }

    /// Persist the overall reading progress of a document
    pub async fn save_document_progress(&self, document: DocumentId, progress: f64) -> Result<()> {
        json::put(
            self.store.as_ref(),
            &keys::document_progress(document),
            &clamp_fraction(progress),
        )
        .await
    }

    pub async fn document_progress(&self, document: DocumentId) -> Result<Option<f64>> {
        json::get(self.store.as_ref(), &keys::document_progress(document)).await
    }

    /// Remember which unit was last handed to the engine
    pub async fn set_last_played(&self, unit_id: UnitId) -> Result<()> {
        json::put(self.store.as_ref(), keys::LAST_PLAYED_UNIT, &unit_id).await
    }

    pub async fn last_played(&self) -> Result<Option<UnitId>> {
        json::get(self.store.as_ref(), keys::LAST_PLAYED_UNIT).await
    }

    /// Map a document-wide progress value onto its ordered chapters
    ///
    /// Returns `None` when the chapters hold no text at all.
    pub fn load_by_overall_progress(
        document_id: DocumentId,
        overall_progress: f64,
        ordered_chapters: &[PlayableUnit],
    ) -> Option<ResumeTarget> {
        let lengths: Vec<usize> = ordered_chapters.iter().map(PlayableUnit::char_len).collect();
        let total: usize = lengths.iter().sum();
        if total == 0 {
            return None;
        }

        let overall = clamp_fraction(overall_progress);
        if overall >= 1.0 {
            let (index, unit) = ordered_chapters
                .iter()
                .enumerate()
                .rev()
                .find(|(_, unit)| !unit.is_empty())?;
            return Some(ResumeTarget {
                unit_id: unit.id(),
                chapter_index: index,
                position_chars: unit.char_len(),
                progress_fraction: 1.0,
                exact: false,
            });
        }

        let target = (total as f64 * overall).floor() as usize;
        let mut acc = 0;
        for (index, (unit, len)) in ordered_chapters.iter().zip(&lengths).enumerate() {
            if *len > 0 && target < acc + len {
                let local = target - acc;
                debug!(
                    document_id = %document_id,
                    chapter = index,
                    local,
                    "Resolved overall progress to chapter"
                );
                return Some(ResumeTarget {
                    unit_id: unit.id(),
                    chapter_index: index,
                    position_chars: local,
                    progress_fraction: local as f64 / *len as f64,
                    exact: false,
                });
            }
            acc += len;
        }

        None
    }

    /// Resume point for opening `unit`
    ///
    /// The unit's own record wins; otherwise `document_progress` is mapped
    /// onto `chapters`.
    pub async fn resume_point(
        &self,
        unit: &PlayableUnit,
        document_progress: Option<f64>,
        chapters: &[PlayableUnit],
    ) -> Result<Option<ResumeTarget>> {
        if let Some(record) = self.load(unit.id()).await? {
            let chapter_index = chapters
                .iter()
                .position(|chapter| chapter.id() == unit.id())
                .unwrap_or(0);
            return Ok(Some(ResumeTarget {
                unit_id: unit.id(),
                chapter_index,
                position_chars: record.position_chars.min(unit.char_len()),
                progress_fraction: record.progress_fraction,
                exact: true,
            }));
        }

        let (Some(progress), Some(document)) = (document_progress, unit.source_id()) else {
            return Ok(None);
        };
        Ok(Self::load_by_overall_progress(document, progress, chapters))
    }

    /// Resume point for opening a whole document
    ///
    /// Follows the chapter pointer (by id, then by index if the document was
    /// re-segmented) and falls back to the stored overall progress.
    pub async fn resume_document(
        &self,
        document: DocumentId,
        chapters: &[PlayableUnit],
    ) -> Result<Option<ResumeTarget>> {
        let progress = self.document_progress(document).await?;

        if let Some(pointer) = self.chapter_pointer(document).await? {
            let by_id = pointer
                .last_chapter_id
                .and_then(|id| chapters.iter().find(|chapter| chapter.id() == id));
            if let Some(unit) = by_id {
                return self.resume_point(unit, progress, chapters).await;
            }
            if let Some(unit) = chapters.get(pointer.last_chapter_index) {
                info!(
                    document_id = %document,
                    index = pointer.last_chapter_index,
                    "Chapter pointer id is stale, resuming by index"
                );
                return self.resume_point(unit, progress, chapters).await;
            }
        }

        Ok(progress.and_then(|p| Self::load_by_overall_progress(document, p, chapters)))
    }

    /// Overall progress of a document given the cursor in one chapter
    pub fn overall_progress(
        ordered_chapters: &[PlayableUnit],
        chapter_index: usize,
        position_chars: usize,
    ) -> f64 {
        let total: usize = ordered_chapters.iter().map(PlayableUnit::char_len).sum();
        if total == 0 {
            return 0.0;
        }

        let before: usize = ordered_chapters
            .iter()
            .take(chapter_index)
            .map(PlayableUnit::char_len)
            .sum();
        let within = ordered_chapters
            .get(chapter_index)
            .map_or(0, |unit| position_chars.min(unit.char_len()));

        clamp_fraction((before + within) as f64 / total as f64)
    }
}

fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
