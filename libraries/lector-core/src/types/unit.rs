//! Playable units and chapter boundaries

use super::ids::{DocumentId, UnitId};
use serde::{Deserialize, Serialize};

/// Title given to the stand-in unit when a source produced nothing readable
pub const PLACEHOLDER_TITLE: &str = "Nothing to read";

/// One chapter or article worth of readable text.
///
/// The parent document is fixed at construction; a re-segmented document
/// produces new units rather than mutating existing ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableUnit {
    id: UnitId,
    title: String,
    text: String,
    source_id: Option<DocumentId>,
}

impl PlayableUnit {
    /// Create a standalone unit (an article with no parent document)
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_id(UnitId::generate(), None, title, text)
    }

    /// Create a unit belonging to a parent document
    pub fn with_source(
        source_id: DocumentId,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::with_id(UnitId::generate(), Some(source_id), title, text)
    }

    /// Create a unit with a known identifier
    pub fn with_id(
        id: UnitId,
        source_id: Option<DocumentId>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            text: text.into(),
            source_id,
        }
    }

    /// Empty stand-in unit so navigation keeps working on empty sources
    pub fn placeholder(source_id: Option<DocumentId>) -> Self {
        Self::with_id(UnitId::generate(), source_id, PLACEHOLDER_TITLE, "")
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_id(&self) -> Option<DocumentId> {
        self.source_id
    }

    /// Length of the text in characters (not bytes)
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the unit has nothing to speak
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Chapter boundary reported by a segmenter.
///
/// `start_index` and `end_index` are character offsets into the raw text,
/// `end_index` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterBoundary {
    pub title: String,
    pub start_index: usize,
    pub end_index: usize,
}

impl ChapterBoundary {
    pub fn new(title: impl Into<String>, start_index: usize, end_index: usize) -> Self {
        Self {
            title: title.into(),
            start_index,
            end_index,
        }
    }

    /// Number of characters covered by this chapter
    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
