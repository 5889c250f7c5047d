/// Playback and resume state types
use super::ids::{DocumentId, UnitId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Navigation mode for a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Play to the end of the list, then stop
    #[default]
    Sequential,
    /// Restart the current unit when it finishes
    SingleRepeat,
    /// Wrap around to the first unit after the last
    ListRepeat,
}

impl PlayMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::SingleRepeat => "single_repeat",
            Self::ListRepeat => "list_repeat",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sequential" => Some(Self::Sequential),
            "single_repeat" | "single-repeat" | "one" => Some(Self::SingleRepeat),
            "list_repeat" | "list-repeat" | "all" => Some(Self::ListRepeat),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of content owning the global "now playing" slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Document,
    #[default]
    None,
}

/// App-wide "now playing" record.
///
/// Only the playback registry writes this record; everyone else reads
/// snapshots of it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalPlaybackRecord {
    pub content_id: Option<UnitId>,
    pub title: String,
    pub content_type: ContentType,
    pub is_playing: bool,
}

impl GlobalPlaybackRecord {
    /// True iff `id` owns the record and is currently playing
    pub fn is_playing_content(&self, id: UnitId) -> bool {
        self.is_playing && self.content_id == Some(id)
    }

    /// True if some other unit legitimately owns playback right now
    pub fn is_owned_by_other(&self, id: UnitId) -> bool {
        self.is_playing && self.content_id.is_some_and(|owner| owner != id)
    }
}

/// Transient position of the unit being read.
///
/// `progress_fraction` is always derived from `position_chars` and the text
/// length, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    unit_id: UnitId,
    position_chars: usize,
    text_len: usize,
    progress_fraction: f64,
    pub is_playing: bool,
    completed: bool,
}

impl PlaybackState {
    /// Fresh state at the start of a unit
    pub fn new(unit_id: UnitId, text_len: usize) -> Self {
        let mut state = Self {
            unit_id,
            position_chars: 0,
            text_len,
            progress_fraction: 0.0,
            is_playing: false,
            completed: false,
        };
        if text_len == 0 {
            state.mark_completed();
        }
        state
    }

    /// Move the cursor, clamping to the text length
    pub fn set_position(&mut self, position_chars: usize) {
        self.position_chars = position_chars.min(self.text_len);
        self.progress_fraction = if self.text_len > 0 {
            self.position_chars as f64 / self.text_len as f64
        } else {
            0.0
        };
    }

    /// Mark the unit as read to the end
    pub fn mark_completed(&mut self) {
        self.completed = true;
        self.is_playing = false;
        if self.text_len > 0 {
            self.set_position(self.text_len);
        }
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    pub fn position_chars(&self) -> usize {
        self.position_chars
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn progress_fraction(&self) -> f64 {
        self.progress_fraction
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

/// Durable record of where reading stopped inside a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub unit_id: UnitId,
    pub position_chars: usize,
    pub progress_fraction: f64,
    pub saved_at: DateTime<Utc>,
}

/// Durable pointer to the chapter of a document that was last active
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterPointer {
    pub document_id: DocumentId,
    pub last_chapter_id: Option<UnitId>,
    pub last_chapter_index: usize,
}
