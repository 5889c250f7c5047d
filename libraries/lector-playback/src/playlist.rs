//! Ordered units with a cursor
//!
//! Navigation is index-based and never mutates the unit list.

use lector_core::{DocumentId, LectorError, PlayMode, PlayableUnit, Result, UnitId};

/// Manual navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Playlist of units sharing one source
///
/// Invariants:
/// - `current_index < units.len()` whenever the list is non-empty
/// - every unit's source equals the playlist's source
#[derive(Debug, Clone)]
pub struct Playlist {
    units: Vec<PlayableUnit>,
    source_id: Option<DocumentId>,
    current_index: usize,
    mode: PlayMode,
}

impl Playlist {
    /// Build a playlist, rejecting units from another source
    pub fn new(
        units: Vec<PlayableUnit>,
        source_id: Option<DocumentId>,
        mode: PlayMode,
    ) -> Result<Self> {
        if let Some(stray) = units.iter().find(|u| u.source_id() != source_id) {
            return Err(LectorError::SourceMismatch {
                expected: source_id,
                found: stray.source_id(),
            });
        }

        Ok(Self {
            units,
            source_id,
            current_index: 0,
            mode,
        })
    }

    /// Create new empty playlist
    pub fn empty(mode: PlayMode) -> Self {
        Self {
            units: Vec::new(),
            source_id: None,
            current_index: 0,
            mode,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[PlayableUnit] {
        &self.units
    }

    pub fn ids(&self) -> Vec<UnitId> {
        self.units.iter().map(PlayableUnit::id).collect()
    }

    pub fn source_id(&self) -> Option<DocumentId> {
        self.source_id
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
    }

    /// Cursor position; meaningless when empty
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<&PlayableUnit> {
        self.units.get(self.current_index)
    }

    pub fn get(&self, index: usize) -> Option<&PlayableUnit> {
        self.units.get(index)
    }

    pub fn index_of(&self, unit_id: UnitId) -> Option<usize> {
        self.units.iter().position(|u| u.id() == unit_id)
    }

    /// Move the cursor; returns false (no change) if out of range
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.units.len() {
            self.current_index = index;
            true
        } else {
            false
        }
    }

    /// Target of a manual step: `(current ± 1 + N) mod N`
    ///
    /// With a single unit both directions land on that unit.
    pub fn step(&self, direction: Direction) -> Option<usize> {
        let n = self.units.len();
        if n == 0 {
            return None;
        }

        Some(match direction {
            Direction::Next => (self.current_index + 1) % n,
            Direction::Previous => (self.current_index + n - 1) % n,
        })
    }

    /// Target after the current unit was read to the end
    ///
    /// `None` means playback stops.
    pub fn after_finish(&self) -> Option<usize> {
        let n = self.units.len();
        if n == 0 {
            return None;
        }

        match self.mode {
            PlayMode::Sequential => {
                let next = self.current_index + 1;
                (next < n).then_some(next)
            }
            PlayMode::SingleRepeat => Some(self.current_index),
            PlayMode::ListRepeat => Some((self.current_index + 1) % n),
        }
    }
}
