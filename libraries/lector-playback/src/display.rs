//! State published to views

use crate::position::DisplayTarget;
use lector_core::UnitId;
use serde::{Deserialize, Serialize};

/// Everything a playback view renders
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayState {
    pub unit_id: Option<UnitId>,
    pub title: String,
    pub position_chars: usize,
    pub progress_fraction: f64,
    /// Estimated elapsed reading time
    pub current_time_ms: u64,
    /// Estimated reading time of the whole unit
    pub total_time_ms: u64,
    pub is_playing: bool,
    /// Opened at a saved position and not speaking yet
    pub is_resuming: bool,
    pub highlighted: Vec<usize>,
    pub scroll_to: Option<usize>,
    pub playlist: Vec<UnitId>,
    pub current_index: Option<usize>,
}

impl DisplayState {
    /// Apply a tracker result
    pub fn with_target(mut self, target: DisplayTarget) -> Self {
        self.highlighted = target.highlighted;
        self.scroll_to = target.scroll_to;
        self
    }
}

/// Reading time of `chars` characters at `chars_per_second`
pub fn estimate_ms(chars: usize, chars_per_second: f64) -> u64 {
    if chars_per_second <= 0.0 {
        return 0;
    }
    (chars as f64 / chars_per_second * 1000.0).round() as u64
}

/// `m:ss` / `h:mm:ss`
pub fn format_time(ms: u64) -> String {
    let total = ms / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
