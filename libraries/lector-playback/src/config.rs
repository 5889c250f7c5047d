//! Playback configuration

use lector_core::{LectorError, PlayMode, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Paragraph tracking thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Paragraphs with fewer non-whitespace chars are never highlighted
    #[serde(default = "default_min_paragraph_chars")]
    pub min_paragraph_chars: usize,

    /// Fraction of a paragraph's length near its edges where the previous
    /// neighbour is kept
    #[serde(default = "default_boundary_epsilon")]
    pub boundary_epsilon: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            min_paragraph_chars: default_min_paragraph_chars(),
            boundary_epsilon: default_boundary_epsilon(),
        }
    }
}

/// Playback coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Minimum interval between accepted navigation transitions
    #[serde(default = "default_transition_cooldown_ms")]
    pub transition_cooldown_ms: u64,

    /// Delay between load and start when the engine sends no `Ready`
    #[serde(default = "default_settle_window_ms")]
    pub settle_window_ms: u64,

    /// Period of the background reconciliation pass
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,

    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Speech rate used for time estimates
    #[serde(default = "default_chars_per_second")]
    pub chars_per_second: f64,

    /// Buffer size of broadcast channels
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Voice/content language pairs that may be mixed (symmetric)
    #[serde(default = "default_language_pairs")]
    pub language_pairs: Vec<[String; 2]>,

    /// Navigation mode of new playlists
    #[serde(default)]
    pub default_mode: PlayMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            transition_cooldown_ms: default_transition_cooldown_ms(),
            settle_window_ms: default_settle_window_ms(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
            tracker: TrackerConfig::default(),
            chars_per_second: default_chars_per_second(),
            event_capacity: default_event_capacity(),
            language_pairs: default_language_pairs(),
            default_mode: PlayMode::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn transition_cooldown(&self) -> Duration {
        Duration::from_millis(self.transition_cooldown_ms)
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.reconcile_interval_ms == 0 {
            return Err(LectorError::invalid_input(
                "reconcile_interval_ms must be greater than zero",
            ));
        }

        if !(self.chars_per_second.is_finite() && self.chars_per_second > 0.0) {
            return Err(LectorError::invalid_input(format!(
                "chars_per_second must be a positive number, got {}",
                self.chars_per_second
            )));
        }

        if self.event_capacity == 0 {
            return Err(LectorError::invalid_input(
                "event_capacity must be greater than zero",
            ));
        }

        if !(0.0..0.5).contains(&self.tracker.boundary_epsilon) {
            return Err(LectorError::invalid_input(format!(
                "tracker.boundary_epsilon must be in [0, 0.5), got {}",
                self.tracker.boundary_epsilon
            )));
        }

        Ok(())
    }
}

// Default values
fn default_min_paragraph_chars() -> usize {
    2
}

fn default_boundary_epsilon() -> f64 {
    0.05
}

fn default_transition_cooldown_ms() -> u64 {
    1500
}

fn default_settle_window_ms() -> u64 {
    300
}

fn default_reconcile_interval_ms() -> u64 {
    2000
}

fn default_chars_per_second() -> f64 {
    15.0
}

fn default_event_capacity() -> usize {
    64
}

fn default_language_pairs() -> Vec<[String; 2]> {
    vec![["zh".to_string(), "en".to_string()]]
}
