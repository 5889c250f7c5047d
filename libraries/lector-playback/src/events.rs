//! Typed events
//!
//! [`AppEvent`]s flow from the UI and the OS lifecycle into the coordinator;
//! [`CoordinatorEvent`]s flow back out to every interested view. Both travel
//! over an [`EventBus`] backed by a tokio broadcast channel.

use crate::controller::Transition;
use crate::display::DisplayState;
use lector_core::{GlobalPlaybackRecord, LectorError, UnitId};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

/// Identifies one open playback view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view-{}", self.0)
    }
}

/// UI and lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A playback view opened on a unit
    EnterPlaybackView { view: ViewId, unit_id: UnitId },

    /// A playback view closed; its position is saved
    ExitPlaybackView { view: ViewId },

    PlayNext,

    PlayPrevious,

    /// Persist the current position now
    SaveProgress,

    /// Open a unit by id and resume it
    OpenById { unit_id: UnitId },

    /// App moved to the background; the position is saved
    AppBackground,

    /// App returned; views are reconciled
    AppForeground,
}

/// Errors that are shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserError {
    ContentMissing { unit_id: UnitId },
    LanguageMismatch { voice: String, content: String },
}

impl UserError {
    /// User-facing part of an error, if it has one
    pub fn from_error(err: &LectorError) -> Option<Self> {
        match err {
            LectorError::ContentMissing(unit_id) => Some(Self::ContentMissing { unit_id: *unit_id }),
            LectorError::LanguageMismatch { voice, content } => Some(Self::LanguageMismatch {
                voice: voice.clone(),
                content: content.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentMissing { .. } => write!(f, "This content is no longer available"),
            Self::LanguageMismatch { voice, content } => write!(
                f,
                "The selected voice ({voice}) may not read this {content} text correctly"
            ),
        }
    }
}

/// Notifications published by the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// Fresh display state (boundary, transition, refresh)
    Display(DisplayState),

    /// A transition was accepted
    Transitioned(Transition),

    /// A unit was read to the end
    Finished { unit_id: UnitId },

    /// A sequential playlist reached its end
    PlaylistEnded,

    /// The global record changed
    Registry(GlobalPlaybackRecord),

    /// Something the user has to see
    Error(UserError),
}

/// Broadcast bus for one event type
///
/// Publishing never blocks; slow subscribers observe `Lagged`.
#[derive(Debug, Clone)]
pub struct EventBus<E> {
    tx: broadcast::Sender<E>,
}

impl<E: Clone> EventBus<E> {
    /// Creates a new bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of subscribers reached; 0 if nobody listens.
    pub fn emit(&self, event: E) -> usize {
        self.tx.send(event).unwrap_or(0)
    }
}
