/// Core error types for Lector
use crate::types::{DocumentId, UnitId};
use thiserror::Error;

/// Result type alias using `LectorError`
pub type Result<T> = std::result::Result<T, LectorError>;

/// Core error type for Lector
#[derive(Error, Debug)]
pub enum LectorError {
    /// Referenced unit does not exist in the content store
    #[error("Content not found: {0}")]
    ContentMissing(UnitId),

    /// Unit has no readable text
    #[error("Unit has no readable text: {0}")]
    EmptyContent(UnitId),

    /// Selected voice cannot read the detected content language
    #[error("Voice language '{voice}' does not match content language '{content}'")]
    LanguageMismatch { voice: String, content: String },

    /// Navigation rejected by the debounce guard
    #[error("Transition rejected: another transition happened within the cooldown window")]
    DuplicateTransition,

    /// Playlist and unit disagree on their parent document
    #[error("Source mismatch: playlist source {expected:?}, unit source {found:?}")]
    SourceMismatch {
        expected: Option<DocumentId>,
        found: Option<DocumentId>,
    },

    /// Persistent store unavailable or failing
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Speech engine rejected a command
    #[error("Speech engine error: {0}")]
    Engine(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Coordinator is no longer running
    #[error("Playback coordinator is not running")]
    CoordinatorClosed,

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl LectorError {
    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a speech engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error must be shown to the user.
    ///
    /// Only missing content and language mismatches reach the UI; everything
    /// else is corrected internally or logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::ContentMissing(_) | Self::LanguageMismatch { .. }
        )
    }
}
