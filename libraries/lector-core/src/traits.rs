/// Collaborator traits for Lector
///
/// The playback core never talks to a concrete speech engine, database, or
/// document parser; it only sees these seams.
use crate::error::Result;
use crate::types::{ChapterBoundary, DocumentId, PlayableUnit, UnitId};
use async_trait::async_trait;
use std::ops::Range;
use tokio::sync::mpsc;

/// Speech synthesis engine
///
/// Implementers drive the actual voice output. Commands return once the
/// engine has accepted them; progress is reported asynchronously through the
/// [`EngineEventSink`] handed to the engine at construction.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Load a unit, positioning the cursor at `from_char`
    ///
    /// # Errors
    /// Returns an error if the engine cannot accept new content right now
    async fn load(&self, unit: &PlayableUnit, from_char: usize) -> Result<()>;

    /// Start or resume speaking the loaded unit
    async fn start(&self) -> Result<()>;

    /// Pause, keeping the cursor
    async fn pause(&self) -> Result<()>;

    /// Stop and release the loaded unit
    async fn stop(&self) -> Result<()>;

    /// Ground truth: is audio being produced right now
    fn is_speaking(&self) -> bool;

    /// BCP 47 tag of the selected voice, if known
    fn voice_language(&self) -> Option<String> {
        None
    }
}

/// Events reported by a speech engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The loaded unit is ready to start without any settle delay
    Ready { unit_id: UnitId },

    /// Speaking started or resumed
    Started { unit_id: UnitId },

    /// Speaking paused
    Paused { unit_id: UnitId },

    /// Speaking stopped (by command or interruption)
    Stopped { unit_id: UnitId },

    /// The engine is about to speak this character range
    Boundary { unit_id: UnitId, range: Range<usize> },

    /// The unit was spoken to the end
    Finished { unit_id: UnitId },

    /// The engine failed while speaking
    Failed { unit_id: UnitId, message: String },
}

impl EngineEvent {
    /// Unit the event refers to
    pub fn unit_id(&self) -> UnitId {
        match self {
            Self::Ready { unit_id }
            | Self::Started { unit_id }
            | Self::Paused { unit_id }
            | Self::Stopped { unit_id }
            | Self::Boundary { unit_id, .. }
            | Self::Finished { unit_id }
            | Self::Failed { unit_id, .. } => *unit_id,
        }
    }
}

/// Receiving side of engine events, consumed by the playback coordinator
pub type EngineEventStream = mpsc::UnboundedReceiver<EngineEvent>;

/// Sending side of engine events, owned by the speech engine
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventSink {
    /// Create a connected sink/stream pair
    pub fn channel() -> (Self, EngineEventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report an event; dropped silently once the coordinator is gone
    pub fn emit(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Engine event dropped: coordinator stopped");
        }
    }
}

/// Abstract key-value store for durable playback state
///
/// Keys are opaque strings composed from unit/document ids.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete a value (no error if absent)
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Source of readable units
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Look up one unit by id
    async fn unit(&self, id: UnitId) -> Result<Option<PlayableUnit>>;

    /// All units of a document, in reading order
    async fn units_of(&self, document: DocumentId) -> Result<Vec<PlayableUnit>>;
}

/// Chapter boundary detection for raw document text
pub trait ChapterSegmenter: Send + Sync {
    /// Ordered, non-overlapping chapter boundaries (char offsets)
    fn identify(&self, raw_text: &str) -> Vec<ChapterBoundary>;
}
