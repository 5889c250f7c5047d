//! Lector Core
//!
//! Platform-agnostic core types, traits, and error handling for the Lector
//! text-to-speech reader.
//!
//! This crate provides the foundational building blocks shared by the storage,
//! segmentation, and playback crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `PlayableUnit`, `GlobalPlaybackRecord`, `ResumeRecord`, etc.
//! - **Collaborator Traits**: `SpeechEngine`, `PersistentStore`, `ContentStore`,
//!   `ChapterSegmenter`
//! - **Error Handling**: Unified `LectorError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use lector_core::types::{DocumentId, PlayableUnit};
//!
//! let document = DocumentId::generate();
//! let unit = PlayableUnit::with_source(document, "Chapter 1", "It was a dark night.");
//!
//! assert_eq!(unit.source_id(), Some(document));
//! assert_eq!(unit.char_len(), 20);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{LectorError, Result};
pub use traits::{
    ChapterSegmenter, ContentStore, EngineEvent, EngineEventSink, EngineEventStream,
    PersistentStore, SpeechEngine,
};

pub use types::{
    ChapterBoundary, ChapterPointer, ContentType, DocumentId, GlobalPlaybackRecord, PlayMode,
    PlayableUnit, PlaybackState, ResumeRecord, UnitId,
};
