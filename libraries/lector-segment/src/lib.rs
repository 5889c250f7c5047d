//! Lector Segment
//!
//! Splits raw document text into chapters and turns them into
//! [`PlayableUnit`]s.
//!
//! # Example
//!
//! ```rust
//! use lector_core::{ChapterSegmenter, DocumentId};
//! use lector_segment::{units_from_text, HeadingSegmenter};
//!
//! let text = "Chapter 1\nCall me Ishmael.\n\nChapter 2\nSome years ago.";
//! let segmenter = HeadingSegmenter::new();
//!
//! let boundaries = segmenter.identify(text);
//! assert_eq!(boundaries.len(), 2);
//!
//! let units = units_from_text(DocumentId::generate(), text, &segmenter).unwrap();
//! assert_eq!(units[1].title(), "Chapter 2");
//! ```
//!
//! [`PlayableUnit`]: lector_core::PlayableUnit

#![forbid(unsafe_code)]

mod error;
mod heading;
mod patterns;
mod units;

pub use error::{Result, SegmentError};
pub use heading::{HeadingSegmenter, FRONT_MATTER_TITLE, WHOLE_TEXT_TITLE};
pub use units::units_from_text;
