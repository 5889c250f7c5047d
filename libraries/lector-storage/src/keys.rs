//! Key layout of the persistent store
//!
//! Every durable value lives under one of these keys. Ids are rendered in
//! their canonical hyphenated UUID form.

use lector_core::{DocumentId, UnitId};

/// Singleton global "now playing" record
pub const GLOBAL_RECORD: &str = "playback/global";

/// Id of the unit that was last handed to the speech engine
pub const LAST_PLAYED_UNIT: &str = "playback/last_unit";

/// Resume record of one unit
pub fn resume_record(unit: UnitId) -> String {
    format!("resume/unit/{unit}")
}

/// Last active chapter of a document
pub fn chapter_pointer(document: DocumentId) -> String {
    format!("resume/document/{document}/chapter")
}

/// Overall reading progress (0..=1) of a document
pub fn document_progress(document: DocumentId) -> String {
    format!("resume/document/{document}/progress")
}
