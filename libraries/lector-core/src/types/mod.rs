mod ids;
mod playback;
mod unit;

pub use ids::{DocumentId, UnitId};
pub use playback::{
    ChapterPointer, ContentType, GlobalPlaybackRecord, PlayMode, PlaybackState, ResumeRecord,
};
pub use unit::{ChapterBoundary, PlayableUnit, PLACEHOLDER_TITLE};
