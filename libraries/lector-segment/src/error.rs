/// Segmentation errors
use thiserror::Error;

/// Result type alias using `SegmentError`
pub type Result<T> = std::result::Result<T, SegmentError>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SegmentError {
    /// A boundary lies outside the text
    #[error("Chapter '{title}' ends at {end} but the text has {len} chars")]
    OutOfRange {
        title: String,
        end: usize,
        len: usize,
    },

    /// Boundaries overlap or are out of order
    #[error("Chapter '{title}' starts at {start}, before the previous chapter ends at {previous_end}")]
    Overlap {
        title: String,
        start: usize,
        previous_end: usize,
    },
}

impl From<SegmentError> for lector_core::LectorError {
    fn from(err: SegmentError) -> Self {
        lector_core::LectorError::invalid_input(err.to_string())
    }
}
