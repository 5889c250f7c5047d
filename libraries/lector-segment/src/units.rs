//! Unit construction from chapter boundaries

use crate::error::{Result, SegmentError};
use lector_core::{ChapterSegmenter, DocumentId, PlayableUnit};

/// Segment `raw_text` and build one unit per chapter, in reading order
///
/// Chapter bodies are trimmed; chapters with no text left are skipped.
/// An empty result means the document has nothing to read.
///
/// # Errors
///
/// Returns an error if the segmenter reports boundaries that overlap, are
/// out of order, or exceed the text.
pub fn units_from_text(
    document_id: DocumentId,
    raw_text: &str,
    segmenter: &dyn ChapterSegmenter,
) -> Result<Vec<PlayableUnit>> {
    let boundaries = segmenter.identify(raw_text);

    // Char offset -> byte offset, with one trailing entry for the end
    let byte_at: Vec<usize> = raw_text
        .char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(raw_text.len()))
        .collect();
    let total_chars = byte_at.len() - 1;

    let mut units = Vec::with_capacity(boundaries.len());
    let mut previous_end = 0;
    for boundary in boundaries {
        if boundary.end_index > total_chars || boundary.start_index > boundary.end_index {
            return Err(SegmentError::OutOfRange {
                title: boundary.title,
                end: boundary.end_index,
                len: total_chars,
            });
        }
        if boundary.start_index < previous_end {
            return Err(SegmentError::Overlap {
                title: boundary.title,
                start: boundary.start_index,
                previous_end,
            });
        }
        previous_end = boundary.end_index;

        let body = raw_text[byte_at[boundary.start_index]..byte_at[boundary.end_index]].trim();
        if body.is_empty() {
            tracing::debug!(title = %boundary.title, "Skipping empty chapter");
            continue;
        }
        units.push(PlayableUnit::with_source(document_id, boundary.title, body));
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lector_core::ChapterBoundary;

    struct Fixed(Vec<ChapterBoundary>);

    impl ChapterSegmenter for Fixed {
        fn identify(&self, _raw_text: &str) -> Vec<ChapterBoundary> {
            self.0.clone()
        }
    }

    #[test]
    fn bodies_are_trimmed_and_sourced() {
        let document = DocumentId::generate();
        let segmenter = Fixed(vec![
            ChapterBoundary::new("A", 0, 6),
            ChapterBoundary::new("B", 6, 12),
        ]);

        let units = units_from_text(document, "  one \n two  ", &segmenter).unwrap();

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text(), "one");
        assert_eq!(units[1].text(), "two");
        assert!(units.iter().all(|u| u.source_id() == Some(document)));
    }

    #[test]
    fn empty_chapters_are_skipped() {
        let segmenter = Fixed(vec![
            ChapterBoundary::new("Blank", 0, 3),
            ChapterBoundary::new("Body", 3, 8),
        ]);

        let units = units_from_text(DocumentId::generate(), "   words", &segmenter).unwrap();

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].title(), "Body");
    }

    #[test]
    fn rejects_boundaries_past_the_end() {
        let segmenter = Fixed(vec![ChapterBoundary::new("Long", 0, 50)]);

        let err = units_from_text(DocumentId::generate(), "short", &segmenter).unwrap_err();

        assert_eq!(
            err,
            SegmentError::OutOfRange {
                title: "Long".to_string(),
                end: 50,
                len: 5
            }
        );
    }

    #[test]
    fn rejects_overlapping_boundaries() {
        let segmenter = Fixed(vec![
            ChapterBoundary::new("A", 0, 4),
            ChapterBoundary::new("B", 2, 5),
        ]);

        let err = units_from_text(DocumentId::generate(), "abcde", &segmenter).unwrap_err();

        assert!(matches!(err, SegmentError::Overlap { start: 2, previous_end: 4, .. }));
    }

    #[test]
    fn multibyte_text_is_sliced_by_chars() {
        let segmenter = Fixed(vec![
            ChapterBoundary::new("一", 0, 2),
            ChapterBoundary::new("二", 2, 4),
        ]);

        let units = units_from_text(DocumentId::generate(), "甲乙丙丁", &segmenter).unwrap();

        assert_eq!(units[0].text(), "甲乙");
        assert_eq!(units[1].text(), "丙丁");
    }
}
