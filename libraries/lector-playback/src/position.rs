//! Speech cursor to paragraph mapping
//!
//! Paragraphs are the segments of a unit's text between blank-line
//! delimiters; a paragraph's id is its index. All offsets are char offsets.
//! The delimiter after a paragraph belongs to that paragraph.

use crate::config::TrackerConfig;
use std::ops::Range;

/// Paragraph delimiter
pub const PARAGRAPH_DELIMITER: &str = "\n\n";

const DELIMITER_LEN: usize = 2;

/// One paragraph of a text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paragraph<'a> {
    /// Paragraph id (index in the text)
    pub index: usize,
    /// Char offset of the first char
    pub start: usize,
    /// Length in chars, delimiter excluded
    pub len: usize,
    pub text: &'a str,
}

impl Paragraph<'_> {
    /// Char offset one past the last char
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Highlight set plus scroll target for one cursor range
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayTarget {
    pub highlighted: Vec<usize>,
    pub scroll_to: Option<usize>,
}

/// Split `text` on blank lines
pub fn paragraphs_of(text: &str) -> Vec<Paragraph<'_>> {
    let mut start = 0;
    text.split(PARAGRAPH_DELIMITER)
        .enumerate()
        .map(|(index, segment)| {
            let len = segment.chars().count();
            let paragraph = Paragraph {
                index,
                start,
                len,
                text: segment,
            };
            start += len + DELIMITER_LEN;
            paragraph
        })
        .collect()
}

/// Maps speech positions to paragraphs
///
/// Holds only immutable configuration; every lookup is a pure function of
/// its arguments.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    config: TrackerConfig,
}

impl PositionTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn is_eligible(&self, paragraph: &Paragraph<'_>) -> bool {
        paragraph
            .text
            .chars()
            .filter(|c| !c.is_whitespace())
            .take(self.config.min_paragraph_chars)
            .count()
            >= self.config.min_paragraph_chars
    }

    /// Paragraph to highlight for the cursor at `position`
    ///
    /// `previous` is the paragraph selected last time; near a paragraph
    /// edge it is kept if it is the adjacent eligible paragraph. Returns
    /// `None` only when no paragraph is eligible.
    pub fn paragraph_at(
        &self,
        position: usize,
        text: &str,
        previous: Option<usize>,
    ) -> Option<usize> {
        let paragraphs = paragraphs_of(text);
        let eligible: Vec<bool> = paragraphs.iter().map(|p| self.is_eligible(p)).collect();
        let last_eligible = eligible.iter().rposition(|e| *e)?;

        let Some(owner) = paragraphs
            .iter()
            .position(|p| position < p.end() + DELIMITER_LEN)
        else {
            return Some(last_eligible);
        };

        if !eligible[owner] {
            let forward = (owner + 1..paragraphs.len()).find(|i| eligible[*i]);
            let backward = (0..owner).rev().find(|i| eligible[*i]);
            return forward.or(backward);
        }

        let paragraph = &paragraphs[owner];
        let span = paragraph.len.max(1) as f64;
        let margin = span * self.config.boundary_epsilon;
        let offset = position - paragraph.start;
        let near_front = (offset as f64) < margin;
        let near_back = (paragraph.len.saturating_sub(offset) as f64) < margin;

        match previous {
            Some(prev)
                if near_front && owner > 0 && prev == owner - 1 && eligible[prev] =>
            {
                Some(prev)
            }
            Some(prev) if near_back && prev == owner + 1 && eligible.get(prev) == Some(&true) => {
                Some(prev)
            }
            _ => Some(owner),
        }
    }

    /// Paragraphs whose span intersects `range`
    pub fn highlighted_paragraphs(&self, range: Range<usize>, text: &str) -> Vec<usize> {
        if range.is_empty() {
            return Vec::new();
        }

        paragraphs_of(text)
            .iter()
            .filter(|p| p.start < range.end && range.start < p.end())
            .map(|p| p.index)
            .collect()
    }

    /// Paragraph to show when reopening a unit that is not speaking
    pub fn paragraph_for_resume_position(&self, last_position: usize, text: &str) -> Option<usize> {
        if last_position == 0 {
            return None;
        }
        self.paragraph_at(last_position, text, None)
    }

    /// Highlight set and stable scroll target for a boundary event
    pub fn display_target(
        &self,
        range: Range<usize>,
        text: &str,
        previous: Option<usize>,
    ) -> DisplayTarget {
        DisplayTarget {
            scroll_to: self.paragraph_at(range.start, text, previous),
            highlighted: self.highlighted_paragraphs(range, text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Paragraph spans: [0,10) [12,22) [24,25) [27,37)
    const TEXT: &str = "aaaaaaaaaa\n\nbbbbbbbbbb\n\n.\n\ncccccccccc";

    fn tracker() -> PositionTracker {
        PositionTracker::default()
    }

    #[test]
    fn splits_on_blank_lines_with_char_offsets() {
        let paragraphs = paragraphs_of("héllo\n\nwörld");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].len, 5);
        assert_eq!(paragraphs[1].start, 7);
        assert_eq!(paragraphs[1].text, "wörld");
    }

    #[test]
    fn finds_owning_paragraph() {
        assert_eq!(tracker().paragraph_at(5, TEXT, None), Some(0));
        assert_eq!(tracker().paragraph_at(15, TEXT, None), Some(1));
        assert_eq!(tracker().paragraph_at(30, TEXT, None), Some(3));
    }

    #[test]
    fn delimiter_belongs_to_preceding_paragraph() {
        assert_eq!(tracker().paragraph_at(11, TEXT, None), Some(0));
    }

    #[test]
    fn short_paragraph_is_skipped_forward() {
        // Paragraph 2 is "." (one non-whitespace char)
        assert_eq!(tracker().paragraph_at(24, TEXT, None), Some(3));
    }

    #[test]
    fn short_trailing_paragraph_falls_back() {
        let text = "aaaaaaaaaa\n\n.";
        assert_eq!(tracker().paragraph_at(12, text, None), Some(0));
    }

    #[test]
    fn past_the_end_is_last_eligible() {
        let text = "aaaaaaaaaa\n\nbbbbbbbbbb\n\n.";
        assert_eq!(tracker().paragraph_at(500, text, None), Some(1));
    }

    #[test]
    fn no_eligible_paragraph() {
        assert_eq!(tracker().paragraph_at(0, ".\n\n \n\n", None), None);
        assert_eq!(tracker().paragraph_at(0, "", None), None);
    }

    #[test]
    fn previous_neighbour_is_kept_near_front_edge() {
        // 12 is the first char of paragraph 1, within 5% of its front
        assert_eq!(tracker().paragraph_at(12, TEXT, Some(0)), Some(0));
        // Not near the edge: precision wins
        assert_eq!(tracker().paragraph_at(16, TEXT, Some(0)), Some(1));
        // Previous is not a neighbour
        assert_eq!(tracker().paragraph_at(12, TEXT, Some(3)), Some(1));
    }

    #[test]
    fn previous_neighbour_is_kept_near_back_edge() {
        let text = "aaaaaaaaaaaaaaaaaaaa\n\nbbbbbbbbbbbbbbbbbbbb";
        // 20 is the delimiter after paragraph 0
        assert_eq!(tracker().paragraph_at(20, text, Some(1)), Some(1));
        assert_eq!(tracker().paragraph_at(20, text, None), Some(0));
    }

    #[test]
    fn highlight_covers_intersecting_paragraphs() {
        assert_eq!(tracker().highlighted_paragraphs(8..14, TEXT), vec![0, 1]);
        assert_eq!(tracker().highlighted_paragraphs(10..12, TEXT), Vec::<usize>::new());
        assert!(tracker().highlighted_paragraphs(5..5, TEXT).is_empty());
    }

    #[test]
    fn resume_position_zero_has_no_paragraph() {
        assert_eq!(tracker().paragraph_for_resume_position(0, TEXT), None);
        assert_eq!(tracker().paragraph_for_resume_position(15, TEXT), Some(1));
    }

    #[test]
    fn display_target_combines_highlight_and_scroll() {
        let target = tracker().display_target(12..20, TEXT, Some(0));
        assert_eq!(target.highlighted, vec![1]);
        assert_eq!(target.scroll_to, Some(0));
    }
}
