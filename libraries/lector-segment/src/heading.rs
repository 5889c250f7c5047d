//! Heading-based chapter detection

use crate::patterns::{CJK_HEADING, MARKDOWN_HEADING, NUMBERED_HEADING};
use lector_core::{ChapterBoundary, ChapterSegmenter};
use std::collections::BTreeMap;

/// Title of the chapter made from text preceding the first heading
pub const FRONT_MATTER_TITLE: &str = "Front matter";

/// Title of the single chapter of a text without headings
pub const WHOLE_TEXT_TITLE: &str = "Full text";

/// Detects chapters from heading lines
///
/// A heading line is any of:
/// - `Chapter`/`Part`/`Book` followed by an arabic, roman or spelled number,
///   optionally followed by `:`, `.` or `-` and a title
/// - a Markdown heading, levels 1 to 3
/// - a CJK `第…章`, `第…回` or `第…节` heading
///
/// Each chapter runs from its heading line to the next heading.
#[derive(Debug, Clone)]
pub struct HeadingSegmenter {
    markdown: bool,
}

impl HeadingSegmenter {
    pub fn new() -> Self {
        Self { markdown: true }
    }

    /// Ignore Markdown headings (for plain text where `#` lines are content)
    #[must_use]
    pub fn without_markdown(mut self) -> Self {
        self.markdown = false;
        self
    }

    /// Heading lines as `(byte offset, title)`, in text order
    fn headings(&self, text: &str) -> Vec<(usize, String)> {
        let mut found = BTreeMap::new();

        for m in NUMBERED_HEADING.find_iter(text) {
            found.insert(m.start(), clean_title(m.as_str()));
        }
        for m in CJK_HEADING.find_iter(text) {
            found.insert(m.start(), clean_title(m.as_str()));
        }
        if self.markdown {
            for m in MARKDOWN_HEADING.find_iter(text) {
                let title = m.as_str().trim_start().trim_start_matches('#');
                found.insert(m.start(), clean_title(title));
            }
        }

        found.into_iter().collect()
    }
}

impl Default for HeadingSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChapterSegmenter for HeadingSegmenter {
    fn identify(&self, raw_text: &str) -> Vec<ChapterBoundary> {
        if raw_text.trim().is_empty() {
            return Vec::new();
        }

        let total_chars = raw_text.chars().count();
        let headings = self.headings(raw_text);
        if headings.is_empty() {
            return vec![ChapterBoundary::new(WHOLE_TEXT_TITLE, 0, total_chars)];
        }

        let preamble_is_text = !raw_text[..headings[0].0].trim().is_empty();

        // Byte offsets from the regex engine become char offsets
        let starts: Vec<(usize, String)> = headings
            .into_iter()
            .map(|(byte, title)| (raw_text[..byte].chars().count(), title))
            .collect();

        let mut boundaries = Vec::with_capacity(starts.len() + 1);
        if preamble_is_text {
            boundaries.push(ChapterBoundary::new(FRONT_MATTER_TITLE, 0, starts[0].0));
        }

        for (i, (start, title)) in starts.iter().enumerate() {
            let end = starts.get(i + 1).map_or(total_chars, |(next, _)| *next);
            boundaries.push(ChapterBoundary::new(title.clone(), *start, end));
        }

        tracing::debug!(chapters = boundaries.len(), "Identified chapters");
        boundaries
    }
}

fn clean_title(line: &str) -> String {
    line.trim().to_string()
}
