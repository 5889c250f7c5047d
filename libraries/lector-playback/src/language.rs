//! Voice/content language compatibility

use lector_core::{LectorError, Result};
use std::collections::HashSet;

/// Checks that a voice can read a text
///
/// Tags are compared by primary subtag, case-insensitively. Allowed pairs
/// are symmetric.
#[derive(Debug, Clone)]
pub struct LanguageGuard {
    allowed: HashSet<(String, String)>,
}

impl LanguageGuard {
    pub fn new(pairs: &[[String; 2]]) -> Self {
        let mut allowed = HashSet::new();
        for [a, b] in pairs {
            let (a, b) = (primary_subtag(a), primary_subtag(b));
            allowed.insert((a.clone(), b.clone()));
            allowed.insert((b, a));
        }
        Self { allowed }
    }

    /// `Ok` if `voice_tag` may read `content_tag` text
    pub fn check(&self, voice_tag: &str, content_tag: &str) -> Result<()> {
        let voice = primary_subtag(voice_tag);
        let content = primary_subtag(content_tag);

        if voice == content || self.allowed.contains(&(voice.clone(), content.clone())) {
            return Ok(());
        }

        Err(LectorError::LanguageMismatch { voice, content })
    }
}

impl Default for LanguageGuard {
    fn default() -> Self {
        Self::new(&[["zh".to_string(), "en".to_string()]])
    }
}

/// `zh-Hans-CN` -> `zh`
pub fn primary_subtag(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Best-effort language of a text from its dominant non-Latin script
///
/// Latin text returns `None`: the script alone cannot tell its language.
pub fn detect_language(text: &str) -> Option<&'static str> {
    const TAGS: [&str; 6] = ["zh", "ja", "ko", "ru", "el", "ar"];
    let mut counts = [0usize; 6];
    let mut letters = 0usize;

    for c in text.chars().filter(|c| c.is_alphabetic()).take(2000) {
        letters += 1;
        let slot = match c as u32 {
            0x4E00..=0x9FFF | 0x3400..=0x4DBF => 0,
            0x3040..=0x30FF => 1,
            0xAC00..=0xD7AF | 0x1100..=0x11FF => 2,
            0x0400..=0x04FF => 3,
            0x0370..=0x03FF => 4,
            0x0600..=0x06FF => 5,
            _ => continue,
        };
        counts[slot] += 1;
    }

    // Kana anywhere means Japanese even when kanji dominate
    if counts[1] > 0 && counts[1] * 10 >= counts[0] {
        return Some("ja");
    }

    let (slot, count) = counts
        .iter()
        .enumerate()
        .max_by_key(|(_, count)| **count)?;
    (*count * 2 > letters).then_some(TAGS[slot])
}
