//! Simulated speech engine that "reads" to the console
//!
//! Text is spoken sentence by sentence at a fixed rate of characters per
//! second; each sentence is reported as a boundary and optionally printed.

use async_trait::async_trait;
use lector_core::{EngineEvent, EngineEventSink, LectorError, PlayableUnit, Result, SpeechEngine};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Sentence-ending characters
const SENTENCE_ENDS: &[char] = &['.', '!', '?', '。', '！', '？', '\n'];

/// Char ranges of the sentences of `text` starting at or after `from`
///
/// A sentence runs up to and including its terminator plus trailing
/// whitespace. The first range starts at `from` even mid-sentence.
pub fn sentence_ranges(text: &str, from: usize) -> Vec<Range<usize>> {
    let chars: Vec<char> = text.chars().collect();
    let mut ranges = Vec::new();
    let mut start = from.min(chars.len());
    let mut i = start;

    while i < chars.len() {
        if SENTENCE_ENDS.contains(&chars[i]) {
            let mut end = i + 1;
            while end < chars.len() && chars[end].is_whitespace() {
                end += 1;
            }
            ranges.push(start..end);
            start = end;
            i = end;
        } else {
            i += 1;
        }
    }
    if start < chars.len() {
        ranges.push(start..chars.len());
    }
    ranges
}

#[derive(Default)]
struct Inner {
    unit: Option<PlayableUnit>,
    task: Option<JoinHandle<()>>,
}

/// Console speech engine
pub struct ConsoleEngine {
    sink: EngineEventSink,
    chars_per_second: f64,
    voice: Option<String>,
    echo: bool,
    speaking: Arc<AtomicBool>,
    cursor: Arc<AtomicUsize>,
    inner: Mutex<Inner>,
}

impl ConsoleEngine {
    pub fn new(
        sink: EngineEventSink,
        chars_per_second: f64,
        voice: Option<String>,
        echo: bool,
    ) -> Self {
        Self {
            sink,
            chars_per_second,
            voice,
            echo,
            speaking: Arc::new(AtomicBool::new(false)),
            cursor: Arc::new(AtomicUsize::new(0)),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| LectorError::engine("console engine state poisoned"))
    }

    /// Abort the speaking task, if any
    fn halt(inner: &mut Inner) -> bool {
        match inner.task.take() {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SpeechEngine for ConsoleEngine {
    async fn load(&self, unit: &PlayableUnit, from_char: usize) -> Result<()> {
        {
            let mut inner = self.lock()?;
            Self::halt(&mut inner);
            inner.unit = Some(unit.clone());
        }
        self.speaking.store(false, Ordering::SeqCst);
        self.cursor
            .store(from_char.min(unit.char_len()), Ordering::SeqCst);

        debug!(unit_id = %unit.id(), from_char, "Console engine loaded unit");
        if self.echo {
            println!("\n== {} ==\n", unit.title());
        }
        self.sink.emit(EngineEvent::Ready { unit_id: unit.id() });
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let mut inner = self.lock()?;
        let Some(unit) = inner.unit.clone() else {
            return Err(LectorError::engine("nothing loaded"));
        };
        if inner.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(());
        }

        let from = self.cursor.load(Ordering::SeqCst);
        let ranges = sentence_ranges(unit.text(), from);
        let chars: Vec<char> = unit.text().chars().collect();
        let sink = self.sink.clone();
        let speaking = Arc::clone(&self.speaking);
        let cursor = Arc::clone(&self.cursor);
        let rate = self.chars_per_second;
        let echo = self.echo;
        let unit_id = unit.id();

        speaking.store(true, Ordering::SeqCst);
        sink.emit(EngineEvent::Started { unit_id });

        inner.task = Some(tokio::spawn(async move {
            for range in ranges {
                sink.emit(EngineEvent::Boundary {
                    unit_id,
                    range: range.clone(),
                });
                if echo {
                    let sentence: String = chars[range.clone()].iter().collect();
                    println!("{}", sentence.trim_end());
                }
                let seconds = range.len() as f64 / rate;
                tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
                cursor.store(range.end, Ordering::SeqCst);
            }
            speaking.store(false, Ordering::SeqCst);
            sink.emit(EngineEvent::Finished { unit_id });
        }));
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut inner = self.lock()?;
        Self::halt(&mut inner);
        self.speaking.store(false, Ordering::SeqCst);
        if let Some(unit) = &inner.unit {
            self.sink.emit(EngineEvent::Paused { unit_id: unit.id() });
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let mut inner = self.lock()?;
        Self::halt(&mut inner);
        self.speaking.store(false, Ordering::SeqCst);
        self.cursor.store(0, Ordering::SeqCst);
        if let Some(unit) = inner.unit.take() {
            self.sink.emit(EngineEvent::Stopped { unit_id: unit.id() });
        }
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    fn voice_language(&self) -> Option<String> {
        self.voice.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentences_cover_text() {
        let text = "One. Two!  Three";
        assert_eq!(sentence_ranges(text, 0), vec![0..5, 5..11, 11..16]);
    }

    #[test]
    fn test_sentences_start_mid_sentence() {
        let text = "One. Two!  Three";
        assert_eq!(sentence_ranges(text, 7), vec![7..11, 11..16]);
        assert!(sentence_ranges(text, 99).is_empty());
    }

    #[test]
    fn test_cjk_terminators() {
        let text = "第一句。第二句！";
        assert_eq!(sentence_ranges(text, 0), vec![0..4, 4..8]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_unit_to_the_end() {
        let (sink, mut events) = EngineEventSink::channel();
        let engine = ConsoleEngine::new(sink, 10.0, None, false);
        let unit = PlayableUnit::new("Short", "Hello there. Bye.");

        engine.load(&unit, 0).await.unwrap();
        engine.start().await.unwrap();
        assert!(engine.is_speaking());

        let mut boundaries = Vec::new();
        loop {
            match events.recv().await.unwrap() {
                EngineEvent::Boundary { range, .. } => boundaries.push(range),
                EngineEvent::Finished { unit_id } => {
                    assert_eq!(unit_id, unit.id());
                    break;
                }
                _ => {}
            }
        }

        assert_eq!(boundaries, vec![0..13, 13..17]);
        assert!(!engine.is_speaking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_keeps_cursor_for_restart() {
        let (sink, mut events) = EngineEventSink::channel();
        let engine = ConsoleEngine::new(sink, 10.0, None, false);
        let unit = PlayableUnit::new("Short", "First sentence here. Second one.");

        engine.load(&unit, 0).await.unwrap();
        engine.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        engine.pause().await.unwrap();
        assert!(!engine.is_speaking());

        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, EngineEvent::Finished { .. }));
        }

        engine.start().await.unwrap();
        let first = loop {
            if let EngineEvent::Boundary { range, .. } = events.recv().await.unwrap() {
                break range;
            }
        };
        assert_eq!(first.start, 21);
    }

    #[tokio::test]
    async fn test_start_without_load_fails() {
        let (sink, _events) = EngineEventSink::channel();
        let engine = ConsoleEngine::new(sink, 10.0, Some("en".to_string()), false);

        assert!(engine.start().await.is_err());
        assert_eq!(engine.voice_language().as_deref(), Some("en"));
    }
}
