//! Text filters applied to raw STT output.
//!
//! Streaming models emit non-speech annotations ("[music]", "(applause)",
//! "♪") and a well-known silence hallucination ("Thank you"). The filters
//! strip or hold these before the segmenter updates its partial state:
//! - bracketed tags and note glyphs are removed from mixed text
//! - output that is *only* a tag is suppressed until the tag has persisted
//!   for a hold period (so a real "[music]" caption still shows eventually)
//! - the silence hallucination is dropped outright

use regex::Regex;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

static AUDIO_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]|\(.*?\)|♪").unwrap());

/// Removes bracketed audio-event tags and note glyphs, then trims.
pub fn strip_audio_tags(text: &str) -> String {
    AUDIO_TAG_RE.replace_all(text, "").trim().to_string()
}

/// True for the known silence hallucination emitted on near-empty audio.
pub fn is_silence_hallucination(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower == "thank you" || lower == "thank you."
}

/// Stateful filter tracking how long pure-tag output has persisted.
#[derive(Debug)]
pub struct TextFilter {
    tag_hold: Duration,
    /// When the current run of pure non-speech tag outputs began.
    tag_streak_start: Option<Instant>,
}

impl TextFilter {
    /// Creates a filter with the given pure-tag hold duration.
    pub fn new(tag_hold: Duration) -> Self {
        Self {
            tag_hold,
            tag_streak_start: None,
        }
    }

    /// Applies the ordered filters to raw engine output.
    ///
    /// Returns the text the segmenter should process, or None if the update
    /// must be dropped.
    pub fn apply(&mut self, raw: &str, now: Instant) -> Option<String> {
        let trimmed = raw.trim();
        let stripped = strip_audio_tags(trimmed);

        let is_pure_tag = stripped.chars().count() < 2 && trimmed.chars().count() >= 2;

        let text = if is_pure_tag {
            // Hold pure tags until they have persisted long enough to be
            // a real audio event rather than recognition noise.
            let streak_start = *self.tag_streak_start.get_or_insert(now);
            if now.duration_since(streak_start) < self.tag_hold {
                return None;
            }
            trimmed.to_string()
        } else {
            self.tag_streak_start = None;
            if stripped.chars().count() < 2 {
                return None;
            }
            stripped
        };

        if is_silence_hallucination(&text) {
            return None;
        }

        Some(text)
    }
}
