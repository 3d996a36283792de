//! Two-line caption renderer.
//!
//! Accumulates committed history, merges the live partial over it, wraps
//! into lines and drives a block-snap two-line display: line 1 is pinned
//! across re-wraps caused by revisions so the top line does not flicker.

use crate::defaults;
use crate::render::layout::wrap;
use crate::render::merge::merge;
use crate::segment::filters::{is_silence_hallucination, strip_audio_tags};
use regex::Regex;
use std::sync::{Arc, LazyLock, Mutex};

/// Whole-word blacklist masked when profanity filtering is on.
const PROFANITY_BLACKLIST: &[&str] = &[
    "ass", "bastard", "bitch", "crap", "damn", "fuck", "hell", "shit",
];

static PROFANITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"(?i)\b(?:{})\b", PROFANITY_BLACKLIST.join("|"));
    Regex::new(&pattern).unwrap()
});

/// Masks blacklisted words with `***`.
fn mask_profanity(text: &str) -> String {
    PROFANITY_RE.replace_all(text, "***").to_string()
}

/// Capability for the two caption lines of the display.
pub trait CaptionSink: Send {
    fn set_line1(&self, text: &str);
    fn set_line2(&self, text: &str);
}

/// Opaque text transformation applied just before display.
pub trait Translator: Send {
    fn translate(&self, text: &str) -> String;
}

/// Configuration for the renderer.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Caption width in characters; the embedding UI keeps this current.
    pub chars_per_line: usize,
    /// History lines retained before the oldest are trimmed.
    pub max_history_lines: usize,
    /// When false, bracketed audio-event tags are stripped before display.
    pub show_audio_tags: bool,
    /// Mask blacklisted words with `***`.
    pub filter_profanity: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            chars_per_line: defaults::CHARS_PER_LINE,
            max_history_lines: defaults::MAX_HISTORY_LINES,
            show_audio_tags: true,
            filter_profanity: false,
        }
    }
}

/// Turns the stream of caption events into a stable two-line display.
///
/// Must be driven from a single logical thread; the pipeline facade
/// serializes all calls onto its dispatcher task.
pub struct OutputRenderer {
    config: RendererConfig,
    sink: Box<dyn CaptionSink>,
    translator: Option<Box<dyn Translator>>,
    /// Committed text only; partials never persist here.
    history: String,
    /// Previously rendered line 1, for flicker suppression.
    pinned_line1: String,
}

impl OutputRenderer {
    /// Creates a renderer with default configuration.
    pub fn new(sink: Box<dyn CaptionSink>) -> Self {
        Self::with_config(RendererConfig::default(), sink)
    }

    /// Creates a renderer with custom configuration.
    pub fn with_config(config: RendererConfig, sink: Box<dyn CaptionSink>) -> Self {
        Self {
            config,
            sink,
            translator: None,
            history: String::new(),
            pinned_line1: String::new(),
        }
    }

    /// Installs a translation hook applied before display.
    pub fn with_translator(mut self, translator: Box<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Current caption width.
    pub fn chars_per_line(&self) -> usize {
        self.config.chars_per_line
    }

    /// Updates the caption width (called by the UI on resize).
    pub fn set_chars_per_line(&mut self, width: usize) {
        self.config.chars_per_line = width;
    }

    /// Committed history text.
    pub fn history(&self) -> &str {
        &self.history
    }

    /// Handles one caption event.
    pub fn on_text(&mut self, text: &str, is_final: bool) {
        let Some(text) = self.prepare(text) else {
            return;
        };

        if is_final {
            self.history = merge(&self.history, &text);
            self.trim_history();
            let display = self.history.clone();
            self.render(&display);
        } else {
            let display = merge(&self.history, &text);
            self.render(&display);
        }
    }

    /// Pre-filters an incoming text; None means drop the update.
    fn prepare(&self, text: &str) -> Option<String> {
        let mut text = text.trim().to_string();
        if !self.config.show_audio_tags {
            text = strip_audio_tags(&text);
        }
        // Tag removal can leave doubled spaces; history stays normalized
        text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.chars().count() < 2 || is_silence_hallucination(&text) {
            return None;
        }
        if self.config.filter_profanity {
            text = mask_profanity(&text);
        }
        if let Some(translator) = &self.translator {
            text = translator.translate(&text);
        }
        Some(text)
    }

    /// Drops the oldest wrapped lines once history exceeds the cap.
    fn trim_history(&mut self) {
        let lines = wrap(&self.history, self.config.chars_per_line);
        if lines.len() > self.config.max_history_lines {
            let drop = lines.len() - self.config.max_history_lines;
            self.history = lines[drop..].join(" ");
        }
    }

    /// Renders the full text through the two-line block-snap layout.
    fn render(&mut self, text: &str) {
        let lines = wrap(text, self.config.chars_per_line);

        let (line1, line2) = match lines.len() {
            0 => {
                self.pinned_line1.clear();
                (String::new(), String::new())
            }
            1 => {
                self.pinned_line1 = lines[0].clone();
                (lines[0].clone(), String::new())
            }
            n => {
                let target1 = &lines[n - 2];
                let target2 = lines[n - 1].clone();
                let pinned_holds = !self.pinned_line1.is_empty()
                    && target1
                        .to_lowercase()
                        .starts_with(&self.pinned_line1.to_lowercase());
                let line1 = if pinned_holds {
                    self.pinned_line1.clone()
                } else {
                    self.pinned_line1 = target1.clone();
                    target1.clone()
                };
                (line1, target2)
            }
        };

        // Empty strings collapse caption rows in most UIs
        self.sink.set_line1(non_empty(&line1));
        self.sink.set_line2(non_empty(&line2));
    }
}

fn non_empty(text: &str) -> &str {
    if text.is_empty() { " " } else { text }
}

/// Recording sink for tests.
#[derive(Clone, Default)]
pub struct MockSink {
    lines: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockSink {
    /// Create a new recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All (line1, line2) pairs rendered so far.
    pub fn renders(&self) -> Vec<(String, String)> {
        self.lines.lock().unwrap().clone()
    }

    /// The most recent (line1, line2) pair.
    pub fn last(&self) -> Option<(String, String)> {
        self.lines.lock().unwrap().last().cloned()
    }
}

impl CaptionSink for MockSink {
    fn set_line1(&self, text: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((text.to_string(), String::new()));
    }

    fn set_line2(&self, text: &str) {
        let mut lines = self.lines.lock().unwrap();
        if let Some(last) = lines.last_mut() {
            last.1 = text.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_renderer(config: RendererConfig) -> (OutputRenderer, MockSink) {
        let sink = MockSink::new();
        let renderer = OutputRenderer::with_config(config, Box::new(sink.clone()));
        (renderer, sink)
    }

    fn narrow(width: usize) -> RendererConfig {
        RendererConfig {
            chars_per_line: width,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_line_render() {
        let (mut renderer, sink) = make_renderer(RendererConfig::default());

        renderer.on_text("hello world", true);

        assert_eq!(renderer.history(), "hello world");
        assert_eq!(
            sink.last(),
            Some(("hello world".to_string(), " ".to_string()))
        );
    }

    #[test]
    fn test_partial_does_not_mutate_history() {
        let (mut renderer, sink) = make_renderer(RendererConfig::default());

        renderer.on_text("hello", false);

        assert_eq!(renderer.history(), "");
        assert_eq!(sink.last(), Some(("hello".to_string(), " ".to_string())));
    }

    #[test]
    fn test_commit_merges_overlap() {
        let (mut renderer, _sink) = make_renderer(RendererConfig::default());

        renderer.on_text("I went to the store", true);
        renderer.on_text("to the store yesterday", true);

        assert_eq!(renderer.history(), "I went to the store yesterday");
    }

    #[test]
    fn test_blank_and_hallucination_dropped() {
        let (mut renderer, sink) = make_renderer(RendererConfig::default());

        renderer.on_text("", true);
        renderer.on_text(" ", true);
        renderer.on_text("a", true);
        renderer.on_text("Thank you.", true);

        assert_eq!(renderer.history(), "");
        assert!(sink.renders().is_empty());
    }

    #[test]
    fn test_tags_stripped_when_hidden() {
        let config = RendererConfig {
            show_audio_tags: false,
            ..Default::default()
        };
        let (mut renderer, _sink) = make_renderer(config);

        renderer.on_text("hello [music] there", true);
        renderer.on_text("[applause]", true);

        assert_eq!(renderer.history(), "hello there");
    }

    #[test]
    fn test_tags_kept_when_shown() {
        let (mut renderer, _sink) = make_renderer(RendererConfig::default());

        renderer.on_text("[music]", true);

        assert_eq!(renderer.history(), "[music]");
    }

    #[test]
    fn test_profanity_masked() {
        let config = RendererConfig {
            filter_profanity: true,
            ..Default::default()
        };
        let (mut renderer, _sink) = make_renderer(config);

        renderer.on_text("what the hell was that", true);

        assert_eq!(renderer.history(), "what the *** was that");
    }

    #[test]
    fn test_profanity_is_whole_word() {
        let config = RendererConfig {
            filter_profanity: true,
            ..Default::default()
        };
        let (mut renderer, _sink) = make_renderer(config);

        // "hello" contains "hell" but must not be masked
        renderer.on_text("hello shellfish", true);

        assert_eq!(renderer.history(), "hello shellfish");
    }

    #[test]
    fn test_translator_hook_applies() {
        struct Upper;
        impl Translator for Upper {
            fn translate(&self, text: &str) -> String {
                text.to_uppercase()
            }
        }

        let sink = MockSink::new();
        let mut renderer = OutputRenderer::new(Box::new(sink.clone())).with_translator(Box::new(Upper));

        renderer.on_text("hello", true);

        assert_eq!(renderer.history(), "HELLO");
    }

    #[test]
    fn test_two_line_layout_shows_last_two_lines() {
        let (mut renderer, sink) = make_renderer(narrow(10));

        renderer.on_text("alpha beta gamma delta", true);

        // Wrapped: ["alpha beta", "gamma", "delta"] => last two lines shown
        let (line1, line2) = sink.last().unwrap();
        assert_eq!(line1, "gamma");
        assert_eq!(line2, "delta");
    }

    #[test]
    fn test_lines_never_exceed_width() {
        let (mut renderer, sink) = make_renderer(narrow(12));

        renderer.on_text("several words of varying length follow here", false);
        renderer.on_text("several words of varying length follow here and more", true);

        for (line1, line2) in sink.renders() {
            assert!(line1.chars().count() <= 12);
            assert!(line2.chars().count() <= 12);
        }
    }

    #[test]
    fn test_pinned_line1_survives_rewrap() {
        let (mut renderer, sink) = make_renderer(narrow(15));

        // Wraps to ["alpha beta", "gamma delta"]; line 1 pins "alpha beta"
        renderer.on_text("alpha beta gamma delta", false);
        assert_eq!(sink.last().unwrap().0, "alpha beta");

        // Revision re-wraps to ["alpha beta go", "gamma delta"]; the new
        // top line starts with the pinned text, so line 1 must not move
        renderer.on_text("alpha beta go gamma delta", false);
        assert_eq!(sink.last().unwrap().0, "alpha beta");
    }

    #[test]
    fn test_pinned_line1_updates_on_divergence() {
        let (mut renderer, sink) = make_renderer(narrow(12));

        renderer.on_text("hello there friend", false);
        renderer.on_text("zebra quick run", false);

        // ["zebra quick", "run"]: top line no longer starts with the pin
        assert_eq!(sink.last().unwrap().0, "zebra quick");
    }

    #[test]
    fn test_pinned_match_is_case_insensitive() {
        let (mut renderer, sink) = make_renderer(narrow(12));

        // Pins "hello there"
        renderer.on_text("hello there friend", false);

        // Re-wrapped top line "HELLO THERE" matches the pin ignoring case
        renderer.on_text("HELLO THERE MY FOLK", false);
        assert_eq!(sink.last().unwrap().0, "hello there");
    }

    #[test]
    fn test_history_trimmed_to_max_lines() {
        let config = RendererConfig {
            chars_per_line: 10,
            max_history_lines: 2,
            ..Default::default()
        };
        let (mut renderer, _sink) = make_renderer(config);

        renderer.on_text("first words", true);
        renderer.on_text("second words", true);
        renderer.on_text("third words", true);

        let lines = wrap(renderer.history(), 10);
        assert!(lines.len() <= 2, "history must be trimmed to 2 lines");
        assert!(renderer.history().contains("third"));
        assert!(!renderer.history().contains("first"));
    }

    #[test]
    fn test_empty_lines_normalized_to_space() {
        let (mut renderer, sink) = make_renderer(RendererConfig::default());

        renderer.on_text("hi there", true);

        let (_, line2) = sink.last().unwrap();
        assert_eq!(line2, " ");
    }

    #[test]
    fn test_set_chars_per_line() {
        let (mut renderer, _sink) = make_renderer(RendererConfig::default());

        renderer.set_chars_per_line(20);

        assert_eq!(renderer.chars_per_line(), 20);
    }

    #[test]
    fn test_mask_profanity_case_insensitive() {
        assert_eq!(mask_profanity("DAMN it"), "*** it");
        assert_eq!(mask_profanity("clean text"), "clean text");
    }
}
