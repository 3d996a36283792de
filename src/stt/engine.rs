//! STT engine capability.
//!
//! The engine is a black box to the core: it loads a model once, turns a
//! byte sequence of S16LE PCM into recognized text segments, and may take
//! seconds to do so. The single-flight discipline lives in the worker, not
//! here.

use crate::error::{LivecapError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recognized segment of engine output.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSegment {
    /// Recognized text.
    pub text: String,
    /// Language tag reported by the engine, if any.
    pub language: Option<String>,
}

impl EngineSegment {
    /// Creates an untagged segment.
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            language: None,
        }
    }

    /// Creates a segment with a language tag.
    pub fn tagged(text: &str, language: &str) -> Self {
        Self {
            text: text.to_string(),
            language: Some(language.to_string()),
        }
    }
}

/// Trait for speech-to-text engines.
///
/// This trait allows swapping implementations (real Whisper vs mock).
pub trait SttEngine: Send + Sync {
    /// Load the model. Idempotent on success.
    ///
    /// # Errors
    /// Returns `LivecapError::ModelNotFound` or `LivecapError::ModelLoad` on
    /// a missing or corrupt model.
    fn initialize(&self, model_path: &Path) -> Result<()>;

    /// Transcribe S16LE PCM bytes at 16kHz mono. Blocking, possibly for
    /// seconds.
    fn transcribe(&self, pcm: &[u8]) -> Result<Vec<EngineSegment>>;
}

/// Mock STT engine for testing
pub struct MockEngine {
    responses: Mutex<Vec<Vec<EngineSegment>>>,
    delay: Option<Duration>,
    should_fail: bool,
    should_fail_init: bool,
    initialized: AtomicBool,
    calls: Arc<AtomicUsize>,
}

impl MockEngine {
    /// Create a new mock engine that recognizes nothing.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            delay: None,
            should_fail: false,
            should_fail_init: false,
            initialized: AtomicBool::new(false),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Configure the mock to return a fixed text on every call.
    pub fn with_response(self, text: &str) -> Self {
        self.with_segments(vec![EngineSegment::new(text)])
    }

    /// Configure the mock to return fixed segments on every call.
    pub fn with_segments(mut self, segments: Vec<EngineSegment>) -> Self {
        self.responses.get_mut().unwrap().push(segments);
        self
    }

    /// Configure a sequence of texts returned on successive calls.
    ///
    /// The last entry repeats once the sequence is exhausted.
    pub fn with_response_sequence(mut self, texts: &[&str]) -> Self {
        let mut responses = Vec::with_capacity(texts.len());
        for text in texts {
            responses.push(vec![EngineSegment::new(text)]);
        }
        *self.responses.get_mut().unwrap() = responses;
        self
    }

    /// Configure the mock to sleep before answering, simulating slow inference.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Configure the mock to fail on transcribe.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the mock to fail on initialize.
    pub fn with_init_failure(mut self) -> Self {
        self.should_fail_init = true;
        self
    }

    /// Number of transcribe calls observed.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared call counter, usable after the engine is moved into the worker.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    /// Whether initialize succeeded at least once.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SttEngine for MockEngine {
    fn initialize(&self, model_path: &Path) -> Result<()> {
        if self.should_fail_init {
            return Err(LivecapError::ModelNotFound {
                path: model_path.to_string_lossy().to_string(),
            });
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn transcribe(&self, _pcm: &[u8]) -> Result<Vec<EngineSegment>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if self.should_fail {
            return Err(LivecapError::Transcribe {
                message: "mock transcription failure".to_string(),
            });
        }

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(Vec::new());
        }
        // Successive calls walk the sequence; the last entry repeats.
        Ok(responses[call.min(responses.len() - 1)].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mock_engine_returns_response() {
        let engine = MockEngine::new().with_response("hello world");

        let segments = engine.transcribe(&[0u8; 100]).unwrap();

        assert_eq!(segments, vec![EngineSegment::new("hello world")]);
    }

    #[test]
    fn test_mock_engine_empty_by_default() {
        let engine = MockEngine::new();
        assert!(engine.transcribe(&[0u8; 100]).unwrap().is_empty());
    }

    #[test]
    fn test_mock_engine_sequence_repeats_last() {
        let engine = MockEngine::new().with_response_sequence(&["one", "two"]);

        assert_eq!(engine.transcribe(&[]).unwrap()[0].text, "one");
        assert_eq!(engine.transcribe(&[]).unwrap()[0].text, "two");
        assert_eq!(engine.transcribe(&[]).unwrap()[0].text, "two");
    }

    #[test]
    fn test_mock_engine_counts_calls() {
        let engine = MockEngine::new().with_response("x");

        assert_eq!(engine.call_count(), 0);
        engine.transcribe(&[]).unwrap();
        engine.transcribe(&[]).unwrap();
        assert_eq!(engine.call_count(), 2);
    }

    #[test]
    fn test_mock_engine_failure() {
        let engine = MockEngine::new().with_failure();

        let result = engine.transcribe(&[]);

        match result {
            Err(LivecapError::Transcribe { message }) => {
                assert_eq!(message, "mock transcription failure");
            }
            _ => panic!("Expected Transcribe error"),
        }
    }

    #[test]
    fn test_mock_engine_init_failure() {
        let engine = MockEngine::new().with_init_failure();

        let result = engine.initialize(&PathBuf::from("/missing/model.bin"));

        match result {
            Err(LivecapError::ModelNotFound { path }) => {
                assert_eq!(path, "/missing/model.bin");
            }
            _ => panic!("Expected ModelNotFound error"),
        }
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_mock_engine_initialize_is_idempotent() {
        let engine = MockEngine::new();
        let path = PathBuf::from("model.bin");

        engine.initialize(&path).unwrap();
        engine.initialize(&path).unwrap();

        assert!(engine.is_initialized());
    }

    #[test]
    fn test_tagged_segments() {
        let engine = MockEngine::new().with_segments(vec![
            EngineSegment::tagged("hola", "es"),
            EngineSegment::tagged("hello", "en"),
        ]);

        let segments = engine.transcribe(&[]).unwrap();

        assert_eq!(segments[0].language.as_deref(), Some("es"));
        assert_eq!(segments[1].language.as_deref(), Some("en"));
    }

    #[test]
    fn test_engine_trait_is_object_safe() {
        let engine: Box<dyn SttEngine> = Box::new(MockEngine::new().with_response("boxed"));

        let segments = engine.transcribe(&[]).unwrap();
        assert_eq!(segments[0].text, "boxed");
    }
}
