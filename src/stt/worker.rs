//! Single-flight adapter over an STT engine.
//!
//! At most one inference is in flight at any time. Overlapping callers get
//! an empty string back immediately instead of queueing; the segmenter loop
//! retains the audio in its session window and retries on a later tick.

use crate::defaults;
use crate::error::Result;
use crate::stt::engine::SttEngine;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Configuration for the STT worker.
#[derive(Debug, Clone)]
pub struct SttWorkerConfig {
    /// Configured output language; differently-tagged segments are dropped.
    pub language: String,
}

impl Default for SttWorkerConfig {
    fn default() -> Self {
        Self {
            language: defaults::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Single-flight worker wrapping an [`SttEngine`].
pub struct SttWorker {
    engine: Arc<dyn SttEngine>,
    config: SttWorkerConfig,
    /// Held for the duration of an engine call; try_lock skips overlaps.
    flight: Mutex<()>,
    busy: AtomicBool,
}

impl SttWorker {
    /// Creates a worker with the default configuration.
    pub fn new(engine: Arc<dyn SttEngine>) -> Self {
        Self::with_config(engine, SttWorkerConfig::default())
    }

    /// Creates a worker with a custom configuration.
    pub fn with_config(engine: Arc<dyn SttEngine>, config: SttWorkerConfig) -> Self {
        Self {
            engine,
            config,
            flight: Mutex::new(()),
            busy: AtomicBool::new(false),
        }
    }

    /// Loads the model. Idempotent on success.
    pub fn initialize(&self, model_path: &Path) -> Result<()> {
        self.engine.initialize(model_path)
    }

    /// True while an engine call is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Transcribes PCM bytes, or returns an empty string if busy.
    ///
    /// Segments whose language tag differs from the configured language are
    /// dropped; the remaining texts are concatenated and trimmed. Engine
    /// faults propagate; the caller treats them as empty output.
    pub fn transcribe(&self, pcm: &[u8]) -> Result<String> {
        let Ok(_guard) = self.flight.try_lock() else {
            return Ok(String::new());
        };

        self.busy.store(true, Ordering::SeqCst);
        let result = self.engine.transcribe(pcm);
        self.busy.store(false, Ordering::SeqCst);

        let segments = result?;
        let mut text = String::new();
        for segment in segments {
            if let Some(language) = &segment.language
                && language != &self.config.language
            {
                continue;
            }
            text.push_str(&segment.text);
        }
        Ok(text.trim().to_string())
    }
}
