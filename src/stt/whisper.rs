//! Whisper-based STT engine.
//!
//! This module provides a Whisper implementation of the [`SttEngine`] trait
//! using whisper-rs.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be
//! installed:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::defaults;
use crate::error::{LivecapError, Result};
use crate::stt::engine::{EngineSegment, SttEngine};
use std::sync::{Mutex, Once};

use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper engine.
#[derive(Debug, Clone)]
pub struct WhisperEngineConfig {
    /// Language code (e.g., "en", "es", "fr")
    pub language: String,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
    /// Whether to use GPU acceleration (default: true)
    pub use_gpu: bool,
}

impl Default for WhisperEngineConfig {
    fn default() -> Self {
        Self {
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
            use_gpu: true,
        }
    }
}

/// Whisper-based engine implementation.
///
/// The context is loaded once by `initialize` and wrapped in a Mutex; the
/// worker above serializes calls, the lock here guards against misuse.
pub struct WhisperEngine {
    context: Mutex<Option<WhisperContext>>,
    config: WhisperEngineConfig,
}

impl WhisperEngine {
    /// Creates an uninitialized engine.
    pub fn new(config: WhisperEngineConfig) -> Self {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });
        Self {
            context: Mutex::new(None),
            config,
        }
    }

    /// Decode S16LE bytes and normalize to the f32 range Whisper expects.
    ///
    /// An odd trailing byte is ignored; complete frames from the audio
    /// buffer never produce one.
    fn convert_audio(pcm: &[u8]) -> Vec<f32> {
        pcm.chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect()
    }
}

impl SttEngine for WhisperEngine {
    fn initialize(&self, model_path: &std::path::Path) -> Result<()> {
        let mut slot = self
            .context
            .lock()
            .map_err(|e| LivecapError::ModelLoad {
                message: format!("Failed to acquire context lock: {}", e),
            })?;

        // Idempotent on success
        if slot.is_some() {
            return Ok(());
        }

        if !model_path.exists() {
            return Err(LivecapError::ModelNotFound {
                path: model_path.to_string_lossy().to_string(),
            });
        }

        let mut context_params = WhisperContextParameters::default();
        context_params.use_gpu(self.config.use_gpu);
        let context = WhisperContext::new_with_params(
            model_path.to_str().ok_or_else(|| LivecapError::ModelLoad {
                message: "Invalid UTF-8 in model path".to_string(),
            })?,
            context_params,
        )
        .map_err(|e| LivecapError::ModelLoad {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        *slot = Some(context);
        Ok(())
    }

    fn transcribe(&self, pcm: &[u8]) -> Result<Vec<EngineSegment>> {
        let audio = Self::convert_audio(pcm);

        let guard = self
            .context
            .lock()
            .map_err(|e| LivecapError::Transcribe {
                message: format!("Failed to acquire context lock: {}", e),
            })?;
        let context = guard.as_ref().ok_or_else(|| LivecapError::Transcribe {
            message: "Engine used before initialize".to_string(),
        })?;

        let mut state = context
            .create_state()
            .map_err(|e| LivecapError::Transcribe {
                message: format!("Failed to create Whisper state: {}", e),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.config.language));
        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        // Disable printing to stdout/stderr
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio)
            .map_err(|e| LivecapError::Transcribe {
                message: format!("Whisper inference failed: {}", e),
            })?;

        // Whisper reports one detected language per run; tag each segment
        // with it so the worker's language filter applies uniformly.
        let lang_id = state.full_lang_id_from_state();
        let language = whisper_rs::get_lang_str(lang_id).map(|s| s.to_string());

        let mut segments = Vec::new();
        for segment in state.as_iter() {
            if let Ok(text) = segment.to_str_lossy() {
                segments.push(EngineSegment {
                    text: text.into_owned(),
                    language: language.clone(),
                });
            }
        }

        Ok(segments)
    }
}
