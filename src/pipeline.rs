//! Pipeline facade.
//!
//! Owns the audio buffer, STT worker, segmenter, silence timer and renderer,
//! and wires them together:
//! ```text
//! ┌─────────────┐   bytes    ┌─────────────┐  frames   ┌───────────┐
//! │ AudioSource │──────────▶│ AudioBuffer  │──────────▶│ Segmenter │
//! │  (capture)  │  levels    │ (window)    │ snapshot  │   loop    │
//! └─────────────┘──────┐     └─────────────┘           └─────┬─────┘
//!                      │            ▲                        │ events
//!                      ▼            │ clear on commit        ▼
//!                ┌──────────────┐   │                ┌──────────────┐
//!                │ SilenceTimer │───┘                │  dispatcher  │──▶ renderer
//!                └──────────────┘  final(partial)    │    task      │──▶ on_segment
//!                                                    └──────────────┘
//! ```
//! All renderer and callback invocations are serialized on the dispatcher
//! task; the capture thread never blocks on STT.

use crate::audio::buffer::{AudioBuffer, AudioBufferConfig};
use crate::audio::source::{AudioEvents, AudioSource};
use crate::config::Settings;
use crate::defaults;
use crate::error::Result;
use crate::render::renderer::{OutputRenderer, RendererConfig};
use crate::segment::segmenter::{Segmenter, SegmenterConfig};
use crate::segment::silence_timer::SilenceTimer;
use crate::stt::engine::SttEngine;
use crate::stt::worker::{SttWorker, SttWorkerConfig};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Callback invoked with each caption event, before rendering.
pub type SegmentCallback = Box<dyn Fn(&str, bool) + Send>;

/// Callback invoked with each published audio level.
pub type LevelCallback = Box<dyn Fn(f32) + Send>;

/// Configuration for the caption pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Audio buffer configuration.
    pub buffer: AudioBufferConfig,
    /// Segmenter configuration.
    pub segmenter: SegmenterConfig,
    /// Renderer configuration.
    pub renderer: RendererConfig,
    /// Transcription language enforced by the worker.
    pub language: String,
    /// Event channel capacity between segmenter and dispatcher.
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer: AudioBufferConfig::default(),
            segmenter: SegmenterConfig::default(),
            renderer: RendererConfig::default(),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            event_buffer: 64,
        }
    }
}

impl PipelineConfig {
    /// Creates configuration from persisted user settings.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut config = Self::default();
        config.segmenter.silence_ms = settings.silence_ms;
        config.segmenter.inference_interval_ms = settings.inference_interval_ms;
        config.renderer.chars_per_line = settings.chars_per_line;
        config.renderer.show_audio_tags = settings.show_audio_tags;
        config.renderer.filter_profanity = settings.filter_profanity;
        config.language = settings.language.clone();
        config
    }
}

/// Live-captioning pipeline facade.
pub struct CaptionPipeline {
    config: PipelineConfig,
    buffer: Arc<AudioBuffer>,
    worker: Arc<SttWorker>,
    source: Box<dyn AudioSource>,
    renderer: Option<OutputRenderer>,
    on_segment: Option<SegmentCallback>,
    on_level: Option<LevelCallback>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl CaptionPipeline {
    /// Creates a pipeline from its external collaborators.
    pub fn new(
        config: PipelineConfig,
        source: Box<dyn AudioSource>,
        engine: Arc<dyn SttEngine>,
        renderer: OutputRenderer,
    ) -> Self {
        let buffer = Arc::new(AudioBuffer::with_config(config.buffer.clone()));
        let worker = Arc::new(SttWorker::with_config(
            engine,
            SttWorkerConfig {
                language: config.language.clone(),
            },
        ));
        Self {
            config,
            buffer,
            worker,
            source,
            renderer: Some(renderer),
            on_segment: None,
            on_level: None,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    /// Installs the UI-facing caption event callback.
    pub fn with_on_segment(mut self, callback: SegmentCallback) -> Self {
        self.on_segment = Some(callback);
        self
    }

    /// Installs the UI-facing level callback.
    pub fn with_on_level(mut self, callback: LevelCallback) -> Self {
        self.on_level = Some(callback);
        self
    }

    /// Loads the STT model. Surfaces model errors synchronously.
    pub fn initialize(&self, model_path: &Path) -> Result<()> {
        self.worker.initialize(model_path)
    }

    /// Starts capture and the segmentation tasks.
    ///
    /// Surfaces audio-source errors synchronously; a failed start may be
    /// retried. Once running, further calls are no-ops.
    pub fn start(&mut self) -> Result<()> {
        if self.renderer.is_none() {
            return Ok(());
        }

        // Keep the renderer until capture is up so a failed start stays
        // retryable.
        self.source.start(AudioEvents::new(self.buffer.clone()))?;
        let Some(renderer) = self.renderer.take() else {
            return Ok(());
        };
        self.cancel = CancellationToken::new();

        let (events_tx, mut events_rx) = mpsc::channel(self.config.event_buffer);

        let segmenter = Segmenter::new(
            self.config.segmenter.clone(),
            self.buffer.clone(),
            self.worker.clone(),
            events_tx.clone(),
        );
        let state = segmenter.state();

        let timer = SilenceTimer::new(
            self.config.segmenter.silence_ms,
            self.config.buffer.voice_threshold,
            self.buffer.clone(),
            state,
            events_tx,
        );

        self.tasks.push(tokio::spawn(segmenter.run(self.cancel.clone())));
        self.tasks.push(tokio::spawn(
            timer.run(self.buffer.level_watch(), self.cancel.clone()),
        ));

        // Dispatcher: the single logical thread for renderer and callbacks.
        // Exits when the segmenter and timer drop their senders.
        let on_segment = self.on_segment.take();
        let mut renderer = renderer;
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                if let Some(callback) = &on_segment {
                    callback(&event.text, event.is_final);
                }
                renderer.on_text(&event.text, event.is_final);
            }
        }));

        if let Some(on_level) = self.on_level.take() {
            let mut levels = self.buffer.level_watch();
            let cancel = self.cancel.clone();
            self.tasks.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        changed = levels.changed() => {
                            if changed.is_err() {
                                break;
                            }
                            on_level(*levels.borrow_and_update());
                        }
                    }
                }
            }));
        }

        Ok(())
    }

    /// True while the pipeline tasks are running.
    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty() && !self.cancel.is_cancelled()
    }

    /// Stops the pipeline: cancels the loop and timer, awaits their exit,
    /// and stops the audio source.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        let _ = self.source.stop();
    }
}
