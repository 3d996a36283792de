//! Segmentation state machine and inference loop.
//!
//! The segmenter is the single consumer of the audio buffer. Each tick it
//! moves one frame into the session window, runs throttled single-flight
//! STT over a window snapshot, filters the raw text, and revises the
//! current partial caption. Finals are produced three ways:
//! - the silence timer commits the pending partial (separate task)
//! - the length safety forces a commit when the window hits its cap
//! - hallucination-drop protection commits a long partial about to be
//!   replaced by short, disjoint text

use crate::audio::buffer::AudioBuffer;
use crate::clock::{Clock, SystemClock};
use crate::defaults;
use crate::segment::filters::TextFilter;
use crate::stt::worker::SttWorker;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A caption update produced by the segmenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentEvent {
    /// Caption text.
    pub text: String,
    /// True when the text is committed and no longer subject to revision.
    pub is_final: bool,
}

impl SegmentEvent {
    /// Creates a non-final (partial) event.
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    /// Creates a final (committed) event.
    pub fn committed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// Configuration for the segmenter.
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Silence duration before the pending partial is auto-committed (ms).
    pub silence_ms: u64,
    /// Minimum gap between STT calls (ms).
    pub inference_interval_ms: u64,
    /// Minimum session frames before the first inference.
    pub min_infer_frames: usize,
    /// Hard cap on session frames before a forced final commit.
    pub max_segment_frames: usize,
    /// Seconds of continuous silence after which the session is cleared.
    pub stale_silence_secs: f32,
    /// Seconds a pure non-speech tag must persist before it is shown.
    pub tag_hold_secs: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            silence_ms: defaults::SILENCE_MS,
            inference_interval_ms: defaults::INFERENCE_INTERVAL_MS,
            min_infer_frames: defaults::MIN_INFER_FRAMES,
            max_segment_frames: defaults::MAX_SEGMENT_FRAMES,
            stale_silence_secs: defaults::STALE_SILENCE_SECS,
            tag_hold_secs: defaults::TAG_HOLD_SECS,
        }
    }
}

/// Segmenter state shared between the inference loop and the silence timer.
#[derive(Debug)]
pub struct SegmentState {
    /// Most recent non-final STT output shown to the UI.
    pub last_partial: String,
    /// True iff no uncommitted partial is pending.
    pub committed: bool,
    /// When the last STT call returned, for throttling.
    pub last_inference_at: Option<Instant>,
}

impl Default for SegmentState {
    fn default() -> Self {
        Self {
            last_partial: String::new(),
            committed: true,
            last_inference_at: None,
        }
    }
}

/// Counts significant-word overlap to detect a hallucinated replacement.
///
/// A long prior partial about to be replaced by a much shorter text sharing
/// no significant words is being thrown away by the model, not revised.
fn is_hallucinated_replacement(last_partial: &str, text: &str) -> bool {
    let old: Vec<&str> = last_partial.split_whitespace().collect();
    let new: Vec<String> = text
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect();

    if old.len() < 3 || new.is_empty() || new.len() >= old.len() {
        return false;
    }

    let mut significant = 0;
    let mut matched = 0;
    for word in &old {
        if word.chars().count() > 2 {
            significant += 1;
            if new.contains(&word.to_lowercase()) {
                matched += 1;
            }
        }
    }

    significant >= 2 && matched == 0
}

/// The inference loop and its state machine.
pub struct Segmenter {
    config: SegmenterConfig,
    buffer: Arc<AudioBuffer>,
    worker: Arc<SttWorker>,
    state: Arc<Mutex<SegmentState>>,
    events: mpsc::Sender<SegmentEvent>,
    filter: TextFilter,
    clock: Arc<dyn Clock>,
}

impl Segmenter {
    /// Creates a segmenter with the system clock.
    pub fn new(
        config: SegmenterConfig,
        buffer: Arc<AudioBuffer>,
        worker: Arc<SttWorker>,
        events: mpsc::Sender<SegmentEvent>,
    ) -> Self {
        Self::with_clock(config, buffer, worker, events, Arc::new(SystemClock))
    }

    /// Creates a segmenter with a custom clock (for deterministic testing).
    pub fn with_clock(
        config: SegmenterConfig,
        buffer: Arc<AudioBuffer>,
        worker: Arc<SttWorker>,
        events: mpsc::Sender<SegmentEvent>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let filter = TextFilter::new(Duration::from_secs(config.tag_hold_secs));
        Self {
            config,
            buffer,
            worker,
            state: Arc::new(Mutex::new(SegmentState::default())),
            events,
            filter,
            clock,
        }
    }

    /// Shared state handle for the silence timer.
    pub fn state(&self) -> Arc<Mutex<SegmentState>> {
        self.state.clone()
    }

    /// Runs the inference loop until cancelled or the event channel closes.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.buffer.wait_for_frame() => {}
            }

            if self.worker.is_busy() {
                // Retain audio in the window rather than dropping it from
                // the queue while inference is in flight.
                self.buffer.drain_into_window();
                continue;
            }

            if !self.buffer.try_consume_frame() {
                continue;
            }

            let frame_size = self.buffer.frame_size();
            if self.buffer.byte_count() < self.config.min_infer_frames * frame_size {
                continue;
            }

            let interval = Duration::from_millis(self.config.inference_interval_ms);
            let throttled = {
                let state = self.state.lock().unwrap();
                state
                    .last_inference_at
                    .is_some_and(|at| self.clock.now().duration_since(at) < interval)
            };
            if throttled {
                continue;
            }

            let snapshot = self.buffer.snapshot();
            let worker = self.worker.clone();
            let raw = match tokio::task::spawn_blocking(move || worker.transcribe(&snapshot)).await
            {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!(error = %e, "transcription failed, continuing");
                    String::new()
                }
                Err(e) => {
                    warn!(error = %e, "transcription task panicked, continuing");
                    String::new()
                }
            };
            self.state.lock().unwrap().last_inference_at = Some(self.clock.now());

            let events = self.process_raw_text(&raw);
            for event in events {
                if self.events.send(event).await.is_err() {
                    return;
                }
            }

            if self.buffer.seconds_since_last_voice() > self.config.stale_silence_secs {
                self.buffer.clear_session();
            }
        }
    }

    /// Applies filters and updates partial state for one raw STT output.
    ///
    /// Returns the events to emit, in order. Session clearing happens here
    /// so that finals and their window resets stay atomic.
    fn process_raw_text(&mut self, raw: &str) -> Vec<SegmentEvent> {
        let now = self.clock.now();
        let Some(text) = self.filter.apply(raw, now) else {
            return Vec::new();
        };

        let mut state = self.state.lock().unwrap();
        let mut events = Vec::new();

        // Hallucination-drop protection: commit the long partial before the
        // short disjoint replacement overwrites it.
        if is_hallucinated_replacement(&state.last_partial, &text) {
            let old = std::mem::take(&mut state.last_partial);
            events.push(SegmentEvent::committed(old));
            self.buffer.clear_session();

            state.last_partial = text.clone();
            state.committed = false;
            events.push(SegmentEvent::partial(text));
            return events;
        }

        state.last_partial = text.clone();

        let max_bytes = self.config.max_segment_frames * self.buffer.frame_size();
        if self.buffer.byte_count() >= max_bytes {
            // Length safety: force a commit before the window wraps.
            state.last_partial.clear();
            state.committed = true;
            self.buffer.clear_session();
            events.push(SegmentEvent::committed(text));
        } else {
            state.committed = false;
            events.push(SegmentEvent::partial(text));
        }
        events
    }
}
