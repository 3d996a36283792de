//! Bounded rolling audio buffer.
//!
//! Converts a variable-rate PCM byte stream into fixed-size frames and keeps
//! a bounded rolling session window of the most recent frames:
//! - `push` carves frames into a ready-queue and signals availability
//! - the segmenter moves ready frames into the session window
//! - `snapshot` hands the window to STT as one contiguous byte sequence
//!
//! A single mutex protects the scratch accumulator, the ready-queue and the
//! session window. The frame-available signal is a counting semaphore:
//! one permit added per carved frame, one acquired per consumption.

use crate::clock::{Clock, SystemClock};
use crate::defaults;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{Semaphore, watch};

/// Configuration for the audio buffer.
#[derive(Debug, Clone)]
pub struct AudioBufferConfig {
    /// Size of one carved frame in bytes.
    pub frame_size: usize,
    /// Maximum number of frames retained in the session window.
    pub max_frames: usize,
    /// Level above which audio counts as voice activity.
    pub voice_threshold: f32,
}

impl Default for AudioBufferConfig {
    fn default() -> Self {
        Self {
            frame_size: defaults::FRAME_SIZE,
            max_frames: defaults::MAX_FRAMES,
            voice_threshold: defaults::VOICE_THRESHOLD,
        }
    }
}

struct BufferInner {
    /// Raw bytes not yet forming a complete frame.
    scratch: Vec<u8>,
    /// Carved frames awaiting consumption by the segmenter loop.
    ready: VecDeque<Vec<u8>>,
    /// Bounded rolling window of frames submitted together to STT.
    window: VecDeque<Vec<u8>>,
    /// When a reported level last exceeded the voice threshold.
    last_voice_at: Instant,
}

/// Bounded rolling buffer between the capture thread and the segmenter loop.
pub struct AudioBuffer {
    config: AudioBufferConfig,
    inner: Mutex<BufferInner>,
    frame_ready: Semaphore,
    level_tx: watch::Sender<f32>,
    clock: Arc<dyn Clock>,
}

impl AudioBuffer {
    /// Creates a new audio buffer with default configuration.
    pub fn new() -> Self {
        Self::with_config(AudioBufferConfig::default())
    }

    /// Creates a new audio buffer with custom configuration.
    pub fn with_config(config: AudioBufferConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a new audio buffer with a custom clock (for deterministic testing).
    pub fn with_clock(config: AudioBufferConfig, clock: Arc<dyn Clock>) -> Self {
        let (level_tx, _) = watch::channel(0.0);
        Self {
            inner: Mutex::new(BufferInner {
                scratch: Vec::new(),
                ready: VecDeque::new(),
                window: VecDeque::with_capacity(config.max_frames),
                last_voice_at: clock.now(),
            }),
            config,
            frame_ready: Semaphore::new(0),
            level_tx,
            clock,
        }
    }

    /// Appends raw PCM bytes, carving complete frames into the ready-queue.
    ///
    /// Odd or partial trailing bytes stay in the scratch accumulator until a
    /// later push completes the frame. Called from the capture thread; never
    /// blocks on transcription.
    pub fn push(&self, bytes: &[u8]) {
        let mut carved = 0;
        {
            let mut inner = self.inner.lock().unwrap();
            inner.scratch.extend_from_slice(bytes);
            while inner.scratch.len() >= self.config.frame_size {
                let rest = inner.scratch.split_off(self.config.frame_size);
                let frame = std::mem::replace(&mut inner.scratch, rest);
                inner.ready.push_back(frame);
                carved += 1;
            }
        }
        if carved > 0 {
            self.frame_ready.add_permits(carved);
        }
    }

    /// Records voice activity and publishes the level to subscribers.
    pub fn report_level(&self, level: f32) {
        if level > self.config.voice_threshold {
            self.inner.lock().unwrap().last_voice_at = self.clock.now();
        }
        self.level_tx.send_replace(level);
    }

    /// Subscribes to published audio levels.
    pub fn level_watch(&self) -> watch::Receiver<f32> {
        self.level_tx.subscribe()
    }

    /// Waits until at least one carved frame is available.
    pub async fn wait_for_frame(&self) {
        // The semaphore is never closed, so acquire cannot fail.
        if let Ok(permit) = self.frame_ready.acquire().await {
            permit.forget();
        }
    }

    /// Moves one frame from the ready-queue into the session window.
    ///
    /// Evicts the oldest window frame when the bound is reached. Returns
    /// false if the queue was empty.
    pub fn try_consume_frame(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.ready.pop_front() {
            Some(frame) => {
                Self::push_window(&mut inner, frame, self.config.max_frames);
                true
            }
            None => false,
        }
    }

    /// Moves all queued frames into the session window.
    ///
    /// Used while STT is busy so that audio is retained in the window rather
    /// than dropped from the queue.
    pub fn drain_into_window(&self) {
        let mut inner = self.inner.lock().unwrap();
        while let Some(frame) = inner.ready.pop_front() {
            Self::push_window(&mut inner, frame, self.config.max_frames);
        }
    }

    fn push_window(inner: &mut BufferInner, frame: Vec<u8>, max_frames: usize) {
        if inner.window.len() >= max_frames {
            inner.window.pop_front();
        }
        inner.window.push_back(frame);
    }

    /// Returns a contiguous copy of the session window, in frame order.
    pub fn snapshot(&self) -> Vec<u8> {
        let inner = self.inner.lock().unwrap();
        let mut out = Vec::with_capacity(inner.window.len() * self.config.frame_size);
        for frame in &inner.window {
            out.extend_from_slice(frame);
        }
        out
    }

    /// Size of one carved frame in bytes.
    pub fn frame_size(&self) -> usize {
        self.config.frame_size
    }

    /// Returns the session window size in bytes.
    pub fn byte_count(&self) -> usize {
        self.inner.lock().unwrap().window.len() * self.config.frame_size
    }

    /// Empties the session window.
    pub fn clear_session(&self) {
        self.inner.lock().unwrap().window.clear();
    }

    /// Seconds elapsed since the last voice-activity report.
    pub fn seconds_since_last_voice(&self) -> f32 {
        let last = self.inner.lock().unwrap().last_voice_at;
        self.clock.now().duration_since(last).as_secs_f32()
    }
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self::new()
    }
}
