//! Silence-driven commit timer.
//!
//! A cancellable one-shot deadline re-armed by every voice-activity report.
//! On expiry it commits the pending partial and clears the session window.
//! The timer runs in its own task, independent of the inference loop, so
//! commits still fire while STT is busy.

use crate::audio::buffer::AudioBuffer;
use crate::segment::segmenter::{SegmentEvent, SegmentState};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Commits the pending partial after a run of silence.
pub struct SilenceTimer {
    silence: Duration,
    voice_threshold: f32,
    buffer: Arc<AudioBuffer>,
    state: Arc<Mutex<SegmentState>>,
    events: mpsc::Sender<SegmentEvent>,
}

impl SilenceTimer {
    /// Creates a silence timer.
    pub fn new(
        silence_ms: u64,
        voice_threshold: f32,
        buffer: Arc<AudioBuffer>,
        state: Arc<Mutex<SegmentState>>,
        events: mpsc::Sender<SegmentEvent>,
    ) -> Self {
        Self {
            silence: Duration::from_millis(silence_ms),
            voice_threshold,
            buffer,
            state,
            events,
        }
    }

    /// Runs the timer until cancelled or the level feed closes.
    ///
    /// `levels` is the audio buffer's level watch channel; any level above
    /// the voice threshold re-arms the deadline.
    pub async fn run(self, mut levels: watch::Receiver<f32>, cancel: CancellationToken) {
        let mut deadline: Option<tokio::time::Instant> = None;

        loop {
            let expiry = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = levels.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let level = *levels.borrow_and_update();
                    if level > self.voice_threshold {
                        deadline = Some(tokio::time::Instant::now() + self.silence);
                    }
                }
                _ = expiry => {
                    deadline = None;
                    if !self.fire().await {
                        break;
                    }
                }
            }
        }
    }

    /// Commits the pending partial, if any. Safe to call during teardown.
    ///
    /// Returns false when the event channel is closed.
    async fn fire(&self) -> bool {
        let pending = {
            let mut state = self.state.lock().unwrap();
            if state.committed || state.last_partial.is_empty() {
                None
            } else {
                state.committed = true;
                Some(std::mem::take(&mut state.last_partial))
            }
        };

        match pending {
            Some(text) => {
                self.buffer.clear_session();
                self.events.send(SegmentEvent::committed(text)).await.is_ok()
            }
            None => true,
        }
    }
}
