//! Audio source capability.
//!
//! The capture backend (OS loopback, microphone mix, file playback) lives
//! outside the core. It is handed an [`AudioEvents`] adapter on start and
//! feeds raw PCM bytes and level updates through it from its own thread.

use crate::audio::buffer::AudioBuffer;
use crate::error::{LivecapError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Event adapter handed to an audio source on start.
///
/// Cloneable so a backend may drive data and level callbacks from different
/// threads. Neither call can fail and neither blocks on transcription.
#[derive(Clone)]
pub struct AudioEvents {
    buffer: Arc<AudioBuffer>,
}

impl AudioEvents {
    pub(crate) fn new(buffer: Arc<AudioBuffer>) -> Self {
        Self { buffer }
    }

    /// Delivers raw S16LE PCM bytes at 16kHz mono.
    pub fn data(&self, bytes: &[u8]) {
        self.buffer.push(bytes);
    }

    /// Reports an instantaneous peak level in [0, 1].
    pub fn level(&self, level: f32) {
        self.buffer.report_level(level);
    }
}

/// Trait for audio capture sources.
///
/// This trait allows swapping implementations (real capture device vs mock).
pub trait AudioSource: Send {
    /// Start capturing audio, delivering data and levels through `events`.
    ///
    /// # Returns
    /// Ok(()) if the source started successfully, or an error
    fn start(&mut self, events: AudioEvents) -> Result<()>;

    /// Stop capturing audio from the source.
    ///
    /// # Returns
    /// Ok(()) if the source stopped successfully, or an error
    fn stop(&mut self) -> Result<()>;
}

/// Handle to observe and drive a [`MockAudioSource`] from tests.
#[derive(Clone)]
pub struct MockSourceHandle {
    events: Arc<Mutex<Option<AudioEvents>>>,
    started: Arc<AtomicBool>,
}

impl MockSourceHandle {
    /// Returns the event adapter the source was started with, if any.
    pub fn events(&self) -> Option<AudioEvents> {
        self.events.lock().unwrap().clone()
    }

    /// Check if the audio source is started
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// Mock audio source for testing
#[derive(Clone)]
pub struct MockAudioSource {
    events: Arc<Mutex<Option<AudioEvents>>>,
    started: Arc<AtomicBool>,
    should_fail_start: bool,
    fail_start_once: Arc<AtomicBool>,
    should_fail_stop: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a new mock audio source with default settings
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(None)),
            started: Arc::new(AtomicBool::new(false)),
            should_fail_start: false,
            fail_start_once: Arc::new(AtomicBool::new(false)),
            should_fail_stop: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail only on the first start
    pub fn with_start_failure_once(self) -> Self {
        self.fail_start_once.store(true, Ordering::SeqCst);
        self
    }

    /// Configure the mock to fail on stop
    pub fn with_stop_failure(mut self) -> Self {
        self.should_fail_stop = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Returns a handle for driving this source from a test.
    pub fn handle(&self) -> MockSourceHandle {
        MockSourceHandle {
            events: self.events.clone(),
            started: self.started.clone(),
        }
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self, events: AudioEvents) -> Result<()> {
        if self.should_fail_start || self.fail_start_once.swap(false, Ordering::SeqCst) {
            Err(LivecapError::AudioSource {
                message: self.error_message.clone(),
            })
        } else {
            *self.events.lock().unwrap() = Some(events);
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn stop(&mut self) -> Result<()> {
        if self.should_fail_stop {
            Err(LivecapError::AudioSource {
                message: self.error_message.clone(),
            })
        } else {
            self.started.store(false, Ordering::SeqCst);
            *self.events.lock().unwrap() = None;
            Ok(())
        }
    }
}
