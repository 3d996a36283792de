//! Default configuration constants for livecap.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Bytes per sample for signed-16-bit little-endian PCM.
pub const BYTES_PER_SAMPLE: u32 = 2;

/// Size of one audio frame in bytes (0.25 s of S16LE PCM at 16kHz).
///
/// All frames carved by the audio buffer have exactly this length; partial
/// trailing bytes stay in the scratch accumulator until they complete a frame.
pub const FRAME_SIZE: usize = (SAMPLE_RATE * BYTES_PER_SAMPLE / 4) as usize;

/// Duration of one frame in milliseconds.
pub const FRAME_MS: u64 = 250;

/// Maximum number of frames retained in the rolling session window.
///
/// 120 frames at 0.25 s each bounds the window to 30 seconds of audio.
/// Appending beyond the bound evicts the oldest frame.
pub const MAX_FRAMES: usize = 120;

/// Audio level above which a frame counts as voice activity.
///
/// Levels are peak amplitudes normalized to [0, 1] as reported by the
/// capture backend.
pub const VOICE_THRESHOLD: f32 = 0.05;

/// Silence duration in milliseconds before the pending partial is committed.
pub const SILENCE_MS: u64 = 800;

/// Minimum gap between STT calls in milliseconds.
pub const INFERENCE_INTERVAL_MS: u64 = 300;

/// Minimum number of frames in the session window before the first inference.
pub const MIN_INFER_FRAMES: usize = 2;

/// Hard cap on session frames before a forced final commit (~10 s).
pub const MAX_SEGMENT_FRAMES: usize = 100;

/// Seconds of continuous silence after which the session window is cleared.
pub const STALE_SILENCE_SECS: f32 = 3.0;

/// Seconds a pure non-speech tag (e.g. "[music]") must persist before it is shown.
pub const TAG_HOLD_SECS: u64 = 4;

/// Maximum number of wrapped lines kept in the renderer history.
pub const MAX_HISTORY_LINES: usize = 4;

/// Default caption width in characters.
///
/// The embedding UI recomputes this whenever the window width or font size
/// changes; the renderer never derives it itself.
pub const CHARS_PER_LINE: usize = 48;

/// Default language code for transcription.
///
/// The pipeline enforces a single configured language; STT segments tagged
/// with a different language are dropped by the worker.
pub const DEFAULT_LANGUAGE: &str = "en";
