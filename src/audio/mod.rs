//! Audio capture seam and rolling buffer.

pub mod buffer;
pub mod source;

pub use buffer::{AudioBuffer, AudioBufferConfig};
pub use source::{AudioEvents, AudioSource, MockAudioSource, MockSourceHandle};
