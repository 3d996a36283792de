//! livecap - Live captions for system audio
//!
//! Streams raw PCM through a bounded rolling window, a VAD-driven segmenter
//! and a single-flight STT worker into a two-line rolling subtitle display.

pub mod audio;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod segment;
pub mod stt;

pub use config::Settings;
pub use error::{LivecapError, Result};
pub use pipeline::{CaptionPipeline, PipelineConfig};
pub use segment::SegmentEvent;
