//! Speech-to-text seam: engine capability and single-flight worker.

pub mod engine;
pub mod worker;

#[cfg(feature = "whisper")]
pub mod whisper;

pub use engine::{EngineSegment, MockEngine, SttEngine};
pub use worker::{SttWorker, SttWorkerConfig};

#[cfg(feature = "whisper")]
pub use whisper::{WhisperEngine, WhisperEngineConfig};
