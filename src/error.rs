//! Error types for livecap.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LivecapError {
    // Audio capture errors
    #[error("Audio source failed to start: {message}")]
    AudioSource { message: String },

    // STT model errors
    #[error("STT model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Failed to load STT model: {message}")]
    ModelLoad { message: String },

    // Transcription errors (transient; the pipeline continues)
    #[error("Transcription failed: {message}")]
    Transcribe { message: String },

    // Settings errors
    #[error("Failed to parse settings: {0}")]
    ConfigParse(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, LivecapError>;
