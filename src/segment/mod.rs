//! Voice-activity-driven segmentation.
//!
//! Turns the rolling audio window into an ordered stream of caption events:
//! ```text
//! ┌────────────┐    ┌───────────┐    ┌───────────┐    ┌──────────────┐
//! │ AudioBuffer│───▶│ Inference │───▶│  Filters  │───▶│ SegmentEvent │
//! │  (frames)  │    │   loop    │    │ + drops   │    │ (text,final) │
//! └────────────┘    └───────────┘    └───────────┘    └──────────────┘
//!        │                                  ▲
//!        └── levels ──▶ SilenceTimer ───────┘
//!                       (commit on silence)
//! ```

pub mod filters;
pub mod segmenter;
pub mod silence_timer;

pub use filters::{TextFilter, is_silence_hallucination, strip_audio_tags};
pub use segmenter::{SegmentEvent, SegmentState, Segmenter, SegmenterConfig};
pub use silence_timer::SilenceTimer;
