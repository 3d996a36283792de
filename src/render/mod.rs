//! Caption rendering: history merge, wrapping and the two-line display.

pub mod layout;
pub mod merge;
pub mod renderer;

pub use layout::wrap;
pub use merge::merge;
pub use renderer::{CaptionSink, MockSink, OutputRenderer, RendererConfig, Translator};
