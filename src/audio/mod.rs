// Audio playback module
// Uses Symphonia for decoding, rubato for resampling and cpal for output

pub mod decoder;
pub mod engine;
pub mod error;
pub mod level;
pub mod output;
pub mod resampler;

pub use engine::{EngineEvent, LocalEngine, PlaybackEngine, SessionId};
pub use error::PlaybackError;
