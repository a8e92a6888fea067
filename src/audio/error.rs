//! Error types for the playback engine.

use thiserror::Error;

/// Playback engine error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The file behind a locator could not be opened.
    #[error("Failed to open file: {0}")]
    Open(String),

    /// The container or codec is not supported or the data is corrupt.
    #[error("Unsupported or corrupt audio: {0}")]
    Format(String),

    /// A packet could not be decoded.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// No output device is available.
    #[error("No output device available")]
    NoOutputDevice,

    /// The output stream could not be created or started.
    #[error("Audio output error: {0}")]
    Output(String),

    /// Sample rate conversion failed.
    #[error("Resampling failed: {0}")]
    Resample(String),

    /// The session id does not refer to a live session.
    #[error("Unknown playback session {0}")]
    UnknownSession(u64),

    /// The session thread went away before reporting back.
    #[error("Playback session thread exited unexpectedly")]
    SessionLost,
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
