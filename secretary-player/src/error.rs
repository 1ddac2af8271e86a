//! Error types for secretary-player
//!
//! `Fetch` covers everything that stops the audio payload from arriving.
//! `Decode`, `AudioOutput` and `Playback` are the ways a received payload
//! can fail to play. Their `Display` text is what subscribers see in
//! `PlaybackStatus::error`.

use thiserror::Error;

/// Main error type for secretary-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio payload could not be retrieved (network, auth, 5xx)
    #[error("Could not load call audio: {0}")]
    Fetch(String),

    /// Payload could not be decoded (corrupt data, unsupported codec)
    #[error("Could not decode call audio: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Playback failed after it started
    #[error("Playback error: {0}")]
    Playback(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Errors from the shared library (config files)
    #[error(transparent)]
    Common(#[from] secretary_common::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Fetch("request timed out".to_string())
        } else if e.is_connect() {
            Error::Fetch("calls service is unreachable".to_string())
        } else {
            Error::Fetch(e.to_string())
        }
    }
}

/// Convenience Result type using secretary-player Error
pub type Result<T> = std::result::Result<T, Error>;
