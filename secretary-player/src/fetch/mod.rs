//! Audio payload retrieval
//!
//! The controller depends only on [`AudioFetcher`]; the production
//! implementation talks to the calls service over HTTP.

mod http;

pub use http::HttpAudioFetcher;

use crate::error::Result;
use async_trait::async_trait;
use secretary_common::TrackId;

/// Raw audio of one call recording, still in its container format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    /// MIME type reported by the service (used as a probe hint)
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioPayload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Source of call-recording payloads
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Retrieve the audio for `track_id`
    ///
    /// Any failure is reported as an error; the controller never retries.
    async fn fetch(&self, track_id: &TrackId) -> Result<AudioPayload>;
}
