//! Playback-related type definitions
//!
//! Supporting types for the call-recording playback session as seen by
//! subscribers.

use serde::{Deserialize, Serialize};

/// Opaque identifier of a call recording (the call/session id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Phase of the single playback session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    /// Nothing loaded or playing
    #[default]
    Idle,
    /// Audio payload is being fetched and decoded
    Loading,
    /// Audio output is running
    Playing,
    /// Last attempt failed; holds no resources
    Error,
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Idle => write!(f, "idle"),
            PlaybackPhase::Loading => write!(f, "loading"),
            PlaybackPhase::Playing => write!(f, "playing"),
            PlaybackPhase::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of the playback session delivered to every subscriber
///
/// `playing_id` is set while the session is Loading or Playing, `error`
/// only in the Error phase.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub phase: PlaybackPhase,
    pub playing_id: Option<TrackId>,
    pub error: Option<String>,
}

impl PlaybackStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading(track_id: TrackId) -> Self {
        Self {
            phase: PlaybackPhase::Loading,
            playing_id: Some(track_id),
            error: None,
        }
    }

    pub fn playing(track_id: TrackId) -> Self {
        Self {
            phase: PlaybackPhase::Playing,
            playing_id: Some(track_id),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            phase: PlaybackPhase::Error,
            playing_id: None,
            error: Some(message.into()),
        }
    }

    /// Whether a row showing `track_id` should render its "playing" indicator
    pub fn is_active_for(&self, track_id: &TrackId) -> bool {
        self.playing_id.as_ref() == Some(track_id)
    }
}
