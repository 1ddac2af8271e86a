//! Playback primitive
//!
//! The controller drives audio through two traits:
//! - [`PlaybackBackend`]: turns a fetched payload into PCM and opens output handles
//! - [`PlaybackHandle`]: one running output; dropping it detaches all listeners
//!
//! Handles report back through a [`HandleEventSink`] tagged with the session
//! that owns them, so events from a released handle are recognisable as stale.
//!
//! **Architecture:** symphonia (decode) + rubato (resample) + cpal (output)

pub mod decode;
pub mod output;
pub mod resampler;

pub use output::CpalBackend;

use crate::error::Result;
use crate::fetch::AudioPayload;
use crate::playback::SessionId;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Decoded call recording: interleaved stereo f32 at `sample_rate`
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sample_rate,
        }
    }

    /// Interleaved stereo samples [L, R, L, R, ...]
    pub fn samples(&self) -> &Arc<Vec<f32>> {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames() as u64 * 1000 / self.sample_rate as u64
    }
}

/// Notifications a running handle sends to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum HandleEvent {
    /// Playback reached the end of the recording
    Ended,
    /// Output failed after it started
    Error(String),
    /// Periodic position report
    Progress {
        position_ms: u64,
        duration_ms: Option<u64>,
    },
}

/// Channel back to the controller, bound to one session
///
/// Cheap to clone and safe to use from any thread, including audio callbacks.
#[derive(Debug, Clone)]
pub struct HandleEventSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<(SessionId, HandleEvent)>,
}

impl HandleEventSink {
    pub(crate) fn new(session: SessionId, tx: mpsc::UnboundedSender<(SessionId, HandleEvent)>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Deliver an event; silently dropped once the controller is gone
    pub fn send(&self, event: HandleEvent) {
        let _ = self.tx.send((self.session, event));
    }
}

/// Factory for playable handles
pub trait PlaybackBackend: Send + Sync {
    /// Decode a fetched payload into PCM ready for this backend's output
    ///
    /// May be slow; the controller runs it on the blocking pool.
    fn decode(&self, payload: AudioPayload) -> Result<DecodedAudio>;

    /// Create a paused output for `audio`, reporting through `events`
    ///
    /// May block while the device opens; the controller runs it on the
    /// blocking pool.
    fn open(&self, audio: DecodedAudio, events: HandleEventSink) -> Result<Box<dyn PlaybackHandle>>;
}

/// One audio output owned exclusively by the controller
///
/// Dropping the handle stops output and detaches its event sink.
pub trait PlaybackHandle: Send {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
}
