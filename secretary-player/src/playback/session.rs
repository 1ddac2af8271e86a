//! The playback session and its resources

use crate::audio::PlaybackHandle;
use secretary_common::{PlaybackPhase, PlaybackStatus, TrackId};
use tokio::task::AbortHandle;

/// Identity of one load-and-play attempt
///
/// Allocated on every transition into Loading and never reused, so results
/// and handle events from an earlier attempt on the same track are told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The single playback session
///
/// Resources live inside the variant that owns them: the fetch task only
/// while Loading, the output handle only while Playing.
pub(crate) enum Session {
    Idle,
    Loading {
        id: SessionId,
        track_id: TrackId,
        fetch: AbortHandle,
    },
    Playing {
        id: SessionId,
        track_id: TrackId,
        handle: Box<dyn PlaybackHandle>,
    },
    Error {
        message: String,
    },
}

impl Session {
    pub(crate) fn status(&self) -> PlaybackStatus {
        match self {
            Session::Idle => PlaybackStatus::idle(),
            Session::Loading { track_id, .. } => PlaybackStatus::loading(track_id.clone()),
            Session::Playing { track_id, .. } => PlaybackStatus::playing(track_id.clone()),
            Session::Error { message } => PlaybackStatus::failed(message.clone()),
        }
    }

    pub(crate) fn phase(&self) -> PlaybackPhase {
        match self {
            Session::Idle => PlaybackPhase::Idle,
            Session::Loading { .. } => PlaybackPhase::Loading,
            Session::Playing { .. } => PlaybackPhase::Playing,
            Session::Error { .. } => PlaybackPhase::Error,
        }
    }

    /// Loading or Playing `track_id`
    pub(crate) fn is_active_for(&self, track_id: &TrackId) -> bool {
        match self {
            Session::Loading { track_id: active, .. } | Session::Playing { track_id: active, .. } => {
                active == track_id
            }
            Session::Idle | Session::Error { .. } => false,
        }
    }

    /// Id of the Loading session, if any
    pub(crate) fn loading_id(&self) -> Option<SessionId> {
        match self {
            Session::Loading { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Id and track of the Playing session, if any
    pub(crate) fn playing(&self) -> Option<(SessionId, &TrackId)> {
        match self {
            Session::Playing { id, track_id, .. } => Some((*id, track_id)),
            _ => None,
        }
    }

    /// Free whatever the session holds and return to Idle
    ///
    /// An in-flight fetch is aborted. A running handle is paused and handed
    /// back; the caller drops it once the controller lock is released, which
    /// stops the output and detaches its event sink.
    #[must_use = "the paused handle is only released when dropped"]
    pub(crate) fn release(&mut self) -> Option<Box<dyn PlaybackHandle>> {
        match std::mem::replace(self, Session::Idle) {
            Session::Loading { fetch, .. } => {
                fetch.abort();
                None
            }
            Session::Playing { mut handle, .. } => {
                handle.pause();
                Some(handle)
            }
            Session::Idle | Session::Error { .. } => None,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Session::Idle => write!(f, "Idle"),
            Session::Loading { id, track_id, .. } => write!(f, "Loading({} {})", id, track_id),
            Session::Playing { id, track_id, .. } => write!(f, "Playing({} {})", id, track_id),
            Session::Error { message } => write!(f, "Error({})", message),
        }
    }
}
