//! Playback controller
//!
//! Serializes toggle requests from any number of views into one session.
//!
//! All transitions happen under one mutex and publish their status while the
//! lock is held, so subscribers observe transitions in the order they were
//! applied. Nothing that can block runs under the lock: fetch, decode and the
//! device open happen in the load task, whose result is applied only if its
//! session is still the active one, and released handles are dropped after
//! the lock is gone.

use super::session::{Session, SessionId};
use super::subscription::PlaybackSubscription;
use super::SwitchPolicy;
use crate::audio::{DecodedAudio, HandleEvent, HandleEventSink, PlaybackBackend, PlaybackHandle};
use crate::error::{Error, Result};
use crate::fetch::AudioFetcher;
use secretary_common::{EventBus, PlaybackStatus, SecretaryEvent, TrackId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Session plus the id allocator, guarded together
struct SessionState {
    next_id: u64,
    session: Session,
}

pub(super) struct Shared {
    state: Mutex<SessionState>,
    fetcher: Arc<dyn AudioFetcher>,
    backend: Arc<dyn PlaybackBackend>,
    events: EventBus,
    policy: SwitchPolicy,
    handle_tx: mpsc::UnboundedSender<(SessionId, HandleEvent)>,
    runtime: Handle,
}

/// Owner of the single playback session
///
/// Cheap to clone; all clones drive the same session.
#[derive(Clone)]
pub struct PlaybackController {
    shared: Arc<Shared>,
}

impl PlaybackController {
    /// Create a controller in the Idle phase
    ///
    /// Must be called from within a tokio runtime: the handle-event listener
    /// and every fetch task are spawned onto it.
    pub fn new(
        fetcher: Arc<dyn AudioFetcher>,
        backend: Arc<dyn PlaybackBackend>,
        events: EventBus,
        policy: SwitchPolicy,
    ) -> Self {
        let (handle_tx, handle_rx) = mpsc::unbounded_channel();
        let runtime = Handle::current();

        let shared = Arc::new(Shared {
            state: Mutex::new(SessionState {
                next_id: 0,
                session: Session::Idle,
            }),
            fetcher,
            backend,
            events,
            policy,
            handle_tx,
            runtime: runtime.clone(),
        });

        runtime.spawn(run_handle_events(Arc::downgrade(&shared), handle_rx));

        info!("Playback controller ready (switch policy: {})", policy);
        Self { shared }
    }

    /// Play `track_id`, or stop it if it is the active track
    ///
    /// Returns the status the transition left behind; fetching and decoding
    /// continue in the background.
    pub fn toggle(&self, track_id: TrackId) -> PlaybackStatus {
        let mut state = self.shared.lock();

        if state.session.is_active_for(&track_id) {
            debug!("Stopping {:?}", state.session);
            let released = state.session.release();
            let status = self.shared.publish(&state);
            drop(state);
            drop(released);
            return status;
        }

        if let Some(loading) = state.session.loading_id() {
            if self.shared.policy == SwitchPolicy::Wait {
                debug!(
                    "Ignoring toggle for {} while session {} is loading",
                    track_id, loading
                );
                return state.session.status();
            }
        }

        let released = if matches!(state.session, Session::Idle) {
            None
        } else {
            debug!("Superseding {:?} with {}", state.session, track_id);
            state.session.release()
        };

        let start = self.start(&mut state, track_id);
        let status = self.shared.publish(&state);
        drop(state);

        // Previous output is gone before the new load begins
        drop(released);
        let _ = start.send(());
        status
    }

    /// Enter Loading for `track_id`; the load waits for the returned gate
    fn start(&self, state: &mut SessionState, track_id: TrackId) -> oneshot::Sender<()> {
        state.next_id += 1;
        let id = SessionId::new(state.next_id);

        let (gate_tx, gate_rx) = oneshot::channel();
        let load = LoadTask {
            shared: Arc::downgrade(&self.shared),
            id,
            track_id: track_id.clone(),
            fetcher: Arc::clone(&self.shared.fetcher),
            backend: Arc::clone(&self.shared.backend),
            sink: HandleEventSink::new(id, self.shared.handle_tx.clone()),
        };

        let task = self.shared.runtime.spawn(async move {
            if gate_rx.await.is_ok() {
                load.run().await;
            }
        });

        debug!("Session {} loading {}", id, track_id);
        state.session = Session::Loading {
            id,
            track_id,
            fetch: task.abort_handle(),
        };
        gate_tx
    }

    /// Snapshot of the current session
    pub fn status(&self) -> PlaybackStatus {
        self.shared.lock().session.status()
    }

    /// Observe the session from now on
    pub fn subscribe(&self) -> PlaybackSubscription {
        let (rx, current) = self.shared.subscribe_raw();
        PlaybackSubscription::new(rx, Arc::downgrade(&self.shared), current)
    }

    /// Bus the controller publishes on
    pub fn event_bus(&self) -> &EventBus {
        &self.shared.events
    }

    pub fn switch_policy(&self) -> SwitchPolicy {
        self.shared.policy
    }

    /// Release any session and return to Idle
    pub fn shutdown(&self) {
        let mut state = self.shared.lock();
        if matches!(state.session, Session::Idle) {
            return;
        }

        info!("Releasing {} session on shutdown", state.session.phase());
        let released = state.session.release();
        self.shared.publish(&state);
        drop(state);
        drop(released);
    }
}

/// Everything one load attempt needs, detached from the controller lock
struct LoadTask {
    shared: Weak<Shared>,
    id: SessionId,
    track_id: TrackId,
    fetcher: Arc<dyn AudioFetcher>,
    backend: Arc<dyn PlaybackBackend>,
    sink: HandleEventSink,
}

impl LoadTask {
    async fn run(self) {
        let LoadTask {
            shared,
            id,
            track_id,
            fetcher,
            backend,
            sink,
        } = self;

        let result = match fetch_and_decode(fetcher.as_ref(), Arc::clone(&backend), &track_id).await {
            Ok(audio) => {
                if !shared.upgrade().is_some_and(|s| s.is_loading(id)) {
                    debug!("Session {} released before its output opened", id);
                    return;
                }
                open_output(backend, audio, sink).await
            }
            Err(e) => Err(e),
        };

        if let Some(shared) = shared.upgrade() {
            shared.complete_load(id, result);
        }
    }
}

/// Fetch then decode on the blocking pool
async fn fetch_and_decode(
    fetcher: &dyn AudioFetcher,
    backend: Arc<dyn PlaybackBackend>,
    track_id: &TrackId,
) -> Result<DecodedAudio> {
    let payload = fetcher.fetch(track_id).await?;
    debug!(
        "Fetched {} bytes of {} for {}",
        payload.bytes.len(),
        payload.mime_type,
        track_id
    );

    tokio::task::spawn_blocking(move || backend.decode(payload))
        .await
        .map_err(|e| Error::Decode(format!("decoder task failed: {}", e)))?
}

/// Open the device on the blocking pool
async fn open_output(
    backend: Arc<dyn PlaybackBackend>,
    audio: DecodedAudio,
    sink: HandleEventSink,
) -> Result<Box<dyn PlaybackHandle>> {
    tokio::task::spawn_blocking(move || backend.open(audio, sink))
        .await
        .map_err(|e| Error::AudioOutput(format!("output task failed: {}", e)))?
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SessionState) -> PlaybackStatus {
        let status = state.session.status();
        self.events
            .emit_lossy(SecretaryEvent::status_changed(status.clone()));
        status
    }

    /// Subscribe and snapshot atomically with respect to transitions
    pub(super) fn subscribe_raw(&self) -> (broadcast::Receiver<SecretaryEvent>, PlaybackStatus) {
        let state = self.lock();
        (self.events.subscribe(), state.session.status())
    }

    fn is_loading(&self, id: SessionId) -> bool {
        self.lock().session.loading_id() == Some(id)
    }

    /// Apply a finished load if session `id` is still loading
    ///
    /// A handle that is not kept is dropped after the lock is released.
    fn complete_load(&self, id: SessionId, result: Result<Box<dyn PlaybackHandle>>) {
        let mut state = self.lock();

        let track_id = match &state.session {
            Session::Loading {
                id: active,
                track_id,
                ..
            } if *active == id => track_id.clone(),
            _ => {
                debug!("Discarding stale load result for session {}", id);
                drop(state);
                drop(result);
                return;
            }
        };

        let mut discarded = None;
        let outcome = match result {
            Ok(mut handle) => match handle.play() {
                Ok(()) => Ok(handle),
                Err(e) => {
                    discarded = Some(handle);
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };

        state.session = match outcome {
            Ok(handle) => {
                info!("Session {} playing {}", id, track_id);
                Session::Playing {
                    id,
                    track_id,
                    handle,
                }
            }
            Err(e) => {
                warn!("Session {} failed for {}: {}", id, track_id, e);
                Session::Error {
                    message: e.to_string(),
                }
            }
        };
        self.publish(&state);
        drop(state);
        drop(discarded);
    }

    /// Apply an event from the handle owned by session `id`
    fn handle_event(&self, id: SessionId, event: HandleEvent) {
        let mut state = self.lock();

        let track_id = match state.session.playing() {
            Some((active, track_id)) if active == id => track_id.clone(),
            _ => {
                debug!("Ignoring {:?} from stale session {}", event, id);
                return;
            }
        };

        let released = match event {
            HandleEvent::Progress {
                position_ms,
                duration_ms,
            } => {
                self.events.emit_lossy(SecretaryEvent::PlaybackProgress {
                    track_id,
                    position_ms,
                    duration_ms,
                    timestamp: chrono::Utc::now(),
                });
                None
            }
            HandleEvent::Ended => {
                info!("Session {} finished {}", id, track_id);
                let released = state.session.release();
                self.publish(&state);
                released
            }
            HandleEvent::Error(message) => {
                let message = Error::Playback(message).to_string();
                warn!("Session {} stopped on {}: {}", id, track_id, message);
                let released = state.session.release();
                state.session = Session::Error { message };
                self.publish(&state);
                released
            }
        };
        drop(state);
        drop(released);
    }
}

/// Forward handle events to the controller until it is dropped
async fn run_handle_events(
    shared: Weak<Shared>,
    mut rx: mpsc::UnboundedReceiver<(SessionId, HandleEvent)>,
) {
    while let Some((id, event)) = rx.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.handle_event(id, event);
    }
    debug!("Handle event listener stopped");
}
