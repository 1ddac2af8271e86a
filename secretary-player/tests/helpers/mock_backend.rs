//! Playback backend that records what the controller does to its handles

use super::scripted_fetcher::CORRUPT_MIME;
use secretary_player::audio::{
    DecodedAudio, HandleEvent, HandleEventSink, PlaybackBackend, PlaybackHandle,
};
use secretary_player::fetch::AudioPayload;
use secretary_player::playback::SessionId;
use secretary_player::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MockBackend {
    handles: Mutex<Vec<HandleTracker>>,
    fail_play: AtomicBool,
}

impl MockBackend {
    /// Make every subsequent `play` fail
    pub fn set_fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    /// Handles opened so far, oldest first
    pub fn handles(&self) -> Vec<HandleTracker> {
        self.handles.lock().unwrap().clone()
    }

    pub fn opened(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    pub fn last_handle(&self) -> HandleTracker {
        self.handles
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no handle was opened")
    }

    /// Handles opened and not yet dropped
    pub fn live_handles(&self) -> usize {
        self.handles().iter().filter(|h| h.drops() == 0).count()
    }
}

impl PlaybackBackend for MockBackend {
    fn decode(&self, payload: AudioPayload) -> Result<DecodedAudio> {
        if payload.mime_type == CORRUPT_MIME {
            return Err(Error::Decode("unrecognised audio/x-corrupt data".to_string()));
        }
        // 10ms of stereo silence at 8kHz
        Ok(DecodedAudio::new(vec![0.0; 160], 8_000))
    }

    fn open(&self, _audio: DecodedAudio, events: HandleEventSink) -> Result<Box<dyn PlaybackHandle>> {
        let tracker = HandleTracker {
            state: Arc::new(TrackerState {
                sink: events,
                plays: AtomicUsize::new(0),
                pauses: AtomicUsize::new(0),
                drops: AtomicUsize::new(0),
            }),
        };
        self.handles.lock().unwrap().push(tracker.clone());

        Ok(Box::new(MockHandle {
            tracker,
            fail_play: self.fail_play.load(Ordering::SeqCst),
        }))
    }
}

struct TrackerState {
    sink: HandleEventSink,
    plays: AtomicUsize,
    pauses: AtomicUsize,
    drops: AtomicUsize,
}

/// Test-side view of one opened handle
#[derive(Clone)]
pub struct HandleTracker {
    state: Arc<TrackerState>,
}

impl HandleTracker {
    pub fn session(&self) -> SessionId {
        self.state.sink.session()
    }

    pub fn plays(&self) -> usize {
        self.state.plays.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.state.pauses.load(Ordering::SeqCst)
    }

    pub fn drops(&self) -> usize {
        self.state.drops.load(Ordering::SeqCst)
    }

    /// Simulate the recording playing to its end
    pub fn end(&self) {
        self.state.sink.send(HandleEvent::Ended);
    }

    /// Simulate a runtime output failure
    pub fn fail(&self, message: &str) {
        self.state.sink.send(HandleEvent::Error(message.to_string()));
    }

    pub fn progress(&self, position_ms: u64, duration_ms: u64) {
        self.state.sink.send(HandleEvent::Progress {
            position_ms,
            duration_ms: Some(duration_ms),
        });
    }
}

struct MockHandle {
    tracker: HandleTracker,
    fail_play: bool,
}

impl PlaybackHandle for MockHandle {
    fn play(&mut self) -> Result<()> {
        self.tracker.state.plays.fetch_add(1, Ordering::SeqCst);
        if self.fail_play {
            return Err(Error::AudioOutput("device busy".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.tracker.state.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        self.tracker.state.drops.fetch_add(1, Ordering::SeqCst);
    }
}
