//! Fetcher whose requests are settled by the test

use async_trait::async_trait;
use secretary_common::TrackId;
use secretary_player::fetch::{AudioFetcher, AudioPayload};
use secretary_player::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// MIME type the mock backend refuses to decode
pub const CORRUPT_MIME: &str = "audio/x-corrupt";

/// Every `fetch` call parks here until the test settles it
pub struct ScriptedFetcher {
    requests: mpsc::UnboundedSender<PendingFetch>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> (Arc<Self>, FetchQueue) {
        let (requests, rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(Self {
            requests,
            calls: AtomicUsize::new(0),
        });
        (fetcher, FetchQueue { rx })
    }

    /// Number of fetches ever issued
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioFetcher for ScriptedFetcher {
    async fn fetch(&self, track_id: &TrackId) -> Result<AudioPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (responder, response) = oneshot::channel();
        self.requests
            .send(PendingFetch {
                track_id: track_id.clone(),
                responder,
            })
            .map_err(|_| Error::Fetch("test finished".to_string()))?;

        response
            .await
            .map_err(|_| Error::Fetch("fetch dropped by test".to_string()))?
    }
}

/// Fetches issued by the controller, in order
pub struct FetchQueue {
    rx: mpsc::UnboundedReceiver<PendingFetch>,
}

impl FetchQueue {
    /// Next fetch request, waiting for it to be issued
    pub async fn next(&mut self) -> PendingFetch {
        tokio::time::timeout(super::WAIT_TIMEOUT, self.rx.recv())
            .await
            .expect("no fetch was issued")
            .expect("fetcher dropped")
    }

    /// Next fetch request if one was already issued
    pub fn try_next(&mut self) -> Option<PendingFetch> {
        self.rx.try_recv().ok()
    }
}

/// One in-flight fetch
pub struct PendingFetch {
    pub track_id: TrackId,
    responder: oneshot::Sender<Result<AudioPayload>>,
}

impl PendingFetch {
    /// Whether the controller has stopped waiting for this fetch
    pub fn is_abandoned(&self) -> bool {
        self.responder.is_closed()
    }

    /// Settle with a small playable payload; false if nobody was waiting
    pub fn succeed(self) -> bool {
        self.succeed_with(AudioPayload::new("audio/wav", vec![0x52, 0x49, 0x46, 0x46]))
    }

    pub fn succeed_with(self, payload: AudioPayload) -> bool {
        self.responder.send(Ok(payload)).is_ok()
    }

    /// Settle with a payload the backend cannot decode
    pub fn succeed_corrupt(self) -> bool {
        self.succeed_with(AudioPayload::new(CORRUPT_MIME, vec![0xde, 0xad]))
    }

    pub fn fail(self, message: &str) -> bool {
        self.responder
            .send(Err(Error::Fetch(message.to_string())))
            .is_ok()
    }
}
