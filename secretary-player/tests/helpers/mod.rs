//! Test helper modules for secretary-player integration tests
//!
//! - ScriptedFetcher: fetches that settle only when the test says so
//! - MockBackend: handles that count play/pause/drop and can emit events
//! - Wait helpers with timeouts

#![allow(dead_code)]

pub mod mock_backend;
pub mod scripted_fetcher;

pub use mock_backend::{HandleTracker, MockBackend};
pub use scripted_fetcher::{FetchQueue, PendingFetch, ScriptedFetcher};

use secretary_common::{EventBus, PlaybackPhase, PlaybackStatus};
use secretary_player::{PlaybackController, SwitchPolicy};
use std::sync::Arc;
use std::time::Duration;

/// How long any wait helper waits before failing the test
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// A controller wired to scripted collaborators
pub struct Harness {
    pub controller: PlaybackController,
    pub fetches: FetchQueue,
    pub fetcher: Arc<ScriptedFetcher>,
    pub backend: Arc<MockBackend>,
}

impl Harness {
    pub fn new(policy: SwitchPolicy) -> Self {
        Self::with_capacity(policy, 64)
    }

    pub fn with_capacity(policy: SwitchPolicy, event_capacity: usize) -> Self {
        let (fetcher, fetches) = ScriptedFetcher::new();
        let backend = Arc::new(MockBackend::default());
        let controller = PlaybackController::new(
            fetcher.clone(),
            backend.clone(),
            EventBus::new(event_capacity),
            policy,
        );

        Self {
            controller,
            fetches,
            fetcher,
            backend,
        }
    }

    /// Toggle `track` and let its fetch succeed, returning the new handle
    pub async fn play(&mut self, track: &str) -> HandleTracker {
        self.controller.toggle(track.into());
        self.fetches.next().await.succeed();
        wait_for_status(&self.controller, &PlaybackStatus::playing(track.into())).await;
        self.backend.last_handle()
    }
}

/// Wait until the controller reports `phase`
pub async fn wait_for_phase(controller: &PlaybackController, phase: PlaybackPhase) -> PlaybackStatus {
    wait_until(|| controller.status().phase == phase).await;
    controller.status()
}

/// Wait until the controller reports exactly `status`
pub async fn wait_for_status(controller: &PlaybackController, status: &PlaybackStatus) {
    wait_until(|| &controller.status() == status).await;
}

/// Poll `condition` until it holds, panicking after [`WAIT_TIMEOUT`]
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let result = tokio::time::timeout(WAIT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "condition not reached within {:?}", WAIT_TIMEOUT);
}

/// Give spawned tasks a chance to run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
