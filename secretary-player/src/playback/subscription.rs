//! Read-only view of the playback session

use super::controller::Shared;
use futures::Stream;
use secretary_common::{PlaybackStatus, SecretaryEvent};
use std::sync::Weak;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

/// One subscriber's view of the controller
///
/// Starts from the status at subscription time and follows every transition
/// after it. A subscriber that falls behind skips straight to the current
/// status instead of replaying what it missed.
pub struct PlaybackSubscription {
    rx: broadcast::Receiver<SecretaryEvent>,
    controller: Weak<Shared>,
    current: PlaybackStatus,
}

impl PlaybackSubscription {
    pub(super) fn new(
        rx: broadcast::Receiver<SecretaryEvent>,
        controller: Weak<Shared>,
        current: PlaybackStatus,
    ) -> Self {
        Self {
            rx,
            controller,
            current,
        }
    }

    /// Last status this subscriber has seen
    pub fn current(&self) -> &PlaybackStatus {
        &self.current
    }

    /// Next event, progress reports included
    ///
    /// After a lag this yields a synthetic `PlaybackStatusChanged` carrying
    /// the controller's current status. `None` once the controller is gone.
    pub async fn next_event(&mut self) -> Option<SecretaryEvent> {
        match self.rx.recv().await {
            Ok(event) => {
                if let SecretaryEvent::PlaybackStatusChanged { status, .. } = &event {
                    self.current = status.clone();
                }
                Some(event)
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Playback subscriber lagged by {} events, resyncing", skipped);
                let controller = self.controller.upgrade()?;
                let (rx, status) = controller.subscribe_raw();
                self.rx = rx;
                self.current = status.clone();
                Some(SecretaryEvent::status_changed(status))
            }
            Err(RecvError::Closed) => None,
        }
    }

    /// Next status change, skipping progress reports
    pub async fn next_status(&mut self) -> Option<PlaybackStatus> {
        loop {
            if let SecretaryEvent::PlaybackStatusChanged { status, .. } = self.next_event().await? {
                return Some(status);
            }
        }
    }

    /// All further events as a stream
    pub fn into_stream(self) -> impl Stream<Item = SecretaryEvent> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            let event = subscription.next_event().await?;
            Some((event, subscription))
        })
    }
}
