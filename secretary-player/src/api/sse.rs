//! Server-Sent Events stream of playback events
//!
//! Each connection starts with the current status, then follows the
//! controller's subscription until the client leaves or the server drains.

use crate::api::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use secretary_common::SecretaryEvent;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

/// GET /events
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    let subscription = ctx.controller.subscribe();
    let initial = SecretaryEvent::status_changed(subscription.current().clone());
    let mut shutdown = ctx.shutdown.subscribe();

    let stream = stream::once(async move { initial })
        .chain(subscription.into_stream())
        .take_until(async move {
            // A dropped sender is not a drain; only `true` ends the stream
            if shutdown.wait_for(|draining| *draining).await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .filter_map(|event| async move {
            match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().event(event.event_type()).data(json))),
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    None
                }
            }
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
