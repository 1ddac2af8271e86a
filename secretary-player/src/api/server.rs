//! HTTP server setup and routing

use crate::error::{Error, Result};
use crate::playback::PlaybackController;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub controller: PlaybackController,
    /// Flipped to `true` when the server starts draining; ends SSE streams
    pub shutdown: Arc<watch::Sender<bool>>,
}

impl AppContext {
    pub fn new(controller: PlaybackController) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            controller,
            shutdown: Arc::new(shutdown),
        }
    }
}

/// Build the router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        .route("/playback/status", get(super::handlers::get_status))
        .route("/playback/toggle/:track_id", post(super::handlers::toggle))
        .route("/events", get(super::sse::event_stream))
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Dashboards are served from other local origins
        .layer(CorsLayer::permissive())
}

/// Serve the control API on `addr` until `shutdown` resolves
pub async fn run<F>(addr: SocketAddr, controller: PlaybackController, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let ctx = AppContext::new(controller);
    let drain = Arc::clone(&ctx.shutdown);
    let app = create_router(ctx);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            drain.send_replace(true);
        })
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    info!("HTTP server stopped");
    Ok(())
}
