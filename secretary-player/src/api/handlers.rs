//! HTTP request handlers

use crate::api::server::AppContext;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use secretary_common::{PlaybackStatus, TrackId};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "secretary_player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /playback/status
pub async fn get_status(State(ctx): State<AppContext>) -> Json<PlaybackStatus> {
    Json(ctx.controller.status())
}

/// POST /playback/toggle/:track_id
///
/// Responds with the session status after the synchronous transition.
pub async fn toggle(
    State(ctx): State<AppContext>,
    Path(track_id): Path<String>,
) -> Result<Json<PlaybackStatus>, (StatusCode, Json<ErrorResponse>)> {
    if track_id.trim().is_empty() {
        warn!("Rejected toggle with blank track id");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "track id must not be blank".to_string(),
            }),
        ));
    }

    debug!("Toggle requested for {}", track_id);
    Ok(Json(ctx.controller.toggle(TrackId::from(track_id))))
}
