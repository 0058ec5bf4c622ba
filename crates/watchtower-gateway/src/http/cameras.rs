use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use watchtower_dispatch::clients::FaceEntry;

use crate::app::AppState;
use crate::error::{GatewayError, Result};
use crate::http::chat::check_auth;

fn require_nvr(state: &AppState) -> Result<&Arc<dyn watchtower_dispatch::clients::NvrClient>> {
    state.nvr.as_ref().ok_or_else(|| GatewayError::Unavailable("no NVR configured".to_string()))
}

/// `GET /api/cameras/:camera/snapshot` — a single current JPEG frame.
pub async fn snapshot_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(camera): Path<String>,
) -> Result<impl IntoResponse> {
    check_auth(&state, &headers)?;
    let nvr = require_nvr(&state)?;
    let bytes = nvr.snapshot(&camera).await.map_err(|e| GatewayError::Unavailable(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

#[derive(Debug, Deserialize, Default)]
pub struct EventsQuery {
    pub camera: Option<String>,
}

/// `GET /api/cameras/events` — recent motion/detection events, optionally
/// scoped to one camera.
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<EventsQuery>,
) -> Result<Json<Vec<serde_json::Value>>> {
    check_auth(&state, &headers)?;
    let nvr = require_nvr(&state)?;
    let events = nvr.recent_events(q.camera.as_deref()).await.map_err(|e| GatewayError::Unavailable(e.to_string()))?;
    Ok(Json(events))
}

/// `GET /api/cameras/events/:event_id/thumbnail` — a small JPEG for the
/// event feed, distinct from the live `snapshot` endpoint.
pub async fn thumbnail_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse> {
    check_auth(&state, &headers)?;
    let nvr = require_nvr(&state)?;
    let bytes = nvr.thumbnail(&event_id).await.map_err(|e| GatewayError::Unavailable(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

/// `GET /api/faces` — the enrolled face library the `recognize_face` /
/// `list_known_faces` tools operate over.
pub async fn list_faces_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<Vec<FaceEntry>>> {
    check_auth(&state, &headers)?;
    let nvr = require_nvr(&state)?;
    let faces = nvr.list_known_faces().await.map_err(|e| GatewayError::Unavailable(e.to_string()))?;
    Ok(Json(faces))
}
