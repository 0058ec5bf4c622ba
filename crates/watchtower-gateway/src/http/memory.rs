use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use watchtower_sessions::{MemoryCategory, MemorySource, UserMemory};

use crate::app::AppState;
use crate::error::{GatewayError, Result};
use crate::http::chat::check_auth;

/// A "memory event" in gateway terms is just a `UserMemory` row — the
/// unresolved/resolved split the REST surface exposes is driven by
/// confidence: anything below the learn-overwrite threshold is still
/// pending operator review.
const UNRESOLVED_CONFIDENCE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Deserialize)]
pub struct LearnRequest {
    pub category: String,
    pub key: String,
    pub value: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_confidence() -> f64 {
    0.8
}
fn default_source() -> String {
    "admin_set".to_string()
}

#[derive(Debug, Serialize)]
pub struct MemoryEventsResponse {
    pub memories: Vec<UserMemory>,
}

/// `GET /api/memory/events` — every remembered fact/preference/instruction
/// for the operator.
pub async fn list_events_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<MemoryEventsResponse>> {
    check_auth(&state, &headers)?;
    let user_id = &state.operator_session().user_id;
    let memories = state.memory.list_all(user_id, 500).unwrap_or_default();
    Ok(Json(MemoryEventsResponse { memories }))
}

/// `GET /api/memory/events/unresolved` — low-confidence entries an operator
/// hasn't confirmed yet.
pub async fn list_unresolved_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<MemoryEventsResponse>> {
    check_auth(&state, &headers)?;
    let user_id = &state.operator_session().user_id;
    let memories = state
        .memory
        .list_all(user_id, 500)
        .unwrap_or_default()
        .into_iter()
        .filter(|m| m.confidence < UNRESOLVED_CONFIDENCE_THRESHOLD)
        .collect();
    Ok(Json(MemoryEventsResponse { memories }))
}

/// `POST /api/memory/events` — operator-asserted memory (learn).
pub async fn learn_handler(State(state): State<Arc<AppState>>, headers: HeaderMap, Json(req): Json<LearnRequest>) -> Result<Json<serde_json::Value>> {
    check_auth(&state, &headers)?;
    let category = MemoryCategory::from_str(&req.category).map_err(GatewayError::BadRequest)?;
    let source = MemorySource::from_str(&req.source).map_err(GatewayError::BadRequest)?;
    let user_id = state.operator_session().user_id.clone();
    state
        .memory
        .learn(&user_id, category, &req.key, &req.value, req.confidence, source)
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Serialize)]
pub struct PreferenceResponse {
    pub key: String,
    pub value: Option<String>,
}

/// `GET /api/memory/preferences/:key`.
pub async fn get_preference_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<PreferenceResponse>> {
    check_auth(&state, &headers)?;
    let conn = state.db.lock().unwrap();
    let value = watchtower_core::db::get_preference(&conn, &key).map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(Json(PreferenceResponse { key, value }))
}

#[derive(Debug, Deserialize)]
pub struct SetPreferenceRequest {
    pub value: String,
}

/// `PUT /api/memory/preferences/:key`.
pub async fn put_preference_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(req): Json<SetPreferenceRequest>,
) -> Result<Json<serde_json::Value>> {
    check_auth(&state, &headers)?;
    let conn = state.db.lock().unwrap();
    watchtower_core::db::set_preference(&conn, &key, &req.value).map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize, Default)]
pub struct ForgetQuery {
    pub category: Option<String>,
}

/// The route table needs a `forget` entry point too; grouped here instead
/// of under its own file since it's one handler operating on the same
/// `MemoryStore`.
pub async fn forget_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Query(q): Query<ForgetQuery>,
) -> Result<Json<serde_json::Value>> {
    check_auth(&state, &headers)?;
    let category = MemoryCategory::from_str(q.category.as_deref().unwrap_or("fact")).map_err(GatewayError::BadRequest)?;
    let user_id = state.operator_session().user_id.clone();
    state.memory.forget(&user_id, category, &key).map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
