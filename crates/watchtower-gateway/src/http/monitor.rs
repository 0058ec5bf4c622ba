use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use watchtower_core::types::AutonomyLevel;

use crate::app::AppState;
use crate::error::{GatewayError, Result};
use crate::http::chat::check_auth;

#[derive(Debug, Serialize)]
pub struct MonitorStatusResponse {
    pub autonomy_level: AutonomyLevel,
    pub kill_switch_engaged: bool,
}

/// `GET /api/monitor/status` — reads the same `autonomy.level` /
/// `autonomy.killSwitch` preferences the runbook engine's guardrails check
/// before every remediation attempt.
pub async fn status_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<MonitorStatusResponse>> {
    check_auth(&state, &headers)?;
    let conn = state.monitor.db();
    let conn = conn.lock().unwrap();
    Ok(Json(MonitorStatusResponse {
        autonomy_level: watchtower_monitor::current_autonomy_level(&conn),
        kill_switch_engaged: watchtower_monitor::kill_switch_engaged(&conn),
    }))
}

#[derive(Debug, Deserialize)]
pub struct KillSwitchRequest {
    pub engaged: bool,
}

/// `PUT /api/monitor/killswitch` — the operator's single big red button.
pub async fn set_killswitch_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<KillSwitchRequest>,
) -> Result<Json<serde_json::Value>> {
    check_auth(&state, &headers)?;
    let conn = state.db.lock().unwrap();
    watchtower_core::db::set_preference(&conn, "autonomy.killSwitch", if req.engaged { "true" } else { "false" })
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct AutonomyLevelRequest {
    pub level: i64,
}

/// `PUT /api/monitor/autonomy-level`.
pub async fn set_autonomy_level_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AutonomyLevelRequest>,
) -> Result<Json<serde_json::Value>> {
    check_auth(&state, &headers)?;
    let level = AutonomyLevel::from_i64(req.level);
    let conn = state.db.lock().unwrap();
    watchtower_core::db::set_preference(&conn, "autonomy.level", &level.as_i64().to_string())
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize, Default)]
pub struct ActionsQuery {
    #[serde(default = "default_actions_limit")]
    pub limit: i64,
}

fn default_actions_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<watchtower_monitor::AutonomyActionRecord>,
}

/// `GET /api/monitor/actions` — the audit trail behind the status dashboard.
pub async fn list_actions_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<ActionsQuery>,
) -> Result<Json<ActionsResponse>> {
    check_auth(&state, &headers)?;
    let conn = state.monitor.db();
    let conn = conn.lock().unwrap();
    let actions = watchtower_monitor::recent_autonomy_actions(&conn, q.limit).map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok(Json(ActionsResponse { actions }))
}

#[derive(Debug, Deserialize)]
pub struct TestAlertRequest {
    pub title: String,
    pub message: String,
}

/// `POST /api/monitor/test-alert` — fires a synthetic `alert` event over
/// `/ws` so the operator can confirm the notification pipeline end to end.
pub async fn test_alert_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TestAlertRequest>,
) -> Result<Json<serde_json::Value>> {
    check_auth(&state, &headers)?;
    state.monitor.emit_test_alert(&req.title, &req.message);
    Ok(Json(serde_json::json!({ "ok": true })))
}
