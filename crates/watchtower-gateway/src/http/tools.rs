use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use watchtower_dispatch::{Caller, DispatchResult};

use crate::app::AppState;
use crate::error::{GatewayError, Result};
use crate::http::chat::check_auth;

#[derive(Debug, Serialize)]
pub struct ToolsListResponse {
    pub tools: Vec<watchtower_dispatch::tools::ToolDefinition>,
}

/// `GET /api/tools` — the registered tool catalog.
pub async fn list_tools_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<ToolsListResponse>> {
    check_auth(&state, &headers)?;
    Ok(Json(ToolsListResponse { tools: state.dispatcher.list_tools() }))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub is_error: bool,
    pub content: Option<String>,
    pub tier: watchtower_core::types::ActionTier,
}

/// `POST /api/tools/execute` — direct tool invocation, outside the chat
/// pipeline. A RED/ORANGE tool without `confirmed`/the approval keyword
/// comes back `403 Forbidden` with the safety reason rather than blocking
/// on a confirmation round trip (§7: safety denials are user-visible, not
/// process failures).
pub async fn execute_tool_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>> {
    check_auth(&state, &headers)?;
    let tool_name = req.tool.clone();
    let DispatchResult { content, is_error, blocked, reason, tier } =
        state.dispatcher.execute_tool(&req.tool, req.args, Caller::Api, false).await;
    if blocked {
        return match reason.as_deref() {
            Some("not found") => Err(GatewayError::NotFound(format!("unknown tool '{tool_name}'"))),
            _ => Err(GatewayError::Forbidden(reason.unwrap_or_else(|| "blocked by safety kernel".to_string()))),
        };
    }
    Ok(Json(ExecuteResponse { is_error, content, tier }))
}
