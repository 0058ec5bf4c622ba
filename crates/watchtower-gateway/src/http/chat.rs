use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use watchtower_core::types::MessageRole;
use watchtower_dispatch::clients::llm::ChatMessage;
use watchtower_dispatch::Caller;

use crate::app::AppState;
use crate::error::{GatewayError, Result};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub timing: watchtower_sessions::TimerBreakdown,
}

/// `POST /api/chat` — non-streaming mirror of the `/ws` `chat.send` path
/// (§6). Tool calls below RED/ORANGE run inline; a tool that needs
/// confirmation is reported as blocked rather than waited on, since there's
/// no socket to carry a confirmation prompt back over.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>> {
    check_auth(&state, &headers)?;
    if req.message.trim().is_empty() {
        return Err(GatewayError::BadRequest("message cannot be empty".to_string()));
    }

    let mut timer = watchtower_sessions::RequestTimer::start();
    let session_key = state.operator_session();

    state
        .sessions
        .add_message(&session_key, MessageRole::User, &req.message)
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    timer.mark_routed();

    let user_context = state.memory.build_user_context(&session_key.user_id).ok().map(|c| c.rendered).unwrap_or_default();
    let system_tokens = state.sessions.cfg().context_window_tokens / 8;
    let memory_tokens = user_context.len() / 4;
    let context = state.sessions.build_context_messages(&session_key, system_tokens, memory_tokens).await;

    let mut messages: Vec<ChatMessage> = Vec::with_capacity(context.len() + 1);
    if !user_context.is_empty() {
        messages.push(ChatMessage { role: "system".to_string(), content: user_context });
    }
    messages.extend(context.into_iter().map(|m| ChatMessage { role: m.role.to_string(), content: m.content }));

    timer.mark_llm_start();
    let reply = state.llm.chat(&messages).await.map_err(|e| GatewayError::Unavailable(e.to_string()))?;
    timer.mark_llm_done();

    state
        .sessions
        .add_message(&session_key, MessageRole::Assistant, &reply)
        .await
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    if state.sessions.should_summarize(&session_key).await {
        state.sessions.summarize(&session_key).await;
    }

    let request_id = uuid::Uuid::new_v4().to_string();
    let timing = timer.finish(&request_id);
    Ok(Json(ChatReply { reply, timing }))
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub tool: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ConfirmReply {
    pub is_error: bool,
    pub content: Option<String>,
}

/// `POST /api/chat/confirm` — answers a pending RED/ORANGE confirmation by
/// re-running the tool with `confirmed: true` set.
pub async fn confirm_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmReply>> {
    check_auth(&state, &headers)?;
    let mut args = req.args;
    if let Some(obj) = args.as_object_mut() {
        obj.insert("confirmed".to_string(), serde_json::Value::Bool(true));
    }
    let result = state.dispatcher.execute_tool(&req.tool, args, Caller::Api, false).await;
    if result.blocked {
        return Err(GatewayError::Forbidden(result.reason.unwrap_or_default()));
    }
    Ok(Json(ConfirmReply { is_error: result.is_error, content: result.content }))
}

pub(crate) fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<()> {
    match extract_bearer(headers) {
        Some(token) if state.auth.verify(token) => Ok(()),
        _ => Err(GatewayError::Unauthorized),
    }
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get("authorization").and_then(|v| v.to_str().ok()).and_then(|v| v.strip_prefix("Bearer "))
}
