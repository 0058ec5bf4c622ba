use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use dashmap::DashMap;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tracing::warn;
use watchtower_core::types::MessageRole;
use watchtower_dispatch::clients::llm::{ChatMessage, StreamEvent};
use watchtower_dispatch::Caller;
use watchtower_protocol::frames::EventFrame;
use watchtower_protocol::methods::chat as m;
use watchtower_sessions::{RequestTimer, SessionKey};

use crate::app::AppState;

/// Per-connection chat state: the fixed operator session this connection
/// talks through, plus in-flight confirmation handshakes keyed by the
/// `call_id` a blocked tool_call event carried.
#[derive(Default)]
pub struct ChatCtx {
    pub pending_confirmations: DashMap<String, oneshot::Sender<bool>>,
}

#[derive(Debug, Deserialize)]
struct SendParams {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ConfirmParams {
    call_id: String,
    confirmed: bool,
}

async fn send_event(tx: &mut SplitSink<WebSocket, Message>, event: &str, payload: impl serde::Serialize) {
    let frame = EventFrame::new(event, payload);
    let text = serde_json::to_string(&frame).unwrap_or_default();
    let _ = tx.send(Message::Text(text.into())).await;
}

pub async fn handle_send(
    app: &Arc<AppState>,
    ctx: &ChatCtx,
    session_key: &SessionKey,
    params: Option<Value>,
    tx: &mut SplitSink<WebSocket, Message>,
) {
    let Some(params) = params.and_then(|p| serde_json::from_value::<SendParams>(p).ok()) else {
        send_event(tx, m::EV_DONE, json!({ "error": "invalid chat.send params" })).await;
        return;
    };

    let mut timer = RequestTimer::start();
    let request_id = uuid::Uuid::new_v4().to_string();

    if let Err(e) = app.sessions.add_message(session_key, MessageRole::User, &params.message).await {
        warn!(error = %e, "failed to record user message");
    }
    timer.mark_routed();

    let user_context = app
        .memory
        .build_user_context(&session_key.user_id)
        .ok()
        .map(|c| c.rendered)
        .unwrap_or_default();
    let system_tokens = app.sessions.cfg().context_window_tokens / 8;
    let memory_tokens = user_context.len() / 4;
    let context = app.sessions.build_context_messages(session_key, system_tokens, memory_tokens).await;

    let mut messages: Vec<ChatMessage> = Vec::with_capacity(context.len() + 1);
    if !user_context.is_empty() {
        messages.push(ChatMessage { role: "system".to_string(), content: user_context });
    }
    messages.extend(context.into_iter().map(|m| ChatMessage { role: m.role.to_string(), content: m.content }));

    timer.mark_llm_start();
    let stream = match app.llm.chat_stream(&messages).await {
        Ok(s) => s,
        Err(e) => {
            send_event(tx, m::EV_DONE, json!({ "error": e.to_string() })).await;
            return;
        }
    };
    tokio::pin!(stream);

    let mut full_text = String::new();
    let mut first_token_sent = false;

    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::TextDelta(delta) => {
                if !first_token_sent {
                    timer.mark_first_token();
                    send_event(tx, m::EV_FIRST_TOKEN, json!({})).await;
                    first_token_sent = true;
                }
                full_text.push_str(&delta);
                send_event(tx, m::EV_TEXT_DELTA, json!({ "delta": delta })).await;
            }
            StreamEvent::Thinking(_) => {}
            StreamEvent::ToolUse { name, input } => {
                run_tool_call(app, ctx, &name, input, tx).await;
            }
            StreamEvent::Done => break,
            StreamEvent::Error(e) => {
                send_event(tx, m::EV_DONE, json!({ "error": e })).await;
                return;
            }
        }
    }
    timer.mark_llm_done();

    if let Err(e) = app.sessions.add_message(session_key, MessageRole::Assistant, &full_text).await {
        warn!(error = %e, "failed to record assistant message");
    }
    if app.sessions.should_summarize(session_key).await {
        app.sessions.summarize(session_key).await;
    }

    let breakdown = timer.finish(&request_id);
    send_event(tx, m::EV_DONE, json!({ "timing": breakdown })).await;
}

/// Executes a tool the model requested. RED/ORANGE tools the kernel blocks
/// pending confirmation surface as a `tool_call` event with `blocked: true`;
/// the browser answers via `chat.confirm`, which resolves the oneshot this
/// function is waiting on.
async fn run_tool_call(app: &Arc<AppState>, ctx: &ChatCtx, name: &str, input: Value, tx: &mut SplitSink<WebSocket, Message>) {
    let call_id = uuid::Uuid::new_v4().to_string();
    let result = app.dispatcher.execute_tool(name, input.clone(), Caller::Chat, false).await;

    if result.blocked {
        let (confirm_tx, confirm_rx) = oneshot::channel();
        ctx.pending_confirmations.insert(call_id.clone(), confirm_tx);
        send_event(
            tx,
            m::EV_TOOL_CALL,
            json!({ "callId": call_id, "name": name, "input": input, "blocked": true, "reason": result.reason, "tier": result.tier }),
        )
        .await;

        let confirmed = confirm_rx.await.unwrap_or(false);
        ctx.pending_confirmations.remove(&call_id);
        if !confirmed {
            return;
        }
        let mut confirmed_args = input;
        if let Some(obj) = confirmed_args.as_object_mut() {
            obj.insert("confirmed".to_string(), Value::Bool(true));
        }
        let retried = app.dispatcher.execute_tool(name, confirmed_args, Caller::Chat, false).await;
        send_event(
            tx,
            m::EV_TOOL_CALL,
            json!({ "callId": call_id, "name": name, "blocked": false, "isError": retried.is_error, "content": retried.content }),
        )
        .await;
    } else {
        send_event(
            tx,
            m::EV_TOOL_CALL,
            json!({ "callId": call_id, "name": name, "blocked": false, "isError": result.is_error, "content": result.content }),
        )
        .await;
    }
}

pub fn handle_confirm(ctx: &ChatCtx, params: Option<Value>) {
    let Some(params) = params.and_then(|p| serde_json::from_value::<ConfirmParams>(p).ok()) else {
        return;
    };
    if let Some((_, sender)) = ctx.pending_confirmations.remove(&params.call_id) {
        let _ = sender.send(params.confirmed);
    }
}
