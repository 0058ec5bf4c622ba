use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use watchtower_core::config::MAX_PAYLOAD_BYTES;
use watchtower_protocol::frames::{InboundFrame, ResFrame};
use watchtower_protocol::handshake::ConnectParams;
use watchtower_protocol::methods::{chat as chat_methods, voice as voice_methods, CONNECT};

use crate::app::AppState;
use crate::ws::chat::{self, ChatCtx};
use crate::ws::voice::{self, VoiceCtx};
use crate::ws::{handshake, HANDSHAKE_TIMEOUT_MS, HEARTBEAT_INTERVAL_SECS};

/// WS connection state machine: `AwaitingConnect` → `Authenticated` → closed.
/// A `connect` request must land within `HANDSHAKE_TIMEOUT_MS` or the socket
/// drops.
enum ConnState {
    AwaitingConnect,
    Authenticated,
    Closing,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "new WS connection");

    let (mut tx, mut rx) = socket.split();
    let mut broadcast_rx = state.broadcaster.subscribe();
    let mut monitor_rx = state.monitor.subscribe();

    let nonce = handshake::make_nonce();
    if tx.send(Message::Text(handshake::challenge_event(&nonce).into())).await.is_err() {
        return;
    }

    let mut conn_state = ConnState::AwaitingConnect;
    let chat_ctx = ChatCtx::default();
    let mut voice_ctx = VoiceCtx::default();

    let handshake_deadline = tokio::time::Instant::now() + Duration::from_millis(HANDSHAKE_TIMEOUT_MS);
    let mut handshake_timer = Box::pin(tokio::time::sleep_until(handshake_deadline));

    let mut tick_interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_PAYLOAD_BYTES {
                            warn!(conn_id, size = text.len(), "payload too large, dropping connection");
                            break;
                        }
                        conn_state = process_message(&conn_id, &text, conn_state, &mut tx, &state, &chat_ctx, &mut voice_ctx).await;
                        if matches!(conn_state, ConnState::Closing) {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }

            event = broadcast_rx.recv() => {
                if let Ok(payload) = event {
                    if tx.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
            }

            event = monitor_rx.recv() => {
                if let Ok(event) = event {
                    let frame = watchtower_protocol::frames::EventFrame::new(
                        watchtower_protocol::methods::events::EV_EVENT,
                        event,
                    );
                    let json = serde_json::to_string(&frame).unwrap_or_default();
                    if tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }

            _ = tick_interval.tick() => {
                if matches!(conn_state, ConnState::Authenticated) {
                    let tick = watchtower_protocol::frames::EventFrame::new("tick", serde_json::json!({ "ts": chrono::Utc::now().timestamp_millis() }));
                    let json = serde_json::to_string(&tick).unwrap_or_default();
                    if tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }

            _ = &mut handshake_timer => {
                if matches!(conn_state, ConnState::AwaitingConnect) {
                    warn!(conn_id, "handshake timeout, closing connection");
                    break;
                }
            }
        }
    }

    info!(conn_id, "WS connection closed");
}

async fn process_message(
    conn_id: &str,
    text: &str,
    state: ConnState,
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    app: &Arc<AppState>,
    chat_ctx: &ChatCtx,
    voice_ctx: &mut VoiceCtx,
) -> ConnState {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            warn!(conn_id, error = %e, "malformed frame, ignoring");
            return state;
        }
    };

    match state {
        ConnState::AwaitingConnect => {
            let Some(req) = frame.as_req() else { return ConnState::AwaitingConnect };

            if req.method != CONNECT {
                let res = ResFrame::err(&req.id, "PROTOCOL_ERROR", "must authenticate first");
                let _ = send_json(tx, &res).await;
                return ConnState::AwaitingConnect;
            }

            let params: ConnectParams = match req.params.and_then(|p| serde_json::from_value(p).ok()) {
                Some(p) => p,
                None => {
                    let res = ResFrame::err(&req.id, "PROTOCOL_ERROR", "invalid connect params");
                    let _ = send_json(tx, &res).await;
                    return ConnState::Closing;
                }
            };

            match handshake::verify_auth(&params, app) {
                Ok(()) => {
                    let hello = handshake::hello_ok_payload();
                    let res = ResFrame::ok(&req.id, hello);
                    let _ = send_json(tx, &res).await;
                    info!(conn_id, "client authenticated");
                    ConnState::Authenticated
                }
                Err(reason) => {
                    warn!(conn_id, %reason, "auth failed");
                    let res = ResFrame::err(&req.id, "AUTH_FAILED", &reason);
                    let _ = send_json(tx, &res).await;
                    ConnState::Closing
                }
            }
        }

        ConnState::Authenticated => {
            if let Some(req) = frame.as_req() {
                dispatch_method(&req.method, req.params, &req.id, app, chat_ctx, voice_ctx, tx).await;
            }
            ConnState::Authenticated
        }

        ConnState::Closing => ConnState::Closing,
    }
}

async fn dispatch_method(
    method: &str,
    params: Option<serde_json::Value>,
    req_id: &str,
    app: &Arc<AppState>,
    chat_ctx: &ChatCtx,
    voice_ctx: &mut VoiceCtx,
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
) {
    match method {
        "ping" => {
            let _ = send_json(tx, &ResFrame::ok(req_id, serde_json::json!({ "pong": true }))).await;
        }
        m if m == chat_methods::SEND => {
            let _ = send_json(tx, &ResFrame::ok(req_id, serde_json::json!({ "accepted": true }))).await;
            let session_key = app.operator_session();
            chat::handle_send(app, chat_ctx, &session_key, params, tx).await;
        }
        m if m == chat_methods::CONFIRM => {
            chat::handle_confirm(chat_ctx, params);
            let _ = send_json(tx, &ResFrame::ok(req_id, serde_json::json!({ "ok": true }))).await;
        }
        m if m == chat_methods::ABORT => {
            // Aborting mid-stream drops through naturally once the browser
            // stops reading; there is no server-side in-flight generation
            // handle to cancel yet (single LLM call per chat.send).
            let _ = send_json(tx, &ResFrame::ok(req_id, serde_json::json!({ "ok": true }))).await;
        }
        m if m == voice_methods::AUDIO_START => {
            voice::handle_audio_start(voice_ctx, tx).await;
            let _ = send_json(tx, &ResFrame::ok(req_id, serde_json::json!({ "ok": true }))).await;
        }
        m if m == voice_methods::AUDIO_CHUNK => {
            voice::handle_audio_chunk(voice_ctx, params);
            let _ = send_json(tx, &ResFrame::ok(req_id, serde_json::json!({ "ok": true }))).await;
        }
        m if m == voice_methods::AUDIO_END => {
            let _ = send_json(tx, &ResFrame::ok(req_id, serde_json::json!({ "accepted": true }))).await;
            let session_key = app.operator_session();
            voice::handle_audio_end(app, voice_ctx, &session_key, tx).await;
        }
        other => {
            let _ = send_json(tx, &ResFrame::err(req_id, "METHOD_NOT_FOUND", &format!("unknown method '{other}'"))).await;
        }
    }
}

async fn send_json<T: serde::Serialize>(
    tx: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    payload: &T,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(payload).unwrap_or_default();
    tx.send(Message::Text(json.into())).await.map_err(axum::Error::new)
}
