use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::warn;
use watchtower_audio::{QueuedSentence, SentenceDetector};
use watchtower_core::types::MessageRole;
use watchtower_dispatch::clients::llm::{ChatMessage, StreamEvent};
use watchtower_protocol::frames::EventFrame;
use watchtower_protocol::methods::voice as m;
use watchtower_sessions::SessionKey;

use crate::app::AppState;

/// Accumulates one utterance's base64 WAV chunks. Per the wire contract
/// there's exactly one chunk per utterance, but the buffer tolerates more
/// without assuming it.
#[derive(Default)]
pub struct VoiceCtx {
    buffer: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct AudioChunkParams {
    #[allow(dead_code)]
    seq: u64,
    audio: String,
}

async fn send_event(tx: &mut SplitSink<WebSocket, Message>, event: &str, payload: impl serde::Serialize) {
    let frame = EventFrame::new(event, payload);
    let text = serde_json::to_string(&frame).unwrap_or_default();
    let _ = tx.send(Message::Text(text.into())).await;
}

pub async fn handle_audio_start(ctx: &mut VoiceCtx, tx: &mut SplitSink<WebSocket, Message>) {
    ctx.buffer.clear();
    send_event(tx, m::EV_LISTENING, json!({})).await;
}

pub fn handle_audio_chunk(ctx: &mut VoiceCtx, params: Option<Value>) {
    let Some(params) = params.and_then(|p| serde_json::from_value::<AudioChunkParams>(p).ok()) else {
        return;
    };
    if let Ok(mut bytes) = BASE64.decode(params.audio) {
        ctx.buffer.append(&mut bytes);
    }
}

pub async fn handle_audio_end(app: &Arc<AppState>, ctx: &mut VoiceCtx, session_key: &SessionKey, tx: &mut SplitSink<WebSocket, Message>) {
    send_event(tx, m::EV_PROCESSING, json!({})).await;

    let wav_bytes = std::mem::take(&mut ctx.buffer);
    let transcript = match app.stt.transcribe(&wav_bytes).await {
        Ok(t) => t,
        Err(e) => {
            send_event(tx, m::EV_ERROR, json!({ "message": e.to_string() })).await;
            return;
        }
    };
    send_event(tx, m::EV_TRANSCRIPT, json!({ "text": transcript })).await;

    if let Err(e) = app.sessions.add_message(session_key, MessageRole::User, &transcript).await {
        warn!(error = %e, "failed to record transcribed message");
    }

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

    send_event(tx, m::EV_THINKING, json!({})).await;

    let stream = match app.llm.chat_stream(&messages).await {
        Ok(s) => s,
        Err(e) => {
            send_event(tx, m::EV_ERROR, json!({ "message": e.to_string() })).await;
            return;
        }
    };
    tokio::pin!(stream);

    let (sentences_tx, sentences_rx) = mpsc::channel::<QueuedSentence>(16);
    let (chunks_tx, mut chunks_rx) = mpsc::channel(16);
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();

    let tts = Arc::clone(&app.tts);
    let drain_task = tokio::spawn(async move {
        tts.drain_response(sentences_rx, chunks_tx, done_tx).await;
    });

    let mut detector = SentenceDetector::new();
    let mut full_text = String::new();
    {
        use futures_util::StreamExt;
        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::TextDelta(delta) => {
                    full_text.push_str(&delta);
                    for sentence in detector.push(&delta) {
                        if sentences_tx.send(sentence).await.is_err() {
                            break;
                        }
                    }
                }
                StreamEvent::Done => break,
                StreamEvent::Error(e) => {
                    send_event(tx, m::EV_ERROR, json!({ "message": e })).await;
                    break;
                }
                _ => {}
            }
        }
    }
    if let Some(last) = detector.finish() {
        let _ = sentences_tx.send(last).await;
    }
    drop(sentences_tx);

    if let Err(e) = app.sessions.add_message(session_key, MessageRole::Assistant, &full_text).await {
        warn!(error = %e, "failed to record assistant voice reply");
    }

    while let Some(chunk) = chunks_rx.recv().await {
        let audio_b64 = BASE64.encode(&chunk.audio);
        send_event(
            tx,
            m::EV_TTS_CHUNK,
            json!({ "index": chunk.index, "contentType": chunk.content_type, "audio": audio_b64 }),
        )
        .await;
    }

    let _ = drain_task.await;
    let total_chunks = done_rx.await.map(|d| d.total_chunks).unwrap_or(0);
    send_event(tx, m::EV_TTS_DONE, json!({ "totalChunks": total_chunks })).await;
}
