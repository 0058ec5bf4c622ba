use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Parsed SSE chat-completion event.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta(String),
    Thinking(String),
    ToolUse { name: String, input: serde_json::Value },
    Done,
    Error(String),
}

pub type ChatStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// LLM chat-completions (streaming + non-streaming) and `tokenize` (§6).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<ChatStream>;
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
    async fn tokenize(&self, text: &str) -> Result<usize>;
}

pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<ChatStream> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;

        let byte_stream = resp.bytes_stream();
        let events = byte_stream.filter_map(|chunk| async move {
            let chunk = chunk.ok()?;
            let text = String::from_utf8_lossy(&chunk).to_string();
            parse_sse_line(&text)
        });
        Ok(Box::pin(events))
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(Duration::from_secs(60))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        let value: serde_json::Value = resp.json().await.map_err(|e| DispatchError::External(e.to_string()))?;
        value
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| DispatchError::External("malformed chat completion response".to_string()))
    }

    async fn tokenize(&self, text: &str) -> Result<usize> {
        let url = format!("{}/v1/tokenize", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "text": text }))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        let value: serde_json::Value = resp.json().await.map_err(|e| DispatchError::External(e.to_string()))?;
        value
            .get("count")
            .and_then(|c| c.as_u64())
            .map(|c| c as usize)
            .ok_or_else(|| DispatchError::External("malformed tokenize response".to_string()))
    }
}

fn parse_sse_line(raw: &str) -> Option<StreamEvent> {
    let data = raw.strip_prefix("data: ")?.trim();
    if data == "[DONE]" {
        return Some(StreamEvent::Done);
    }
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    if let Some(delta) = value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
    {
        if let Some(text) = delta.get("content").and_then(|c| c.as_str()) {
            return Some(StreamEvent::TextDelta(text.to_string()));
        }
        if let Some(thinking) = delta.get("thinking").and_then(|c| c.as_str()) {
            return Some(StreamEvent::Thinking(thinking.to_string()));
        }
        if let Some(tool_calls) = delta.get("tool_calls").and_then(|t| t.as_array()) {
            if let Some(first) = tool_calls.first() {
                let name = first
                    .get("function")
                    .and_then(|f| f.get("name"))
                    .and_then(|n| n.as_str())
                    .unwrap_or_default()
                    .to_string();
                let input = first
                    .get("function")
                    .and_then(|f| f.get("arguments"))
                    .cloned()
                    .unwrap_or(serde_json::Value::Null);
                return Some(StreamEvent::ToolUse { name, input });
            }
        }
    }
    None
}
