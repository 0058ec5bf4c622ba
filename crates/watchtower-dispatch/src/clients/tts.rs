use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DispatchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsEngine {
    Primary,
    Fallback,
}

impl std::fmt::Display for TtsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TtsEngine::Primary => write!(f, "primary"),
            TtsEngine::Fallback => write!(f, "fallback"),
        }
    }
}

/// One TTS endpoint (§6). The pipeline instantiates two — primary and
/// fallback — and races them under its own deadlines (§4.6); this trait only
/// covers the wire contract of a single endpoint.
#[async_trait]
pub trait TtsClient: Send + Sync {
    /// Synthesize `text`, returning `(audio_bytes, content_type)`. The
    /// caller applies its own deadline via `tokio::time::timeout`.
    async fn synthesize(&self, text: &str) -> Result<(Vec<u8>, String)>;
}

pub struct HttpTtsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTtsClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl TtsClient for HttpTtsClient {
    async fn synthesize(&self, text: &str) -> Result<(Vec<u8>, String)> {
        let url = format!("{}/v1/tts", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "text": text }))
            .timeout(Duration::from_secs(30));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| DispatchError::External(e.to_string()))?;
        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/wav")
            .to_string();
        let bytes = resp.bytes().await.map_err(|e| DispatchError::External(e.to_string()))?;
        Ok((bytes.to_vec(), content_type))
    }
}
