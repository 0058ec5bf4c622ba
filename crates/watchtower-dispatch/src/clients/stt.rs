use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DispatchError, Result};

/// STT endpoint: accepts a WAV blob, returns a transcript (§6). One
/// configured backend per process; `watchtower-audio` owns the capture
/// pipeline that calls it.
#[async_trait]
pub trait SttClient: Send + Sync {
    async fn transcribe(&self, wav_bytes: &[u8]) -> Result<String>;
}

pub struct HttpSttClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSttClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl SttClient for HttpSttClient {
    async fn transcribe(&self, wav_bytes: &[u8]) -> Result<String> {
        let url = format!("{}/v1/transcribe", self.base_url);
        let part = reqwest::multipart::Part::bytes(wav_bytes.to_vec())
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| DispatchError::External(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let mut req = self.client.post(&url).multipart(form).timeout(Duration::from_secs(20));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await.map_err(|e| DispatchError::External(e.to_string()))?;
        let value: serde_json::Value = resp.json().await.map_err(|e| DispatchError::External(e.to_string()))?;
        value
            .get("text")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| DispatchError::External("malformed transcription response".to_string()))
    }
}
