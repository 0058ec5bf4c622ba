use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceEntry {
    pub id: String,
    pub name: String,
}

/// NVR snapshot/event/thumbnail/face-library REST (§6). Payloads opaque
/// except for the fields tool handlers touch.
#[async_trait]
pub trait NvrClient: Send + Sync {
    async fn snapshot(&self, camera: &str) -> Result<Vec<u8>>;
    async fn recent_events(&self, camera: Option<&str>) -> Result<Vec<Value>>;
    async fn thumbnail(&self, event_id: &str) -> Result<Vec<u8>>;
    async fn list_known_faces(&self) -> Result<Vec<FaceEntry>>;
}

pub struct HttpNvrClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpNvrClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }
}

#[async_trait]
impl NvrClient for HttpNvrClient {
    async fn snapshot(&self, camera: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/cameras/{camera}/snapshot", self.base_url);
        let resp = self
            .auth(self.client.get(&url))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        Ok(resp.bytes().await.map_err(|e| DispatchError::External(e.to_string()))?.to_vec())
    }

    async fn recent_events(&self, camera: Option<&str>) -> Result<Vec<Value>> {
        let mut url = format!("{}/api/events", self.base_url);
        if let Some(c) = camera {
            url.push_str(&format!("?camera={c}"));
        }
        let resp = self
            .auth(self.client.get(&url))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        resp.json().await.map_err(|e| DispatchError::External(e.to_string()))
    }

    async fn thumbnail(&self, event_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/events/{event_id}/thumbnail.jpg", self.base_url);
        let resp = self
            .auth(self.client.get(&url))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        Ok(resp.bytes().await.map_err(|e| DispatchError::External(e.to_string()))?.to_vec())
    }

    async fn list_known_faces(&self) -> Result<Vec<FaceEntry>> {
        let url = format!("{}/api/faces", self.base_url);
        let resp = self
            .auth(self.client.get(&url))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        resp.json().await.map_err(|e| DispatchError::External(e.to_string()))
    }
}
