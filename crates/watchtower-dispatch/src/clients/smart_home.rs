use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DispatchError, Result};

/// Smart-home state/services REST (§6). Payloads are opaque to this spec
/// except where tool handlers parse specific named fields — so this trait
/// passes JSON through rather than modeling every entity domain.
#[async_trait]
pub trait SmartHomeClient: Send + Sync {
    async fn get_state(&self, entity_id: &str) -> Result<Value>;
    async fn call_service(&self, domain: &str, service: &str, entity_id: &str, data: Value) -> Result<()>;
}

pub struct HttpSmartHomeClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSmartHomeClient {
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
impl SmartHomeClient for HttpSmartHomeClient {
    async fn get_state(&self, entity_id: &str) -> Result<Value> {
        let url = format!("{}/api/states/{entity_id}", self.base_url);
        let resp = self
            .auth(self.client.get(&url))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        resp.json().await.map_err(|e| DispatchError::External(e.to_string()))
    }

    async fn call_service(&self, domain: &str, service: &str, entity_id: &str, mut data: Value) -> Result<()> {
        if let Some(obj) = data.as_object_mut() {
            obj.insert("entity_id".to_string(), Value::String(entity_id.to_string()));
        }
        let url = format!("{}/api/services/{domain}/{service}", self.base_url);
        self.auth(self.client.post(&url))
            .json(&data)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        Ok(())
    }
}
