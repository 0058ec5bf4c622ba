use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

/// A single node/VM/container record from `cluster resources` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterResource {
    pub name: Option<String>,
    pub vmid: Option<u64>,
    pub node: String,
    pub status: String,
    pub cpu: Option<f64>,
    pub maxcpu: Option<u64>,
    pub mem: Option<u64>,
    pub maxmem: Option<u64>,
    pub disk: Option<u64>,
    pub maxdisk: Option<u64>,
    pub uptime: Option<u64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatus {
    pub node: String,
    pub online: bool,
    pub quorate: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    pub id: String,
    pub node: String,
    pub status: String,
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
    Reboot,
    Shutdown,
}

impl LifecycleAction {
    fn as_path_segment(self) -> &'static str {
        match self {
            LifecycleAction::Start => "start",
            LifecycleAction::Stop => "stop",
            LifecycleAction::Reboot => "reboot",
            LifecycleAction::Shutdown => "shutdown",
        }
    }
}

#[async_trait]
pub trait HypervisorClient: Send + Sync {
    async fn list_resources(&self, filter: Option<&str>) -> Result<Vec<ClusterResource>>;
    async fn cluster_status(&self) -> Result<Vec<NodeStatus>>;
    async fn vm_lifecycle(&self, node: &str, vmid: u64, action: LifecycleAction) -> Result<()>;
    async fn node_reboot(&self, node: &str) -> Result<()>;
    async fn vm_delete(&self, node: &str, vmid: u64) -> Result<()>;
    async fn list_tasks(&self, node: &str) -> Result<Vec<TaskEntry>>;
}

pub struct HttpHypervisorClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpHypervisorClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl HypervisorClient for HttpHypervisorClient {
    async fn list_resources(&self, filter: Option<&str>) -> Result<Vec<ClusterResource>> {
        let mut url = format!("{}/api2/json/cluster/resources", self.base_url);
        if let Some(f) = filter {
            url.push_str(&format!("?type={f}"));
        }
        let resp = self
            .client
            .get(&url)
            .header("Authorization", format!("PVEAPIToken={}", self.token))
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        let body: serde_json::Value = resp.json().await.map_err(|e| DispatchError::External(e.to_string()))?;
        let data = body.get("data").cloned().unwrap_or(serde_json::Value::Array(vec![]));
        serde_json::from_value(data).map_err(Into::into)
    }

    async fn cluster_status(&self) -> Result<Vec<NodeStatus>> {
        let url = format!("{}/api2/json/cluster/status", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", format!("PVEAPIToken={}", self.token))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        let body: serde_json::Value = resp.json().await.map_err(|e| DispatchError::External(e.to_string()))?;
        let data = body.get("data").cloned().unwrap_or(serde_json::Value::Array(vec![]));
        serde_json::from_value(data).map_err(Into::into)
    }

    async fn vm_lifecycle(&self, node: &str, vmid: u64, action: LifecycleAction) -> Result<()> {
        let url = format!(
            "{}/api2/json/nodes/{node}/qemu/{vmid}/status/{}",
            self.base_url,
            action.as_path_segment()
        );
        self.client
            .post(&url)
            .header("Authorization", format!("PVEAPIToken={}", self.token))
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        Ok(())
    }

    async fn node_reboot(&self, node: &str) -> Result<()> {
        let url = format!("{}/api2/json/nodes/{node}/status", self.base_url);
        self.client
            .post(&url)
            .header("Authorization", format!("PVEAPIToken={}", self.token))
            .json(&serde_json::json!({ "command": "reboot" }))
            .timeout(Duration::from_secs(15))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        Ok(())
    }

    async fn vm_delete(&self, node: &str, vmid: u64) -> Result<()> {
        let url = format!("{}/api2/json/nodes/{node}/qemu/{vmid}", self.base_url);
        self.client
            .delete(&url)
            .header("Authorization", format!("PVEAPIToken={}", self.token))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        Ok(())
    }

    async fn list_tasks(&self, node: &str) -> Result<Vec<TaskEntry>> {
        let url = format!("{}/api2/json/nodes/{node}/tasks", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", format!("PVEAPIToken={}", self.token))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| DispatchError::External(e.to_string()))?;
        let body: serde_json::Value = resp.json().await.map_err(|e| DispatchError::External(e.to_string()))?;
        let data = body.get("data").cloned().unwrap_or(serde_json::Value::Array(vec![]));
        serde_json::from_value(data).map_err(Into::into)
    }
}
