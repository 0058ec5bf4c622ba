use std::sync::Arc;

use async_trait::async_trait;
use watchtower_core::types::ActionTier;

use crate::clients::HypervisorClient;
use crate::tools::{Tool, ToolResult};

pub struct ListNodesTool {
    hypervisor: Arc<dyn HypervisorClient>,
}

impl ListNodesTool {
    pub fn new(hypervisor: Arc<dyn HypervisorClient>) -> Self {
        Self { hypervisor }
    }
}

#[async_trait]
impl Tool for ListNodesTool {
    fn name(&self) -> &str {
        "list_nodes"
    }

    fn description(&self) -> &str {
        "List cluster nodes and their online/quorate status"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Green
    }

    async fn execute(&self, _input: serde_json::Value) -> ToolResult {
        match self.hypervisor.cluster_status().await {
            Ok(nodes) => match serde_json::to_string(&nodes) {
                Ok(json) => ToolResult::success(json),
                Err(e) => ToolResult::error(e.to_string()),
            },
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct ListVmsTool {
    hypervisor: Arc<dyn HypervisorClient>,
}

impl ListVmsTool {
    pub fn new(hypervisor: Arc<dyn HypervisorClient>) -> Self {
        Self { hypervisor }
    }
}

#[async_trait]
impl Tool for ListVmsTool {
    fn name(&self) -> &str {
        "list_vms"
    }

    fn description(&self) -> &str {
        "List VMs and containers across the cluster, optionally filtered by node"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "node": { "type": "string" } },
        })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Green
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let node_filter = match input.get("node").and_then(|v| v.as_str()) {
            Some(n) => match watchtower_safety::node::sanitize_node_name(n) {
                Ok(n) => Some(n),
                Err(e) => return ToolResult::error(e.to_string()),
            },
            None => None,
        };
        match self.hypervisor.list_resources(Some("vm")).await {
            Ok(resources) => {
                let filtered: Vec<_> = match node_filter {
                    Some(node) => resources.into_iter().filter(|r| r.node == node).collect(),
                    None => resources,
                };
                match serde_json::to_string(&filtered) {
                    Ok(json) => ToolResult::success(json),
                    Err(e) => ToolResult::error(e.to_string()),
                }
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
