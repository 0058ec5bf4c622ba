use std::sync::Arc;

use async_trait::async_trait;
use watchtower_core::types::ActionTier;
use watchtower_safety::node::sanitize_node_name;

use crate::clients::{HypervisorClient, LifecycleAction};
use crate::tools::{Tool, ToolResult};

fn node_vmid(input: &serde_json::Value) -> Result<(String, u64), ToolResult> {
    let node = input
        .get("node")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolResult::error("missing 'node'"))?;
    let node = sanitize_node_name(node).map_err(|e| ToolResult::error(e.to_string()))?;
    let vmid = input
        .get("vmid")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ToolResult::error("missing 'vmid'"))?;
    Ok((node, vmid))
}

macro_rules! lifecycle_tool {
    ($struct_name:ident, $name:literal, $desc:literal, $tier:expr, $action:expr) => {
        pub struct $struct_name {
            hypervisor: Arc<dyn HypervisorClient>,
        }

        impl $struct_name {
            pub fn new(hypervisor: Arc<dyn HypervisorClient>) -> Self {
                Self { hypervisor }
            }
        }

        #[async_trait]
        impl Tool for $struct_name {
            fn name(&self) -> &str {
                $name
            }

            fn description(&self) -> &str {
                $desc
            }

            fn input_schema(&self) -> serde_json::Value {
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "node": { "type": "string" },
                        "vmid": { "type": "integer" },
                    },
                    "required": ["node", "vmid"],
                })
            }

            fn tier(&self) -> ActionTier {
                $tier
            }

            async fn execute(&self, input: serde_json::Value) -> ToolResult {
                let (node, vmid) = match node_vmid(&input) {
                    Ok(pair) => pair,
                    Err(result) => return result,
                };
                match self.hypervisor.vm_lifecycle(&node, vmid, $action).await {
                    Ok(()) => ToolResult::success(format!("{} {node}/{vmid} accepted", $name)),
                    Err(e) => ToolResult::error(e.to_string()),
                }
            }
        }
    };
}

lifecycle_tool!(StartVmTool, "start_vm", "Start a stopped VM or container", ActionTier::Yellow, LifecycleAction::Start);
lifecycle_tool!(StopVmTool, "stop_vm", "Forcefully stop a running VM or container", ActionTier::Red, LifecycleAction::Stop);
lifecycle_tool!(RebootVmTool, "reboot_vm", "Reboot a VM or container", ActionTier::Red, LifecycleAction::Reboot);

pub struct DeleteVmTool {
    hypervisor: Arc<dyn HypervisorClient>,
}

impl DeleteVmTool {
    pub fn new(hypervisor: Arc<dyn HypervisorClient>) -> Self {
        Self { hypervisor }
    }
}

#[async_trait]
impl Tool for DeleteVmTool {
    fn name(&self) -> &str {
        "delete_vm"
    }

    fn description(&self) -> &str {
        "Permanently delete a VM or container (requires the approval keyword)"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "node": { "type": "string" },
                "vmid": { "type": "integer" },
                "keyword": { "type": "string" },
            },
            "required": ["node", "vmid", "keyword"],
        })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Orange
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let (node, vmid) = match node_vmid(&input) {
            Ok(pair) => pair,
            Err(result) => return result,
        };
        match self.hypervisor.vm_delete(&node, vmid).await {
            Ok(()) => ToolResult::success(format!("delete_vm {node}/{vmid} accepted")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct RebootNodeTool {
    hypervisor: Arc<dyn HypervisorClient>,
}

impl RebootNodeTool {
    pub fn new(hypervisor: Arc<dyn HypervisorClient>) -> Self {
        Self { hypervisor }
    }
}

#[async_trait]
impl Tool for RebootNodeTool {
    fn name(&self) -> &str {
        "reboot_node"
    }

    fn description(&self) -> &str {
        "Reboot an entire hypervisor node (forbidden without an operator override)"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "node": { "type": "string" } },
            "required": ["node"],
        })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Black
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let node = match input.get("node").and_then(|v| v.as_str()) {
            Some(n) => n,
            None => return ToolResult::error("missing 'node'"),
        };
        let node = match sanitize_node_name(node) {
            Ok(n) => n,
            Err(e) => return ToolResult::error(e.to_string()),
        };
        match self.hypervisor.node_reboot(&node).await {
            Ok(()) => ToolResult::success(format!("reboot_node {node} accepted")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
