use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use watchtower_core::types::ActionTier;
use watchtower_safety::command::sanitize_command;
use watchtower_safety::is_override_active;
use watchtower_safety::node::sanitize_node_name;

use crate::clients::RemoteShellClient;
use crate::tools::{Tool, ToolResult};

/// `run_command` — RED tier. `sanitize_command` runs inside the handler
/// itself (not just at dispatch time) so a denylisted command is rejected
/// even if a future caller invokes the tool outside the dispatcher.
pub struct RunCommandTool {
    shell: Arc<dyn RemoteShellClient>,
}

impl RunCommandTool {
    pub fn new(shell: Arc<dyn RemoteShellClient>) -> Self {
        Self { shell }
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command on a cluster node over a pooled SSH session"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "node": { "type": "string" },
                "command": { "type": "string" },
                "timeout_secs": { "type": "integer" },
            },
            "required": ["node", "command"],
        })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Red
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let node = match input.get("node").and_then(|v| v.as_str()) {
            Some(n) => n,
            None => return ToolResult::error("missing 'node'"),
        };
        let command = match input.get("command").and_then(|v| v.as_str()) {
            Some(c) => c,
            None => return ToolResult::error("missing 'command'"),
        };
        let timeout_secs = input.get("timeout_secs").and_then(|v| v.as_u64()).unwrap_or(30);

        let node = match sanitize_node_name(node) {
            Ok(n) => n,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let check = sanitize_command(command, is_override_active());
        if !check.is_safe() {
            return ToolResult::error(format!("command rejected: {check:?}"));
        }

        match self.shell.run(&node, command, Duration::from_secs(timeout_secs)).await {
            Ok(result) => {
                if result.exit_code == 0 {
                    ToolResult::success(result.stdout)
                } else {
                    ToolResult::error(format!("exit {}: {}", result.exit_code, result.stderr))
                }
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
