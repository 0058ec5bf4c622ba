use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use watchtower_core::types::ActionTier;
use watchtower_safety::node::sanitize_node_name;
use watchtower_safety::path::sanitize_path;
use watchtower_safety::secrets::is_secret_file;

use crate::clients::RemoteShellClient;
use crate::tools::{Tool, ToolResult};

/// `read_file` — GREEN tier. Still runs every path through `sanitize_path`
/// and `is_secret_file`; GREEN means no confirmation gate, not no checks.
pub struct ReadFileTool {
    shell: Arc<dyn RemoteShellClient>,
    allowed_base_dirs: Vec<String>,
}

impl ReadFileTool {
    pub fn new(shell: Arc<dyn RemoteShellClient>, allowed_base_dirs: Vec<String>) -> Self {
        Self { shell, allowed_base_dirs }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file from an allowed directory on a cluster node"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "node": { "type": "string" },
                "path": { "type": "string" },
            },
            "required": ["node", "path"],
        })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Green
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let node = match input.get("node").and_then(|v| v.as_str()) {
            Some(n) => n,
            None => return ToolResult::error("missing 'node'"),
        };
        let path = match input.get("path").and_then(|v| v.as_str()) {
            Some(p) => p,
            None => return ToolResult::error("missing 'path'"),
        };

        let node = match sanitize_node_name(node) {
            Ok(n) => n,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let secret = is_secret_file(path);
        if secret.blocked {
            return ToolResult::error(secret.reason.unwrap_or_else(|| "secret file".to_string()));
        }

        let check = sanitize_path(path, None, &self.allowed_base_dirs).await;
        let resolved = match check {
            watchtower_safety::path::PathCheck::Safe { resolved_path } => resolved_path,
            watchtower_safety::path::PathCheck::Unsafe { reason } => return ToolResult::error(reason),
        };

        let command = format!("cat -- '{}'", resolved.replace('\'', "'\\''"));
        match self.shell.run(&node, &command, Duration::from_secs(15)).await {
            Ok(result) if result.exit_code == 0 => ToolResult::success(result.stdout),
            Ok(result) => ToolResult::error(format!("exit {}: {}", result.exit_code, result.stderr)),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

/// `write_file` — YELLOW tier.
pub struct WriteFileTool {
    shell: Arc<dyn RemoteShellClient>,
    allowed_base_dirs: Vec<String>,
}

impl WriteFileTool {
    pub fn new(shell: Arc<dyn RemoteShellClient>, allowed_base_dirs: Vec<String>) -> Self {
        Self { shell, allowed_base_dirs }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text content to a file in an allowed directory on a cluster node"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "node": { "type": "string" },
                "path": { "type": "string" },
                "content": { "type": "string" },
            },
            "required": ["node", "path", "content"],
        })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Yellow
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let node = match input.get("node").and_then(|v| v.as_str()) {
            Some(n) => n,
            None => return ToolResult::error("missing 'node'"),
        };
        let path = match input.get("path").and_then(|v| v.as_str()) {
            Some(p) => p,
            None => return ToolResult::error("missing 'path'"),
        };
        let content = match input.get("content").and_then(|v| v.as_str()) {
            Some(c) => c,
            None => return ToolResult::error("missing 'content'"),
        };

        let node = match sanitize_node_name(node) {
            Ok(n) => n,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        let secret = is_secret_file(path);
        if secret.blocked {
            return ToolResult::error(secret.reason.unwrap_or_else(|| "secret file".to_string()));
        }

        let check = sanitize_path(path, None, &self.allowed_base_dirs).await;
        let resolved = match check {
            watchtower_safety::path::PathCheck::Safe { resolved_path } => resolved_path,
            watchtower_safety::path::PathCheck::Unsafe { reason } => return ToolResult::error(reason),
        };

        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, content.as_bytes());
        let command = format!("echo '{encoded}' | base64 -d > '{}'", resolved.replace('\'', "'\\''"));
        match self.shell.run(&node, &command, Duration::from_secs(15)).await {
            Ok(result) if result.exit_code == 0 => ToolResult::success(format!("wrote {} bytes to {resolved}", content.len())),
            Ok(result) => ToolResult::error(format!("exit {}: {}", result.exit_code, result.stderr)),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
