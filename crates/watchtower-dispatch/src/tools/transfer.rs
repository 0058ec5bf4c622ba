use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use watchtower_core::types::ActionTier;
use watchtower_safety::node::sanitize_node_name;
use watchtower_safety::path::{sanitize_path, PathCheck};
use watchtower_safety::url::{validate_url, UrlCheck};

use crate::clients::RemoteShellClient;
use crate::tools::{Tool, ToolResult};

/// `download_file` — YELLOW tier. Both the source URL and destination path
/// are validated before the remote fetch runs.
pub struct DownloadFileTool {
    shell: Arc<dyn RemoteShellClient>,
    allowed_base_dirs: Vec<String>,
}

impl DownloadFileTool {
    pub fn new(shell: Arc<dyn RemoteShellClient>, allowed_base_dirs: Vec<String>) -> Self {
        Self { shell, allowed_base_dirs }
    }
}

#[async_trait]
impl Tool for DownloadFileTool {
    fn name(&self) -> &str {
        "download_file"
    }

    fn description(&self) -> &str {
        "Download a URL to a file in an allowed directory on a cluster node"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "node": { "type": "string" },
                "url": { "type": "string" },
                "dest_path": { "type": "string" },
            },
            "required": ["node", "url", "dest_path"],
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
        let url = match input.get("url").and_then(|v| v.as_str()) {
            Some(u) => u,
            None => return ToolResult::error("missing 'url'"),
        };
        let dest_path = match input.get("dest_path").and_then(|v| v.as_str()) {
            Some(p) => p,
            None => return ToolResult::error("missing 'dest_path'"),
        };

        let node = match sanitize_node_name(node) {
            Ok(n) => n,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        match validate_url(url).await {
            UrlCheck::Safe { .. } => {}
            UrlCheck::Unsafe { reason } => return ToolResult::error(reason),
        }

        let resolved = match sanitize_path(dest_path, None, &self.allowed_base_dirs).await {
            PathCheck::Safe { resolved_path } => resolved_path,
            PathCheck::Unsafe { reason } => return ToolResult::error(reason),
        };

        let command = format!(
            "curl -fsSL --max-time 120 -o '{}' '{}'",
            resolved.replace('\'', "'\\''"),
            url.replace('\'', "'\\''")
        );
        match self.shell.run(&node, &command, Duration::from_secs(130)).await {
            Ok(result) if result.exit_code == 0 => ToolResult::success(format!("downloaded to {resolved}")),
            Ok(result) => ToolResult::error(format!("exit {}: {}", result.exit_code, result.stderr)),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
