use std::sync::Arc;

use async_trait::async_trait;
use watchtower_core::types::ActionTier;

use crate::clients::SmartHomeClient;
use crate::tools::{Tool, ToolResult};

/// `show_notification` — GREEN tier. Routed through the smart-home hub's
/// `notify` domain rather than a dedicated display client; homelab dashboards
/// (wall tablets, media players) are themselves smart-home entities.
pub struct ShowNotificationTool {
    smart_home: Arc<dyn SmartHomeClient>,
}

impl ShowNotificationTool {
    pub fn new(smart_home: Arc<dyn SmartHomeClient>) -> Self {
        Self { smart_home }
    }
}

#[async_trait]
impl Tool for ShowNotificationTool {
    fn name(&self) -> &str {
        "show_notification"
    }

    fn description(&self) -> &str {
        "Show a short notification on a configured display target"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target": { "type": "string" },
                "title": { "type": "string" },
                "message": { "type": "string" },
            },
            "required": ["target", "message"],
        })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Green
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let target = match input.get("target").and_then(|v| v.as_str()) {
            Some(t) => t,
            None => return ToolResult::error("missing 'target'"),
        };
        let message = match input.get("message").and_then(|v| v.as_str()) {
            Some(m) => m,
            None => return ToolResult::error("missing 'message'"),
        };
        let title = input.get("title").and_then(|v| v.as_str()).unwrap_or("Watchtower");
        let data = serde_json::json!({ "title": title, "message": message });
        match self.smart_home.call_service("notify", target, target, data).await {
            Ok(_) => ToolResult::success("notification sent"),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
