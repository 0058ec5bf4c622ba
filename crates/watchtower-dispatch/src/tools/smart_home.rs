use std::sync::Arc;

use async_trait::async_trait;
use watchtower_core::types::ActionTier;

use crate::clients::SmartHomeClient;
use crate::tools::{Tool, ToolResult};

pub struct SetClimateTool {
    smart_home: Arc<dyn SmartHomeClient>,
}

impl SetClimateTool {
    pub fn new(smart_home: Arc<dyn SmartHomeClient>) -> Self {
        Self { smart_home }
    }
}

#[async_trait]
impl Tool for SetClimateTool {
    fn name(&self) -> &str {
        "set_climate"
    }

    fn description(&self) -> &str {
        "Set a thermostat's target temperature or mode"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "entity_id": { "type": "string" },
                "temperature": { "type": "number" },
            },
            "required": ["entity_id", "temperature"],
        })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Yellow
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let entity_id = match input.get("entity_id").and_then(|v| v.as_str()) {
            Some(e) => e,
            None => return ToolResult::error("missing 'entity_id'"),
        };
        let data = serde_json::json!({ "temperature": input.get("temperature") });
        match self.smart_home.call_service("climate", "set_temperature", entity_id, data).await {
            Ok(_) => ToolResult::success(format!("{entity_id} climate updated")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct LockDoorTool {
    smart_home: Arc<dyn SmartHomeClient>,
}

impl LockDoorTool {
    pub fn new(smart_home: Arc<dyn SmartHomeClient>) -> Self {
        Self { smart_home }
    }
}

#[async_trait]
impl Tool for LockDoorTool {
    fn name(&self) -> &str {
        "lock_door"
    }

    fn description(&self) -> &str {
        "Lock or unlock a smart lock entity"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "entity_id": { "type": "string" },
                "locked": { "type": "boolean" },
            },
            "required": ["entity_id", "locked"],
        })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Red
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let entity_id = match input.get("entity_id").and_then(|v| v.as_str()) {
            Some(e) => e,
            None => return ToolResult::error("missing 'entity_id'"),
        };
        let locked = input.get("locked").and_then(|v| v.as_bool()).unwrap_or(true);
        let service = if locked { "lock" } else { "unlock" };
        match self.smart_home.call_service("lock", service, entity_id, serde_json::json!({})).await {
            Ok(_) => ToolResult::success(format!("{entity_id} {service}ed")),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
