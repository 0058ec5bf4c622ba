use std::sync::Arc;

use async_trait::async_trait;
use watchtower_core::types::ActionTier;

use crate::clients::NvrClient;
use crate::tools::{Tool, ToolResult};

/// `recognize_face` — GREEN tier. The NVR tags its own events with
/// recognized identities; this tool just surfaces the most recent match for
/// a camera rather than running recognition itself.
pub struct RecognizeFaceTool {
    nvr: Arc<dyn NvrClient>,
}

impl RecognizeFaceTool {
    pub fn new(nvr: Arc<dyn NvrClient>) -> Self {
        Self { nvr }
    }
}

#[async_trait]
impl Tool for RecognizeFaceTool {
    fn name(&self) -> &str {
        "recognize_face"
    }

    fn description(&self) -> &str {
        "Report the most recent recognized face event for a camera"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "camera": { "type": "string" } },
            "required": ["camera"],
        })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Green
    }

    async fn execute(&self, input: serde_json::Value) -> ToolResult {
        let camera = match input.get("camera").and_then(|v| v.as_str()) {
            Some(c) => c,
            None => return ToolResult::error("missing 'camera'"),
        };
        match self.nvr.recent_events(Some(camera)).await {
            Ok(events) => {
                let faces: Vec<_> = events
                    .iter()
                    .filter_map(|e| e.get("recognized_face"))
                    .cloned()
                    .collect();
                match serde_json::to_string(&faces) {
                    Ok(json) => ToolResult::success(json),
                    Err(e) => ToolResult::error(e.to_string()),
                }
            }
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

pub struct ListKnownFacesTool {
    nvr: Arc<dyn NvrClient>,
}

impl ListKnownFacesTool {
    pub fn new(nvr: Arc<dyn NvrClient>) -> Self {
        Self { nvr }
    }
}

#[async_trait]
impl Tool for ListKnownFacesTool {
    fn name(&self) -> &str {
        "list_known_faces"
    }

    fn description(&self) -> &str {
        "List faces the NVR's face library can currently recognize"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    fn tier(&self) -> ActionTier {
        ActionTier::Green
    }

    async fn execute(&self, _input: serde_json::Value) -> ToolResult {
        match self.nvr.list_known_faces().await {
            Ok(faces) => match serde_json::to_string(&faces) {
                Ok(json) => ToolResult::success(json),
                Err(e) => ToolResult::error(e.to_string()),
            },
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
