//! Tool catalog for the autonomy surface (§3 Tool, §9 Design Notes grouping:
//! cluster, lifecycle, system, files, transfer, smart home, display, face).
//!
//! Each tool is a small `Tool` impl carrying its own fixed [`ActionTier`];
//! the dispatcher is the only place that consults the tier, so a tool's
//! `execute` never needs to reason about safety itself.

pub mod cluster;
pub mod display;
pub mod face;
pub mod files;
pub mod lifecycle;
pub mod smart_home;
pub mod system;
pub mod transfer;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use watchtower_core::types::ActionTier;

use crate::error::{DispatchError, Result};

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }
}

/// Trait every dispatchable tool implements.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> serde_json::Value;
    fn tier(&self) -> ActionTier;
    async fn execute(&self, input: serde_json::Value) -> ToolResult;
}

/// Name + description + schema, for `GET /api/tools` (§6).
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
    pub tier: ActionTier,
}

/// The catalog of registered tools, keyed by name.
///
/// Owns no safety state: the kernel's own `tiers` table (populated by
/// `register_tool_tier` alongside this registry) is what `checkSafety`
/// actually consults. This registry exists purely so the dispatcher can
/// look a tool up by name and invoke it.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::NotFound(name.to_string()))
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
                tier: t.tier(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}
