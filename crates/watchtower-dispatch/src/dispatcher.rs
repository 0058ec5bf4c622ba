use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;
use watchtower_core::types::ActionTier;
use watchtower_safety::{run_with_context, SafetyKernel};

use crate::tools::{ToolRegistry, ToolResult};

/// Who invoked `execute_tool` (§6: "caller ∈ {api, monitor, voice, chat}").
/// Carried through for audit/logging only; it has no bearing on the safety
/// decision itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Api,
    Monitor,
    Voice,
    Chat,
}

impl std::fmt::Display for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Caller::Api => "api",
            Caller::Monitor => "monitor",
            Caller::Voice => "voice",
            Caller::Chat => "chat",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub content: Option<String>,
    pub is_error: bool,
    pub blocked: bool,
    pub reason: Option<String>,
    pub tier: ActionTier,
}

impl DispatchResult {
    fn blocked(tier: ActionTier, reason: impl Into<String>) -> Self {
        Self {
            content: None,
            is_error: false,
            blocked: true,
            reason: Some(reason.into()),
            tier,
        }
    }

    fn from_tool_result(tier: ActionTier, result: ToolResult) -> Self {
        Self {
            content: Some(result.content),
            is_error: result.is_error,
            blocked: false,
            reason: None,
            tier,
        }
    }
}

/// The Tool Dispatcher (C2). Owns the tool catalog; defers every safety
/// decision to the [`SafetyKernel`] rather than re-implementing it.
pub struct Dispatcher {
    registry: ToolRegistry,
    kernel: Arc<SafetyKernel>,
}

impl Dispatcher {
    pub fn new(kernel: Arc<SafetyKernel>) -> Self {
        Self {
            registry: ToolRegistry::new(),
            kernel,
        }
    }

    /// `registerTool` — static, called once per tool at startup. Registers
    /// the tool's tier with the kernel in the same call so the two tables
    /// never drift apart.
    pub fn register_tool(&mut self, tool: Arc<dyn crate::tools::Tool>) {
        self.kernel.register_tool_tier(tool.name(), tool.tier());
        self.registry.register(tool);
    }

    /// `listTools`.
    pub fn list_tools(&self) -> Vec<crate::tools::ToolDefinition> {
        self.registry.definitions()
    }

    /// `executeTool` (§4.2's six-step pipeline).
    #[instrument(skip(self, args), fields(tool = %name, caller = %caller))]
    pub async fn execute_tool(&self, name: &str, args: Value, caller: Caller, override_active: bool) -> DispatchResult {
        // 1. Lookup.
        let tool = match self.registry.get(name) {
            Ok(t) => t,
            Err(_) => return DispatchResult::blocked(ActionTier::Black, "not found"),
        };

        // 2 & 3. Override context is already resolved by the caller;
        // checkSafety is a pure function of it plus the args.
        let confirmed = args.get("confirmed").and_then(|v| v.as_bool()).unwrap_or(false);
        let decision = self.kernel.check_safety(name, &args, confirmed, override_active);
        if !decision.allowed {
            return DispatchResult::blocked(decision.tier, decision.reason.unwrap_or_default());
        }

        // 4. ORANGE's keyword is already checked inside checkSafety; nothing
        // further required here.

        // 5. Invoke the handler. Tool::execute never panics-as-control-flow
        // in this codebase, but `run_with_context` still scopes the override
        // flag for any nested helper (e.g. sanitize_command inside a
        // handler) that reads it ambiently rather than receiving it as an
        // argument.
        let result = run_with_context(override_active, tool.execute(args)).await;

        // 6. Post-execute push is the caller's responsibility (REST route /
        // WS broadcaster); this layer only returns the outcome.
        DispatchResult::from_tool_result(decision.tier, result)
    }
}
