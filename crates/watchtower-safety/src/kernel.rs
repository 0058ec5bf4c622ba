use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use rusqlite::Connection;
use serde_json::Value;
use tracing::instrument;
use watchtower_core::types::ActionTier;

use crate::audit::log_safety_audit;
use crate::protected::is_protected_resource;

#[derive(Debug, Clone)]
pub struct SafetyDecision {
    pub allowed: bool,
    pub reason: Option<String>,
    pub tier: ActionTier,
}

impl SafetyDecision {
    fn allow(tier: ActionTier) -> Self {
        Self {
            allowed: true,
            reason: None,
            tier,
        }
    }

    fn deny(tier: ActionTier, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            tier,
        }
    }
}

/// The Safety Kernel (C1). Every public operation in the plane crosses this
/// — it is compact but pervasive, per spec.md §2's share table.
pub struct SafetyKernel {
    tiers: RwLock<HashMap<String, ActionTier>>,
    approval_keyword: String,
    allowed_base_dirs: Vec<String>,
    db: Arc<Mutex<Connection>>,
}

impl SafetyKernel {
    pub fn new(approval_keyword: String, allowed_base_dirs: Vec<String>, db: Arc<Mutex<Connection>>) -> Self {
        Self {
            tiers: RwLock::new(HashMap::new()),
            approval_keyword,
            allowed_base_dirs,
            db,
        }
    }

    pub fn allowed_base_dirs(&self) -> &[String] {
        &self.allowed_base_dirs
    }

    /// Called once at startup per registered tool (§9 "registering runbooks
    /// and tools at startup from leaf tables").
    pub fn register_tool_tier(&self, name: &str, tier: ActionTier) {
        self.tiers.write().unwrap().insert(name.to_string(), tier);
    }

    /// `getToolTier` — unknown names return BLACK (fail-safe).
    pub fn get_tool_tier(&self, name: &str) -> ActionTier {
        self.tiers
            .read()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(ActionTier::Black)
    }

    /// `validateApprovalKeyword` — case-insensitive, whitespace-trimmed.
    pub fn validate_approval_keyword(&self, given: &str) -> bool {
        given.trim().eq_ignore_ascii_case(self.approval_keyword.trim())
    }

    /// `checkSafety` (§4.1 evaluation algorithm, in order).
    #[instrument(skip(self, args), fields(tool = %tool))]
    pub fn check_safety(
        &self,
        tool: &str,
        args: &Value,
        confirmed: bool,
        override_active: bool,
    ) -> SafetyDecision {
        // 1. Tier lookup.
        let tier = self.get_tool_tier(tool);

        // 2. Protected-resource check.
        let protected = is_protected_resource(args);
        if protected.protected && !override_active {
            let reason = protected
                .reason
                .unwrap_or_else(|| "protected resource".to_string());
            let decision = SafetyDecision::deny(tier, reason.clone());
            self.audit("checkSafety", tool, &decision);
            return decision;
        }

        // 3. Active override allows everything (BLACK/RED/ORANGE alike), but
        // is itself audited.
        if override_active {
            let decision = SafetyDecision::allow(tier);
            self.audit("checkSafety.override", tool, &decision);
            return decision;
        }

        // 4. BLACK is forbidden by default.
        if tier == ActionTier::Black {
            let decision = SafetyDecision::deny(tier, format!("tool '{tool}' is BLACK-tier (forbidden without an override)"));
            self.audit("checkSafety", tool, &decision);
            return decision;
        }

        // 5. ORANGE requires the approval keyword.
        if tier == ActionTier::Orange {
            let keyword_ok = args
                .get("keyword")
                .and_then(|v| v.as_str())
                .map(|k| self.validate_approval_keyword(k))
                .unwrap_or(false);
            let decision = if keyword_ok {
                SafetyDecision::allow(tier)
            } else {
                SafetyDecision::deny(tier, "ORANGE tier requires the approval keyword")
            };
            if !decision.allowed {
                self.audit("checkSafety", tool, &decision);
            }
            return decision;
        }

        // 6. RED requires confirmed=true.
        if tier == ActionTier::Red {
            let decision = if confirmed {
                SafetyDecision::allow(tier)
            } else {
                SafetyDecision::deny(tier, "RED tier requires confirmed=true")
            };
            if !decision.allowed {
                self.audit("checkSafety", tool, &decision);
            }
            return decision;
        }

        // 7. YELLOW/GREEN: allow.
        if tier == ActionTier::Yellow || tier == ActionTier::Green {
            return SafetyDecision::allow(tier);
        }

        // 8. Fail-safe (unreachable with the current enum; kept as an
        // explicit otherwise-branch rather than an unchecked assumption).
        let decision = SafetyDecision::deny(tier, "unrecognized tier");
        self.audit("checkSafety", tool, &decision);
        decision
    }

    fn audit(&self, action: &str, tool: &str, decision: &SafetyDecision) {
        let details = serde_json::json!({
            "tool": tool,
            "tier": decision.tier.to_string(),
            "allowed": decision.allowed,
            "reason": decision.reason,
        });
        match self.db.lock() {
            Ok(conn) => log_safety_audit(&conn, action, &details),
            Err(_) => tracing::warn!(%action, %tool, "safety db mutex poisoned, audit dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kernel() -> SafetyKernel {
        let conn = Connection::open_in_memory().unwrap();
        watchtower_core::db::init_core_db(&conn).unwrap();
        let k = SafetyKernel::new(
            "execute order 66".to_string(),
            vec!["/mnt/storage".to_string()],
            Arc::new(Mutex::new(conn)),
        );
        k.register_tool_tier("reboot_node", ActionTier::Black);
        k.register_tool_tier("stop_vm", ActionTier::Red);
        k.register_tool_tier("delete_vm", ActionTier::Orange);
        k.register_tool_tier("list_nodes", ActionTier::Green);
        k
    }

    #[test]
    fn unknown_tool_is_black() {
        let k = kernel();
        assert_eq!(k.get_tool_tier("does_not_exist"), ActionTier::Black);
    }

    #[test]
    fn black_tier_blocked_without_override() {
        let k = kernel();
        let d = k.check_safety("reboot_node", &json!({"node": "Home"}), false, false);
        assert!(!d.allowed);
        assert_eq!(d.tier, ActionTier::Black);
        assert!(d.reason.unwrap().contains("BLACK"));
    }

    #[test]
    fn red_requires_confirmation() {
        let k = kernel();
        let unconfirmed = k.check_safety("stop_vm", &json!({"node":"Home","vmid":200}), false, false);
        assert!(!unconfirmed.allowed);
        assert!(unconfirmed.reason.unwrap().contains("confirmed"));

        let confirmed = k.check_safety("stop_vm", &json!({"node":"Home","vmid":200}), true, false);
        assert!(confirmed.allowed);
    }

    #[test]
    fn protected_resource_overrides_confirmation() {
        let k = kernel();
        let d = k.check_safety("stop_vm", &json!({"node":"pve","vmid":103}), true, false);
        assert!(!d.allowed);
        assert!(d.reason.unwrap().contains("103"));
    }

    #[test]
    fn override_allows_black_and_protected() {
        let k = kernel();
        let d = k.check_safety("reboot_node", &json!({"node":"Home"}), false, true);
        assert!(d.allowed);

        let d2 = k.check_safety("stop_vm", &json!({"node":"pve","vmid":103}), false, true);
        assert!(d2.allowed);
    }

    #[test]
    fn orange_requires_keyword() {
        let k = kernel();
        let missing = k.check_safety("delete_vm", &json!({"vmid": 200}), true, false);
        assert!(!missing.allowed);

        let wrong = k.check_safety("delete_vm", &json!({"vmid": 200, "keyword": "nope"}), true, false);
        assert!(!wrong.allowed);

        let right = k.check_safety(
            "delete_vm",
            &json!({"vmid": 200, "keyword": "  Execute Order 66  "}),
            true,
            false,
        );
        assert!(right.allowed);
    }

    #[test]
    fn green_always_allowed() {
        let k = kernel();
        let d = k.check_safety("list_nodes", &json!({}), false, false);
        assert!(d.allowed);
    }
}
