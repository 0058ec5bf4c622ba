use serde_json::Value;

use crate::tables::{PROTECTED_SERVICES, PROTECTED_VMIDS};

#[derive(Debug, Clone)]
pub struct ProtectedCheck {
    pub protected: bool,
    pub reason: Option<String>,
}

/// `isProtectedResource` (§3, §4.1 step 2) — a tool call is protected-blocked
/// when any canonical argument key (`vmid`/`id`, `service`, or a `command`
/// string containing a protected service name) matches the closed table.
pub fn is_protected_resource(args: &Value) -> ProtectedCheck {
    let obj = match args.as_object() {
        Some(o) => o,
        None => {
            return ProtectedCheck {
                protected: false,
                reason: None,
            }
        }
    };

    for key in ["vmid", "id"] {
        if let Some(v) = obj.get(key) {
            let as_str = value_as_comparable_string(v);
            if PROTECTED_VMIDS.iter().any(|p| *p == as_str) {
                return ProtectedCheck {
                    protected: true,
                    reason: Some(format!("vmid {as_str} is a protected management resource")),
                };
            }
        }
    }

    if let Some(service) = obj.get("service").and_then(|v| v.as_str()) {
        if PROTECTED_SERVICES.iter().any(|p| *p == service) {
            return ProtectedCheck {
                protected: true,
                reason: Some(format!("service '{service}' hosts the control plane itself")),
            };
        }
    }

    if let Some(cmd) = obj.get("command").and_then(|v| v.as_str()) {
        let lower = cmd.to_lowercase();
        for service in PROTECTED_SERVICES {
            if lower.contains(&service.to_lowercase()) {
                return ProtectedCheck {
                    protected: true,
                    reason: Some(format!(
                        "command references the protected service '{service}'"
                    )),
                };
            }
        }
    }

    ProtectedCheck {
        protected: false,
        reason: None,
    }
}

fn value_as_comparable_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blocks_protected_vmid_numeric_or_string() {
        assert!(is_protected_resource(&json!({"vmid": 103})).protected);
        assert!(is_protected_resource(&json!({"vmid": "103"})).protected);
    }

    #[test]
    fn blocks_protected_service() {
        assert!(is_protected_resource(&json!({"service": "pve-cluster"})).protected);
    }

    #[test]
    fn blocks_command_naming_protected_service() {
        assert!(is_protected_resource(&json!({"command": "systemctl restart pvedaemon"})).protected);
    }

    #[test]
    fn allows_unrelated_vmid() {
        assert!(!is_protected_resource(&json!({"vmid": 200})).protected);
    }
}
