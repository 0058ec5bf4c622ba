use watchtower_core::types::{AutonomyLevel, Incident, IncidentType};

/// Immutable runbook record (§3 Runbook). The table is static; `lookup`
/// returns the first matching record.
pub struct Runbook {
    pub trigger: IncidentType,
    pub required_level: AutonomyLevel,
    pub tool: &'static str,
    pub verify_delay_secs: u64,
    pub build_args: fn(&Incident) -> serde_json::Value,
}

fn vmid_from_target(target: &str) -> Option<u64> {
    target.strip_prefix("vmid=")?.parse().ok()
}

fn vm_restart_args(incident: &Incident) -> serde_json::Value {
    let vmid = vmid_from_target(&incident.target).unwrap_or(0);
    serde_json::json!({ "node": incident.node, "vmid": vmid, "confirmed": true })
}

/// Static runbook table. Not every incident type has an automated response —
/// `NODE_UNREACHABLE` and the threshold conditions have no entry here, so
/// `lookup` falls through and the engine stops silently for them, per spec.
pub const RUNBOOKS: &[Runbook] = &[
    Runbook {
        trigger: IncidentType::VmCrashed,
        required_level: AutonomyLevel::ActReport,
        tool: "start_vm",
        verify_delay_secs: 15,
        build_args: vm_restart_args,
    },
    Runbook {
        trigger: IncidentType::CtCrashed,
        required_level: AutonomyLevel::ActReport,
        tool: "start_vm",
        verify_delay_secs: 15,
        build_args: vm_restart_args,
    },
];

pub fn lookup(kind: IncidentType) -> Option<&'static Runbook> {
    RUNBOOKS.iter().find(|r| r.trigger == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_first_match() {
        let rb = lookup(IncidentType::VmCrashed).unwrap();
        assert_eq!(rb.tool, "start_vm");
    }

    #[test]
    fn lookup_returns_none_for_conditions_without_a_runbook() {
        assert!(lookup(IncidentType::NodeUnreachable).is_none());
        assert!(lookup(IncidentType::DiskCritical).is_none());
    }

    #[test]
    fn build_args_extracts_vmid_from_target() {
        let incident = Incident {
            key: "VM_CRASHED:vmid=200".to_string(),
            kind: IncidentType::VmCrashed,
            target: "vmid=200".to_string(),
            node: "pve".to_string(),
            detected_at: chrono::Utc::now(),
            detail: String::new(),
        };
        let args = vm_restart_args(&incident);
        assert_eq!(args["vmid"], 200);
        assert_eq!(args["node"], "pve");
        assert_eq!(args["confirmed"], true);
    }
}
