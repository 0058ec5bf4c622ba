use std::collections::HashMap;

use chrono::Utc;
use watchtower_core::types::{Incident, IncidentType};

use crate::types::{NodeObservation, VmKind, VmObservation};

#[derive(Debug, Clone)]
struct NodeState {
    online: bool,
    last_seen: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct VmState {
    running: bool,
    node: String,
    kind: VmKind,
    last_seen: chrono::DateTime<Utc>,
}

/// State Tracker (§4.3). The first observation of any entity seeds state
/// without emitting a change — there is nothing to compare it against yet.
#[derive(Default)]
pub struct StateTracker {
    nodes: HashMap<String, NodeState>,
    vms: HashMap<u64, VmState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs a fresh batch of node observations against stored state,
    /// returning `NODE_UNREACHABLE` incidents for online→offline transitions.
    /// Offline→online recoveries update state silently; they are not
    /// incidents.
    pub fn update_nodes(&mut self, observations: &[NodeObservation]) -> Vec<Incident> {
        let now = Utc::now();
        let mut incidents = Vec::new();

        for obs in observations {
            match self.nodes.get_mut(&obs.name) {
                None => {
                    self.nodes.insert(
                        obs.name.clone(),
                        NodeState {
                            online: obs.online,
                            last_seen: now,
                        },
                    );
                }
                Some(state) => {
                    if state.online && !obs.online {
                        let target = format!("node={}", obs.name);
                        incidents.push(Incident {
                            key: Incident::key_for(IncidentType::NodeUnreachable, &target),
                            kind: IncidentType::NodeUnreachable,
                            target,
                            node: obs.name.clone(),
                            detected_at: now,
                            detail: format!("node '{}' went offline", obs.name),
                        });
                    }
                    state.online = obs.online;
                    state.last_seen = now;
                }
            }
        }

        incidents
    }

    /// Diffs VM/container observations, emitting `VM_CRASHED`/`CT_CRASHED`
    /// (by kind) on running→stopped transitions.
    pub fn update_vms(&mut self, observations: &[VmObservation]) -> Vec<Incident> {
        let now = Utc::now();
        let mut incidents = Vec::new();

        for obs in observations {
            match self.vms.get_mut(&obs.id) {
                None => {
                    self.vms.insert(
                        obs.id,
                        VmState {
                            running: obs.running,
                            node: obs.node.clone(),
                            kind: obs.kind,
                            last_seen: now,
                        },
                    );
                }
                Some(state) => {
                    if state.running && !obs.running {
                        let target = format!("vmid={}", obs.id);
                        let kind = match obs.kind {
                            VmKind::Qemu => IncidentType::VmCrashed,
                            VmKind::Lxc => IncidentType::CtCrashed,
                        };
                        incidents.push(Incident {
                            key: Incident::key_for(kind, &target),
                            kind,
                            target,
                            node: obs.node.clone(),
                            detected_at: now,
                            detail: format!("{:?} {} stopped unexpectedly on node '{}'", obs.kind, obs.id, obs.node),
                        });
                    }
                    state.running = obs.running;
                    state.node = obs.node.clone();
                    state.kind = obs.kind;
                    state.last_seen = now;
                }
            }
        }

        incidents
    }

    pub fn node_last_seen(&self, name: &str) -> Option<chrono::DateTime<Utc>> {
        self.nodes.get(name).map(|s| s.last_seen)
    }

    pub fn vm_last_seen(&self, id: u64) -> Option<chrono::DateTime<Utc>> {
        self.vms.get(&id).map(|s| s.last_seen)
    }

    pub fn is_node_online(&self, name: &str) -> Option<bool> {
        self.nodes.get(name).map(|s| s.online)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, online: bool) -> NodeObservation {
        NodeObservation {
            name: name.to_string(),
            online,
            cpu_fraction: Some(0.1),
            mem_fraction: Some(0.1),
            disk_fraction: Some(0.1),
        }
    }

    fn vm(id: u64, node: &str, kind: VmKind, running: bool) -> VmObservation {
        VmObservation {
            id,
            node: node.to_string(),
            kind,
            running,
        }
    }

    #[test]
    fn first_observation_seeds_without_incident() {
        let mut t = StateTracker::new();
        let incidents = t.update_nodes(&[node("pve", true)]);
        assert!(incidents.is_empty());
        assert_eq!(t.is_node_online("pve"), Some(true));
    }

    #[test]
    fn node_going_offline_emits_node_unreachable() {
        let mut t = StateTracker::new();
        t.update_nodes(&[node("pve", true)]);
        let incidents = t.update_nodes(&[node("pve", false)]);
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].kind, IncidentType::NodeUnreachable);
        assert_eq!(incidents[0].key, "NODE_UNREACHABLE:node=pve");
    }

    #[test]
    fn node_recovery_is_silent() {
        let mut t = StateTracker::new();
        t.update_nodes(&[node("pve", true)]);
        t.update_nodes(&[node("pve", false)]);
        let incidents = t.update_nodes(&[node("pve", true)]);
        assert!(incidents.is_empty());
    }

    #[test]
    fn vm_crash_is_typed_by_kind() {
        let mut t = StateTracker::new();
        t.update_vms(&[vm(200, "pve", VmKind::Qemu, true)]);
        let incidents = t.update_vms(&[vm(200, "pve", VmKind::Qemu, false)]);
        assert_eq!(incidents[0].kind, IncidentType::VmCrashed);

        t.update_vms(&[vm(101, "pve", VmKind::Lxc, true)]);
        let ct_incidents = t.update_vms(&[vm(101, "pve", VmKind::Lxc, false)]);
        assert_eq!(ct_incidents[0].kind, IncidentType::CtCrashed);
    }

    #[test]
    fn steady_state_emits_nothing() {
        let mut t = StateTracker::new();
        t.update_vms(&[vm(200, "pve", VmKind::Qemu, true)]);
        let incidents = t.update_vms(&[vm(200, "pve", VmKind::Qemu, true)]);
        assert!(incidents.is_empty());
    }
}
