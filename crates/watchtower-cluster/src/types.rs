use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmKind {
    Qemu,
    Lxc,
}

/// A single observation of a node's reachability and resource usage, taken
/// from one poll of the hypervisor's cluster-status/resources endpoints.
#[derive(Debug, Clone)]
pub struct NodeObservation {
    pub name: String,
    pub online: bool,
    /// Fractions in `[0, 1]`; `None` when the node is offline and the
    /// hypervisor reported no metrics for it.
    pub cpu_fraction: Option<f64>,
    pub mem_fraction: Option<f64>,
    pub disk_fraction: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct VmObservation {
    pub id: u64,
    pub node: String,
    pub kind: VmKind,
    pub running: bool,
}
