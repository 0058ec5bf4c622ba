use std::collections::HashSet;

use chrono::Utc;
use watchtower_core::types::{Incident, IncidentType};

use crate::types::NodeObservation;

/// Threshold Evaluator (§4.3). A closed, tiered table per metric — disk and
/// RAM have a high/critical split, CPU has one tier. Violations are
/// hysteresis-gated: a condition fires once on entry to the active set and
/// stays silent until the metric drops back below its threshold, at which
/// point the key is dropped and a future re-entry can fire again.
#[derive(Default)]
pub struct ThresholdEvaluator {
    active: HashSet<(IncidentType, String)>,
}

impl ThresholdEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only online nodes are evaluated; an offline node's stale metrics
    /// never produce a threshold violation.
    pub fn evaluate(&mut self, observations: &[NodeObservation]) -> Vec<Incident> {
        let now = Utc::now();
        let mut new_violations = Vec::new();

        for obs in observations {
            if !obs.online {
                continue;
            }

            let conditions = [
                tiered_condition(obs.disk_fraction, 0.95, 0.90, IncidentType::DiskCritical, IncidentType::DiskHigh),
                tiered_condition(obs.mem_fraction, 0.95, 0.85, IncidentType::RamCritical, IncidentType::RamHigh),
                single_condition(obs.cpu_fraction, 0.95, IncidentType::CpuHigh),
            ]
            .into_iter()
            .flatten();

            let mut seen_this_tick = HashSet::new();
            for kind in conditions {
                seen_this_tick.insert(kind);
                let key = (kind, obs.name.clone());
                if self.active.insert(key.clone()) {
                    let target = format!("node={}", obs.name);
                    new_violations.push(Incident {
                        key: Incident::key_for(kind, &target),
                        kind,
                        target,
                        node: obs.name.clone(),
                        detected_at: now,
                        detail: format!("{kind} on node '{}'", obs.name),
                    });
                }
            }

            // Drop active entries for conditions that no longer hold on this
            // node, so a future re-entry across the threshold fires again.
            for kind in [
                IncidentType::DiskCritical,
                IncidentType::DiskHigh,
                IncidentType::RamCritical,
                IncidentType::RamHigh,
                IncidentType::CpuHigh,
            ] {
                if !seen_this_tick.contains(&kind) {
                    self.active.remove(&(kind, obs.name.clone()));
                }
            }
        }

        new_violations
    }
}

fn tiered_condition(
    fraction: Option<f64>,
    critical_threshold: f64,
    high_threshold: f64,
    critical_kind: IncidentType,
    high_kind: IncidentType,
) -> Option<IncidentType> {
    let f = fraction?;
    if f > critical_threshold {
        Some(critical_kind)
    } else if f > high_threshold {
        Some(high_kind)
    } else {
        None
    }
}

fn single_condition(fraction: Option<f64>, threshold: f64, kind: IncidentType) -> Option<IncidentType> {
    let f = fraction?;
    (f > threshold).then_some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(disk: f64, mem: f64, cpu: f64) -> NodeObservation {
        NodeObservation {
            name: "pve".to_string(),
            online: true,
            cpu_fraction: Some(cpu),
            mem_fraction: Some(mem),
            disk_fraction: Some(disk),
        }
    }

    #[test]
    fn emits_on_first_crossing_only() {
        let mut e = ThresholdEvaluator::new();
        let first = e.evaluate(&[node(0.96, 0.10, 0.10)]);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].kind, IncidentType::DiskCritical);

        let second = e.evaluate(&[node(0.97, 0.10, 0.10)]);
        assert!(second.is_empty());
    }

    #[test]
    fn reenters_after_dropping_below_threshold() {
        let mut e = ThresholdEvaluator::new();
        e.evaluate(&[node(0.96, 0.10, 0.10)]);
        let recovered = e.evaluate(&[node(0.50, 0.10, 0.10)]);
        assert!(recovered.is_empty());
        let reentered = e.evaluate(&[node(0.96, 0.10, 0.10)]);
        assert_eq!(reentered.len(), 1);
    }

    #[test]
    fn offline_node_is_skipped() {
        let mut e = ThresholdEvaluator::new();
        let mut obs = node(0.99, 0.99, 0.99);
        obs.online = false;
        let incidents = e.evaluate(&[obs]);
        assert!(incidents.is_empty());
    }

    #[test]
    fn disk_tier_is_critical_not_both() {
        let mut e = ThresholdEvaluator::new();
        let incidents = e.evaluate(&[node(0.99, 0.10, 0.10)]);
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].kind, IncidentType::DiskCritical);
    }

    #[test]
    fn disk_high_tier_between_bands() {
        let mut e = ThresholdEvaluator::new();
        let incidents = e.evaluate(&[node(0.92, 0.10, 0.10)]);
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].kind, IncidentType::DiskHigh);
    }
}
