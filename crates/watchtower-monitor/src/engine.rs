use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, instrument, warn};
use watchtower_cluster::{NodeObservation, StateTracker, ThresholdEvaluator, VmKind, VmObservation};
use watchtower_core::config::MonitorConfig;
use watchtower_core::types::{AutonomyLevel, BroadcastEvent, EventSource, Incident, Severity};
use watchtower_dispatch::clients::{EmailClient, HypervisorClient};
use watchtower_dispatch::{Caller, Dispatcher};

use crate::db::{prune_old_autonomy_actions, record_autonomy_action};
use crate::guardrails::{current_autonomy_level, kill_switch_engaged, BlastRadiusLock, EmailRateLimiter, RateLimiter};
use crate::runbooks::{lookup, Runbook};

/// The Autonomous Monitor & Runbook Engine (C4) — four independently-failing
/// polling tiers feeding a State Tracker and Threshold Evaluator, plus the
/// guarded runbook pipeline the Critical tier dispatches into.
pub struct MonitorEngine {
    db: Arc<Mutex<Connection>>,
    hypervisor: Arc<dyn HypervisorClient>,
    dispatcher: Arc<Dispatcher>,
    email: Arc<dyn EmailClient>,
    events: broadcast::Sender<BroadcastEvent>,
    state: Mutex<StateTracker>,
    threshold: Mutex<ThresholdEvaluator>,
    rate_limiter: RateLimiter,
    blast_lock: BlastRadiusLock,
    email_limiter: EmailRateLimiter,
    cfg: MonitorConfig,
}

impl MonitorEngine {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        hypervisor: Arc<dyn HypervisorClient>,
        dispatcher: Arc<Dispatcher>,
        email: Arc<dyn EmailClient>,
        events: broadcast::Sender<BroadcastEvent>,
        cfg: MonitorConfig,
    ) -> Self {
        Self {
            db,
            hypervisor,
            dispatcher,
            email,
            events,
            state: Mutex::new(StateTracker::new()),
            threshold: Mutex::new(ThresholdEvaluator::new()),
            rate_limiter: RateLimiter::new(),
            blast_lock: BlastRadiusLock::new(),
            email_limiter: EmailRateLimiter::new(),
            cfg,
        }
    }

    /// A fresh receiver for the engine's broadcast channel, used by realtime
    /// subscribers (the `/events` namespace) to relay runbook-state
    /// transitions as they happen.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.events.subscribe()
    }

    /// The shared database handle, for read-mostly endpoints (action log,
    /// monitor status) that don't need to go through the runbook pipeline.
    pub fn db(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.db)
    }

    /// Emits an operator-triggered test event, exercising the same
    /// persistence and broadcast path a real incident would use.
    pub fn emit_test_alert(&self, title: &str, message: &str) {
        let event = BroadcastEvent::new(
            "alert",
            Severity::Info,
            title,
            message,
            EventSource::User,
        );
        self.emit(event);
    }

    fn emit(&self, event: BroadcastEvent) {
        if let Err(e) = self.record_event(&event) {
            warn!("failed to persist event: {e}");
        }
        // No subscribers is the common case between chat sessions; dropping
        // the event is fine, nothing downstream is waiting on it.
        let _ = self.events.send(event);
    }

    fn record_event(&self, event: &BroadcastEvent) -> crate::error::Result<()> {
        let conn = self.db.lock().unwrap();
        watchtower_core::db::record_event(&conn, event, None)
            .map_err(|e| crate::error::MonitorError::External(e.to_string()))
    }

    /// Spawns the four polling tiers and runs until `shutdown` fires.
    /// Cadences are offset from each other (and, per spec, from external
    /// snapshot emitters) to avoid thundering-herd polling.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        info!("autonomous monitor starting");
        tokio::time::sleep(Duration::from_secs(5)).await;

        let tiers: Vec<tokio::task::JoinHandle<()>> = vec![
            tokio::spawn(Arc::clone(&self).critical_tier(shutdown.clone())),
            tokio::spawn(Arc::clone(&self).important_tier(shutdown.clone())),
            tokio::spawn(Arc::clone(&self).routine_tier(shutdown.clone())),
            tokio::spawn(Arc::clone(&self).background_tier(shutdown.clone())),
        ];

        for tier in tiers {
            let _ = tier.await;
        }
        info!("autonomous monitor stopped");
    }

    async fn critical_tier(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.cfg.critical_poll_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = Self::critical_poll(&self).await {
                        error!("critical tier poll failed: {e}");
                    }
                }
                _ = shutdown.changed() => if *shutdown.borrow() { break; },
            }
        }
    }

    async fn critical_poll(engine: &Arc<Self>) -> crate::error::Result<()> {
        let self_ = engine;
        let (nodes_result, resources_result) =
            tokio::join!(self_.hypervisor.cluster_status(), self_.hypervisor.list_resources(None));
        let nodes = nodes_result.map_err(|e| crate::error::MonitorError::External(e.to_string()))?;
        let resources = resources_result.map_err(|e| crate::error::MonitorError::External(e.to_string()))?;

        let node_observations: Vec<NodeObservation> = nodes
            .iter()
            .map(|n| {
                let metrics = resources
                    .iter()
                    .find(|r| r.kind.as_deref() == Some("node") && r.node == n.node);
                NodeObservation {
                    name: n.node.clone(),
                    online: n.online,
                    cpu_fraction: metrics.and_then(|m| m.cpu),
                    mem_fraction: metrics.and_then(|m| fraction(m.mem, m.maxmem)),
                    disk_fraction: metrics.and_then(|m| fraction(m.disk, m.maxdisk)),
                }
            })
            .collect();

        let vm_observations: Vec<VmObservation> = resources
            .iter()
            .filter_map(|r| {
                let kind = match r.kind.as_deref() {
                    Some("qemu") => VmKind::Qemu,
                    Some("lxc") => VmKind::Lxc,
                    _ => return None,
                };
                Some(VmObservation {
                    id: r.vmid?,
                    node: r.node.clone(),
                    kind,
                    running: r.status == "running",
                })
            })
            .collect();

        let incidents = {
            let mut state = self_.state.lock().unwrap();
            let mut incidents = state.update_nodes(&node_observations);
            incidents.extend(state.update_vms(&vm_observations));
            incidents
        };

        for incident in incidents {
            self_.emit(BroadcastEvent::new(
                "incident",
                Severity::Warning,
                incident.kind.to_string(),
                incident.detail.clone(),
                EventSource::Monitor,
            ));
            let task_engine = Arc::clone(self_);
            tokio::spawn(async move {
                task_engine.run_runbook(incident).await;
            });
        }

        Ok(())
    }

    async fn important_tier(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.cfg.important_poll_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.important_poll().await {
                        error!("important tier poll failed: {e}");
                    }
                }
                _ = shutdown.changed() => if *shutdown.borrow() { break; },
            }
        }
    }

    async fn important_poll(&self) -> crate::error::Result<()> {
        let nodes = self
            .hypervisor
            .cluster_status()
            .await
            .map_err(|e| crate::error::MonitorError::External(e.to_string()))?;
        let resources = self
            .hypervisor
            .list_resources(Some("node"))
            .await
            .map_err(|e| crate::error::MonitorError::External(e.to_string()))?;

        let observations: Vec<NodeObservation> = nodes
            .iter()
            .map(|n| {
                let metrics = resources.iter().find(|r| r.node == n.node);
                NodeObservation {
                    name: n.node.clone(),
                    online: n.online,
                    cpu_fraction: metrics.and_then(|m| m.cpu),
                    mem_fraction: metrics.and_then(|m| fraction(m.mem, m.maxmem)),
                    disk_fraction: metrics.and_then(|m| fraction(m.disk, m.maxdisk)),
                }
            })
            .collect();

        let violations = self.threshold.lock().unwrap().evaluate(&observations);
        for v in violations {
            self.emit(BroadcastEvent::new("violation", Severity::Warning, v.kind.to_string(), v.detail.clone(), EventSource::Monitor).with_node(v.node.clone()));
        }
        Ok(())
    }

    async fn routine_tier(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.cfg.routine_poll_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.routine_poll().await {
                        error!("routine tier poll failed: {e}");
                    }
                }
                _ = shutdown.changed() => if *shutdown.borrow() { break; },
            }
        }
    }

    async fn routine_poll(&self) -> crate::error::Result<()> {
        let nodes = self
            .hypervisor
            .cluster_status()
            .await
            .map_err(|e| crate::error::MonitorError::External(e.to_string()))?;
        let online = nodes.iter().filter(|n| n.online).count();
        let total = nodes.len();
        let (severity, title) = if online == total {
            (Severity::Info, "systems nominal")
        } else {
            (Severity::Warning, "degraded")
        };
        self.emit(BroadcastEvent::new(
            "status",
            severity,
            title,
            format!("{online}/{total} nodes online"),
            EventSource::Monitor,
        ));
        Ok(())
    }

    async fn background_tier(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.cfg.background_poll_secs));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.background_poll().await {
                        error!("background tier poll failed: {e}");
                    }
                }
                _ = shutdown.changed() => if *shutdown.borrow() { break; },
            }
        }
    }

    async fn background_poll(&self) -> crate::error::Result<()> {
        let resources = self
            .hypervisor
            .list_resources(Some("node"))
            .await
            .map_err(|e| crate::error::MonitorError::External(e.to_string()))?;

        for r in &resources {
            if let Some(frac) = fraction(r.disk, r.maxdisk) {
                if frac >= 0.95 {
                    self.emit(BroadcastEvent::new("status", Severity::Error, "storage critical", format!("node '{}' disk at {:.0}%", r.node, frac * 100.0), EventSource::Monitor).with_node(r.node.clone()));
                } else if frac >= 0.85 {
                    self.emit(BroadcastEvent::new("status", Severity::Warning, "storage warning", format!("node '{}' disk at {:.0}%", r.node, frac * 100.0), EventSource::Monitor).with_node(r.node.clone()));
                }
            }
        }

        let pruned = {
            let conn = self.db.lock().unwrap();
            prune_old_autonomy_actions(&conn, self.cfg.audit_retention_days)?
        };
        if pruned > 0 {
            info!(pruned, "pruned expired autonomy action records");
        }
        Ok(())
    }

    /// The runbook pipeline (§4.4, 13 ordered steps). Any failure along the
    /// way is logged and discarded — the monitor never panics the process.
    #[instrument(skip(self, incident), fields(incident_key = %incident.key))]
    async fn run_runbook(self: Arc<Self>, incident: Incident) {
        // 1. Lookup.
        let runbook = match lookup(incident.kind) {
            Some(rb) => rb,
            None => return,
        };

        let now = Utc::now();
        let key = incident.key.clone();

        // 2a. Kill switch.
        let kill_switch = {
            let conn = self.db.lock().unwrap();
            kill_switch_engaged(&conn)
        };
        if kill_switch {
            warn!(%key, "remediation denied: kill switch engaged");
            let conn = self.db.lock().unwrap();
            let level = current_autonomy_level(&conn).as_i64();
            if let Err(e) = record_autonomy_action(&conn, &key, &incident.kind.to_string(), runbook.tool, &serde_json::json!({}), "blocked", false, level, 0, false, false) {
                warn!("failed to record blocked action: {e}");
            }
            return;
        }

        // 2b. Rate limiter.
        let window_secs = self.cfg.rate_limit_window_secs as i64;
        let max_attempts = self.cfg.rate_limit_max_attempts as usize;
        if self.rate_limiter.is_limited(&key, now, window_secs, max_attempts) {
            let attempt_number = self.rate_limiter.attempt_count(&key, now, window_secs) as i64 + 1;
            self.escalate(&incident, runbook.tool, attempt_number).await;
            return;
        }

        // 2c. Blast-radius lock.
        if !self.blast_lock.try_acquire(&incident.node, now, self.cfg.blast_radius_staleness_secs as i64) {
            warn!(%key, "remediation denied: another remediation is active on this node");
            let conn = self.db.lock().unwrap();
            let level = current_autonomy_level(&conn).as_i64();
            if let Err(e) = record_autonomy_action(&conn, &key, &incident.kind.to_string(), runbook.tool, &serde_json::json!({}), "blocked", false, level, 0, false, false) {
                warn!("failed to record blocked action: {e}");
            }
            return;
        }

        // 2d. Autonomy level.
        let autonomy_level = {
            let conn = self.db.lock().unwrap();
            current_autonomy_level(&conn)
        };
        if autonomy_level.as_i64() < runbook.required_level.as_i64() {
            warn!(%key, required = %runbook.required_level, current = %autonomy_level, "remediation denied: autonomy level too low");
            {
                let conn = self.db.lock().unwrap();
                if let Err(e) = record_autonomy_action(&conn, &key, &incident.kind.to_string(), runbook.tool, &serde_json::json!({}), "blocked", false, autonomy_level.as_i64(), 0, false, false) {
                    warn!("failed to record blocked action: {e}");
                }
            }
            self.blast_lock.release();
            return;
        }

        // From here on, the lock must always be released — wrap the rest in
        // a closure so every exit path falls through to the release below.
        self.run_runbook_body(incident, runbook, now, autonomy_level).await;
        self.blast_lock.release();
    }

    async fn run_runbook_body(
        &self,
        incident: Incident,
        runbook: &Runbook,
        now: chrono::DateTime<Utc>,
        autonomy_level: AutonomyLevel,
    ) {
        let key = incident.key.clone();
        let window_secs = self.cfg.rate_limit_window_secs as i64;

        // 3. Record the attempt.
        self.rate_limiter.record_attempt(&key, now, window_secs);
        let attempt_number = self.rate_limiter.attempt_count(&key, now, window_secs) as i64;

        // 4. "Remediation starting" event.
        self.emit(BroadcastEvent::new(
            "action",
            Severity::Info,
            "remediation starting",
            format!("running '{}' for {}", runbook.tool, key),
            EventSource::Monitor,
        ).with_node(incident.node.clone()));

        // 5. Re-check the kill switch immediately before executing.
        let kill_switch_now = {
            let conn = self.db.lock().unwrap();
            kill_switch_engaged(&conn)
        };
        if kill_switch_now {
            warn!(%key, "remediation aborted: kill switch engaged between detection and execution");
            return;
        }

        // 6. Invoke the tool. confirmed=true is baked into build_args.
        let args = (runbook.build_args)(&incident);
        let result = self
            .dispatcher
            .execute_tool(runbook.tool, args.clone(), Caller::Monitor, false)
            .await;
        let tool_errored = result.is_error || result.blocked;

        // 7. Verification delay.
        tokio::time::sleep(Duration::from_secs(runbook.verify_delay_secs)).await;

        // 8. Verify recovery.
        let verified = self.verify_recovery(&incident).await;

        // 9. Success computation.
        let success = !tool_errored && verified;

        // 10. Audit record.
        let outcome = if success { "success" } else { "failure" };
        {
            let conn = self.db.lock().unwrap();
            if let Err(e) = record_autonomy_action(
                &conn,
                &key,
                &incident.kind.to_string(),
                runbook.tool,
                &args,
                outcome,
                verified,
                autonomy_level.as_i64(),
                attempt_number,
                false,
                false,
            ) {
                warn!("failed to record autonomy action: {e}");
            }
        }

        // 11. Result event.
        if success {
            self.emit(BroadcastEvent::new(
                "status",
                Severity::Info,
                "remediation resolved",
                format!("Resolved: {} on {}", incident.kind, incident.node),
                EventSource::Monitor,
            ).with_node(incident.node.clone()));
        } else {
            self.emit(BroadcastEvent::new(
                "alert",
                Severity::Error,
                "remediation failed",
                format!("'{}' did not resolve {}", runbook.tool, key),
                EventSource::Monitor,
            ).with_node(incident.node.clone()));
        }

        // 12. Email.
        let subject = if success {
            format!("Watchtower: resolved {}", incident.kind)
        } else {
            format!("Watchtower: remediation failed for {}", incident.kind)
        };
        let body = format!(
            "<p>Incident <code>{key}</code> on node <code>{}</code>.</p><p>Tool: {}</p><p>Outcome: {outcome}</p>",
            incident.node, runbook.tool
        );
        let allowed = self.email_limiter.allow(Utc::now(), self.cfg.email_rate_limit_secs as i64, false);
        if allowed {
            if let Err(e) = self.email.send(&subject, &body).await {
                warn!("failed to send remediation email: {e}");
            }
        }
    }

    async fn escalate(&self, incident: &Incident, tool: &str, attempt_number: i64) {
        let key = &incident.key;
        self.emit(BroadcastEvent::new(
            "alert",
            Severity::Error,
            "remediation escalated",
            format!("{key} exceeded the retry budget; manual intervention required"),
            EventSource::Monitor,
        ).with_node(incident.node.clone()));

        {
            let conn = self.db.lock().unwrap();
            if let Err(e) = record_autonomy_action(
                &conn,
                key,
                &incident.kind.to_string(),
                tool,
                &serde_json::json!({}),
                "escalated",
                false,
                current_autonomy_level(&conn).as_i64(),
                attempt_number,
                true,
                true,
            ) {
                warn!("failed to record escalation: {e}");
            }
        }

        let subject = format!("Watchtower: ESCALATION for {}", incident.kind);
        let body = format!("<p>Incident <code>{key}</code> on node <code>{}</code> has exceeded its retry budget.</p>", incident.node);
        // Escalation emails bypass the rate limit.
        self.email_limiter.allow(Utc::now(), self.cfg.email_rate_limit_secs as i64, true);
        if let Err(e) = self.email.send(&subject, &body).await {
            warn!("failed to send escalation email: {e}");
        }
    }

    async fn verify_recovery(&self, incident: &Incident) -> bool {
        use watchtower_core::types::IncidentType;
        match incident.kind {
            IncidentType::VmCrashed | IncidentType::CtCrashed => {
                let Some(vmid) = incident.target.strip_prefix("vmid=").and_then(|v| v.parse::<u64>().ok()) else {
                    return false;
                };
                match self.hypervisor.list_resources(None).await {
                    Ok(resources) => resources.iter().any(|r| r.vmid == Some(vmid) && r.status == "running"),
                    Err(_) => false,
                }
            }
            IncidentType::NodeUnreachable => match self.hypervisor.cluster_status().await {
                Ok(nodes) => nodes.iter().any(|n| n.node == incident.node && n.online),
                Err(_) => false,
            },
            _ => false,
        }
    }
}

fn fraction(used: Option<u64>, max: Option<u64>) -> Option<f64> {
    match (used, max) {
        (Some(u), Some(m)) if m > 0 => Some(u as f64 / m as f64),
        _ => None,
    }
}
