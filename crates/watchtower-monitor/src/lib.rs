//! `watchtower-monitor` — the Autonomous Monitor & Runbook Engine (§4.4).
//!
//! Four independently-scheduled polling tiers (Critical/Important/Routine/
//! Background) feed a [`watchtower_cluster::StateTracker`] and
//! [`watchtower_cluster::ThresholdEvaluator`]. Incidents the Critical tier
//! detects are handed to a guarded runbook pipeline that checks the kill
//! switch, a sliding-window rate limiter, a cluster-wide blast-radius lock,
//! and the configured autonomy level before invoking anything through the
//! tool [`watchtower_dispatch::Dispatcher`].

pub mod db;
pub mod engine;
pub mod error;
pub mod guardrails;
pub mod runbooks;

pub use db::{recent_autonomy_actions, AutonomyActionRecord};
pub use engine::MonitorEngine;
pub use error::{MonitorError, Result};
pub use guardrails::{current_autonomy_level, kill_switch_engaged};
pub use runbooks::{lookup, Runbook, RUNBOOKS};
