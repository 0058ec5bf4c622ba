use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Per-connection identifier (random UUID, not persisted).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub String);

impl ConnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session identifier. Time-sortable (UUIDv7) so log correlation doesn't need
/// a secondary timestamp column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Action tier — classification of a tool's blast radius (§3).
///
/// Ordering matters for nothing except display; the evaluation logic in
/// `watchtower-safety` does not rely on `PartialOrd` between tiers — each
/// tier has its own distinct guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionTier {
    /// Read-only, no side effects; always permitted.
    Green,
    /// Writes/side effects that are non-destructive; permitted with audit log.
    Yellow,
    /// Destructive or consequential; requires `confirmed: true`.
    Red,
    /// Privileged/destructive; requires the approval keyword.
    Orange,
    /// Forbidden by default; permitted only under an active override context.
    Black,
}

impl fmt::Display for ActionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionTier::Green => "GREEN",
            ActionTier::Yellow => "YELLOW",
            ActionTier::Red => "RED",
            ActionTier::Orange => "ORANGE",
            ActionTier::Black => "BLACK",
        };
        write!(f, "{s}")
    }
}

/// Message role within a session's ordered message sequence (§3 Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
            MessageRole::Tool => "tool",
        };
        write!(f, "{s}")
    }
}

/// Closed set of incident types (§3 Incident).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentType {
    NodeUnreachable,
    VmCrashed,
    CtCrashed,
    DiskHigh,
    DiskCritical,
    RamHigh,
    RamCritical,
    CpuHigh,
    ServiceDown,
    TempHigh,
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IncidentType::NodeUnreachable => "NODE_UNREACHABLE",
            IncidentType::VmCrashed => "VM_CRASHED",
            IncidentType::CtCrashed => "CT_CRASHED",
            IncidentType::DiskHigh => "DISK_HIGH",
            IncidentType::DiskCritical => "DISK_CRITICAL",
            IncidentType::RamHigh => "RAM_HIGH",
            IncidentType::RamCritical => "RAM_CRITICAL",
            IncidentType::CpuHigh => "CPU_HIGH",
            IncidentType::ServiceDown => "SERVICE_DOWN",
            IncidentType::TempHigh => "TEMP_HIGH",
        };
        write!(f, "{s}")
    }
}

/// A detected condition with a stable dedup key (§3 Incident).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Stable dedup primitive, e.g. `VM_CRASHED:vmid=103`.
    pub key: String,
    pub kind: IncidentType,
    pub target: String,
    pub node: String,
    pub detected_at: chrono::DateTime<chrono::Utc>,
    pub detail: String,
}

impl Incident {
    pub fn key_for(kind: IncidentType, target: &str) -> String {
        format!("{kind}:{target}")
    }
}

/// Outcome recorded for an autonomy action (§3 Autonomy Action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOutcome {
    Success,
    Failure,
    Blocked,
    Escalated,
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionOutcome::Success => "success",
            ActionOutcome::Failure => "failure",
            ActionOutcome::Blocked => "blocked",
            ActionOutcome::Escalated => "escalated",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ActionOutcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(ActionOutcome::Success),
            "failure" => Ok(ActionOutcome::Failure),
            "blocked" => Ok(ActionOutcome::Blocked),
            "escalated" => Ok(ActionOutcome::Escalated),
            other => Err(format!("unknown action outcome: {other}")),
        }
    }
}

/// Autonomy level — how much latitude the runbook engine has (§9 Dynamic
/// configuration); stored as a persisted integer preference, 0..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    Observe = 0,
    Alert = 1,
    Recommend = 2,
    ActReport = 3,
    ActSilent = 4,
}

impl AutonomyLevel {
    pub fn from_i64(v: i64) -> Self {
        match v {
            0 => AutonomyLevel::Observe,
            1 => AutonomyLevel::Alert,
            2 => AutonomyLevel::Recommend,
            3 => AutonomyLevel::ActReport,
            _ => AutonomyLevel::ActSilent,
        }
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

impl fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AutonomyLevel::Observe => "observe",
            AutonomyLevel::Alert => "alert",
            AutonomyLevel::Recommend => "recommend",
            AutonomyLevel::ActReport => "act_report",
            AutonomyLevel::ActSilent => "act_silent",
        };
        write!(f, "{s}")
    }
}

/// Broadcast event source (§6 bit-exact compatibility points).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Monitor,
    User,
    System,
    Jarvis,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventSource::Monitor => "monitor",
            EventSource::User => "user",
            EventSource::System => "system",
            EventSource::Jarvis => "jarvis",
        };
        write!(f, "{s}")
    }
}

/// Event severity, used both for broadcast events and the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// A broadcast event pushed to `/events` subscribers (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub node: Option<String>,
    pub source: EventSource,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl BroadcastEvent {
    pub fn new(
        kind: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
        source: EventSource,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.into(),
            severity,
            title: title.into(),
            message: message.into(),
            node: None,
            source,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }
}
