use rusqlite::Connection;
use serde_json::Value;
use watchtower_core::db::record_event;
use watchtower_core::types::{BroadcastEvent, EventSource, Severity};

/// `logSafetyAudit` (§4.1) — best-effort, never throws. Shape matches §6's
/// bit-exact compatibility point: `{type:'action', severity:'warning',
/// source:'system', summary:"SAFETY: <action> — <short details>",
/// details: JSON(<structured>)}`.
pub fn log_safety_audit(conn: &Connection, action: &str, details: &Value) {
    let short = details
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("no reason given");
    let event = BroadcastEvent::new(
        "action",
        Severity::Warning,
        "safety audit",
        format!("SAFETY: {action} — {short}"),
        EventSource::System,
    );

    if let Err(e) = record_event(conn, &event, Some(&details.to_string())) {
        tracing::warn!(error = %e, %action, "failed to persist safety audit record");
    }
}
