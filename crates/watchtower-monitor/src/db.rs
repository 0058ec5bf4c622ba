use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;

/// A single row from `autonomy_actions`, as returned to API callers.
#[derive(Debug, Clone, Serialize)]
pub struct AutonomyActionRecord {
    pub id: String,
    pub incident_key: String,
    pub incident_kind: String,
    pub runbook_tool: String,
    pub args_snapshot: serde_json::Value,
    pub outcome: String,
    pub verification_ok: bool,
    pub autonomy_level: i64,
    pub attempt_number: i64,
    pub escalated: bool,
    pub email_sent: bool,
    pub timestamp: String,
}

/// Initialise the autonomy-action audit schema (§3 "Autonomy Action").
/// Distinct from `watchtower_core::db`'s generic `events` table: this one
/// carries the structured fields the runbook engine's pipeline steps need
/// (attempt number, escalation flag, email-sent flag) rather than a free
/// text message.
pub fn init_monitor_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS autonomy_actions (
            id               TEXT    NOT NULL PRIMARY KEY,
            incident_key     TEXT    NOT NULL,
            incident_kind    TEXT    NOT NULL,
            runbook_tool     TEXT    NOT NULL,
            args_snapshot    TEXT    NOT NULL,
            outcome          TEXT    NOT NULL,
            verification_ok  INTEGER NOT NULL,
            autonomy_level   INTEGER NOT NULL,
            attempt_number   INTEGER NOT NULL,
            escalated        INTEGER NOT NULL,
            email_sent       INTEGER NOT NULL,
            timestamp        TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_autonomy_actions_key ON autonomy_actions (incident_key);
        CREATE INDEX IF NOT EXISTS idx_autonomy_actions_timestamp ON autonomy_actions (timestamp);
        ",
    )?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn record_autonomy_action(
    conn: &Connection,
    incident_key: &str,
    incident_kind: &str,
    runbook_tool: &str,
    args_snapshot: &serde_json::Value,
    outcome: &str,
    verification_ok: bool,
    autonomy_level: i64,
    attempt_number: i64,
    escalated: bool,
    email_sent: bool,
) -> Result<()> {
    conn.execute(
        "INSERT INTO autonomy_actions
         (id, incident_key, incident_kind, runbook_tool, args_snapshot, outcome,
          verification_ok, autonomy_level, attempt_number, escalated, email_sent, timestamp)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
        rusqlite::params![
            uuid::Uuid::new_v4().to_string(),
            incident_key,
            incident_kind,
            runbook_tool,
            args_snapshot.to_string(),
            outcome,
            verification_ok as i64,
            autonomy_level,
            attempt_number,
            escalated as i64,
            email_sent as i64,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Drop autonomy-action rows older than `retention_days` (§4.4 Background tier).
pub fn prune_old_autonomy_actions(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = (chrono::Utc::now() - chrono::Duration::days(retention_days)).to_rfc3339();
    let n = conn.execute("DELETE FROM autonomy_actions WHERE timestamp < ?1", [&cutoff])?;
    Ok(n)
}

/// Most recent autonomy actions, newest first, for the monitor dashboard's action log.
pub fn recent_autonomy_actions(conn: &Connection, limit: i64) -> Result<Vec<AutonomyActionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, incident_key, incident_kind, runbook_tool, args_snapshot, outcome,
                verification_ok, autonomy_level, attempt_number, escalated, email_sent, timestamp
         FROM autonomy_actions ORDER BY timestamp DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], |row| {
        let args_snapshot: String = row.get(4)?;
        Ok(AutonomyActionRecord {
            id: row.get(0)?,
            incident_key: row.get(1)?,
            incident_kind: row.get(2)?,
            runbook_tool: row.get(3)?,
            args_snapshot: serde_json::from_str(&args_snapshot).unwrap_or(serde_json::Value::Null),
            outcome: row.get(5)?,
            verification_ok: row.get::<_, i64>(6)? != 0,
            autonomy_level: row.get(7)?,
            attempt_number: row.get(8)?,
            escalated: row.get::<_, i64>(9)? != 0,
            email_sent: row.get::<_, i64>(10)? != 0,
            timestamp: row.get(11)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
