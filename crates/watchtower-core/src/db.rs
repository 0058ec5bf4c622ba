use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::types::BroadcastEvent;

/// Schema shared across every crate that touches the database: the
/// broadcast-event log and the dynamically-read preferences table (§9
/// "Dynamic configuration" — kill switch, autonomy level, rate-limit window,
/// per-sentence deadline all live here, read fresh on every use).
///
/// Each owning crate calls its own `init_db` in addition to this one,
/// using the same idempotent `CREATE TABLE IF NOT EXISTS` pattern.
pub fn init_core_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA cache_size = -65536;

        CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            severity TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            node TEXT,
            source TEXT NOT NULL,
            details TEXT,
            timestamp TEXT NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);

        CREATE TABLE IF NOT EXISTS preferences (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}

/// Best-effort event/audit record. Per §4.1 `logSafetyAudit`: never throws —
/// callers should log-and-discard a write failure rather than propagate it.
pub fn record_event(conn: &Connection, event: &BroadcastEvent, details: Option<&str>) -> Result<()> {
    conn.execute(
        "INSERT INTO events (id, kind, severity, title, message, node, source, details, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            event.id,
            event.kind,
            serde_json::to_value(event.severity)?.as_str().unwrap_or("info"),
            event.title,
            event.message,
            event.node,
            serde_json::to_value(event.source)?.as_str().unwrap_or("system"),
            details,
            event.timestamp.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Upsert a preference value (string-encoded; callers parse as needed).
pub fn set_preference(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Read a preference value, if set. Callers apply their own fail-safe default
/// on `Ok(None)` or `Err` — e.g. the kill switch guardrail treats a read
/// failure as "deny" (§4.4 guardrail 2a).
pub fn get_preference(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM preferences WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

pub fn open(path: &str) -> Result<Connection> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    init_core_db(&conn)?;
    Ok(conn)
}
