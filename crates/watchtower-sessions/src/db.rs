use rusqlite::Connection;

use crate::error::Result;

/// Initialise the session/memory schema (§3.A Persistence shape). Safe to
/// call on every startup — `CREATE TABLE IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            id            TEXT PRIMARY KEY,
            session_key   TEXT NOT NULL UNIQUE,
            user_id       TEXT NOT NULL,
            agent_id      TEXT NOT NULL,
            name          TEXT NOT NULL,
            total_message_count INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id, updated_at DESC);

        CREATE TABLE IF NOT EXISTS conversations (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            session_key TEXT NOT NULL,
            role        TEXT NOT NULL,
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conversations_session ON conversations(session_key, created_at);

        CREATE TABLE IF NOT EXISTS entities (
            session_key TEXT NOT NULL,
            key         TEXT NOT NULL,
            description TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            PRIMARY KEY (session_key, key)
        );

        CREATE TABLE IF NOT EXISTS memories (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT NOT NULL,
            category    TEXT NOT NULL,
            key         TEXT NOT NULL,
            value       TEXT NOT NULL,
            confidence  REAL NOT NULL DEFAULT 0.8,
            source      TEXT NOT NULL DEFAULT 'inferred',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            UNIQUE(user_id, category, key)
        );
        CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id);

        CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts
            USING fts5(key, value, content='memories', content_rowid='id');
        ",
    )?;
    Ok(())
}

pub fn persist_message(conn: &Connection, session_key: &str, role: &str, content: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO conversations (session_key, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![session_key, role, content, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn upsert_session_row(conn: &Connection, key: &crate::types::SessionKey, total_message_count: u32) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO sessions (id, session_key, user_id, agent_id, name, total_message_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT(session_key) DO UPDATE SET
            total_message_count = excluded.total_message_count,
            updated_at = excluded.updated_at",
        rusqlite::params![
            uuid::Uuid::now_v7().to_string(),
            key.format(),
            key.user_id,
            key.agent_id,
            key.name,
            total_message_count,
            now,
        ],
    )?;
    Ok(())
}

pub fn upsert_entity(conn: &Connection, session_key: &str, key: &str, description: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO entities (session_key, key, description, updated_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(session_key, key) DO UPDATE SET description = excluded.description, updated_at = excluded.updated_at",
        rusqlite::params![session_key, key, description, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn clear_session(conn: &Connection, session_key: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE session_key = ?1", [session_key])?;
    conn.execute("DELETE FROM entities WHERE session_key = ?1", [session_key])?;
    Ok(())
}
