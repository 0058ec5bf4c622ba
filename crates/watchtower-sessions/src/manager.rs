use std::sync::Arc;

use dashmap::DashMap;
use rusqlite::Connection;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, warn};
use watchtower_core::config::SessionConfig;
use watchtower_core::types::MessageRole;
use watchtower_dispatch::clients::llm::{ChatMessage, LlmClient};

use crate::db;
use crate::error::{Result, SessionError};
use crate::tokenizer::Tokenizer;
use crate::types::{ContextMessage, Message, Session, SessionKey};

const SUMMARY_WRAP_OPEN: &str = "<conversation_summary>";
const SUMMARY_WRAP_CLOSE: &str = "</conversation_summary>";
const ENTITIES_WRAP_OPEN: &str = "<preserved_context>";
const ENTITIES_WRAP_CLOSE: &str = "</preserved_context>";
const ENTITIES_MARKER: &str = "---ENTITIES---";

/// Owns live session state and mediates every read/write against it. One
/// instance per process; sessions are addressed by [`SessionKey`], lazily
/// created on first message, cleared on disconnect.
pub struct SessionManager {
    live: DashMap<SessionKey, AsyncMutex<Session>>,
    db: std::sync::Mutex<Connection>,
    llm: Arc<dyn LlmClient>,
    cfg: SessionConfig,
    tokenizer: Tokenizer,
}

impl SessionManager {
    pub fn new(conn: Connection, llm: Arc<dyn LlmClient>, cfg: SessionConfig) -> Result<Self> {
        db::init_db(&conn)?;
        Ok(Self {
            live: DashMap::new(),
            db: std::sync::Mutex::new(conn),
            llm,
            cfg,
            tokenizer: Tokenizer::new(),
        })
    }

    /// Append a message to the session's recent list and bump `totalMessageCount`.
    pub async fn add_message(&self, key: &SessionKey, role: MessageRole, content: &str) -> Result<()> {
        let entry = self.live.entry(key.clone()).or_insert_with(|| AsyncMutex::new(Session::default()));
        let mut session = entry.lock().await;
        session.messages.push(Message { role, content: content.to_string() });
        session.total_message_count += 1;
        let total = session.total_message_count;
        drop(session);

        let conn = self.db.lock().unwrap();
        db::persist_message(&conn, &key.format(), &role.to_string(), content)?;
        db::upsert_session_row(&conn, key, total)?;
        Ok(())
    }

    /// Produce the LLM input array for a session (§4.5 `buildContextMessages`).
    pub async fn build_context_messages(
        &self,
        key: &SessionKey,
        system_prompt_tokens: usize,
        memory_context_tokens: usize,
    ) -> Vec<ContextMessage> {
        let entry = self.live.entry(key.clone()).or_insert_with(|| AsyncMutex::new(Session::default()));
        let session = entry.lock().await;

        let mut available = self
            .cfg
            .context_window_tokens
            .saturating_sub(system_prompt_tokens)
            .saturating_sub(memory_context_tokens)
            .saturating_sub(self.cfg.response_reserve_tokens) as i64;

        let mut prefix = Vec::new();

        if let Some(summary) = &session.summary {
            let block = format!("{SUMMARY_WRAP_OPEN}{summary}{SUMMARY_WRAP_CLOSE}");
            available -= self.tokenizer.count_message(&block) as i64;
            prefix.push(ContextMessage { role: MessageRole::System, content: block });
        }

        if !session.entities.is_empty() {
            let mut lines = session
                .entities
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>();
            lines.sort();
            let block = format!("{ENTITIES_WRAP_OPEN}\n{}\n{ENTITIES_WRAP_CLOSE}", lines.join("\n"));
            available -= self.tokenizer.count_message(&block) as i64;
            prefix.push(ContextMessage { role: MessageRole::System, content: block });
        }

        let budget = (available.max(0) as f64 * self.cfg.recent_ratio) as i64;
        let mut running = 0i64;
        let mut recent = Vec::new();
        for msg in session.messages.iter().rev() {
            let cost = self.tokenizer.count_message(&msg.content) as i64;
            if running + cost >= budget {
                break;
            }
            running += cost;
            recent.push(ContextMessage { role: msg.role, content: msg.content.clone() });
        }
        recent.reverse();

        prefix.extend(recent);
        prefix
    }

    /// True when the session has crossed the summarization threshold and
    /// isn't already being summarized.
    pub async fn should_summarize(&self, key: &SessionKey) -> bool {
        let Some(entry) = self.live.get(key) else { return false };
        let session = entry.lock().await;
        session.total_message_count as usize > self.cfg.summarize_threshold && !session.summarizing
    }

    /// Compact the session's history into a narrative summary plus a
    /// preserved-entities block (§4.5 `summarize`). Runs out-of-band from the
    /// "LLM stream complete" callback, never from message receipt.
    pub async fn summarize(&self, key: &SessionKey) {
        let Some(entry) = self.live.get(key) else { return };

        {
            let mut session = entry.lock().await;
            session.summarizing = true;
        }

        if let Err(err) = self.summarize_inner(key, entry.value()).await {
            warn!(session = %key, error = %err, "summarization failed, discarding attempt");
        }

        let mut session = entry.lock().await;
        session.summarizing = false;
    }

    async fn summarize_inner(&self, key: &SessionKey, cell: &AsyncMutex<Session>) -> Result<()> {
        let (older, existing_entities) = {
            let session = cell.lock().await;
            let keep = self.cfg.keep_count as usize;
            let split = session.messages.len().saturating_sub(keep);
            (session.messages[..split].to_vec(), session.entities.clone())
        };

        if older.is_empty() {
            return Ok(());
        }

        let prompt = build_summarization_prompt(&older);
        let reply = self
            .llm
            .chat(&[ChatMessage { role: "user".to_string(), content: prompt }])
            .await
            .map_err(|e| SessionError::Llm(e.to_string()))?;

        let (narrative, new_entities) = parse_summary_response(&reply);

        let mut session = cell.lock().await;
        session.summary = Some(narrative);

        let mut merged = existing_entities;
        for (k, v) in new_entities {
            merged.insert(k, v);
        }
        session.entities = merged;

        let keep = self.cfg.keep_count as usize;
        let split = session.messages.len().saturating_sub(keep);
        session.messages.drain(..split);

        session.cached_token_count = session
            .messages
            .iter()
            .map(|m| self.tokenizer.count_message(&m.content))
            .sum();

        let conn = self.db.lock().unwrap();
        for (k, v) in session.entities.iter() {
            db::upsert_entity(&conn, &key.format(), k, v)?;
        }

        Ok(())
    }

    /// Clear a session's in-memory state on disconnect or explicit logout.
    /// Durable metadata in `sessions` is intentionally left intact.
    pub fn clear(&self, key: &SessionKey) {
        self.live.remove(key);
    }

    pub fn cfg(&self) -> &SessionConfig {
        &self.cfg
    }
}

fn build_summarization_prompt(messages: &[Message]) -> String {
    let transcript = messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Summarize the following conversation in 150 words or fewer as a \
         single narrative paragraph. Never drop identifiers: VM ids, IP \
         addresses, node names, file paths, and error codes must all be \
         preserved verbatim, either in the narrative or as entity entries.\n\n\
         After the narrative, write the line `{ENTITIES_MARKER}` followed by \
         one `key: description` line per identifier worth remembering.\n\n\
         Conversation:\n{transcript}"
    )
}

fn parse_summary_response(reply: &str) -> (String, std::collections::HashMap<String, String>) {
    let mut entities = std::collections::HashMap::new();
    match reply.split_once(ENTITIES_MARKER) {
        Some((narrative, tail)) => {
            for line in tail.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some((k, v)) = line.split_once(':') {
                    entities.insert(k.trim().to_string(), v.trim().to_string());
                } else {
                    error!(line, "malformed entity line in summarization response, skipping");
                }
            }
            (narrative.trim().to_string(), entities)
        }
        None => (reply.trim().to_string(), entities),
    }
}
