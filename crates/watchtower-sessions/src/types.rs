use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use watchtower_core::types::MessageRole;

/// Structured, user-centric session key.
///
/// Sessions belong to users, not channels: Alice on the web UI and Alice on
/// voice share the same session, `user:{user_id}:agent:{agent_id}:{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub user_id: String,
    pub agent_id: String,
    pub name: String,
}

impl SessionKey {
    pub fn new(user_id: impl Into<String>, agent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            agent_id: agent_id.into(),
            name: name.into(),
        }
    }

    pub fn format(&self) -> String {
        format!("user:{}:agent:{}:{}", self.user_id, self.agent_id, self.name)
    }

    pub fn parse(s: &str) -> Result<Self, crate::error::SessionError> {
        let rest = s
            .strip_prefix("user:")
            .ok_or_else(|| crate::error::SessionError::InvalidKey(format!("missing 'user:' prefix: {s}")))?;

        let agent_marker = ":agent:";
        let agent_pos = rest
            .find(agent_marker)
            .ok_or_else(|| crate::error::SessionError::InvalidKey(format!("missing ':agent:' segment: {s}")))?;

        let user_id = &rest[..agent_pos];
        let after_agent = &rest[agent_pos + agent_marker.len()..];

        let colon_pos = after_agent
            .find(':')
            .ok_or_else(|| crate::error::SessionError::InvalidKey(format!("missing session name segment: {s}")))?;

        let agent_id = &after_agent[..colon_pos];
        let name = &after_agent[colon_pos + 1..];

        if user_id.is_empty() || agent_id.is_empty() || name.is_empty() {
            return Err(crate::error::SessionError::InvalidKey(format!(
                "key components must not be empty: {s}"
            )));
        }

        Ok(Self {
            user_id: user_id.to_string(),
            agent_id: agent_id.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

/// One message in a session's ordered sequence (§3 Session).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// A context message ready for the LLM input array — `buildContextMessages`'s
/// return shape (§4.5 step 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: MessageRole,
    pub content: String,
}

/// Live, in-memory session state (§3 Session).
///
/// Lazily created on first message, mutated by both user messages and model
/// replies, cleared on disconnect — the gateway owns the lifecycle and calls
/// [`crate::manager::SessionManager::clear`] when a connection drops.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub messages: Vec<Message>,
    pub summary: Option<String>,
    pub entities: HashMap<String, String>,
    pub cached_token_count: usize,
    pub summarizing: bool,
    pub total_message_count: u32,
}

/// How a long-term memory entry was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    UserSaid,
    Inferred,
    AdminSet,
}

impl std::fmt::Display for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MemorySource::UserSaid => "user_said",
            MemorySource::Inferred => "inferred",
            MemorySource::AdminSet => "admin_set",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MemorySource {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_said" => Ok(Self::UserSaid),
            "inferred" => Ok(Self::Inferred),
            "admin_set" => Ok(Self::AdminSet),
            other => Err(format!("unknown memory source: {other}")),
        }
    }
}

/// Long-term, per-user memory category. Priority order for prompt injection:
/// instruction > preference > fact > context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Instruction,
    Preference,
    Fact,
    Context,
}

impl std::fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MemoryCategory::Instruction => "instruction",
            MemoryCategory::Preference => "preference",
            MemoryCategory::Fact => "fact",
            MemoryCategory::Context => "context",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MemoryCategory {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instruction" => Ok(Self::Instruction),
            "preference" => Ok(Self::Preference),
            "fact" => Ok(Self::Fact),
            "context" => Ok(Self::Context),
            other => Err(format!("unknown memory category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMemory {
    pub id: i64,
    pub user_id: String,
    pub category: MemoryCategory,
    pub key: String,
    pub value: String,
    pub confidence: f64,
    pub source: MemorySource,
    pub created_at: String,
    pub updated_at: String,
}

/// Rendered long-term memory block, ready for injection as the
/// `memoryContextTokens` input to `buildContextMessages`.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
    pub rendered: String,
    pub memory_count: usize,
    pub built_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_simple_key() {
        let key = SessionKey::new("u-123", "main", "main");
        let s = key.format();
        assert_eq!(s, "user:u-123:agent:main:main");
        let parsed = SessionKey::parse(&s).expect("parse failed");
        assert_eq!(parsed, key);
    }

    #[test]
    fn roundtrip_name_with_colons() {
        let key = SessionKey::new("u-999", "main", "trip:paris:2026");
        let s = key.format();
        let parsed = SessionKey::parse(&s).expect("parse failed");
        assert_eq!(parsed.name, "trip:paris:2026");
    }

    #[test]
    fn parse_missing_agent_returns_err() {
        assert!(SessionKey::parse("user:u-1:main:main").is_err());
    }

    #[test]
    fn parse_missing_user_prefix_returns_err() {
        assert!(SessionKey::parse("u-1:agent:main:main").is_err());
    }
}
