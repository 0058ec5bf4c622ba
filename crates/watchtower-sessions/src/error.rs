use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {key}")]
    NotFound { key: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid session key: {0}")]
    InvalidKey(String),

    #[error("memory not found: {category}/{key}")]
    MemoryNotFound { category: String, key: String },

    #[error("llm error: {0}")]
    Llm(String),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotFound { .. } => "SESSION_NOT_FOUND",
            SessionError::Database(_) => "DATABASE_ERROR",
            SessionError::InvalidKey(_) => "INVALID_SESSION_KEY",
            SessionError::MemoryNotFound { .. } => "MEMORY_NOT_FOUND",
            SessionError::Llm(_) => "LLM_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
