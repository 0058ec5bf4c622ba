use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("tool '{0}' not found")]
    NotFound(String),

    #[error("external service error: {0}")]
    External(String),

    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DispatchError {
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::NotFound(_) => "TOOL_NOT_FOUND",
            DispatchError::External(_) => "EXTERNAL_ERROR",
            DispatchError::Timeout { .. } => "TIMEOUT",
            DispatchError::Database(_) => "DATABASE_ERROR",
            DispatchError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
