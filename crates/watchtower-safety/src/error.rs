use thiserror::Error;

#[derive(Debug, Error)]
pub enum SafetyError {
    #[error("tool '{name}' is not registered")]
    UnknownTool { name: String },

    #[error("blocked: {reason}")]
    Denied { reason: String },

    #[error("invalid node name: {0}")]
    InvalidNodeName(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SafetyError {
    pub fn code(&self) -> &'static str {
        match self {
            SafetyError::UnknownTool { .. } => "UNKNOWN_TOOL",
            SafetyError::Denied { .. } => "SAFETY_DENIAL",
            SafetyError::InvalidNodeName(_) => "INVALID_NODE_NAME",
            SafetyError::Database(_) => "DATABASE_ERROR",
            SafetyError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SafetyError>;
