use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl MonitorError {
    pub fn code(&self) -> &'static str {
        match self {
            MonitorError::Database(_) => "DATABASE_ERROR",
            MonitorError::Serialization(_) => "SERIALIZATION_ERROR",
            MonitorError::External(_) => "EXTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
