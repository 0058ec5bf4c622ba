use thiserror::Error;

/// Error kinds shared across crates that don't need a richer local enum.
///
/// Mirrors the kind hierarchy in §7: `SafetyDenial` and `GuardrailDenial` are
/// left to `watchtower-safety`/`watchtower-monitor` (they carry structured
/// reasons the REST layer needs), but plain infra failures land here so every
/// crate isn't re-deriving `Config`/`Database`/`Io` variants.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external service error: {0}")]
    External(String),

    #[error("request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "CONFIG_ERROR",
            CoreError::Database(_) => "DATABASE_ERROR",
            CoreError::Serialization(_) => "SERIALIZATION_ERROR",
            CoreError::Io(_) => "IO_ERROR",
            CoreError::External(_) => "EXTERNAL_ERROR",
            CoreError::Timeout { .. } => "TIMEOUT",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        CoreError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
