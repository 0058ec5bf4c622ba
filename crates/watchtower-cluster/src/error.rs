use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid observation: {0}")]
    InvalidObservation(String),
}

impl ClusterError {
    pub fn code(&self) -> &'static str {
        match self {
            ClusterError::InvalidObservation(_) => "INVALID_OBSERVATION",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
