use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    /// A collaborator broke the calling contract (mismatched batch lengths,
    /// duplicate ids, malformed metadata). The only class surfaced to callers
    /// of the retriever.
    #[error("Contract violation: {0}")]
    Contract(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn is_contract(&self) -> bool {
        matches!(self, Error::Contract(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
