use thiserror::Error;

/// Failures that are not business outcomes. Wrong credentials, duplicate
/// emails and rejected imports are reported as `Ok(false)` instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("credential hashing failed: {0}")]
    Credential(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
