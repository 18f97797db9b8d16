use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to (de)serialize persisted document: {0}")]
    Serde(#[from] serde_json::Error),
}
