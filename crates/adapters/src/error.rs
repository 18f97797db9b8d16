use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned an error: {0}")]
    Upstream(String),

    #[error("failed to parse upstream response: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
