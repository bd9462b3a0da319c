use thiserror::Error;

/// Failures of the persisted session storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(String),
    #[error("storage encoding error: {0}")]
    Encode(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self { Self::Io(e.to_string()) }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self { Self::Encode(e.to_string()) }
}
