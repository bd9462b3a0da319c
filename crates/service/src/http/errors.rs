use serde_json::Value;
use thiserror::Error;

use crate::errors::StoreError;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("request failed with status {status}")]
    Status { status: u16, message: Option<String> },
    /// 401 that survived (or could not attempt) the token refresh.
    #[error("unauthorized")]
    Unauthorized,
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            HttpError::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Message the backend put in the error body, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            HttpError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// The backend was never reached or never answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, HttpError::Network(_) | HttpError::Timeout)
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_decode() {
            HttpError::Decode(e.to_string())
        } else {
            HttpError::Network(e.to_string())
        }
    }
}

/// Pull a human-readable message out of an error body (`message`, `error` or `detail`).
pub fn extract_message(body: &Value) -> Option<String> {
    ["message", "error", "detail"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}
