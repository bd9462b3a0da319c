use serde::Serialize;

/// Why an auth operation did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Backend unreachable or timed out.
    Network,
    /// Backend answered and refused (bad credentials, validation, ...).
    Rejected,
    /// Operation requires a session and there is none.
    NotAuthenticated,
}

/// Outcome of a session operation. Failures are values, never panics or
/// errors, so callers only branch on the variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuthResult<T> {
    Success { data: T },
    Failure { kind: FailureKind, message: String },
}

impl<T> AuthResult<T> {
    pub fn success(data: T) -> Self {
        AuthResult::Success { data }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        AuthResult::Failure { kind, message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthResult::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            AuthResult::Success { data } => Some(data),
            AuthResult::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AuthResult::Success { .. } => None,
            AuthResult::Failure { message, .. } => Some(message),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            AuthResult::Success { .. } => None,
            AuthResult::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn into_result(self) -> Result<T, (FailureKind, String)> {
        match self {
            AuthResult::Success { data } => Ok(data),
            AuthResult::Failure { kind, message } => Err((kind, message)),
        }
    }
}
