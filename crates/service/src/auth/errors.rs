use models::errors::ModelError;
use models::{AuthResult, FailureKind};
use thiserror::Error;

use crate::errors::StoreError;
use crate::http::HttpError;

pub const NETWORK_FAILURE_MESSAGE: &str = "Unable to reach the server. Please try again.";
pub const NOT_AUTHENTICATED_MESSAGE: &str = "Not authenticated";
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Failures inside session operations. Converted to `AuthResult` before
/// leaving `SessionManager`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("credentials were revoked before the session was established")]
    CredentialsRevoked,
}

impl AuthError {
    /// Stable numeric code for logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Http(e) if e.is_transport() => 1001,
            AuthError::Http(HttpError::Unauthorized | HttpError::RefreshFailed(_)) => 1002,
            AuthError::Http(_) => 1003,
            AuthError::Model(_) => 1101,
            AuthError::Storage(_) => 1102,
            AuthError::NotAuthenticated => 1201,
            AuthError::CredentialsRevoked => 1202,
        }
    }

    /// Map to a user-facing failure; `fallback` is used when the backend gave no message.
    pub fn into_failure<T>(self, fallback: &str) -> AuthResult<T> {
        match self {
            AuthError::Http(e) if e.is_transport() => AuthResult::failure(FailureKind::Network, NETWORK_FAILURE_MESSAGE),
            AuthError::Http(HttpError::Unauthorized | HttpError::RefreshFailed(_)) => {
                AuthResult::failure(FailureKind::NotAuthenticated, SESSION_EXPIRED_MESSAGE)
            }
            AuthError::Http(e) => {
                let message = e.backend_message().unwrap_or(fallback).to_string();
                AuthResult::failure(FailureKind::Rejected, message)
            }
            AuthError::NotAuthenticated => AuthResult::failure(FailureKind::NotAuthenticated, NOT_AUTHENTICATED_MESSAGE),
            AuthError::Model(_) | AuthError::Storage(_) | AuthError::CredentialsRevoked => {
                AuthResult::failure(FailureKind::Rejected, fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_message_wins_over_fallback() {
        let e = AuthError::from(HttpError::Status { status: 401, message: Some("No active account".into()) });
        let r: AuthResult<()> = e.into_failure("Login failed");
        assert_eq!(r.error_message(), Some("No active account"));
        assert_eq!(r.failure_kind(), Some(FailureKind::Rejected));

        let e = AuthError::from(HttpError::Status { status: 400, message: None });
        assert_eq!(e.into_failure::<()>("Login failed").error_message(), Some("Login failed"));
    }

    #[test]
    fn network_failures_are_generic() {
        let r: AuthResult<()> = AuthError::from(HttpError::Timeout).into_failure("Login failed");
        assert_eq!(r.failure_kind(), Some(FailureKind::Network));
        assert_eq!(r.error_message(), Some(NETWORK_FAILURE_MESSAGE));
    }

    #[test]
    fn expired_session_is_not_authenticated() {
        let r: AuthResult<()> = AuthError::from(HttpError::RefreshFailed("x".into())).into_failure("Update failed");
        assert_eq!(r.failure_kind(), Some(FailureKind::NotAuthenticated));
    }
}
