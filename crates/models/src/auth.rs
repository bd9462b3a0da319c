use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::user::UserRecord;

/// Credentials typed on the login form.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub login_id: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(login_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self { login_id: login_id.into(), password: password.into() }
    }

    /// Body expected by the login endpoint.
    pub fn to_wire(&self) -> Value {
        serde_json::json!({ "username": self.login_id, "password": self.password })
    }
}

/// Access/refresh token pair. Both are written and cleared together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub user: Option<Value>,
}

impl LoginResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair { access: self.access.clone(), refresh: self.refresh.clone() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    /// Present when the backend rotates refresh tokens.
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Registration payload. Unknown backend fields can be carried in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial profile update; only the fields set are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl From<&ProfileUpdate> for UserRecord {
    fn from(update: &ProfileUpdate) -> Self {
        UserRecord {
            first_name: update.first_name.clone(),
            last_name: update.last_name.clone(),
            email: update.email.clone(),
            phone: update.phone.clone(),
            department: update.department.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

/// Start of the forgotten-password flow; the backend emails a reset link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Completes a reset with the `uid`/`token` pair from the emailed link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetConfirm {
    pub uid: String,
    pub token: String,
    pub new_password: String,
}
