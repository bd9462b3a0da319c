use std::sync::Arc;

use configs::EndpointsConfig;
use models::{
    LoginRequest, LoginResponse, PasswordChange, PasswordResetConfirm, PasswordResetRequest, ProfileUpdate, RegisterInput,
    UserRecord,
};
use serde_json::{json, Value};

use super::errors::AuthError;
use crate::http::{ApiClient, HttpError, Method, RequestOptions};
use crate::token_store::TokenStore;

/// Typed wrappers over the backend's auth endpoints.
pub struct AuthApi {
    client: Arc<ApiClient>,
    endpoints: EndpointsConfig,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>, endpoints: EndpointsConfig) -> Self {
        Self { client, endpoints }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        self.client.store()
    }

    /// Returns the parsed token response and the raw body (for the embedded user).
    pub async fn login(&self, request: &LoginRequest) -> Result<(LoginResponse, Value), AuthError> {
        let resp = self
            .client
            .request(Method::Post, &self.endpoints.login, Some(request.to_wire()), RequestOptions::anonymous())
            .await?;
        let parsed = resp.json::<LoginResponse>()?;
        Ok((parsed, resp.body))
    }

    pub async fn profile(&self) -> Result<UserRecord, AuthError> {
        let resp = self.client.get(&self.endpoints.profile).await?;
        Ok(UserRecord::from_payload(&resp.body)?)
    }

    /// The backend may echo the full record, a subset, or only a message.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserRecord, AuthError> {
        let body = serde_json::to_value(update).map_err(|e| HttpError::Decode(e.to_string()))?;
        let resp = self.client.put(&self.endpoints.profile, Some(body)).await?;
        record_or_default(&resp.body)
    }

    pub async fn register(&self, input: &RegisterInput) -> Result<UserRecord, AuthError> {
        let body = serde_json::to_value(input).map_err(|e| HttpError::Decode(e.to_string()))?;
        let resp = self
            .client
            .request(Method::Post, &self.endpoints.register, Some(body), RequestOptions::anonymous())
            .await?;
        record_or_default(&resp.body)
    }

    /// Blacklist the refresh token server-side.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.client
            .post(&self.endpoints.logout, Some(json!({ "refresh_token": refresh_token })))
            .await?;
        Ok(())
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), AuthError> {
        let body = serde_json::to_value(change).map_err(|e| HttpError::Decode(e.to_string()))?;
        self.client.post(&self.endpoints.change_password, Some(body)).await?;
        Ok(())
    }

    /// Sent without a bearer token; the user is signed out.
    pub async fn request_password_reset(&self, request: &PasswordResetRequest) -> Result<(), AuthError> {
        self.post_anonymous(&self.endpoints.password_reset, request).await
    }

    pub async fn confirm_password_reset(&self, confirm: &PasswordResetConfirm) -> Result<(), AuthError> {
        self.post_anonymous(&self.endpoints.password_reset_confirm, confirm).await
    }

    async fn post_anonymous<T: serde::Serialize + Sync>(&self, path: &str, payload: &T) -> Result<(), AuthError> {
        let body = serde_json::to_value(payload).map_err(|e| HttpError::Decode(e.to_string()))?;
        self.client
            .request(Method::Post, path, Some(body), RequestOptions::anonymous())
            .await?;
        Ok(())
    }
}

fn record_or_default(body: &Value) -> Result<UserRecord, AuthError> {
    if body.is_object() {
        Ok(UserRecord::from_payload(body)?)
    } else {
        Ok(UserRecord::default())
    }
}
