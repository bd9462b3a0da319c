use std::sync::{Arc, Mutex, PoisonError};

use configs::EndpointsConfig;
use models::{
    AuthResult, LoginRequest, LoginResponse, PasswordChange, PasswordResetConfirm, PasswordResetRequest, ProfileUpdate,
    RegisterInput, Session, UserRecord,
};
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::api::AuthApi;
use super::domain::{SessionPhase, SessionSnapshot};
use super::errors::AuthError;
use crate::http::{ApiClient, SessionExpired};
use crate::token_store::{StorageKey, TokenStore};

/// Owns the client session: startup hydration, login/logout, profile
/// updates and the reaction to forced logouts from the HTTP client.
///
/// Public operations never return `Err`; failures come back as
/// `AuthResult::Failure`.
pub struct SessionManager {
    api: AuthApi,
    state: watch::Sender<SessionSnapshot>,
    phases: broadcast::Sender<SessionPhase>,
    scope: Mutex<CancellationToken>,
}

impl SessionManager {
    pub fn new(client: Arc<ApiClient>, endpoints: EndpointsConfig) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::uninitialized());
        let (phases, _) = broadcast::channel(32);
        Self { api: AuthApi::new(client, endpoints), state, phases, scope: Mutex::new(CancellationToken::new()) }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }

    /// Latest snapshot, updated on every change (including profile edits).
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Every phase transition, in order.
    pub fn subscribe_phases(&self) -> broadcast::Receiver<SessionPhase> {
        self.phases.subscribe()
    }

    /// Token cancelled when the current session ends. Background work tied to
    /// the session (polling) should run under it.
    pub fn session_scope(&self) -> CancellationToken {
        self.scope.lock().unwrap_or_else(PoisonError::into_inner).child_token()
    }

    fn store(&self) -> &Arc<dyn TokenStore> {
        self.api.store()
    }

    fn transition(&self, next: SessionSnapshot) {
        let phase = next.phase();
        let previous = self.state.send_replace(next);
        if previous.phase() != phase {
            info!(from = ?previous.phase(), to = ?phase, "session phase changed");
            let _ = self.phases.send(phase);
        }
    }

    async fn clear_store(&self) {
        if let Err(e) = self.store().clear().await {
            warn!(error = %e, "failed to clear token store");
        }
    }

    async fn end_session(&self, reason: &str) {
        self.clear_store().await;
        let previous = {
            let mut scope = self.scope.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *scope, CancellationToken::new())
        };
        previous.cancel();
        debug!(reason, "session ended");
        self.transition(SessionSnapshot::anonymous());
    }

    async fn fetch_session(&self) -> Result<Session, AuthError> {
        let record = self.api.profile().await?;
        Ok(Session::from_record(&record)?)
    }

    /// Restore the session from persisted credentials. Runs once; concurrent
    /// and later callers wait until the phase leaves `Hydrating`. Always
    /// returns an `Authenticated` or `Anonymous` snapshot.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> SessionSnapshot {
        let claimed = self.state.send_if_modified(|snap| {
            if snap.phase() != SessionPhase::Uninitialized {
                return false;
            }
            *snap = SessionSnapshot::hydrating();
            true
        });
        if !claimed {
            debug!(phase = ?self.phase(), "bootstrap already claimed; waiting for it to resolve");
            let mut rx = self.state.subscribe();
            // The sender lives in `self`, so the channel cannot close here.
            let _ = rx.wait_for(|snap| !snap.phase().is_pending()).await;
            return self.snapshot();
        }
        info!(from = ?SessionPhase::Uninitialized, to = ?SessionPhase::Hydrating, "session phase changed");
        let _ = self.phases.send(SessionPhase::Hydrating);

        if self.store().credentials().await.is_none() {
            // Drop any half-written state so a cached user never outlives its tokens.
            self.clear_store().await;
            self.transition(SessionSnapshot::anonymous());
            return self.snapshot();
        }

        match self.store().cached_session().await {
            Some(cached) => self.transition(SessionSnapshot::authenticated(cached)),
            None => debug!("credentials found without a cached user; validating before render"),
        }

        match self.fetch_session().await {
            Ok(session) => {
                // A logout may have raced the validation request.
                if self.store().credentials().await.is_none() {
                    self.end_session("credentials vanished during validation").await;
                    return self.snapshot();
                }
                if let Err(e) = self.store().store_session(&session).await {
                    warn!(error = %e, "failed to cache validated session");
                }
                info!(user_id = session.user_id, role = %session.role, "session restored");
                self.transition(SessionSnapshot::authenticated(session));
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "stored session failed validation");
                self.end_session("validation failed").await;
            }
        }
        self.snapshot()
    }

    #[instrument(skip(self, request), fields(login_id = %request.login_id))]
    pub async fn login(&self, request: LoginRequest) -> AuthResult<Session> {
        match self.try_login(&request).await {
            Ok(session) => {
                info!(user_id = session.user_id, role = %session.role, "login succeeded");
                AuthResult::success(session)
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "login failed");
                e.into_failure("Login failed")
            }
        }
    }

    async fn try_login(&self, request: &LoginRequest) -> Result<Session, AuthError> {
        let (login, raw) = self.api.login(request).await?;
        self.store().set_credentials(&login.tokens()).await?;

        // Past this point the store holds the new tokens and any previous
        // session is gone; a failure must leave the manager anonymous.
        match self.establish_session(&login, &raw).await {
            Ok(session) => {
                self.transition(SessionSnapshot::authenticated(session.clone()));
                Ok(session)
            }
            Err(e) => {
                self.end_session("login could not be completed").await;
                Err(e)
            }
        }
    }

    /// Resolve and persist the user for freshly stored tokens.
    async fn establish_session(&self, login: &LoginResponse, raw: &Value) -> Result<Session, AuthError> {
        let session = match self.fetch_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "profile fetch after login failed; using login payload");
                let embedded = login.user.as_ref().unwrap_or(raw);
                UserRecord::from_payload(embedded).and_then(|r| Session::from_record(&r))?
            }
        };

        // A failed refresh during the profile fetch wipes the tokens we just wrote.
        if self.store().credentials().await.is_none() {
            return Err(AuthError::CredentialsRevoked);
        }
        self.store().store_session(&session).await?;
        Ok(session)
    }

    /// Best-effort server logout, then unconditional local teardown.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Some(refresh) = self.store().get(StorageKey::RefreshToken).await {
            if let Err(e) = self.api.logout(&refresh).await {
                warn!(error = %e, "server logout failed; clearing local session anyway");
            }
        }
        self.end_session("logout").await;
        info!("logged out");
    }

    /// Create an account. Does not sign the new user in.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: RegisterInput) -> AuthResult<UserRecord> {
        match self.api.register(&input).await {
            Ok(record) => {
                info!(user_id = ?record.id, "user registered");
                AuthResult::success(record)
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "registration failed");
                e.into_failure("Registration failed")
            }
        }
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> AuthResult<Session> {
        match self.try_update_profile(&update).await {
            Ok(session) => AuthResult::success(session),
            Err(e) => {
                warn!(error = %e, code = e.code(), "profile update failed");
                e.into_failure("Update failed")
            }
        }
    }

    async fn try_update_profile(&self, update: &ProfileUpdate) -> Result<Session, AuthError> {
        if !self.snapshot().is_authenticated() {
            return Err(AuthError::NotAuthenticated);
        }
        let echoed = self.api.update_profile(update).await?;

        // Re-read: the session may have ended while the request was in flight.
        let mut session = self.snapshot().into_session().ok_or(AuthError::NotAuthenticated)?;
        session.merge(&UserRecord::from(update));
        session.merge(&echoed);
        self.store().store_session(&session).await?;
        self.transition(SessionSnapshot::authenticated(session.clone()));
        Ok(session)
    }

    #[instrument(skip(self, change))]
    pub async fn change_password(&self, change: PasswordChange) -> AuthResult<()> {
        if !self.snapshot().is_authenticated() {
            return AuthError::NotAuthenticated.into_failure("Password change failed");
        }
        match self.api.change_password(&change).await {
            Ok(()) => {
                info!("password changed");
                AuthResult::success(())
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "password change failed");
                e.into_failure("Password change failed")
            }
        }
    }

    /// Ask the backend to email a reset link. Leaves the session untouched.
    #[instrument(skip(self, request))]
    pub async fn request_password_reset(&self, request: PasswordResetRequest) -> AuthResult<()> {
        match self.api.request_password_reset(&request).await {
            Ok(()) => {
                info!("password reset requested");
                AuthResult::success(())
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "password reset request failed");
                e.into_failure("Password reset request failed")
            }
        }
    }

    /// Set a new password from a reset link. Does not sign the user in.
    #[instrument(skip(self, confirm))]
    pub async fn confirm_password_reset(&self, confirm: PasswordResetConfirm) -> AuthResult<()> {
        match self.api.confirm_password_reset(&confirm).await {
            Ok(()) => {
                info!("password reset confirmed");
                AuthResult::success(())
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "password reset confirmation failed");
                e.into_failure("Password reset failed")
            }
        }
    }

    /// React to a forced logout from the HTTP client. Ignored if fresh
    /// credentials were stored since (a login raced the event).
    pub async fn handle_expired(&self, event: &SessionExpired) {
        if self.store().credentials().await.is_some() {
            debug!(reason = %event.reason, "stale expiry event ignored");
            return;
        }
        if self.phase() == SessionPhase::Anonymous {
            return;
        }
        warn!(reason = %event.reason, "session expired; signing out");
        self.end_session("expired").await;
    }

    /// Spawn the listener that turns HTTP client expiry events into logouts.
    /// Stops when the manager is dropped.
    pub fn watch_expiry(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.api.client().subscribe_expired();
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        SessionExpired { reason: format!("{skipped} expiry events missed") }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(strong) = manager.upgrade() else { break };
                strong.handle_expired(&event).await;
            }
        })
    }
}
