//! Composition root: wires config, persistence, transport and the session
//! manager into one context for binaries and integration tests.

use std::sync::Arc;

use anyhow::Context;
use configs::ClientConfig;
use tokio::task::JoinHandle;
use tracing::info;

use crate::auth::SessionManager;
use crate::guard::{GuardDecision, RouteGuard};
use crate::http::{ApiClient, ReqwestTransport, Transport};
use crate::notifications::NotificationPoller;
use crate::token_store::{FileTokenStore, TokenStore};

pub struct ClientContext {
    pub config: ClientConfig,
    pub store: Arc<dyn TokenStore>,
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionManager>,
    expiry_listener: JoinHandle<()>,
}

impl ClientContext {
    /// File-backed store and `reqwest` transport from config.
    pub async fn build(config: ClientConfig) -> anyhow::Result<Self> {
        common::env::ensure_storage_dir(&config.storage.path).await?;
        let store: Arc<dyn TokenStore> = FileTokenStore::open(config.storage.path.clone())
            .await
            .with_context(|| format!("opening token store at {}", config.storage.path.display()))?;
        let transport: Arc<dyn Transport> =
            Arc::new(ReqwestTransport::new(&config.api).context("building HTTP transport")?);
        info!(base_url = %config.api.base_url, storage = %config.storage.path.display(), "client context ready");
        Ok(Self::with_parts(config, transport, store))
    }

    /// Assemble from explicit parts; must be called inside a tokio runtime.
    pub fn with_parts(config: ClientConfig, transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Self {
        let api = Arc::new(ApiClient::new(transport, Arc::clone(&store), config.endpoints.refresh.clone()));
        let session = Arc::new(SessionManager::new(Arc::clone(&api), config.endpoints.clone()));
        let expiry_listener = session.watch_expiry();
        Self { config, store, api, session, expiry_listener }
    }

    /// Start notification polling for the current session, if enabled and signed in.
    pub fn start_notifications(&self) -> Option<NotificationPoller> {
        if !self.config.notifications.enabled || !self.session.snapshot().is_authenticated() {
            return None;
        }
        Some(NotificationPoller::spawn(
            Arc::clone(&self.api),
            &self.config.endpoints,
            &self.config.notifications,
            self.session.session_scope(),
        ))
    }

    /// Decision for every guard against the current snapshot.
    pub fn guard_decisions(&self) -> Vec<(RouteGuard, GuardDecision)> {
        let snapshot = self.session.snapshot();
        RouteGuard::ALL
            .into_iter()
            .map(|guard| (guard, guard.evaluate(&snapshot, &self.config.routes)))
            .collect()
    }
}

impl Drop for ClientContext {
    fn drop(&mut self) {
        self.expiry_listener.abort();
    }
}
