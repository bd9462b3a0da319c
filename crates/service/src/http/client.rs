use std::sync::Arc;

use models::{RefreshResponse, TokenPair};
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::errors::{extract_message, HttpError};
use super::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::token_store::{StorageKey, TokenStore};

/// Emitted when the client gives up on the stored credentials and wipes them.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionExpired {
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Send without a bearer token and never attempt a refresh (login, register).
    pub anonymous: bool,
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn anonymous() -> Self {
        Self { anonymous: true, ..Default::default() }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Backend client that attaches the stored access token and, on a 401,
/// refreshes it once before giving up.
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
    refresh_path: String,
    refresh_lock: Mutex<()>,
    expired_tx: broadcast::Sender<SessionExpired>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>, refresh_path: impl Into<String>) -> Self {
        let (expired_tx, _) = broadcast::channel(16);
        Self { transport, store, refresh_path: refresh_path.into(), refresh_lock: Mutex::new(()), expired_tx }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Forced-logout notifications (refresh failed or no refresh token).
    pub fn subscribe_expired(&self) -> broadcast::Receiver<SessionExpired> {
        self.expired_tx.subscribe()
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, HttpError> {
        self.request(Method::Get, path, None, RequestOptions::default()).await
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<ApiResponse, HttpError> {
        self.request(Method::Post, path, body, RequestOptions::default()).await
    }

    pub async fn put(&self, path: &str, body: Option<Value>) -> Result<ApiResponse, HttpError> {
        self.request(Method::Put, path, body, RequestOptions::default()).await
    }

    pub async fn patch(&self, path: &str, body: Option<Value>) -> Result<ApiResponse, HttpError> {
        self.request(Method::Patch, path, body, RequestOptions::default()).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, HttpError> {
        self.request(Method::Delete, path, None, RequestOptions::default()).await
    }

    /// Issue a request. Non-2xx answers come back as `HttpError::Status`; a 401
    /// triggers at most one refresh-and-retry for this call.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<ApiResponse, HttpError> {
        let base = ApiRequest { method, path: path.to_string(), body, query: options.query, bearer: None };

        if options.anonymous {
            let resp = self.transport.send(base).await?;
            return ensure_success(resp);
        }

        let mut refreshed = false;
        loop {
            let token = self.store.get(StorageKey::AccessToken).await;
            let mut req = base.clone();
            req.bearer = token.clone();

            let resp = self.transport.send(req).await?;
            if resp.status != 401 {
                return ensure_success(resp);
            }
            if refreshed {
                warn!(%path, "still unauthorized after token refresh");
                return Err(HttpError::Unauthorized);
            }
            refreshed = true;
            debug!(%path, "401 received; refreshing access token");
            self.refresh_after_unauthorized(token.as_deref()).await?;
        }
    }

    /// Refresh under a single-flight lock. If another request already replaced
    /// the token we were rejected with, reuse that one instead.
    async fn refresh_after_unauthorized(&self, rejected: Option<&str>) -> Result<(), HttpError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.store.get(StorageKey::AccessToken).await;
        if current.is_some() && current.as_deref() != rejected {
            debug!("access token already refreshed by a concurrent request");
            return Ok(());
        }

        let Some(refresh) = self.store.get(StorageKey::RefreshToken).await else {
            self.expire("no refresh token available").await;
            return Err(HttpError::Unauthorized);
        };

        match self.call_refresh(&refresh).await {
            Ok(resp) => {
                match resp.refresh {
                    Some(rotated) => {
                        self.store.set_credentials(&TokenPair { access: resp.access, refresh: rotated }).await?
                    }
                    None => self.store.set(StorageKey::AccessToken, resp.access).await?,
                }
                info!("access token refreshed");
                Ok(())
            }
            Err(e) => {
                self.expire(&e.to_string()).await;
                Err(HttpError::RefreshFailed(e.to_string()))
            }
        }
    }

    async fn call_refresh(&self, refresh: &str) -> Result<RefreshResponse, HttpError> {
        let req = ApiRequest::new(Method::Post, self.refresh_path.clone()).with_body(json!({ "refresh": refresh }));
        let resp = ensure_success(self.transport.send(req).await?)?;
        resp.json::<RefreshResponse>()
    }

    async fn expire(&self, reason: &str) {
        warn!(reason, "session expired; clearing stored credentials");
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to clear token store");
        }
        // No receivers just means nobody is listening yet.
        let _ = self.expired_tx.send(SessionExpired { reason: reason.to_string() });
    }
}

fn ensure_success(resp: ApiResponse) -> Result<ApiResponse, HttpError> {
    if resp.is_success() {
        Ok(resp)
    } else {
        Err(HttpError::Status { status: resp.status, message: extract_message(&resp.body) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::mock::MockTransport;
    use crate::token_store::MemoryTokenStore;
    use std::time::Duration;

    const REFRESH: &str = "/auth/token/refresh";

    async fn seeded_store() -> Arc<MemoryTokenStore> {
        let store = MemoryTokenStore::new();
        store.set_credentials(&TokenPair { access: "old".into(), refresh: "r1".into() }).await.unwrap();
        store.set(StorageKey::UserData, "{}".into()).await.unwrap();
        store
    }

    fn client(transport: Arc<MockTransport>, store: Arc<MemoryTokenStore>) -> ApiClient {
        ApiClient::new(transport, store, REFRESH)
    }

    /// Accepts only bearer `new`; refresh hands out `new`.
    fn rotating_backend(refresh_ok: bool) -> MockTransport {
        MockTransport::new(move |req| {
            if req.path == REFRESH {
                return Ok(if refresh_ok {
                    ApiResponse::new(200, json!({"access": "new"}))
                } else {
                    ApiResponse::new(401, json!({"detail": "Token is blacklisted"}))
                });
            }
            match req.bearer.as_deref() {
                Some("new") => Ok(ApiResponse::new(200, json!({"ok": true, "path": req.path}))),
                _ => Ok(ApiResponse::new(401, json!({"detail": "expired"}))),
            }
        })
    }

    #[tokio::test]
    async fn attaches_bearer_when_token_present() {
        let transport = Arc::new(MockTransport::new(|_| Ok(ApiResponse::new(200, Value::Null))));
        let store = seeded_store().await;
        let api = client(transport.clone(), store);
        api.get("/attendance/my-attendance/").await.unwrap();
        assert_eq!(transport.calls()[0].bearer.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn anonymous_request_skips_bearer_and_refresh() {
        let transport = Arc::new(MockTransport::new(|_| Ok(ApiResponse::new(401, json!({"detail": "bad creds"})))));
        let store = seeded_store().await;
        let api = client(transport.clone(), store.clone());
        let err = api
            .request(Method::Post, "/auth/login", Some(json!({})), RequestOptions::anonymous())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.backend_message(), Some("bad creds"));
        assert!(transport.calls()[0].bearer.is_none());
        assert_eq!(transport.count(Method::Post, REFRESH), 0);
        assert!(store.credentials().await.is_some());
    }

    #[tokio::test]
    async fn refreshes_once_and_retries_with_new_token() {
        let transport = Arc::new(rotating_backend(true));
        let store = seeded_store().await;
        let api = client(transport.clone(), store.clone());

        let resp = api.get("/payroll/my-payroll/").await.unwrap();
        assert_eq!(resp.body["ok"], true);
        assert_eq!(store.get(StorageKey::AccessToken).await.as_deref(), Some("new"));
        assert_eq!(store.get(StorageKey::RefreshToken).await.as_deref(), Some("r1"));
        assert_eq!(transport.count(Method::Post, REFRESH), 1);
        assert_eq!(transport.count(Method::Get, "/payroll/my-payroll/"), 2);
        let refresh_call = transport.calls().into_iter().find(|c| c.path == REFRESH).unwrap();
        assert_eq!(refresh_call.body, Some(json!({"refresh": "r1"})));
        assert!(refresh_call.bearer.is_none());
    }

    #[tokio::test]
    async fn rotated_refresh_token_is_stored() {
        let transport = Arc::new(MockTransport::new(|req| {
            if req.path == REFRESH {
                return Ok(ApiResponse::new(200, json!({"access": "new", "refresh": "r2"})));
            }
            Ok(match req.bearer.as_deref() {
                Some("new") => ApiResponse::new(200, Value::Null),
                _ => ApiResponse::new(401, Value::Null),
            })
        }));
        let store = seeded_store().await;
        let api = client(transport, store.clone());
        api.get("/leaves/my-leaves/").await.unwrap();
        assert_eq!(store.credentials().await, Some(TokenPair { access: "new".into(), refresh: "r2".into() }));
    }

    #[tokio::test]
    async fn failed_refresh_clears_store_and_signals_expiry() {
        let transport = Arc::new(rotating_backend(false));
        let store = seeded_store().await;
        let api = client(transport.clone(), store.clone());
        let mut expired = api.subscribe_expired();

        let err = api.get("/users/profile/").await.unwrap_err();
        assert!(matches!(err, HttpError::RefreshFailed(_)));
        assert!(store.is_empty().await);
        assert!(expired.try_recv().is_ok());
        assert_eq!(transport.count(Method::Post, REFRESH), 1);
    }

    #[tokio::test]
    async fn missing_refresh_token_is_terminal() {
        let transport = Arc::new(rotating_backend(true));
        let store = MemoryTokenStore::new();
        store.set(StorageKey::AccessToken, "old".into()).await.unwrap();
        let api = client(transport.clone(), store.clone());
        let mut expired = api.subscribe_expired();

        let err = api.get("/users/profile/").await.unwrap_err();
        assert!(matches!(err, HttpError::Unauthorized));
        assert_eq!(transport.count(Method::Post, REFRESH), 0);
        assert!(store.is_empty().await);
        assert!(expired.try_recv().is_ok());
    }

    #[tokio::test]
    async fn second_401_after_refresh_does_not_refresh_again() {
        let transport = Arc::new(MockTransport::new(|req| {
            if req.path == REFRESH {
                return Ok(ApiResponse::new(200, json!({"access": "new"})));
            }
            Ok(ApiResponse::new(401, json!({"detail": "forbidden forever"})))
        }));
        let store = seeded_store().await;
        let api = client(transport.clone(), store);

        let err = api.get("/payroll/all/").await.unwrap_err();
        assert!(matches!(err, HttpError::Unauthorized));
        assert_eq!(transport.count(Method::Post, REFRESH), 1);
        assert_eq!(transport.count(Method::Get, "/payroll/all/"), 2);
    }

    #[tokio::test]
    async fn non_401_errors_propagate_unmodified() {
        let transport = Arc::new(MockTransport::new(|_| Ok(ApiResponse::new(500, json!({"error": "boom"})))));
        let store = seeded_store().await;
        let api = client(transport.clone(), store.clone());
        let err = api.post("/attendance/check-in/", None).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.backend_message(), Some("boom"));
        assert_eq!(transport.calls().len(), 1);
        assert!(store.credentials().await.is_some());

        let offline = Arc::new(MockTransport::new(|_| Err(HttpError::Timeout)));
        let api = client(offline, store);
        assert!(api.get("/x").await.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn concurrent_401s_share_one_refresh() {
        let transport = Arc::new(rotating_backend(true).with_latency(Duration::from_millis(20)));
        let store = seeded_store().await;
        let api = client(transport.clone(), store.clone());

        let (a, b, c) = tokio::join!(api.get("/a"), api.get("/b"), api.get("/c"));
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(transport.count(Method::Post, REFRESH), 1);
        assert_eq!(store.get(StorageKey::AccessToken).await.as_deref(), Some("new"));
    }
}
