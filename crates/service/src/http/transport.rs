use async_trait::async_trait;
use configs::ApiConfig;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::errors::HttpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One outbound request, path relative to the backend base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), body: None, query: Vec::new(), bearer: None }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Parsed JSON body; `Null` when empty, a JSON string when not JSON.
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_value(self.body.clone()).map_err(|e| HttpError::Decode(e.to_string()))
    }
}

/// Sends a single request. No auth handling happens at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, HttpError>;
}

/// `reqwest`-backed transport with the configured timeouts.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(cfg: &ApiConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .connect_timeout(cfg.connect_timeout())
            .build()?;
        Ok(Self { client, base_url: cfg.base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, HttpError> {
        let url = self.url(&req.path);
        debug!(method = ?req.method, %url, authenticated = req.bearer.is_some(), "sending request");

        let mut builder = self.client.request(req.method.into(), &url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        debug!(%url, status, "response received");
        Ok(ApiResponse { status, body })
    }
}

/// Scripted transport for tests and doc examples.
pub mod mock {
    use super::*;
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, HttpError> + Send + Sync>;

    pub struct MockTransport {
        handler: Handler,
        latency: Option<Duration>,
        calls: Mutex<Vec<ApiRequest>>,
    }

    impl MockTransport {
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&ApiRequest) -> Result<ApiResponse, HttpError> + Send + Sync + 'static,
        {
            Self { handler: Box::new(handler), latency: None, calls: Mutex::new(Vec::new()) }
        }

        /// Sleep before answering each request, so concurrent callers interleave.
        pub fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = Some(latency);
            self
        }

        pub fn calls(&self) -> Vec<ApiRequest> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        pub fn count(&self, method: Method, path: &str) -> usize {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).iter().filter(|c| c.method == method && c.path == path).count()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, req: ApiRequest) -> Result<ApiResponse, HttpError> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(req.clone());
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            (self.handler)(&req)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        let cfg = ApiConfig { base_url: base.into(), ..Default::default() };
        ReqwestTransport::new(&cfg).unwrap()
    }

    #[test]
    fn joins_paths_onto_base() {
        let t = transport("http://hr.local/api/");
        assert_eq!(t.url("/auth/login"), "http://hr.local/api/auth/login");
        assert_eq!(t.url("auth/profile"), "http://hr.local/api/auth/profile");
        assert_eq!(t.url("https://other.host/x"), "https://other.host/x");
    }

    #[test]
    fn response_helpers() {
        let ok = ApiResponse::new(204, Value::Null);
        assert!(ok.is_success());
        let bad = ApiResponse::new(401, serde_json::json!({"detail": "expired"}));
        assert!(!bad.is_success());
        assert!(bad.json::<Vec<u8>>().is_err());
    }
}
