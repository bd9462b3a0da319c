use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Backend paths, relative to `api.base_url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub login: String,
    pub refresh: String,
    pub logout: String,
    pub profile: String,
    pub register: String,
    pub change_password: String,
    pub password_reset: String,
    pub password_reset_confirm: String,
    pub notifications: String,
    pub notifications_mark_all_read: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            login: "/auth/login".into(),
            refresh: "/auth/token/refresh".into(),
            logout: "/auth/logout".into(),
            profile: "/auth/profile".into(),
            register: "/auth/register".into(),
            change_password: "/auth/change-password".into(),
            password_reset: "/users/password-reset/".into(),
            password_reset_confirm: "/users/password-reset-confirm/".into(),
            notifications: "/notifications/my-notifications/".into(),
            notifications_mark_all_read: "/notifications/mark-all-read/".into(),
        }
    }
}

/// Client-side navigation targets used by route guards.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoutesConfig {
    pub login: String,
    pub admin_home: String,
    pub employee_home: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            admin_home: "/admin/dashboard".into(),
            employee_home: "/employee/dashboard".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("data/session.json") }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub poll_interval_secs: u64,
    /// Ask the backend for unread items only.
    pub unread_only: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { enabled: true, poll_interval_secs: 30, unread_only: false }
    }
}

impl NotificationsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_request_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }

/// Load from `CONFIG_PATH` (default `client.toml`). A missing file yields defaults.
pub fn load_default() -> Result<ClientConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "client.toml".to_string());
    match std::fs::metadata(&path) {
        Ok(_) => load_from_file(&path),
        Err(_) => Ok(ClientConfig::default()),
    }
}

pub fn load_from_file(path: &str) -> Result<ClientConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<ClientConfig> {
    let cfg: ClientConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl ClientConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.apply_env_overrides();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// `BASE_URL` and `REQUEST_TIMEOUT_SECS` take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("BASE_URL") {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        if let Some(secs) = std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()) {
            self.api.request_timeout_secs = secs;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.api.normalize_and_validate()?;
        if self.notifications.poll_interval_secs == 0 {
            return Err(anyhow!("notifications.poll_interval_secs must be >= 1"));
        }
        for (name, path) in [
            ("routes.login", &self.routes.login),
            ("routes.admin_home", &self.routes.admin_home),
            ("routes.employee_home", &self.routes.employee_home),
        ] {
            if !path.starts_with('/') {
                return Err(anyhow!("{name} must be an absolute path, got {path:?}"));
            }
        }
        Ok(())
    }

}

impl ApiConfig {
    fn normalize_and_validate(&mut self) -> Result<()> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(anyhow!("api.base_url is empty; set it in the config file or BASE_URL"));
        }
        let lower = trimmed.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("api.base_url must start with http:// or https://"));
        }
        self.base_url = trimmed;
        if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(anyhow!("api timeouts must be positive seconds"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let mut cfg = ClientConfig::default();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.api.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.endpoints.refresh, "/auth/token/refresh");
        assert_eq!(cfg.routes.login, "/login");
        assert_eq!(cfg.notifications.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn partial_file_keeps_section_defaults() {
        let mut cfg = load_from_str(
            r#"
            [api]
            base_url = "https://hr.example.com/api/"

            [routes]
            admin_home = "/hr/home"
            "#,
        )
        .unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.api.base_url, "https://hr.example.com/api");
        assert_eq!(cfg.api.request_timeout_secs, 30);
        assert_eq!(cfg.routes.admin_home, "/hr/home");
        assert_eq!(cfg.routes.login, "/login");
        assert_eq!(cfg.endpoints.login, "/auth/login");
        assert_eq!(cfg.endpoints.password_reset_confirm, "/users/password-reset-confirm/");
        assert!(!cfg.notifications.unread_only);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut cfg = ClientConfig::default();
        cfg.api.base_url = "ftp://hr.example.com".into();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn rejects_zero_timeouts_and_intervals() {
        let mut cfg = ClientConfig::default();
        cfg.api.request_timeout_secs = 0;
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg = ClientConfig::default();
        cfg.notifications.poll_interval_secs = 0;
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn rejects_relative_route() {
        let mut cfg = ClientConfig::default();
        cfg.routes.login = "login".into();
        assert!(cfg.normalize_and_validate().is_err());
    }
}
