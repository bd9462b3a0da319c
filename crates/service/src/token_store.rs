//! Persisted session credentials.
//!
//! Three logical keys: access token, refresh token and the cached user JSON.
//! The store performs no validation; callers treat an unreadable cached user
//! as "no cached user".

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use models::{Session, TokenPair};
use tokio::sync::RwLock;
use tracing::warn;

use crate::errors::StoreError;
use crate::storage::json_map_store::JsonMapStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    UserData,
}

impl StorageKey {
    pub const ALL: [StorageKey; 3] = [StorageKey::AccessToken, StorageKey::RefreshToken, StorageKey::UserData];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::AccessToken => "auth_token",
            StorageKey::RefreshToken => "refresh_token",
            StorageKey::UserData => "user_data",
        }
    }
}

/// Key-value persistence boundary for session state.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: StorageKey) -> Option<String>;
    async fn set(&self, key: StorageKey, value: String) -> Result<(), StoreError>;
    async fn clear(&self) -> Result<(), StoreError>;

    /// Write several keys as one unit. Implementations that can persist in a
    /// single write should override this.
    async fn set_many(&self, entries: Vec<(StorageKey, String)>) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    /// Both tokens, or `None` if either is missing.
    async fn credentials(&self) -> Option<TokenPair> {
        let access = self.get(StorageKey::AccessToken).await?;
        let refresh = self.get(StorageKey::RefreshToken).await?;
        Some(TokenPair { access, refresh })
    }

    async fn set_credentials(&self, pair: &TokenPair) -> Result<(), StoreError> {
        self.set_many(vec![
            (StorageKey::AccessToken, pair.access.clone()),
            (StorageKey::RefreshToken, pair.refresh.clone()),
        ])
        .await
    }

    /// Cached session for optimistic startup. Corrupt data reads as `None`.
    async fn cached_session(&self) -> Option<Session> {
        let raw = self.get(StorageKey::UserData).await?;
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(error = %e, "cached user is unreadable; ignoring it");
                None
            }
        }
    }

    async fn store_session(&self, session: &Session) -> Result<(), StoreError> {
        let raw = serde_json::to_string(session)?;
        self.set(StorageKey::UserData, raw).await
    }
}

/// Durable store backed by a JSON file.
pub struct FileTokenStore {
    store: Arc<JsonMapStore<String, String>>,
}

impl FileTokenStore {
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, StoreError> {
        let store = JsonMapStore::<String, String>::open(path).await?;
        Ok(Arc::new(Self { store }))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: StorageKey) -> Option<String> {
        self.store.get(&key.as_str().to_string()).await
    }

    async fn set(&self, key: StorageKey, value: String) -> Result<(), StoreError> {
        self.store.insert(key.as_str().to_string(), value).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.store.clear().await
    }

    async fn set_many(&self, entries: Vec<(StorageKey, String)>) -> Result<(), StoreError> {
        self.store
            .update_map(|m| {
                for (key, value) in entries {
                    m.insert(key.as_str().to_string(), value);
                }
            })
            .await
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: RwLock<HashMap<StorageKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: StorageKey) -> Option<String> {
        self.inner.read().await.get(&key).cloned()
    }

    async fn set(&self, key: StorageKey, value: String) -> Result<(), StoreError> {
        self.inner.write().await.insert(key, value);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.inner.write().await.clear();
        Ok(())
    }

    async fn set_many(&self, entries: Vec<(StorageKey, String)>) -> Result<(), StoreError> {
        let mut map = self.inner.write().await;
        map.extend(entries);
        Ok(())
    }
}
