use std::{collections::HashMap, hash::Hash, path::PathBuf, sync::Arc};
use tokio::{fs, sync::RwLock};
use tracing::warn;

use crate::errors::StoreError;

/// Generic JSON file-backed key-value map store.
///
/// Persists a `HashMap<K, V>` to a JSON file. Every mutation rewrites the whole
/// map through a temporary file and a rename, so readers of the file never see
/// a half-written map.
pub struct JsonMapStore<K, V> {
    inner: RwLock<HashMap<K, V>>,
    file_path: PathBuf,
}

impl<K, V> JsonMapStore<K, V>
where
    K: Eq + Hash + serde::Serialize + serde::de::DeserializeOwned + Clone,
    V: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    /// Open the store at `path`. A missing file starts empty; an unreadable one
    /// is logged and treated as empty.
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, StoreError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let map: HashMap<K, V> = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %file_path.display(), error = %e, "discarding unreadable store file");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Ok(Arc::new(Self { inner: RwLock::new(map), file_path }))
    }

    async fn save(&self, map: &HashMap<K, V>) -> Result<(), StoreError> {
        let data = serde_json::to_vec(map)?;
        let tmp = self.file_path.with_extension("json.tmp");
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, &self.file_path).await?;
        Ok(())
    }

    /// Get value by key.
    pub async fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().await;
        map.get(key).cloned()
    }

    /// Insert or update a value by key and persist.
    pub async fn insert(&self, key: K, value: V) -> Result<(), StoreError> {
        self.update_map(|m| {
            m.insert(key, value);
        })
        .await
    }

    /// Remove a key and persist; returns whether it existed.
    pub async fn remove(&self, key: &K) -> Result<bool, StoreError> {
        let mut existed = false;
        self.update_map(|m| existed = m.remove(key).is_some()).await?;
        Ok(existed)
    }

    /// Drop every entry and persist the empty map.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.update_map(HashMap::clear).await
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Apply a mutation under the write lock and persist before releasing it,
    /// so concurrent writers are serialized and the last one wins.
    pub async fn update_map<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut HashMap<K, V>),
    {
        let mut map = self.inner.write().await;
        f(&mut map);
        self.save(&map).await
    }
}
