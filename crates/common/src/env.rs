//! Environment/runtime helpers
//!
//! Sanity checks to ensure the session storage location is usable at startup.

use std::path::Path;

use tracing::debug;

/// Ensure the parent directory of the session file exists.
pub async fn ensure_storage_dir(storage_file: &Path) -> anyhow::Result<()> {
    let Some(parent) = storage_file.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if tokio::fs::metadata(parent).await.is_err() {
        debug!(dir = %parent.display(), "creating session storage directory");
    }
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    Ok(())
}
