//! JSON snapshot files backing the in-memory stores.
//!
//! A snapshot is the whole collection serialized as one JSON document. Writes go
//! to a sibling temp file first and are renamed over the target.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::error::StoreResult;

/// Read a snapshot, or `T::default()` if the file does not exist yet.
pub async fn load<T>(path: &Path) -> StoreResult<T>
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes)?;
            info!(target: "store", path = %path.display(), bytes = bytes.len(), "Loaded snapshot");
            Ok(value)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(target: "store", path = %path.display(), "No snapshot yet; starting empty");
            Ok(T::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Persist `value` at `path`.
pub async fn save<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(target: "store", path = %path.display(), bytes = bytes.len(), "Snapshot written");
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
