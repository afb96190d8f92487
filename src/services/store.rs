//! Persistent key-value store
//!
//! The store is a flat map of JSON values. It has no transactions: the last
//! writer of a key wins.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const KEY_IS_ENABLED: &str = "isEnabled";
pub const KEY_SETTINGS: &str = "settings";
pub const KEY_STATS: &str = "stats";
pub const KEY_ERRORS: &str = "errors";

/// Asynchronous get/set collaborator
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch the requested keys. Missing keys are absent from the result.
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>>;

    /// Write every entry, replacing existing values.
    async fn set(&self, entries: Map<String, Value>) -> Result<()>;
}

/// Decode one key from a fetched map
pub fn read_value<T: DeserializeOwned>(
    values: &Map<String, Value>,
    key: &str,
) -> Result<Option<T>> {
    match values.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| Error::StoreFormat {
                key: key.to_string(),
                source,
            }),
    }
}

/// Write a single key
pub async fn write_value<T: Serialize + ?Sized>(
    store: &dyn Store,
    key: &str,
    value: &T,
) -> Result<()> {
    let encoded = serde_json::to_value(value).map_err(|source| Error::StoreFormat {
        key: key.to_string(),
        source,
    })?;
    let mut entries = Map::new();
    entries.insert(key.to_string(), encoded);
    store.set(entries).await
}

/// In-memory store, used for tests and `--ephemeral` runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing contents
    pub fn with_values(values: Map<String, Value>) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }

    /// Copy of everything stored
    pub fn contents(&self) -> Map<String, Value> {
        self.values.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let values = self.values.lock().map_err(|_| Error::Lock("memory store"))?;
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| Error::Lock("memory store"))?;
        values.extend(entries);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk. Every write rewrites the
/// whole file through a temporary sibling and a rename.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: tokio::sync::Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating parent directories. A missing
    /// file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::StoreIo {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let cache = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| Error::StoreFormat {
                key: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store at {}, starting empty", path.display());
                Map::new()
            }
            Err(source) => return Err(Error::StoreIo { path, source }),
        };

        debug!("Opened store {} with {} keys", path.display(), cache.len());
        Ok(Self {
            path,
            cache: tokio::sync::Mutex::new(cache),
        })
    }

    /// Open the store, moving an unreadable file aside and starting empty.
    /// The load error is handed back so the caller can record it.
    pub async fn open_or_recover(path: impl Into<PathBuf>) -> Result<(Self, Option<Error>)> {
        let path = path.into();
        match Self::open(&path).await {
            Ok(store) => Ok((store, None)),
            Err(err @ Error::StoreFormat { .. }) => {
                let aside = path.with_extension("json.corrupt");
                warn!(
                    "Store {} is unreadable ({}), moving it to {}",
                    path.display(),
                    err,
                    aside.display()
                );
                tokio::fs::rename(&path, &aside)
                    .await
                    .map_err(|source| Error::StoreIo {
                        path: path.clone(),
                        source,
                    })?;
                let store = Self::open(&path).await?;
                Ok((store, Some(err)))
            }
            Err(err) => Err(err),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, values: &Map<String, Value>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(values).map_err(|source| Error::StoreFormat {
            key: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|source| Error::StoreIo {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| Error::StoreIo {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let values = self.cache.lock().await;
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        let mut values = self.cache.lock().await;
        values.extend(entries);
        self.flush(&values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_returns_only_present_keys() {
        let store = MemoryStore::new();
        write_value(&store, KEY_IS_ENABLED, &false).await.unwrap();

        let values = store.get(&[KEY_IS_ENABLED, KEY_SETTINGS]).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(read_value::<bool>(&values, KEY_IS_ENABLED).unwrap(), Some(false));
        assert_eq!(read_value::<bool>(&values, KEY_SETTINGS).unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_value_reports_key() {
        let mut initial = Map::new();
        initial.insert(KEY_IS_ENABLED.to_string(), json!("yes"));
        let store = MemoryStore::with_values(initial);

        let values = store.get(&[KEY_IS_ENABLED]).await.unwrap();
        let err = read_value::<bool>(&values, KEY_IS_ENABLED).unwrap_err();
        assert!(matches!(err, Error::StoreFormat { ref key, .. } if key == KEY_IS_ENABLED));
    }

    #[tokio::test]
    async fn json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        write_value(&store, KEY_SETTINGS, &json!({"interval": 30, "breakDuration": 10}))
            .await
            .unwrap();
        write_value(&store, KEY_IS_ENABLED, &true).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let values = reopened.get(&[KEY_SETTINGS, KEY_IS_ENABLED]).await.unwrap();
        assert_eq!(values[KEY_SETTINGS], json!({"interval": 30, "breakDuration": 10}));
        assert_eq!(values[KEY_IS_ENABLED], json!(true));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(Error::StoreFormat { .. })
        ));
    }

    #[tokio::test]
    async fn recover_moves_corrupt_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{not json").unwrap();

        let (store, load_error) = JsonFileStore::open_or_recover(&path).await.unwrap();
        assert!(matches!(load_error, Some(Error::StoreFormat { .. })));
        assert_eq!(store.path(), path.as_path());
        assert!(store.get(&[KEY_SETTINGS]).await.unwrap().is_empty());
        assert!(path.with_extension("json.corrupt").exists());
    }
}
