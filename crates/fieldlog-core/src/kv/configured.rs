//! Backend chosen once at startup from configuration.

use std::path::Path;

use super::{FallbackStore, FileStore, KeyValueStore, LibSqlStore, MemoryStore, StoreResult};
use crate::config::StorageBackend;

const FILE_STORE_NAME: &str = "fieldlog-store.json";
const LIBSQL_STORE_NAME: &str = "fieldlog.db";

/// The key-value backend selected by [`StorageBackend`].
///
/// Durable backends are wrapped in a [`FallbackStore`]. A durable backend that
/// cannot even be opened yields [`ConfiguredStore::Degraded`].
#[derive(Debug)]
pub enum ConfiguredStore {
    File(FallbackStore<FileStore>),
    LibSql(FallbackStore<LibSqlStore>),
    Memory(MemoryStore),
    Degraded(MemoryStore),
}

impl ConfiguredStore {
    /// Open the configured backend under `data_dir`. Never fails.
    pub async fn open(backend: StorageBackend, data_dir: &Path) -> Self {
        match backend {
            StorageBackend::File => {
                let path = data_dir.join(FILE_STORE_NAME);
                tracing::debug!("Using file storage at {}", path.display());
                Self::File(FallbackStore::new(FileStore::new(path)))
            }
            StorageBackend::LibSql => {
                let path = data_dir.join(LIBSQL_STORE_NAME);
                match LibSqlStore::open(&path).await {
                    Ok(store) => {
                        tracing::debug!("Using libSQL storage at {}", path.display());
                        Self::LibSql(FallbackStore::new(store))
                    }
                    Err(error) => {
                        tracing::warn!(
                            "Failed to open libSQL storage at {}: {}. Falling back to in-memory storage for this session",
                            path.display(),
                            error
                        );
                        Self::Degraded(MemoryStore::new())
                    }
                }
            }
            StorageBackend::Memory => {
                tracing::info!("Running with volatile in-memory storage");
                Self::Memory(MemoryStore::new())
            }
        }
    }

    /// Whether data written now will be lost when the process exits
    /// although a durable backend was requested.
    pub fn is_degraded(&self) -> bool {
        match self {
            Self::File(store) => store.is_degraded(),
            Self::LibSql(store) => store.is_degraded(),
            Self::Memory(_) => false,
            Self::Degraded(_) => true,
        }
    }

    pub const fn backend(&self) -> StorageBackend {
        match self {
            Self::File(_) => StorageBackend::File,
            Self::LibSql(_) => StorageBackend::LibSql,
            Self::Memory(_) | Self::Degraded(_) => StorageBackend::Memory,
        }
    }
}

impl KeyValueStore for ConfiguredStore {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        match self {
            Self::File(store) => store.get_item(key).await,
            Self::LibSql(store) => store.get_item(key).await,
            Self::Memory(store) | Self::Degraded(store) => store.get_item(key).await,
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        match self {
            Self::File(store) => store.set_item(key, value).await,
            Self::LibSql(store) => store.set_item(key, value).await,
            Self::Memory(store) | Self::Degraded(store) => store.set_item(key, value).await,
        }
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        match self {
            Self::File(store) => store.remove_item(key).await,
            Self::LibSql(store) => store.remove_item(key).await,
            Self::Memory(store) | Self::Degraded(store) => store.remove_item(key).await,
        }
    }

    async fn clear(&self) -> StoreResult<()> {
        match self {
            Self::File(store) => store.clear().await,
            Self::LibSql(store) => store.clear().await,
            Self::Memory(store) | Self::Degraded(store) => store.clear().await,
        }
    }

    async fn multi_set(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        match self {
            Self::File(store) => store.multi_set(pairs).await,
            Self::LibSql(store) => store.multi_set(pairs).await,
            Self::Memory(store) | Self::Degraded(store) => store.multi_set(pairs).await,
        }
    }

    async fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        match self {
            Self::File(store) => store.multi_get(keys).await,
            Self::LibSql(store) => store.multi_get(keys).await,
            Self::Memory(store) | Self::Degraded(store) => store.multi_get(keys).await,
        }
    }
}
