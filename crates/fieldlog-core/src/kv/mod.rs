//! Key-value storage backends.
//!
//! Every backend speaks the same small async contract over string keys and
//! string values. The event store only ever sees [`KeyValueStore`]; which
//! backend sits behind it is decided once at startup (see [`ConfiguredStore`]).

mod configured;
mod fallback;
mod file;
mod libsql_store;
mod memory;

use std::future::Future;

use thiserror::Error;

pub use configured::ConfiguredStore;
pub use fallback::FallbackStore;
pub use file::FileStore;
pub use libsql_store::LibSqlStore;
pub use memory::MemoryStore;

/// Result type for key-value backends
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by durable backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    #[error("Corrupt store file: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Async string key-value storage.
///
/// Backends must be shareable across tasks; every method is a suspension
/// point for the caller.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` when the key is absent.
    fn get_item(&self, key: &str) -> impl Future<Output = StoreResult<Option<String>>> + Send;

    /// Insert or overwrite a value.
    fn set_item(&self, key: &str, value: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Remove a key. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> impl Future<Output = StoreResult<()>> + Send;

    /// Remove every key.
    fn clear(&self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Write several pairs.
    fn multi_set(&self, pairs: &[(String, String)]) -> impl Future<Output = StoreResult<()>> + Send {
        async move {
            for (key, value) in pairs {
                self.set_item(key, value).await?;
            }
            Ok(())
        }
    }

    /// Read several keys; the output order matches `keys`.
    fn multi_get(
        &self,
        keys: &[String],
    ) -> impl Future<Output = StoreResult<Vec<Option<String>>>> + Send {
        async move {
            let mut values = Vec::with_capacity(keys.len());
            for key in keys {
                values.push(self.get_item(key).await?);
            }
            Ok(values)
        }
    }
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every backend has to share.

    use super::KeyValueStore;

    pub async fn exercise<S: KeyValueStore>(store: &S) {
        assert_eq!(store.get_item("missing").await.unwrap(), None);

        store.set_item("a", "1").await.unwrap();
        store.set_item("a", "2").await.unwrap();
        assert_eq!(store.get_item("a").await.unwrap().as_deref(), Some("2"));

        store
            .multi_set(&[
                ("b".to_string(), "two".to_string()),
                ("c".to_string(), "three".to_string()),
            ])
            .await
            .unwrap();
        let values = store
            .multi_get(&["c".to_string(), "missing".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(
            values,
            vec![Some("three".to_string()), None, Some("two".to_string())]
        );

        store.remove_item("a").await.unwrap();
        store.remove_item("a").await.unwrap();
        assert_eq!(store.get_item("a").await.unwrap(), None);

        store.clear().await.unwrap();
        assert_eq!(store.get_item("b").await.unwrap(), None);
        assert_eq!(store.get_item("c").await.unwrap(), None);
    }
}
