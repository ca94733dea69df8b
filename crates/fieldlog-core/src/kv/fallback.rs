//! Session-long degradation from a durable backend to memory.

use std::sync::atomic::{AtomicBool, Ordering};

use super::{KeyValueStore, MemoryStore, StoreError, StoreResult};

/// Wraps a durable backend and never reports an error.
///
/// The first failure of the primary backend flips the store into degraded mode:
/// that operation and every later one run against a [`MemoryStore`] for the
/// rest of the session. Availability wins over durability here; callers are
/// not told, only the log and [`FallbackStore::is_degraded`] show it.
#[derive(Debug)]
pub struct FallbackStore<S> {
    primary: S,
    fallback: MemoryStore,
    degraded: AtomicBool,
}

impl<S: KeyValueStore> FallbackStore<S> {
    pub fn new(primary: S) -> Self {
        Self {
            primary,
            fallback: MemoryStore::new(),
            degraded: AtomicBool::new(false),
        }
    }

    /// Whether writes are currently going to memory only
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    pub const fn primary(&self) -> &S {
        &self.primary
    }

    fn degrade(&self, operation: &str, error: &StoreError) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                "Storage backend failed during {operation}: {error}. Falling back to in-memory storage for this session"
            );
        }
    }
}

impl<S: KeyValueStore> KeyValueStore for FallbackStore<S> {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        if !self.is_degraded() {
            match self.primary.get_item(key).await {
                Ok(value) => return Ok(value),
                Err(error) => self.degrade("get_item", &error),
            }
        }
        self.fallback.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        if !self.is_degraded() {
            match self.primary.set_item(key, value).await {
                Ok(()) => return Ok(()),
                Err(error) => self.degrade("set_item", &error),
            }
        }
        self.fallback.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        if !self.is_degraded() {
            match self.primary.remove_item(key).await {
                Ok(()) => return Ok(()),
                Err(error) => self.degrade("remove_item", &error),
            }
        }
        self.fallback.remove_item(key).await
    }

    async fn clear(&self) -> StoreResult<()> {
        if !self.is_degraded() {
            match self.primary.clear().await {
                Ok(()) => return Ok(()),
                Err(error) => self.degrade("clear", &error),
            }
        }
        self.fallback.clear().await
    }

    async fn multi_set(&self, pairs: &[(String, String)]) -> StoreResult<()> {
        if !self.is_degraded() {
            match self.primary.multi_set(pairs).await {
                Ok(()) => return Ok(()),
                Err(error) => self.degrade("multi_set", &error),
            }
        }
        self.fallback.multi_set(pairs).await
    }

    async fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if !self.is_degraded() {
            match self.primary.multi_get(keys).await {
                Ok(values) => return Ok(values),
                Err(error) => self.degrade("multi_get", &error),
            }
        }
        self.fallback.multi_get(keys).await
    }
}
