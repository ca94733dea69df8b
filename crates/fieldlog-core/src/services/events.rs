//! Event service used by presentation code.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::config::{ClientConfig, StorageBackend};
use crate::connectivity::{
    ConfiguredConnectivity, ConnectivityOracle, HttpProbe, ManualConnectivity,
};
use crate::event_store::EventStore;
use crate::kv::{ConfiguredStore, KeyValueStore};
use crate::models::{Event, EventId, EventPatch, NewEvent};
use crate::remote::{ConfiguredRemote, HttpEventsClient, RemoteEvents, Unconfigured};
use crate::state::SyncSummary;
use crate::sync::{spawn_on_reconnect, AutoSyncHandle, Saved, SyncEngine, SyncOutcome};
use crate::{Error, Result};

#[derive(Debug)]
struct CachedList {
    events: Vec<Event>,
    fetched_at: Instant,
}

/// Sync engine plus a short-lived cache of the event list.
///
/// List reads may be served from the cache for up to `cache_ttl`; every
/// mutation and every sync pass drops it.
#[derive(Debug)]
pub struct EventService<S, C, R> {
    engine: SyncEngine<S, C, R>,
    cache: RwLock<Option<CachedList>>,
    cache_ttl: Duration,
}

/// Service over the backends chosen from [`ClientConfig`]
pub type ConfiguredEventService =
    EventService<ConfiguredStore, ConfiguredConnectivity, ConfiguredRemote>;

impl<S, C, R> EventService<S, C, R>
where
    S: KeyValueStore,
    C: ConnectivityOracle,
    R: RemoteEvents,
{
    pub fn new(engine: SyncEngine<S, C, R>, cache_ttl: Duration) -> Self {
        Self {
            engine,
            cache: RwLock::new(None),
            cache_ttl,
        }
    }

    pub const fn engine(&self) -> &SyncEngine<S, C, R> {
        &self.engine
    }

    /// All events, possibly from cache.
    pub async fn list_events(&self) -> Result<Vec<Event>> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(cached.events.clone());
                }
            }
        }

        let events = self.engine.list_events().await?;
        *self.cache.write().await = Some(CachedList {
            events: events.clone(),
            fetched_at: Instant::now(),
        });
        Ok(events)
    }

    /// Always read through to the store.
    pub async fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        self.engine.get_event(id).await
    }

    /// Resolve a full id or a unique prefix of one.
    pub async fn resolve_id(&self, id_or_prefix: &str) -> Result<EventId> {
        let needle = id_or_prefix.trim();
        if needle.is_empty() {
            return Err(Error::InvalidInput("event id cannot be empty".to_string()));
        }
        if let Ok(id) = needle.parse::<EventId>() {
            return Ok(id);
        }

        let events = self.engine.list_events().await?;
        let mut matches = events
            .iter()
            .filter(|event| event.id.as_str().starts_with(needle));
        match (matches.next(), matches.next()) {
            (Some(event), None) => Ok(event.id),
            (None, _) => Err(Error::NotFound(format!("event {needle}"))),
            (Some(_), Some(_)) => Err(Error::InvalidInput(format!(
                "event id prefix '{needle}' is ambiguous"
            ))),
        }
    }

    pub async fn create_event(&self, draft: NewEvent) -> Result<Saved> {
        let saved = self.engine.create_event(draft).await?;
        self.invalidate().await;
        Ok(saved)
    }

    pub async fn update_event(&self, id: &EventId, patch: EventPatch) -> Result<Saved> {
        let saved = self.engine.update_event(id, patch).await?;
        self.invalidate().await;
        Ok(saved)
    }

    pub async fn delete_event(&self, id: &EventId) -> Result<bool> {
        let deleted = self.engine.delete_event(id).await?;
        self.invalidate().await;
        Ok(deleted)
    }

    pub async fn retry_event(&self, id: &EventId) -> Result<Saved> {
        let saved = self.engine.retry_event(id).await?;
        self.invalidate().await;
        Ok(saved)
    }

    pub async fn sync_events(&self) -> SyncOutcome {
        let outcome = self.engine.sync_events().await;
        self.invalidate().await;
        outcome
    }

    pub async fn sync_summary(&self) -> Result<SyncSummary> {
        self.engine.sync_summary().await
    }

    /// Drop the cached list so the next read hits the store.
    pub async fn invalidate(&self) {
        tracing::debug!("Invalidating cached event list");
        *self.cache.write().await = None;
    }
}

impl<S, C, R> EventService<S, C, R>
where
    S: KeyValueStore + 'static,
    C: ConnectivityOracle + 'static,
    R: RemoteEvents + 'static,
{
    /// Reconcile through the service on every reconnect, so the cache is
    /// dropped after automatic passes too.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> AutoSyncHandle {
        let service = Arc::clone(self);
        spawn_on_reconnect(self.engine.connectivity(), move || {
            let service = Arc::clone(&service);
            async move {
                service.sync_events().await;
            }
        })
    }
}

impl ConfiguredEventService {
    /// Build the service from configuration.
    ///
    /// Without an API URL, or with `force_offline`, connectivity is pinned
    /// to offline and every change stays local.
    pub async fn open(config: &ClientConfig, data_dir: &Path, force_offline: bool) -> Result<Self> {
        config.validate()?;
        let store = ConfiguredStore::open(config.storage, data_dir).await;

        let (connectivity, remote) = match config.api_base_url.as_deref() {
            Some(base_url) if !force_offline => {
                let health_url = config
                    .resolved_health_url()
                    .ok_or_else(|| Error::Config("health URL could not be derived".to_string()))?;
                let probe = HttpProbe::new(health_url, config.request_timeout())?;
                let client = HttpEventsClient::new(base_url, config.request_timeout())
                    .map_err(|error| Error::Config(error.to_string()))?;
                tracing::info!("Sync enabled against {}", client.base_url());
                (
                    ConfiguredConnectivity::Probe(probe),
                    ConfiguredRemote::Http(client),
                )
            }
            _ => {
                tracing::info!("Running in local-only mode");
                (
                    ConfiguredConnectivity::Manual(ManualConnectivity::offline()),
                    ConfiguredRemote::Unconfigured(Unconfigured),
                )
            }
        };

        let engine = SyncEngine::new(
            EventStore::new(store),
            connectivity,
            remote,
            config.sync_policy(),
        );
        Ok(Self::new(engine, config.list_cache_ttl()))
    }

    pub const fn storage_backend(&self) -> StorageBackend {
        self.engine.store().backend().backend()
    }

    /// Whether writes currently only live in memory
    pub fn is_storage_degraded(&self) -> bool {
        self.engine.store().backend().is_degraded()
    }
}
