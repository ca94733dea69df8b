//! Event collection persisted as one blob in a key-value store.
//!
//! The whole collection is the unit of persistence: every mutation reads the
//! collection, changes it and writes it back. That is fine for a field device
//! holding thousands of events. Concurrent writers are not serialized; the
//! later write wins.

use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::models::{Event, EventId};

/// Key holding the serialized event collection
pub const EVENTS_STORAGE_KEY: &str = "fieldlog.events";

/// Per-event CRUD over the serialized collection
#[derive(Debug)]
pub struct EventStore<S> {
    kv: S,
}

impl<S: KeyValueStore> EventStore<S> {
    pub const fn new(kv: S) -> Self {
        Self { kv }
    }

    /// Underlying key-value backend
    pub const fn backend(&self) -> &S {
        &self.kv
    }

    /// Load every stored event.
    ///
    /// A missing key or an unreadable payload both yield an empty collection;
    /// the latter is logged and otherwise ignored.
    pub async fn get_all(&self) -> Result<Vec<Event>> {
        let Some(raw) = self.kv.get_item(EVENTS_STORAGE_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Event>>(&raw) {
            Ok(events) => Ok(events),
            Err(error) => {
                tracing::warn!(
                    "Ignoring unreadable event collection under '{}': {}",
                    EVENTS_STORAGE_KEY,
                    error
                );
                Ok(Vec::new())
            }
        }
    }

    pub async fn get_by_id(&self, id: &EventId) -> Result<Option<Event>> {
        let events = self.get_all().await?;
        Ok(events.into_iter().find(|event| event.id == *id))
    }

    /// Insert or replace the event with the same id.
    pub async fn save(&self, event: &Event) -> Result<()> {
        let mut events = self.get_all().await?;
        match events.iter_mut().find(|existing| existing.id == event.id) {
            Some(existing) => existing.clone_from(event),
            None => events.push(event.clone()),
        }
        self.write_all(&events).await
    }

    /// Remove an event. Returns whether it existed.
    pub async fn delete(&self, id: &EventId) -> Result<bool> {
        let mut events = self.get_all().await?;
        let before = events.len();
        events.retain(|event| event.id != *id);
        if events.len() == before {
            return Ok(false);
        }
        self.write_all(&events).await?;
        Ok(true)
    }

    /// Drop the whole collection.
    pub async fn clear(&self) -> Result<()> {
        self.kv.remove_item(EVENTS_STORAGE_KEY).await?;
        Ok(())
    }

    async fn write_all(&self, events: &[Event]) -> Result<()> {
        let serialized = serde_json::to_string(events)?;
        self.kv.set_item(EVENTS_STORAGE_KEY, &serialized).await?;
        tracing::debug!("Persisted {} events", events.len());
        Ok(())
    }
}
