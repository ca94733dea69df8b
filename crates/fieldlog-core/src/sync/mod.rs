//! Offline-first sync engine.
//!
//! The engine owns every status transition of an [`Event`]. It asks the
//! connectivity oracle before each sync-affecting decision, pushes to the
//! remote authority when online, and persists the outcome through the
//! [`EventStore`] in a single write per event.
//!
//! | operation | situation | status | attempts |
//! |---|---|---|---|
//! | create/update | online, push ok | `Sent` | 0 |
//! | create/update | online, push fails | `Failed` | `min(attempts + 1, max)` |
//! | create/update | offline | `Pending` | unchanged |
//! | reconcile | attempts >= max | skipped | unchanged |
//! | reconcile | push ok | `Sent` | 0 |
//! | reconcile | push fails | `Failed` once attempts reach max, else `Pending` | +1 |

mod auto;
#[cfg(test)]
mod tests;

use chrono::Utc;

pub use auto::{spawn_on_reconnect, AutoSyncHandle};

use crate::connectivity::ConnectivityOracle;
use crate::error::{Error, Result};
use crate::event_store::EventStore;
use crate::kv::KeyValueStore;
use crate::models::{Event, EventId, EventPatch, NewEvent, SyncStatus};
use crate::remote::{PushRequest, RemoteEvents};
use crate::state::SyncSummary;

/// Attempts after which reconciliation leaves an event alone
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 3;

/// Tunables of the sync engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    pub max_retry_attempts: u32,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
        }
    }
}

/// What happened to the remote side of a create, update or retry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDisposition {
    /// The remote confirmed the event
    Confirmed,
    /// Offline; stored locally and queued for the next reconciliation
    Deferred,
    /// The push was attempted and failed with this reason
    Failed(String),
}

impl SyncDisposition {
    /// Short message suitable for showing to the person who made the change
    pub fn user_message(&self) -> String {
        match self {
            Self::Confirmed => "Event saved and synced.".to_string(),
            Self::Deferred => "Event saved locally and will sync when back online.".to_string(),
            Self::Failed(reason) => {
                format!("Event saved locally but sync failed: {reason}. It will be retried.")
            }
        }
    }
}

/// A persisted event together with the remote outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saved {
    pub event: Event,
    pub disposition: SyncDisposition,
}

/// Counters of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Events pushed to the remote
    pub attempted: usize,
    pub confirmed: usize,
    pub failed: usize,
    /// Unconfirmed events left alone because their attempts are used up
    pub exhausted_skipped: usize,
    /// Events whose outcome could not be written back
    pub persist_errors: usize,
}

impl SyncReport {
    pub const fn is_clean(&self) -> bool {
        self.failed == 0 && self.persist_errors == 0
    }
}

/// Result of [`SyncEngine::sync_events`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Not connected; nothing was touched
    Offline,
    Completed(SyncReport),
    /// The collection could not be enumerated. Work done before the failure
    /// is kept.
    Aborted(String),
}

impl SyncOutcome {
    pub const fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Offline | Self::Aborted(_) => None,
        }
    }
}

/// Event lifecycle over a store, a connectivity oracle and a remote
#[derive(Debug)]
pub struct SyncEngine<S, C, R> {
    store: EventStore<S>,
    connectivity: C,
    remote: R,
    policy: SyncPolicy,
}

impl<S, C, R> SyncEngine<S, C, R>
where
    S: KeyValueStore,
    C: ConnectivityOracle,
    R: RemoteEvents,
{
    pub const fn new(store: EventStore<S>, connectivity: C, remote: R, policy: SyncPolicy) -> Self {
        Self {
            store,
            connectivity,
            remote,
            policy,
        }
    }

    pub const fn store(&self) -> &EventStore<S> {
        &self.store
    }

    pub const fn connectivity(&self) -> &C {
        &self.connectivity
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Record a new event. Pushes it right away when online.
    ///
    /// Remote failures are recorded on the event, never returned as `Err`.
    pub async fn create_event(&self, draft: NewEvent) -> Result<Saved> {
        let mut event = Event::from_draft(draft)?;
        let disposition = self.push_or_defer(&mut event).await;
        self.store.save(&event).await?;
        tracing::debug!("Created event {} ({})", event.id, event.status);
        Ok(Saved { event, disposition })
    }

    /// Apply an edit and push it. A previously confirmed event is sent as an
    /// update against its `server_id`.
    pub async fn update_event(&self, id: &EventId, patch: EventPatch) -> Result<Saved> {
        let mut event = self.require(id).await?;
        event.apply_patch(patch)?;
        let disposition = self.push_or_defer(&mut event).await;
        self.store.save(&event).await?;
        tracing::debug!("Updated event {} ({})", event.id, event.status);
        Ok(Saved { event, disposition })
    }

    /// Remove an event locally. Returns whether it existed.
    pub async fn delete_event(&self, id: &EventId) -> Result<bool> {
        let deleted = self.store.delete(id).await?;
        if deleted {
            tracing::debug!("Deleted event {}", id);
        }
        Ok(deleted)
    }

    pub async fn get_event(&self, id: &EventId) -> Result<Option<Event>> {
        self.store.get_by_id(id).await
    }

    /// All events, in insertion order
    pub async fn list_events(&self) -> Result<Vec<Event>> {
        self.store.get_all().await
    }

    /// Push every unconfirmed event that still has attempts left.
    ///
    /// Each event is pushed and persisted on its own; a failure on one does
    /// not stop the others.
    pub async fn sync_events(&self) -> SyncOutcome {
        if !self.connectivity.is_connected().await {
            tracing::debug!("Skipping reconciliation: offline");
            return SyncOutcome::Offline;
        }

        let events = match self.store.get_all().await {
            Ok(events) => events,
            Err(error) => {
                tracing::warn!("Reconciliation aborted: {}", error);
                return SyncOutcome::Aborted(error.to_string());
            }
        };

        let mut report = SyncReport::default();
        for mut event in events
            .into_iter()
            .filter(|event| event.status.is_unconfirmed())
        {
            if event.is_retry_exhausted(self.policy.max_retry_attempts) {
                tracing::debug!(
                    "Skipping event {}: {} attempts used",
                    event.id,
                    event.sync_attempts
                );
                report.exhausted_skipped += 1;
                continue;
            }

            report.attempted += 1;
            if self.reconcile(&mut event).await {
                report.confirmed += 1;
            } else {
                report.failed += 1;
            }

            if let Err(error) = self.store.save(&event).await {
                tracing::warn!("Failed to persist sync result for {}: {}", event.id, error);
                report.persist_errors += 1;
            }
        }

        tracing::info!(
            "Reconciliation finished: {} attempted, {} confirmed, {} failed, {} exhausted",
            report.attempted,
            report.confirmed,
            report.failed,
            report.exhausted_skipped
        );
        SyncOutcome::Completed(report)
    }

    /// Give an event a fresh attempt budget and, when online, push it once.
    pub async fn retry_event(&self, id: &EventId) -> Result<Saved> {
        let mut event = self.require(id).await?;
        if event.status == SyncStatus::Sent {
            return Err(Error::InvalidInput(format!(
                "event {id} is already synced"
            )));
        }

        event.reset_for_retry(Utc::now());
        let disposition = if self.connectivity.is_connected().await {
            if self.reconcile(&mut event).await {
                SyncDisposition::Confirmed
            } else {
                SyncDisposition::Failed(event.last_sync_error.clone().unwrap_or_default())
            }
        } else {
            SyncDisposition::Deferred
        };
        self.store.save(&event).await?;
        tracing::debug!("Retried event {} ({})", event.id, event.status);
        Ok(Saved { event, disposition })
    }

    /// Counts per status and the overall sync state.
    pub async fn sync_summary(&self) -> Result<SyncSummary> {
        let events = self.store.get_all().await?;
        let connected = self.connectivity.is_connected().await;
        Ok(SyncSummary::from_events(
            &events,
            self.policy.max_retry_attempts,
            connected,
        ))
    }

    async fn require(&self, id: &EventId) -> Result<Event> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("event {id}")))
    }

    /// Create/update path: push when online, otherwise queue.
    async fn push_or_defer(&self, event: &mut Event) -> SyncDisposition {
        let now = Utc::now();
        if !self.connectivity.is_connected().await {
            event.mark_deferred(now);
            return SyncDisposition::Deferred;
        }

        match self.remote.push(PushRequest::for_event(event)).await {
            Ok(ack) => {
                event.mark_confirmed(ack.server_id, now);
                SyncDisposition::Confirmed
            }
            Err(error) => {
                let reason = error.to_string();
                tracing::debug!("Push of {} failed: {}", event.id, reason);
                let attempts = event
                    .sync_attempts
                    .saturating_add(1)
                    .min(self.policy.max_retry_attempts);
                event.mark_failed(SyncStatus::Failed, attempts, reason.clone(), now);
                SyncDisposition::Failed(reason)
            }
        }
    }

    /// Reconcile path: one push, attempts counted towards the budget.
    /// Returns whether the remote confirmed.
    async fn reconcile(&self, event: &mut Event) -> bool {
        let result = self.remote.push(PushRequest::for_event(event)).await;
        let now = Utc::now();
        match result {
            Ok(ack) => {
                event.mark_confirmed(ack.server_id, now);
                true
            }
            Err(error) => {
                let attempts = event.sync_attempts.saturating_add(1);
                let status = if attempts >= self.policy.max_retry_attempts {
                    SyncStatus::Failed
                } else {
                    SyncStatus::Pending
                };
                tracing::debug!(
                    "Reconcile of {} failed (attempt {}): {}",
                    event.id,
                    attempts,
                    error
                );
                event.mark_failed(status, attempts, error.to_string(), now);
                false
            }
        }
    }
}
