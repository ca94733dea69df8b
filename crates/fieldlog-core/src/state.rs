//! Shared sync state types for status displays.

use serde::Serialize;

use crate::models::{Event, SyncStatus};

/// Overall sync state shown by clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Offline,
    Pending,
    Synced,
    Error,
}

impl SyncState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event counts per sync status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub total: usize,
    pub pending: usize,
    pub sent: usize,
    pub failed: usize,
    /// Unconfirmed events that reconciliation will no longer touch
    pub exhausted: usize,
    pub connected: bool,
}

impl SyncSummary {
    pub fn from_events(events: &[Event], max_retry_attempts: u32, connected: bool) -> Self {
        let mut summary = Self {
            total: events.len(),
            connected,
            ..Self::default()
        };
        for event in events {
            match event.status {
                SyncStatus::Pending => summary.pending += 1,
                SyncStatus::Sent => summary.sent += 1,
                SyncStatus::Failed => summary.failed += 1,
            }
            if event.status.is_unconfirmed() && event.is_retry_exhausted(max_retry_attempts) {
                summary.exhausted += 1;
            }
        }
        summary
    }

    /// Offline wins; then any failure; then anything still queued.
    pub const fn state(&self) -> SyncState {
        if !self.connected {
            SyncState::Offline
        } else if self.failed > 0 {
            SyncState::Error
        } else if self.pending > 0 {
            SyncState::Pending
        } else {
            SyncState::Synced
        }
    }

    pub const fn unconfirmed(&self) -> usize {
        self.pending + self.failed
    }
}
