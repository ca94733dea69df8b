//! Event model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::util::normalize_text_option;

/// A unique identifier for an event, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Create a new unique event ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Kind of field event being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Accident,
    Service,
    Transfer,
}

impl EventType {
    pub const ALL: [Self; 3] = [Self::Accident, Self::Service, Self::Transfer];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accident => "ACCIDENT",
            Self::Service => "SERVICE",
            Self::Transfer => "TRANSFER",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown event type '{needle}' (expected accident, service or transfer)"))
    }
}

/// Where an event stands relative to the remote authority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    /// Created or modified locally, not yet confirmed
    Pending,
    /// Confirmed by the remote authority
    Sent,
    /// Last attempt failed; retried until the attempt budget runs out
    Failed,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }

    /// Whether reconciliation should pick this event up.
    #[must_use]
    pub const fn is_unconfirmed(self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "SENT" => Ok(Self::Sent),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!(
                "unknown sync status '{other}' (expected pending, sent or failed)"
            )),
        }
    }
}

/// A field-recorded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Client-generated identifier
    pub id: EventId,
    /// External object the event refers to
    pub object_id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub comment: String,
    /// When the event happened in the real world
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub photo_uri: Option<String>,
    pub status: SyncStatus,
    #[serde(default)]
    pub sync_attempts: u32,
    #[serde(default)]
    pub last_sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Identifier assigned by the server on first confirmation
    #[serde(default)]
    pub server_id: Option<String>,
}

impl Event {
    /// Build a fresh, not yet persisted event from a draft.
    ///
    /// The event starts out `Pending` with no attempts; the sync engine decides
    /// the status it is first persisted with.
    pub fn from_draft(draft: NewEvent) -> crate::Result<Self> {
        let comment = normalize_comment(draft.comment)?;
        let now = Utc::now();
        Ok(Self {
            id: EventId::new(),
            object_id: draft.object_id.trim().to_string(),
            event_type: draft.event_type,
            comment,
            occurred_at: draft.occurred_at.unwrap_or(now),
            photo_uri: normalize_text_option(draft.photo_uri),
            status: SyncStatus::Pending,
            sync_attempts: 0,
            last_sync_error: None,
            created_at: now,
            updated_at: now,
            server_id: None,
        })
    }

    /// Apply user edits. Sync bookkeeping is left to the caller.
    pub fn apply_patch(&mut self, patch: EventPatch) -> crate::Result<()> {
        if let Some(comment) = patch.comment {
            self.comment = normalize_comment(comment)?;
        }
        if let Some(object_id) = patch.object_id {
            self.object_id = object_id.trim().to_string();
        }
        if let Some(event_type) = patch.event_type {
            self.event_type = event_type;
        }
        if let Some(occurred_at) = patch.occurred_at {
            self.occurred_at = occurred_at;
        }
        if let Some(photo_uri) = patch.photo_uri {
            self.photo_uri = normalize_text_option(photo_uri);
        }
        Ok(())
    }

    /// Whether the attempt budget is used up.
    #[must_use]
    pub const fn is_retry_exhausted(&self, max_attempts: u32) -> bool {
        self.sync_attempts >= max_attempts
    }

    /// Remote confirmed the event. Keeps the previous server id if the
    /// server did not send one back.
    pub(crate) fn mark_confirmed(&mut self, server_id: Option<String>, now: DateTime<Utc>) {
        if let Some(server_id) = normalize_text_option(server_id) {
            self.server_id = Some(server_id);
        }
        self.status = SyncStatus::Sent;
        self.sync_attempts = 0;
        self.last_sync_error = None;
        self.updated_at = now;
    }

    /// Local change waiting for connectivity. Attempts and error are kept.
    pub(crate) fn mark_deferred(&mut self, now: DateTime<Utc>) {
        self.status = SyncStatus::Pending;
        self.updated_at = now;
    }

    /// Failed push: status and attempt count move together.
    pub(crate) fn mark_failed(
        &mut self,
        status: SyncStatus,
        attempts: u32,
        reason: String,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        self.sync_attempts = attempts;
        self.last_sync_error = Some(reason);
        self.updated_at = now;
    }

    /// Manual retry: give the event a fresh attempt budget.
    pub(crate) fn reset_for_retry(&mut self, now: DateTime<Utc>) {
        self.status = SyncStatus::Pending;
        self.sync_attempts = 0;
        self.updated_at = now;
    }

    /// First line of the comment, truncated to `max_len` characters
    #[must_use]
    pub fn comment_preview(&self, max_len: usize) -> String {
        self.comment
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}

/// User intent to record a new event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub object_id: String,
    pub event_type: EventType,
    pub comment: String,
    /// Defaults to the creation time when absent
    pub occurred_at: Option<DateTime<Utc>>,
    pub photo_uri: Option<String>,
}

impl NewEvent {
    pub fn new(
        object_id: impl Into<String>,
        event_type: EventType,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            event_type,
            comment: comment.into(),
            occurred_at: None,
            photo_uri: None,
        }
    }

    #[must_use]
    pub const fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn photo_uri(mut self, photo_uri: impl Into<String>) -> Self {
        self.photo_uri = Some(photo_uri.into());
        self
    }
}

/// Partial edit of an existing event; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub object_id: Option<String>,
    pub event_type: Option<EventType>,
    pub comment: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    /// `Some(None)` removes the photo reference
    pub photo_uri: Option<Option<String>>,
}

impl EventPatch {
    #[must_use]
    pub fn comment(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.object_id.is_none()
            && self.event_type.is_none()
            && self.comment.is_none()
            && self.occurred_at.is_none()
            && self.photo_uri.is_none()
    }
}

fn normalize_comment(comment: String) -> crate::Result<String> {
    normalize_text_option(Some(comment))
        .ok_or_else(|| Error::InvalidInput("event comment cannot be empty".into()))
}
