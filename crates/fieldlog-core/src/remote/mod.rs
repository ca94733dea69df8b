//! Remote authority that confirms events.

mod http;

use std::future::Future;

use thiserror::Error;

pub use http::HttpEventsClient;

use crate::models::Event;

/// What the remote is asked to do with an event
#[derive(Debug, Clone, Copy)]
pub enum PushRequest<'a> {
    /// First sync: the server has never seen this event
    Create(&'a Event),
    /// Re-sync: update the server's copy in place
    Update { server_id: &'a str, event: &'a Event },
}

impl<'a> PushRequest<'a> {
    /// A stored `server_id` is the only signal that the event was confirmed
    /// before; it turns the push into an update.
    pub fn for_event(event: &'a Event) -> Self {
        match event.server_id.as_deref() {
            Some(server_id) => Self::Update { server_id, event },
            None => Self::Create(event),
        }
    }

    pub const fn event(self) -> &'a Event {
        match self {
            Self::Create(event) | Self::Update { event, .. } => event,
        }
    }

    pub const fn is_update(&self) -> bool {
        matches!(self, Self::Update { .. })
    }
}

/// Successful confirmation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteAck {
    /// Server-side identifier, when the server reports one
    pub server_id: Option<String>,
}

impl RemoteAck {
    pub fn with_server_id(server_id: impl Into<String>) -> Self {
        Self {
            server_id: Some(server_id.into()),
        }
    }
}

/// Why a push did not go through. The display string is what ends up in
/// `Event::last_sync_error`.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server error: {0}")]
    Api(String),
    #[error("Rejected: {0}")]
    Rejected(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Client of the remote events authority
pub trait RemoteEvents: Send + Sync {
    fn push(&self, request: PushRequest<'_>) -> impl Future<Output = RemoteResult<RemoteAck>> + Send;
}

/// Stand-in used when no API is configured. Front ends pair it with an
/// offline oracle so it is never asked; a direct push fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

impl RemoteEvents for Unconfigured {
    async fn push(&self, _request: PushRequest<'_>) -> RemoteResult<RemoteAck> {
        Err(RemoteError::InvalidConfiguration(
            "no events API configured".to_string(),
        ))
    }
}

/// Remote selected at startup
#[derive(Debug, Clone)]
pub enum ConfiguredRemote {
    Http(HttpEventsClient),
    Unconfigured(Unconfigured),
}

impl RemoteEvents for ConfiguredRemote {
    async fn push(&self, request: PushRequest<'_>) -> RemoteResult<RemoteAck> {
        match self {
            Self::Http(client) => client.push(request).await,
            Self::Unconfigured(remote) => remote.push(request).await,
        }
    }
}
