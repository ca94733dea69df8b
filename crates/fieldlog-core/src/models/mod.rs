//! Data models for fieldlog

mod event;

pub use event::{Event, EventId, EventPatch, EventType, NewEvent, SyncStatus};
