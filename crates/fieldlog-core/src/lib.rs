//! fieldlog-core - Core library for fieldlog
//!
//! This crate contains the event model, the pluggable key-value storage
//! backends, and the offline-first sync engine used by every fieldlog
//! interface.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod event_store;
pub mod export;
pub mod kv;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Event, EventId, EventType, SyncStatus};
