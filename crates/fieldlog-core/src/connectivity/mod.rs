//! Network reachability.
//!
//! A [`ConnectivityOracle`] answers "are we online right now" and publishes
//! [`Reachability`] changes over a `watch` channel. [`observe`] turns that
//! into a callback subscription; [`EdgeDetector`] picks out offline-to-online
//! edges.

mod probe;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use probe::{HttpProbe, ProbeHandle};

/// One published reachability value.
///
/// `reconnects` counts offline-to-online transitions since the source was
/// created. A `watch` reader only sees the latest value, so a dropout that
/// came and went between two reads still shows up as a higher count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reachability {
    pub connected: bool,
    pub reconnects: u64,
}

impl Reachability {
    pub const fn new(connected: bool) -> Self {
        Self {
            connected,
            reconnects: 0,
        }
    }

    /// Apply an observation. Returns whether anything changed.
    fn update(&mut self, connected: bool) -> bool {
        if self.connected == connected {
            return false;
        }
        if connected {
            self.reconnects = self.reconnects.saturating_add(1);
        }
        self.connected = connected;
        true
    }
}

/// Publish `connected` on `state`; subscribers are only woken on change.
fn publish(state: &watch::Sender<Reachability>, connected: bool) -> bool {
    state.send_if_modified(|current| current.update(connected))
}

/// Source of reachability information
pub trait ConnectivityOracle: Send + Sync {
    /// Point-in-time reachability check.
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Receiver of reachability updates. The current value counts as the
    /// first observation.
    fn subscribe(&self) -> watch::Receiver<Reachability>;
}

/// Callback subscription returned by [`observe`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Invoke `callback` with the current reachability and then with every
/// published change until the subscription is dropped.
///
/// The first call happens before `observe` returns. Must be called from
/// within a tokio runtime.
pub fn observe<O, F>(oracle: &O, mut callback: F) -> Subscription
where
    O: ConnectivityOracle + ?Sized,
    F: FnMut(Reachability) + Send + 'static,
{
    let mut updates = oracle.subscribe();
    let current = *updates.borrow_and_update();
    callback(current);
    let task = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = *updates.borrow_and_update();
            callback(state);
        }
    });
    Subscription { task }
}

/// Tracks the last observed reachability and reports offline-to-online edges.
///
/// The first observation only sets the baseline, so a session that starts
/// online does not count as a reconnect.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    last: Option<Reachability>,
}

impl EdgeDetector {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Record an observation; true when at least one reconnect happened
    /// since the previous one.
    pub fn observe(&mut self, state: Reachability) -> bool {
        let reconnected = self
            .last
            .is_some_and(|last| state.reconnects > last.reconnects);
        self.last = Some(state);
        reconnected
    }

    pub const fn last(&self) -> Option<Reachability> {
        self.last
    }
}

/// Reachability flipped by hand. Used by tests and the CLI `--offline` flag.
#[derive(Debug, Clone)]
pub struct ManualConnectivity {
    state: Arc<watch::Sender<Reachability>>,
}

impl ManualConnectivity {
    pub fn new(connected: bool) -> Self {
        let (state, _) = watch::channel(Reachability::new(connected));
        Self {
            state: Arc::new(state),
        }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Publish a new state. Subscribers are only notified on change.
    pub fn set_connected(&self, connected: bool) {
        publish(&self.state, connected);
    }
}

impl ConnectivityOracle for ManualConnectivity {
    async fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    fn subscribe(&self) -> watch::Receiver<Reachability> {
        self.state.subscribe()
    }
}

/// Oracle selected at startup: a health probe when an API is configured,
/// otherwise a fixed state.
#[derive(Debug, Clone)]
pub enum ConfiguredConnectivity {
    Probe(HttpProbe),
    Manual(ManualConnectivity),
}

impl ConfiguredConnectivity {
    /// Keep the probe's published state fresh. `None` for manual state.
    pub fn spawn_polling(&self, interval: std::time::Duration) -> Option<ProbeHandle> {
        match self {
            Self::Probe(probe) => Some(probe.spawn_polling(interval)),
            Self::Manual(_) => None,
        }
    }

    pub const fn is_probe(&self) -> bool {
        matches!(self, Self::Probe(_))
    }
}

impl ConnectivityOracle for ConfiguredConnectivity {
    async fn is_connected(&self) -> bool {
        match self {
            Self::Probe(probe) => probe.is_connected().await,
            Self::Manual(manual) => manual.is_connected().await,
        }
    }

    fn subscribe(&self) -> watch::Receiver<Reachability> {
        match self {
            Self::Probe(probe) => probe.subscribe(),
            Self::Manual(manual) => manual.subscribe(),
        }
    }
}
