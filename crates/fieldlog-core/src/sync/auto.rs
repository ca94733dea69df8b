//! Reconciliation on reconnect.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::connectivity::{observe, ConnectivityOracle, EdgeDetector, Subscription};

/// Running auto-sync listener. Dropping the handle stops it.
#[derive(Debug)]
pub struct AutoSyncHandle {
    subscription: Subscription,
    worker: JoinHandle<()>,
}

impl AutoSyncHandle {
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_running(&self) -> bool {
        self.subscription.is_active() && !self.worker.is_finished()
    }
}

impl Drop for AutoSyncHandle {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Run `on_reconnect` after every offline-to-online transition of `oracle`.
///
/// The reachability current at spawn time is only the baseline. Runs are
/// awaited in order, so two reconnects never reconcile concurrently; a
/// reconnect that happens while a run is in progress queues exactly one
/// more run.
pub fn spawn_on_reconnect<O, F, Fut>(oracle: &O, mut on_reconnect: F) -> AutoSyncHandle
where
    O: ConnectivityOracle + ?Sized,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let pending = Arc::new(Notify::new());

    let queued = Arc::clone(&pending);
    let worker = tokio::spawn(async move {
        loop {
            queued.notified().await;
            tracing::info!("Back online, reconciling pending events");
            on_reconnect().await;
        }
    });

    let mut edges = EdgeDetector::new();
    let subscription = observe(oracle, move |state| {
        if edges.observe(state) {
            // Holds at most one permit, so reconnects during a run coalesce
            pending.notify_one();
        }
    });

    AutoSyncHandle {
        subscription,
        worker,
    }
}
