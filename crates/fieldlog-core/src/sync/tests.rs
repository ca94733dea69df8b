use super::*;
use crate::connectivity::ManualConnectivity;
use crate::kv::{MemoryStore, StoreError, StoreResult};
use crate::models::EventType;
use crate::remote::{RemoteAck, RemoteError, RemoteResult};
use crate::state::SyncState;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Remote that confirms everything except objects marked as failing.
#[derive(Debug, Default)]
struct ScriptedRemote {
    failing: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    calls: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl ScriptedRemote {
    fn fail_object(&self, object_id: &str) {
        self.failing.lock().unwrap().insert(object_id.to_string());
    }

    fn heal_object(&self, object_id: &str) {
        self.failing.lock().unwrap().remove(object_id);
    }

    fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RemoteEvents for ScriptedRemote {
    async fn push(&self, request: PushRequest<'_>) -> RemoteResult<RemoteAck> {
        let label = match request {
            PushRequest::Create(event) => format!("create {}", event.object_id),
            PushRequest::Update { server_id, .. } => format!("update {server_id}"),
        };
        self.calls.lock().unwrap().push(label);

        let object_id = &request.event().object_id;
        if self.fail_all.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(object_id)
        {
            return Err(RemoteError::Api("HTTP 503".to_string()));
        }
        if request.is_update() {
            Ok(RemoteAck::default())
        } else {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(RemoteAck::with_server_id(format!("srv-{id}")))
        }
    }
}

/// Memory store whose reads or writes can be switched to fail.
#[derive(Debug, Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn check(flag: &AtomicBool) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("disk unplugged".to_string()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for FlakyStore {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Self::check(&self.fail_reads)?;
        self.inner.get_item(key).await
    }

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        Self::check(&self.fail_writes)?;
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        Self::check(&self.fail_writes)?;
        self.inner.remove_item(key).await
    }

    async fn clear(&self) -> StoreResult<()> {
        Self::check(&self.fail_writes)?;
        self.inner.clear().await
    }
}

type Engine<S = MemoryStore> = SyncEngine<S, ManualConnectivity, ScriptedRemote>;

fn engine_with<S: KeyValueStore>(kv: S, online: bool) -> (Engine<S>, ManualConnectivity) {
    let connectivity = ManualConnectivity::new(online);
    let engine = SyncEngine::new(
        EventStore::new(kv),
        connectivity.clone(),
        ScriptedRemote::default(),
        SyncPolicy::default(),
    );
    (engine, connectivity)
}

fn engine(online: bool) -> (Engine, ManualConnectivity) {
    engine_with(MemoryStore::new(), online)
}

fn draft(object_id: &str) -> NewEvent {
    NewEvent::new(object_id, EventType::Service, format!("Serviced {object_id}"))
}

/// Store an event directly with the given sync bookkeeping.
async fn seed<S: KeyValueStore>(
    engine: &Engine<S>,
    object_id: &str,
    status: SyncStatus,
    attempts: u32,
) -> Event {
    let mut event = Event::from_draft(draft(object_id)).unwrap();
    event.status = status;
    event.sync_attempts = attempts;
    if attempts > 0 {
        event.last_sync_error = Some("Server error: HTTP 503".to_string());
    }
    engine.store().save(&event).await.unwrap();
    event
}

async fn reload<S: KeyValueStore>(engine: &Engine<S>, id: &EventId) -> Event {
    engine.get_event(id).await.unwrap().unwrap()
}

fn completed(outcome: SyncOutcome) -> SyncReport {
    match outcome {
        SyncOutcome::Completed(report) => report,
        other => panic!("expected a completed pass, got {other:?}"),
    }
}

#[test]
fn test_policy_default() {
    assert_eq!(SyncPolicy::default().max_retry_attempts, 3);
}

#[test]
fn test_user_messages() {
    assert!(SyncDisposition::Deferred.user_message().contains("saved locally"));
    assert!(SyncDisposition::Failed("HTTP 500".to_string())
        .user_message()
        .contains("HTTP 500"));
    assert_eq!(
        SyncDisposition::Confirmed.user_message(),
        "Event saved and synced."
    );
}

#[tokio::test]
async fn test_create_online_confirms() {
    let (engine, _) = engine(true);
    let saved = engine.create_event(draft("pump-1")).await.unwrap();

    assert_eq!(saved.disposition, SyncDisposition::Confirmed);
    assert_eq!(saved.event.status, SyncStatus::Sent);
    assert_eq!(saved.event.sync_attempts, 0);
    assert_eq!(saved.event.server_id.as_deref(), Some("srv-1"));
    assert_eq!(reload(&engine, &saved.event.id).await, saved.event);
    assert_eq!(engine.remote().calls(), vec!["create pump-1".to_string()]);
}

#[tokio::test]
async fn test_create_offline_is_pending_and_retrievable() {
    let (engine, _) = engine(false);
    let saved = engine.create_event(draft("pump-1")).await.unwrap();

    assert_eq!(saved.disposition, SyncDisposition::Deferred);
    let stored = reload(&engine, &saved.event.id).await;
    assert_eq!(stored.status, SyncStatus::Pending);
    assert_eq!(stored.sync_attempts, 0);
    assert_eq!(stored.last_sync_error, None);
    assert!(engine.remote().calls().is_empty());
}

#[tokio::test]
async fn test_create_online_failure_counts_one_attempt() {
    let (engine, _) = engine(true);
    engine.remote().fail_object("pump-1");
    let saved = engine.create_event(draft("pump-1")).await.unwrap();

    assert_eq!(
        saved.disposition,
        SyncDisposition::Failed("Server error: HTTP 503".to_string())
    );
    let stored = reload(&engine, &saved.event.id).await;
    assert_eq!(stored.status, SyncStatus::Failed);
    assert_eq!(stored.sync_attempts, 1);
    assert_eq!(
        stored.last_sync_error.as_deref(),
        Some("Server error: HTTP 503")
    );
}

#[tokio::test]
async fn test_create_rejects_blank_comment() {
    let (engine, _) = engine(true);
    let result = engine
        .create_event(NewEvent::new("pump-1", EventType::Accident, "   "))
        .await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));
    assert!(engine.list_events().await.unwrap().is_empty());
    assert!(engine.remote().calls().is_empty());
}

#[tokio::test]
async fn test_update_offline_keeps_attempts_and_error() {
    let (engine, _) = engine(false);
    let seeded = seed(&engine, "valve-7", SyncStatus::Failed, 2).await;

    let saved = engine
        .update_event(&seeded.id, EventPatch::comment("Valve replaced"))
        .await
        .unwrap();

    assert_eq!(saved.disposition, SyncDisposition::Deferred);
    assert_eq!(saved.event.status, SyncStatus::Pending);
    assert_eq!(saved.event.sync_attempts, 2);
    assert_eq!(saved.event.last_sync_error, seeded.last_sync_error);
    assert_eq!(saved.event.comment, "Valve replaced");
    assert!(saved.event.updated_at >= seeded.updated_at);
}

#[tokio::test]
async fn test_update_online_failure_caps_attempts() {
    let (engine, _) = engine(true);
    let seeded = seed(&engine, "valve-7", SyncStatus::Failed, 3).await;
    engine.remote().fail_object("valve-7");

    let saved = engine
        .update_event(&seeded.id, EventPatch::comment("Still leaking"))
        .await
        .unwrap();

    assert_eq!(saved.event.status, SyncStatus::Failed);
    assert_eq!(saved.event.sync_attempts, 3);
}

#[tokio::test]
async fn test_update_online_success_clears_error() {
    let (engine, _) = engine(true);
    let seeded = seed(&engine, "valve-7", SyncStatus::Failed, 2).await;

    let saved = engine
        .update_event(&seeded.id, EventPatch::comment("Fixed"))
        .await
        .unwrap();

    assert_eq!(saved.event.status, SyncStatus::Sent);
    assert_eq!(saved.event.sync_attempts, 0);
    assert_eq!(saved.event.last_sync_error, None);
}

#[tokio::test]
async fn test_update_unknown_event_is_not_found() {
    let (engine, _) = engine(true);
    let result = engine
        .update_event(&EventId::new(), EventPatch::comment("Nope"))
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_offline_reconcile_is_noop() {
    let (engine, _) = engine(false);
    engine.create_event(draft("a")).await.unwrap();
    seed(&engine, "b", SyncStatus::Failed, 1).await;
    let before = engine.list_events().await.unwrap();

    assert_eq!(engine.sync_events().await, SyncOutcome::Offline);
    assert_eq!(engine.list_events().await.unwrap(), before);
    assert!(engine.remote().calls().is_empty());
}

#[tokio::test]
async fn test_reconcile_failure_below_max_stays_pending() {
    let (engine, _) = engine(true);
    let seeded = seed(&engine, "hoist", SyncStatus::Pending, 0).await;
    engine.remote().fail_object("hoist");

    let report = completed(engine.sync_events().await);
    assert_eq!(report.failed, 1);

    let stored = reload(&engine, &seeded.id).await;
    assert_eq!(stored.status, SyncStatus::Pending);
    assert_eq!(stored.sync_attempts, 1);
    assert_eq!(
        stored.last_sync_error.as_deref(),
        Some("Server error: HTTP 503")
    );
}

#[tokio::test]
async fn test_reconcile_exhausts_then_skips() {
    let (engine, _) = engine(true);
    let seeded = seed(&engine, "hoist", SyncStatus::Failed, 2).await;
    engine.remote().fail_object("hoist");

    completed(engine.sync_events().await);
    let exhausted = reload(&engine, &seeded.id).await;
    assert_eq!(exhausted.status, SyncStatus::Failed);
    assert_eq!(exhausted.sync_attempts, 3);

    let report = completed(engine.sync_events().await);
    assert_eq!(
        report,
        SyncReport {
            exhausted_skipped: 1,
            ..SyncReport::default()
        }
    );
    assert_eq!(reload(&engine, &seeded.id).await, exhausted);
    assert_eq!(engine.remote().calls().len(), 1);
}

#[tokio::test]
async fn test_reconcile_success_resets_attempts_and_error() {
    let (engine, _) = engine(true);
    let seeded = seed(&engine, "hoist", SyncStatus::Pending, 2).await;

    let report = completed(engine.sync_events().await);
    assert_eq!(report.confirmed, 1);

    let stored = reload(&engine, &seeded.id).await;
    assert_eq!(stored.status, SyncStatus::Sent);
    assert_eq!(stored.sync_attempts, 0);
    assert_eq!(stored.last_sync_error, None);
    assert_eq!(stored.server_id.as_deref(), Some("srv-1"));
}

#[tokio::test]
async fn test_reconcile_ignores_sent_events() {
    let (engine, _) = engine(true);
    seed(&engine, "done", SyncStatus::Sent, 0).await;

    let report = completed(engine.sync_events().await);
    assert_eq!(report, SyncReport::default());
    assert!(engine.remote().calls().is_empty());
}

#[tokio::test]
async fn test_offline_edit_of_synced_event_resyncs_as_update() {
    let (engine, connectivity) = engine(false);

    let created = engine.create_event(draft("e1")).await.unwrap().event;
    assert_eq!(created.status, SyncStatus::Pending);
    assert_eq!(created.sync_attempts, 0);

    connectivity.set_connected(true);
    completed(engine.sync_events().await);
    let confirmed = reload(&engine, &created.id).await;
    assert_eq!(confirmed.status, SyncStatus::Sent);
    assert_eq!(confirmed.sync_attempts, 0);
    assert_eq!(confirmed.last_sync_error, None);
    assert_eq!(confirmed.server_id.as_deref(), Some("srv-1"));

    connectivity.set_connected(false);
    let edited = engine
        .update_event(&created.id, EventPatch::comment("Second visit"))
        .await
        .unwrap()
        .event;
    assert_eq!(edited.status, SyncStatus::Pending);
    assert_eq!(edited.server_id.as_deref(), Some("srv-1"));

    connectivity.set_connected(true);
    completed(engine.sync_events().await);
    let resynced = reload(&engine, &created.id).await;
    assert_eq!(resynced.status, SyncStatus::Sent);
    assert_eq!(resynced.server_id.as_deref(), Some("srv-1"));
    assert_eq!(
        engine.remote().calls(),
        vec!["create e1".to_string(), "update srv-1".to_string()]
    );
}

#[tokio::test]
async fn test_exhaustion_does_not_block_other_events() {
    let (engine, connectivity) = engine(true);
    engine.remote().fail_object("e2");

    let e2 = engine.create_event(draft("e2")).await.unwrap().event;
    assert_eq!(e2.status, SyncStatus::Failed);
    assert_eq!(e2.sync_attempts, 1);

    connectivity.set_connected(false);
    let e3 = engine.create_event(draft("e3")).await.unwrap().event;
    connectivity.set_connected(true);

    let first = completed(engine.sync_events().await);
    assert_eq!((first.attempted, first.confirmed, first.failed), (2, 1, 1));
    let after_first = reload(&engine, &e2.id).await;
    assert_eq!(after_first.status, SyncStatus::Pending);
    assert_eq!(after_first.sync_attempts, 2);
    assert_eq!(reload(&engine, &e3.id).await.status, SyncStatus::Sent);

    completed(engine.sync_events().await);
    let exhausted = reload(&engine, &e2.id).await;
    assert_eq!(exhausted.status, SyncStatus::Failed);
    assert_eq!(exhausted.sync_attempts, 3);

    connectivity.set_connected(false);
    let e4 = engine.create_event(draft("e4")).await.unwrap().event;
    connectivity.set_connected(true);

    let third = completed(engine.sync_events().await);
    assert_eq!(third.exhausted_skipped, 1);
    assert_eq!(third.confirmed, 1);
    assert_eq!(reload(&engine, &e2.id).await, exhausted);
    assert_eq!(reload(&engine, &e4.id).await.status, SyncStatus::Sent);
    assert_eq!(engine.list_events().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_persist_failure_is_isolated_per_event() {
    let (engine, _) = engine_with(FlakyStore::default(), true);
    let first = seed(&engine, "a", SyncStatus::Pending, 0).await;
    seed(&engine, "b", SyncStatus::Pending, 0).await;
    engine.store().backend().fail_writes.store(true, Ordering::SeqCst);

    let report = completed(engine.sync_events().await);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.confirmed, 2);
    assert_eq!(report.persist_errors, 2);
    assert!(!report.is_clean());
    assert_eq!(engine.remote().calls().len(), 2);

    // Nothing was written, so the events are still queued
    assert_eq!(reload(&engine, &first.id).await.status, SyncStatus::Pending);
}

#[tokio::test]
async fn test_enumeration_failure_aborts() {
    let (engine, _) = engine_with(FlakyStore::default(), true);
    seed(&engine, "a", SyncStatus::Pending, 0).await;
    engine.store().backend().fail_reads.store(true, Ordering::SeqCst);

    let outcome = engine.sync_events().await;
    assert!(
        matches!(outcome, SyncOutcome::Aborted(ref reason) if reason.contains("disk unplugged"))
    );
    assert!(engine.remote().calls().is_empty());
}

#[tokio::test]
async fn test_retry_unlocks_exhausted_event() {
    let (engine, _) = engine(true);
    let seeded = seed(&engine, "gate", SyncStatus::Failed, 3).await;

    let saved = engine.retry_event(&seeded.id).await.unwrap();
    assert_eq!(saved.disposition, SyncDisposition::Confirmed);
    assert_eq!(saved.event.status, SyncStatus::Sent);
    assert_eq!(saved.event.sync_attempts, 0);
    assert_eq!(reload(&engine, &seeded.id).await, saved.event);
}

#[tokio::test]
async fn test_retry_failure_counts_from_fresh_budget() {
    let (engine, _) = engine(true);
    let seeded = seed(&engine, "gate", SyncStatus::Failed, 3).await;
    engine.remote().set_fail_all(true);

    let saved = engine.retry_event(&seeded.id).await.unwrap();
    assert!(matches!(saved.disposition, SyncDisposition::Failed(_)));
    assert_eq!(saved.event.status, SyncStatus::Pending);
    assert_eq!(saved.event.sync_attempts, 1);

    engine.remote().set_fail_all(false);
    engine.remote().heal_object("gate");
    completed(engine.sync_events().await);
    assert_eq!(reload(&engine, &seeded.id).await.status, SyncStatus::Sent);
}

#[tokio::test]
async fn test_retry_offline_only_resets() {
    let (engine, _) = engine(false);
    let seeded = seed(&engine, "gate", SyncStatus::Failed, 3).await;

    let saved = engine.retry_event(&seeded.id).await.unwrap();
    assert_eq!(saved.disposition, SyncDisposition::Deferred);
    assert_eq!(saved.event.status, SyncStatus::Pending);
    assert_eq!(saved.event.sync_attempts, 0);
    assert_eq!(saved.event.last_sync_error, seeded.last_sync_error);
}

#[tokio::test]
async fn test_retry_of_synced_event_is_rejected() {
    let (engine, _) = engine(true);
    let seeded = seed(&engine, "gate", SyncStatus::Sent, 0).await;
    assert!(matches!(
        engine.retry_event(&seeded.id).await,
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_delete_is_explicit() {
    let (engine, _) = engine(true);
    engine.remote().set_fail_all(true);
    let event = engine.create_event(draft("x")).await.unwrap().event;

    for _ in 0..4 {
        engine.sync_events().await;
    }
    assert_eq!(engine.list_events().await.unwrap().len(), 1);

    assert!(engine.delete_event(&event.id).await.unwrap());
    assert!(!engine.delete_event(&event.id).await.unwrap());
    assert!(engine.list_events().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_sync_summary() {
    let (engine, connectivity) = engine(true);
    seed(&engine, "a", SyncStatus::Pending, 0).await;
    seed(&engine, "b", SyncStatus::Failed, 3).await;
    seed(&engine, "c", SyncStatus::Sent, 0).await;

    let summary = engine.sync_summary().await.unwrap();
    assert_eq!((summary.pending, summary.failed, summary.sent), (1, 1, 1));
    assert_eq!(summary.exhausted, 1);
    assert_eq!(summary.state(), SyncState::Error);

    connectivity.set_connected(false);
    assert_eq!(
        engine.sync_summary().await.unwrap().state(),
        SyncState::Offline
    );
}

async fn wait_until_sent(engine: &Engine, id: &EventId) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while reload(engine, id).await.status != SyncStatus::Sent {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("event was not synced in time");
}

fn auto_sync(engine: &Arc<Engine>) -> AutoSyncHandle {
    let runner = Arc::clone(engine);
    spawn_on_reconnect(engine.connectivity(), move || {
        let runner = Arc::clone(&runner);
        async move {
            runner.sync_events().await;
        }
    })
}

#[tokio::test]
async fn test_auto_sync_runs_on_reconnect() {
    let (engine, connectivity) = engine(false);
    let engine = Arc::new(engine);
    let event = engine.create_event(draft("truck")).await.unwrap().event;

    let handle = auto_sync(&engine);
    assert!(handle.is_running());

    connectivity.set_connected(true);
    wait_until_sent(&engine, &event.id).await;
    assert_eq!(engine.remote().calls(), vec!["create truck".to_string()]);
}

#[tokio::test]
async fn test_auto_sync_ignores_initial_online_state() {
    let (engine, connectivity) = engine(true);
    let event = seed(&engine, "truck", SyncStatus::Pending, 0).await;
    let engine = Arc::new(engine);

    let _handle = auto_sync(&engine);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(engine.remote().calls().is_empty());

    connectivity.set_connected(false);
    tokio::time::sleep(Duration::from_millis(20)).await;
    connectivity.set_connected(true);
    wait_until_sent(&engine, &event.id).await;
    assert_eq!(engine.remote().calls().len(), 1);
}

#[tokio::test]
async fn test_stopped_auto_sync_does_nothing() {
    let (engine, connectivity) = engine(false);
    let engine = Arc::new(engine);
    let event = engine.create_event(draft("truck")).await.unwrap().event;

    auto_sync(&engine).stop();
    connectivity.set_connected(true);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stored = engine.get_event(&event.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SyncStatus::Pending);
    assert!(engine.remote().calls().is_empty());
}

#[tokio::test]
async fn test_spawn_on_reconnect_fires_once_per_edge() {
    let connectivity = ManualConnectivity::offline();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let _handle = spawn_on_reconnect(&connectivity, move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    for connected in [true, false, true] {
        connectivity.set_connected(connected);
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

async fn wait_started(started: &mut mpsc::UnboundedReceiver<()>) {
    tokio::time::timeout(Duration::from_secs(2), started.recv())
        .await
        .expect("reconcile run did not start");
}

#[tokio::test]
async fn test_reconnect_during_running_pass_queues_another() {
    let connectivity = ManualConnectivity::offline();
    let release = Arc::new(Notify::new());
    let finished = Arc::new(AtomicUsize::new(0));
    let (started_tx, mut started) = mpsc::unbounded_channel();

    let _handle = spawn_on_reconnect(&connectivity, {
        let release = Arc::clone(&release);
        let finished = Arc::clone(&finished);
        move || {
            let release = Arc::clone(&release);
            let finished = Arc::clone(&finished);
            let started_tx = started_tx.clone();
            async move {
                let _ = started_tx.send(());
                release.notified().await;
                finished.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    connectivity.set_connected(true);
    wait_started(&mut started).await;

    // Drop out and come back while the first run is still going
    connectivity.set_connected(false);
    connectivity.set_connected(true);
    release.notify_one();

    wait_started(&mut started).await;
    release.notify_one();

    tokio::time::timeout(Duration::from_secs(2), async {
        while finished.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("second run did not finish");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 2);
}
