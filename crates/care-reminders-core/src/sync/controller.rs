//! Live sync controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use super::{ReminderStream, SyncError, SyncPhase, SyncResult};
use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::models::{PatientRecord, ReminderListView};
use crate::reminders::derive_view;
use crate::store::{
    CollectionStore, Session, SnapshotEvent, SnapshotListener, StoreError, StoreSubscription,
};

/// Consumer of published views.
pub type UpdateCallback = Arc<dyn Fn(ReminderListView) + Send + Sync>;

/// Keeps a reminder view in step with the caregiver's patient collection.
///
/// Each controller owns at most one subscription over its lifetime:
/// `Idle → Subscribed → Unsubscribed`. Every snapshot is recomputed in full
/// and published once, in delivery order.
pub struct LiveSyncController {
    store: Arc<dyn CollectionStore>,
    session: Session,
    config: SyncConfig,
    shared: Arc<Shared>,
}

impl LiveSyncController {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        session: Session,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            session,
            config,
            shared: Arc::new(Shared {
                clock,
                active: AtomicBool::new(false),
                delivery: Mutex::new(()),
                delivering_thread: Mutex::new(None),
                state: Mutex::new(SyncState::default()),
            }),
        }
    }

    /// Subscribe and publish a fresh view to `on_update` for every snapshot.
    ///
    /// The initial snapshot may be published before this returns. Fails with
    /// [`SyncError::AuthenticationRequired`] if the session has no identity,
    /// in which case nothing is subscribed.
    pub fn start_sync<F>(&self, on_update: F) -> SyncResult<SyncHandle>
    where
        F: Fn(ReminderListView) + Send + Sync + 'static,
    {
        self.start_with(Arc::new(on_update))
    }

    /// Subscribe and receive views as a blocking iterator.
    ///
    /// The stream ends once the handle is unsubscribed or dropped.
    pub fn stream(&self) -> SyncResult<(SyncHandle, ReminderStream)> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let handle = self.start_sync(move |view| {
            if let Ok(tx) = tx.lock() {
                // Receiver gone means nobody is listening any more
                let _ = tx.send(view);
            }
        })?;
        Ok((handle, ReminderStream::new(rx)))
    }

    fn start_with(&self, on_update: UpdateCallback) -> SyncResult<SyncHandle> {
        let path = {
            let mut state = self.shared.lock();
            if state.phase != SyncPhase::Idle {
                return Err(SyncError::InvalidState {
                    expected: SyncPhase::Idle,
                    found: state.phase,
                });
            }

            let Some(uid) = self.session.current_identity() else {
                tracing::warn!("reminder sync requested without an authenticated user");
                return Err(SyncError::AuthenticationRequired);
            };

            state.phase = SyncPhase::Subscribed;
            state.on_update = Some(on_update);
            self.config.patients_path(uid)
        };
        self.shared.active.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let listener: SnapshotListener =
            Arc::new(move |event: &SnapshotEvent| shared.handle_event(event));

        match self.store.subscribe(&path, &self.config.order_by, listener) {
            Ok(subscription) => {
                tracing::info!(path = %path, order_by = %self.config.order_by, "reminder sync started");
                Ok(SyncHandle {
                    shared: Arc::clone(&self.shared),
                    subscription: Mutex::new(Some(subscription)),
                })
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "failed to subscribe to patients");
                self.shared.active.store(false, Ordering::SeqCst);
                let mut state = self.shared.lock();
                state.phase = SyncPhase::Idle;
                state.on_update = None;
                Err(e.into())
            }
        }
    }

    /// Re-evaluate the last snapshot against the current time and publish it.
    ///
    /// Returns `None` if no snapshot has arrived yet.
    pub fn refresh(&self) -> SyncResult<Option<ReminderListView>> {
        let found = self.phase();
        if found != SyncPhase::Subscribed {
            return Err(SyncError::InvalidState {
                expected: SyncPhase::Subscribed,
                found,
            });
        }
        Ok(self.shared.publish(None))
    }

    pub fn phase(&self) -> SyncPhase {
        self.shared.lock().phase
    }

    /// The most recently published view.
    pub fn latest_view(&self) -> Option<ReminderListView> {
        self.shared.lock().latest.clone()
    }

    /// The last read failure since the most recent good snapshot.
    pub fn last_error(&self) -> Option<StoreError> {
        self.shared.lock().last_error.clone()
    }

    /// Patient records from the most recent snapshot, in store order.
    pub fn records(&self) -> Vec<PatientRecord> {
        self.shared.lock().records.clone().unwrap_or_default()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }
}

/// Handle for an active sync. Unsubscribes on drop.
#[must_use = "dropping the handle stops the sync"]
pub struct SyncHandle {
    shared: Arc<Shared>,
    subscription: Mutex<Option<StoreSubscription>>,
}

impl SyncHandle {
    /// Stop syncing. No update is published after this returns, including
    /// from a snapshot already being delivered. Safe to call more than once.
    ///
    /// Blocks until a callback running on another thread has finished. When
    /// called from inside the callback itself, that callback is the last.
    pub fn unsubscribe(&self) {
        self.shared.active.store(false, Ordering::SeqCst);
        self.shared.wait_for_delivery();

        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(mut subscription) = subscription {
            subscription.unsubscribe();
            let mut state = self.shared.lock();
            state.phase = SyncPhase::Unsubscribed;
            state.on_update = None;
            tracing::info!("reminder sync stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

struct Shared {
    clock: Arc<dyn Clock>,
    active: AtomicBool,
    /// Held from recompute through the callback; one publication at a time.
    delivery: Mutex<()>,
    /// Thread currently holding `delivery`, so nested calls do not relock it.
    delivering_thread: Mutex<Option<ThreadId>>,
    state: Mutex<SyncState>,
}

/// Marks the current thread as publishing until dropped.
struct DeliveryGuard<'a> {
    shared: &'a Shared,
    previous: Option<ThreadId>,
    _lock: Option<MutexGuard<'a, ()>>,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        *self.shared.delivering_thread() = self.previous;
    }
}

#[derive(Default)]
struct SyncState {
    phase: SyncPhase,
    on_update: Option<UpdateCallback>,
    records: Option<Vec<PatientRecord>>,
    latest: Option<ReminderListView>,
    last_error: Option<StoreError>,
}

impl Shared {
    fn handle_event(&self, event: &SnapshotEvent) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }

        match event {
            Ok(documents) => {
                let records = documents.iter().map(PatientRecord::from_document).collect();
                self.publish(Some(records));
            }
            Err(e) => {
                tracing::warn!(error = %e, "snapshot failed, keeping last reminder view");
                self.lock().last_error = Some(e.clone());
            }
        }
    }

    /// Recompute from `records` (or the cached snapshot) and publish.
    fn publish(&self, records: Option<Vec<PatientRecord>>) -> Option<ReminderListView> {
        let _delivery = self.begin_delivery();
        let now = self.clock.now();

        let (view, on_update) = {
            let mut state = self.lock();
            if let Some(records) = records {
                state.records = Some(records);
                state.last_error = None;
            }

            let view = derive_view(state.records.as_deref()?, now);
            state.latest = Some(view.clone());
            (view, state.on_update.clone())
        };

        // State is unlocked here so consumers may call back into the controller
        if let Some(on_update) = on_update {
            if self.active.load(Ordering::SeqCst) {
                on_update(view.clone());
            }
        }
        Some(view)
    }

    fn begin_delivery(&self) -> DeliveryGuard<'_> {
        let me = thread::current().id();
        let previous = *self.delivering_thread();
        let lock = if previous == Some(me) {
            None
        } else {
            Some(self.delivery.lock().unwrap_or_else(|e| e.into_inner()))
        };
        *self.delivering_thread() = Some(me);
        DeliveryGuard {
            shared: self,
            previous: if lock.is_some() { None } else { previous },
            _lock: lock,
        }
    }

    /// Wait out a publication in progress on another thread.
    fn wait_for_delivery(&self) {
        if *self.delivering_thread() == Some(thread::current().id()) {
            return;
        }
        drop(self.delivery.lock().unwrap_or_else(|e| e.into_inner()));
    }

    fn delivering_thread(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.delivering_thread
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::ReminderStatus;
    use crate::store::{CollectionPath, MemoryStore};
    use chrono::{Duration, Local, TimeZone};
    use serde_json::{json, Map, Value};

    struct Fixture {
        store: Arc<MemoryStore>,
        clock: Arc<FixedClock>,
        controller: LiveSyncController,
        views: Arc<Mutex<Vec<ReminderListView>>>,
    }

    impl Fixture {
        fn new(session: Session) -> Self {
            let store = Arc::new(MemoryStore::new());
            let clock = Arc::new(FixedClock::new(
                Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            ));
            let controller = LiveSyncController::new(
                store.clone(),
                session,
                clock.clone(),
                SyncConfig::default(),
            );
            Self {
                store,
                clock,
                controller,
                views: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn start(&self) -> SyncResult<SyncHandle> {
            let sink = self.views.clone();
            self.controller
                .start_sync(move |view| sink.lock().unwrap().push(view))
        }

        fn published(&self) -> usize {
            self.views.lock().unwrap().len()
        }
    }

    fn patients() -> CollectionPath {
        CollectionPath::new(&["users", "u1", "patients"])
    }

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_requires_identity() {
        let fx = Fixture::new(Session::anonymous());

        let err = fx.start().err().unwrap();
        assert_eq!(err, SyncError::AuthenticationRequired);
        assert_eq!(fx.controller.phase(), SyncPhase::Idle);
        assert_eq!(fx.store.subscriber_count(), 0);
        assert_eq!(fx.published(), 0);
    }

    #[test]
    fn test_initial_snapshot_published() {
        let fx = Fixture::new(Session::authenticated("u1"));
        fx.store
            .set_document(&patients(), "p1", data(json!({ "name": "John Doe", "time": "8:00 AM" })))
            .unwrap();

        let _handle = fx.start().unwrap();

        assert_eq!(fx.controller.phase(), SyncPhase::Subscribed);
        let views = fx.views.lock().unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].reminders[0].status, ReminderStatus::Missed);
        assert_eq!(fx.controller.latest_view().as_ref(), Some(&views[0]));
    }

    #[test]
    fn test_only_own_collection() {
        let fx = Fixture::new(Session::authenticated("u1"));
        let _handle = fx.start().unwrap();

        let other = CollectionPath::new(&["users", "u2", "patients"]);
        fx.store.add(&other, data(json!({ "name": "Eve" }))).unwrap();
        assert_eq!(fx.published(), 1);

        fx.store.add(&patients(), data(json!({ "name": "Amy" }))).unwrap();
        assert_eq!(fx.published(), 2);
    }

    #[test]
    fn test_single_subscription_per_controller() {
        let fx = Fixture::new(Session::authenticated("u1"));
        let handle = fx.start().unwrap();

        let err = fx.start().err().unwrap();
        assert_eq!(
            err,
            SyncError::InvalidState {
                expected: SyncPhase::Idle,
                found: SyncPhase::Subscribed,
            }
        );

        handle.unsubscribe();
        assert!(fx.start().is_err());
        assert_eq!(fx.store.subscriber_count(), 0);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let fx = Fixture::new(Session::authenticated("u1"));
        let handle = fx.start().unwrap();
        assert!(handle.is_active());

        handle.unsubscribe();
        handle.unsubscribe();
        assert!(!handle.is_active());
        assert_eq!(fx.controller.phase(), SyncPhase::Unsubscribed);

        fx.store.add(&patients(), data(json!({ "name": "Amy" }))).unwrap();
        assert_eq!(fx.published(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let fx = Fixture::new(Session::authenticated("u1"));
        drop(fx.start().unwrap());

        assert_eq!(fx.store.subscriber_count(), 0);
        assert_eq!(fx.controller.phase(), SyncPhase::Unsubscribed);
    }

    #[test]
    fn test_failure_keeps_last_view() {
        let fx = Fixture::new(Session::authenticated("u1"));
        fx.store
            .set_document(&patients(), "p1", data(json!({ "name": "John Doe", "time": "8:00 AM" })))
            .unwrap();
        let _handle = fx.start().unwrap();
        let before = fx.controller.latest_view();

        let failure = StoreError::Unavailable("connection reset".into());
        fx.store.inject_failure(&patients(), failure.clone());

        assert_eq!(fx.published(), 1);
        assert_eq!(fx.controller.latest_view(), before);
        assert_eq!(fx.controller.last_error(), Some(failure));

        // The next good snapshot clears the error
        fx.store.add(&patients(), data(json!({ "name": "Amy" }))).unwrap();
        assert_eq!(fx.controller.last_error(), None);
        assert_eq!(fx.published(), 2);
    }

    #[test]
    fn test_refresh_tracks_time() {
        let fx = Fixture::new(Session::authenticated("u1"));
        fx.store
            .set_document(&patients(), "p1", data(json!({ "name": "Bob Lee", "time": "12:00 PM" })))
            .unwrap();

        assert!(fx.controller.refresh().is_err());

        let _handle = fx.start().unwrap();
        assert_eq!(
            fx.controller.latest_view().unwrap().reminders[0].status,
            ReminderStatus::Upcoming
        );

        fx.clock.advance(Duration::hours(3));
        let view = fx.controller.refresh().unwrap().unwrap();
        assert_eq!(view.reminders[0].status, ReminderStatus::Missed);
        assert_eq!(view.counts.missed, 1);
        assert_eq!(fx.published(), 2);
    }

    #[test]
    fn test_subscribe_failure_resets_to_idle() {
        let fx = Fixture::new(Session::authenticated("u1"));
        fx.store.set_available(false);

        let err = fx.start().err().unwrap();
        assert!(matches!(err, SyncError::Store(StoreError::Unavailable(_))));
        assert_eq!(fx.controller.phase(), SyncPhase::Idle);

        fx.store.set_available(true);
        assert!(fx.start().is_ok());
    }

    #[test]
    fn test_records_exposed() {
        let fx = Fixture::new(Session::authenticated("u1"));
        fx.store.set_document(&patients(), "b", data(json!({ "name": "Bob" }))).unwrap();
        fx.store.set_document(&patients(), "a", data(json!({ "name": "Amy" }))).unwrap();
        let _handle = fx.start().unwrap();

        let names: Vec<_> = fx.controller.records().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Amy", "Bob"]);
    }
}
