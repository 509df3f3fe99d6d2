//! Queue Controller - owns one live queue
//!
//! State machine: `NotLoaded -> Loading -> {Loaded, Error}`;
//! `Loaded | Error -> Loading` only through `reload()`; `dispose()` is terminal.
//!
//! Events that arrive while a snapshot is in flight are applied immediately and
//! buffered; when the snapshot resolves the buffer is replayed on top of it so a
//! late snapshot never erases them.

use crate::application::loader::SnapshotLoader;
use crate::application::reducer::{dedup, reduce, reduce_all};
use crate::application::stagger::Activate;
use crate::domain::{
    LoadError, LoadStatus, OperationKind, QueueConfig, QueueEvent, QueueItem, QueueOp,
    QueueState, ReducerPolicy,
};
use crate::error::{AppError, Result};
use crate::port::{AuthContext, DataSource, StateObserver, Subscription, TimeProvider};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Inner {
    state: QueueState,
    /// Ops received during `Loading`, replayed onto the snapshot
    pending: Vec<QueueOp>,
    /// Bumped on every load start and on dispose; stale results are discarded
    load_epoch: u64,
    load_task: Option<JoinHandle<()>>,
    subscriptions: Vec<Subscription>,
    disposed: bool,
}

/// Observer notifications waiting to be delivered, in publish order
#[derive(Default)]
struct Delivery {
    queue: VecDeque<QueueState>,
    draining: bool,
}

/// Live synchronizer for one admin queue
pub struct QueueController {
    config: Arc<QueueConfig>,
    policy: ReducerPolicy,
    loader: SnapshotLoader,
    time_provider: Arc<dyn TimeProvider>,
    observer: Option<Arc<dyn StateObserver>>,
    state_tx: watch::Sender<QueueState>,
    inner: Mutex<Inner>,
    delivery: Mutex<Delivery>,
    weak_self: Weak<QueueController>,
}

impl QueueController {
    /// Create a controller and subscribe it to its queue's event names
    ///
    /// # Errors
    /// - AppError::Config if the queue configuration is unusable
    pub fn new(
        config: QueueConfig,
        data_source: Arc<dyn DataSource>,
        auth: AuthContext,
        time_provider: Arc<dyn TimeProvider>,
        observer: Option<Arc<dyn StateObserver>>,
    ) -> Result<Arc<Self>> {
        validate_config(&config)?;

        let (state_tx, _) = watch::channel(QueueState::default());
        let policy = config.policy();
        let config = Arc::new(config);

        let controller = Arc::new_cyclic(|weak: &Weak<QueueController>| {
            let subscriptions = config
                .rules
                .event_names()
                .map(|event| {
                    let weak = weak.clone();
                    data_source.subscribe(
                        event,
                        Arc::new(move |event: QueueEvent| {
                            if let Some(controller) = weak.upgrade() {
                                controller.handle_event(&event);
                            }
                        }),
                    )
                })
                .collect();

            Self {
                config: Arc::clone(&config),
                policy,
                loader: SnapshotLoader::new(Arc::clone(&data_source), auth),
                time_provider,
                observer,
                state_tx,
                inner: Mutex::new(Inner {
                    state: QueueState::default(),
                    pending: Vec::new(),
                    load_epoch: 0,
                    load_task: None,
                    subscriptions,
                    disposed: false,
                }),
                delivery: Mutex::new(Delivery::default()),
                weak_self: weak.clone(),
            }
        });

        debug!(
            queue = %controller.config.name,
            events = controller.config.rules.bindings.len(),
            "Queue controller created"
        );
        Ok(controller)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Latest state (always reflects the most recent synchronous change)
    pub fn snapshot(&self) -> QueueState {
        self.lock().state.clone()
    }

    /// Push-style view of the state for renderers
    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.state_tx.subscribe()
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Start the first snapshot load; no-op unless `NotLoaded`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn activate(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            debug!(queue = %self.config.name, "Activate ignored: controller disposed");
            return;
        }
        if inner.state.load_status != LoadStatus::NotLoaded {
            debug!(
                queue = %self.config.name,
                status = %inner.state.load_status,
                "Activate ignored: already activated"
            );
            return;
        }
        self.start_load(&mut inner);
        self.publish(inner);
    }

    /// Explicit refresh: `Loaded | Error -> Loading`
    ///
    /// A load already in flight is left alone.
    pub fn reload(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            debug!(queue = %self.config.name, "Reload ignored: controller disposed");
            return;
        }
        if inner.state.load_status == LoadStatus::Loading {
            debug!(queue = %self.config.name, "Reload ignored: load in flight");
            return;
        }
        self.start_load(&mut inner);
        self.publish(inner);
    }

    /// Route one inbound event through the merge rules and reducer
    ///
    /// Foreign events are ignored, malformed ones are logged and dropped.
    pub fn handle_event(&self, event: &QueueEvent) {
        let op = match self.config.rules.decode(event) {
            Ok(Some(op)) => op,
            Ok(None) => {
                debug!(queue = %self.config.name, event = %event.name, "Ignoring foreign event");
                return;
            }
            Err(e) => {
                warn!(
                    queue = %self.config.name,
                    event = %event.name,
                    error = %e,
                    "Dropping malformed event"
                );
                return;
            }
        };
        self.apply(op);
    }

    /// Apply a decoded operation
    pub fn apply(&self, op: QueueOp) {
        let mut inner = self.lock();
        if inner.disposed {
            debug!(queue = %self.config.name, kind = %op.kind(), "Op ignored: controller disposed");
            return;
        }

        // Pushed snapshot (socket request/response pair) settles any in-flight load.
        // Before activation it only replaces items; `activate()` still loads.
        let activated = inner.state.load_status != LoadStatus::NotLoaded;
        let op = match op {
            QueueOp::SnapshotReplace(items) if activated => {
                if let Some(task) = inner.load_task.take() {
                    task.abort();
                }
                inner.load_epoch += 1;
                self.install_snapshot(&mut inner, items);
                self.publish(inner);
                return;
            }
            op => op,
        };

        let items = std::mem::take(&mut inner.state.items);
        inner.state.items = reduce(items, &op, &self.policy);
        debug!(
            queue = %self.config.name,
            kind = %op.kind(),
            items = inner.state.items.len(),
            "Event applied"
        );
        if inner.state.load_status == LoadStatus::Loading {
            inner.pending.push(op);
        }
        self.publish(inner);
    }

    /// Detach from the data source and discard any in-flight load
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        inner.load_epoch += 1;
        inner.pending.clear();
        if let Some(task) = inner.load_task.take() {
            task.abort();
        }
        let subscriptions = std::mem::take(&mut inner.subscriptions);
        drop(inner);

        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        info!(queue = %self.config.name, "Queue controller disposed");
    }

    fn start_load(&self, inner: &mut MutexGuard<'_, Inner>) {
        inner.load_epoch += 1;
        let epoch = inner.load_epoch;
        inner.pending.clear();
        inner.state.load_status = LoadStatus::Loading;
        inner.state.last_error = None;

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(queue = %self.config.name, error = %e, "Cannot load snapshot outside a runtime");
                inner.state.load_status = LoadStatus::Error;
                inner.state.last_error = Some(format!("no async runtime: {}", e));
                return;
            }
        };

        let weak = self.weak_self.clone();
        let loader = self.loader.clone();
        let config = Arc::clone(&self.config);
        info!(queue = %self.config.name, epoch = epoch, "Loading snapshot");

        inner.load_task = Some(runtime.spawn(async move {
            let result = loader.load(&config).await;
            if let Some(controller) = weak.upgrade() {
                controller.complete_load(epoch, result);
            }
        }));
    }

    fn complete_load(&self, epoch: u64, result: std::result::Result<Vec<QueueItem>, LoadError>) {
        let mut inner = self.lock();
        if inner.disposed || epoch != inner.load_epoch {
            debug!(
                queue = %self.config.name,
                epoch = epoch,
                current = inner.load_epoch,
                "Discarding stale snapshot result"
            );
            return;
        }
        inner.load_task = None;

        match result {
            Ok(items) => self.install_snapshot(&mut inner, items),
            Err(e) => {
                // Keep stale items visible, surface the error
                let dropped = inner.pending.len();
                inner.pending.clear();
                inner.state.load_status = LoadStatus::Error;
                inner.state.last_error = Some(e.to_string());
                warn!(
                    queue = %self.config.name,
                    error = %e,
                    kept_items = inner.state.items.len(),
                    buffered = dropped,
                    "Snapshot load failed"
                );
            }
        }
        self.publish(inner);
    }

    fn install_snapshot(&self, inner: &mut MutexGuard<'_, Inner>, items: Vec<QueueItem>) {
        let pending = std::mem::take(&mut inner.pending);
        inner.state.items = reduce_all(dedup(items), pending.iter(), &self.policy);
        inner.state.load_status = LoadStatus::Loaded;
        inner.state.last_error = None;
        inner.state.last_synced_at = Some(self.time_provider.now_millis());
        info!(
            queue = %self.config.name,
            items = inner.state.items.len(),
            replayed = pending.len(),
            "Snapshot installed"
        );
    }

    /// Publish the current state and release the lock before calling the observer
    ///
    /// States are queued while the lock is held, so the observer sees them in
    /// publish order even when publishers race on different threads.
    fn publish(&self, inner: MutexGuard<'_, Inner>) {
        let state = inner.state.clone();
        self.state_tx.send_replace(state.clone());
        let Some(observer) = &self.observer else {
            return;
        };
        self.lock_delivery().queue.push_back(state);
        drop(inner);

        self.drain(observer.as_ref());
    }

    /// Deliver queued states; only one thread drains at a time
    fn drain(&self, observer: &dyn StateObserver) {
        {
            let mut delivery = self.lock_delivery();
            if delivery.draining {
                return;
            }
            delivery.draining = true;
        }

        loop {
            let next = {
                let mut delivery = self.lock_delivery();
                match delivery.queue.pop_front() {
                    Some(state) => state,
                    None => {
                        delivery.draining = false;
                        return;
                    }
                }
            };
            observer.on_state_change(&self.config.name, &next);
        }
    }

    fn lock_delivery(&self) -> MutexGuard<'_, Delivery> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Activate for QueueController {
    fn activate(&self) {
        QueueController::activate(self);
    }
}

impl Drop for QueueController {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = inner.load_task.take() {
            task.abort();
        }
    }
}

/// Reject queue tables that cannot work (programmer error, setup time only)
pub fn validate_config(config: &QueueConfig) -> Result<()> {
    if config.name.trim().is_empty() {
        return Err(AppError::Config("queue name must not be empty".to_string()));
    }
    let identity = &config.rules.identity;
    if identity.field.trim().is_empty() || identity.aliases.iter().any(|a| a.trim().is_empty()) {
        return Err(AppError::Config(format!(
            "queue '{}' has no usable identity field",
            config.name
        )));
    }

    let mut seen = HashSet::new();
    for binding in &config.rules.bindings {
        if binding.event.trim().is_empty() {
            return Err(AppError::Config(format!(
                "queue '{}' binds an empty event name",
                config.name
            )));
        }
        if !seen.insert(binding.event.as_str()) {
            return Err(AppError::Config(format!(
                "queue '{}' binds event '{}' twice",
                config.name, binding.event
            )));
        }
        if binding.kind == OperationKind::NestedAppend && config.rules.nested_field.is_none() {
            return Err(AppError::Config(format!(
                "queue '{}' binds nested-append event '{}' without a nested field",
                config.name, binding.event
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventBinding, IdentityRule, InsertPosition};
    use crate::port::data_source::mocks::MockDataSource;
    use crate::port::observer::mocks::RecordingObserver;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use serde_json::json;
    use std::time::Duration;

    fn bump_config() -> QueueConfig {
        QueueConfig::new("bumpRequests", IdentityRule::new("_id").with_alias("id"))
            .bind(EventBinding::insert("newBumpRequest", "bumpRequest"))
            .bind(EventBinding::upsert("bumpRequestUpdated", "bumpRequest"))
            .bind(EventBinding::remove("bumpRequestApproved", "requestId"))
    }

    fn controller_with(
        config: QueueConfig,
        source: &Arc<MockDataSource>,
    ) -> (Arc<QueueController>, Arc<RecordingObserver>) {
        let observer = Arc::new(RecordingObserver::new());
        let controller = QueueController::new(
            config,
            source.clone(),
            AuthContext::bearer("admin"),
            Arc::new(ManualTimeProvider::new(1_000)),
            Some(observer.clone()),
        )
        .unwrap();
        (controller, observer)
    }

    fn insert_event(id: &str) -> QueueEvent {
        QueueEvent::new("newBumpRequest", json!({"bumpRequest": {"_id": id}}))
    }

    fn remove_event(id: &str) -> QueueEvent {
        QueueEvent::new("bumpRequestApproved", json!({"requestId": id}))
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_activate_loads_snapshot() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot("bumpRequests", vec![json!({"_id": "r1"})]);
        let (controller, observer) = controller_with(bump_config(), &source);

        assert_eq!(controller.snapshot().load_status, LoadStatus::NotLoaded);
        controller.activate();
        assert_eq!(controller.snapshot().load_status, LoadStatus::Loading);
        settle().await;

        let state = controller.snapshot();
        assert_eq!(state.load_status, LoadStatus::Loaded);
        assert_eq!(state.ids(), vec!["r1"]);
        assert_eq!(state.last_synced_at, Some(1_000));
        assert_eq!(
            observer.last_for("bumpRequests").unwrap().load_status,
            LoadStatus::Loaded
        );
    }

    #[tokio::test]
    async fn test_activate_is_idempotent() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot_delayed("bumpRequests", Duration::from_millis(20), vec![]);
        let (controller, _) = controller_with(bump_config(), &source);

        controller.activate();
        controller.activate();
        tokio::time::sleep(Duration::from_millis(40)).await;
        controller.activate();
        settle().await;

        assert_eq!(source.snapshot_calls("bumpRequests"), 1);
        assert_eq!(controller.snapshot().load_status, LoadStatus::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffered_events_replayed_after_snapshot() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot_delayed(
            "bumpRequests",
            Duration::from_millis(50),
            vec![json!({"_id": "q"}), json!({"_id": "r"})],
        );
        let (controller, _) = controller_with(bump_config(), &source);

        controller.activate();
        source.emit(insert_event("p"));
        source.emit(remove_event("q"));
        assert_eq!(controller.snapshot().load_status, LoadStatus::Loading);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let state = controller.snapshot();
        assert_eq!(state.load_status, LoadStatus::Loaded);
        assert_eq!(state.ids(), vec!["p", "r"]);
    }

    #[tokio::test]
    async fn test_load_error_keeps_stale_items() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot("bumpRequests", vec![json!({"_id": "a"}), json!({"_id": "b"})]);
        source.fail_snapshot("bumpRequests", LoadError::Transport("offline".into()));
        let (controller, _) = controller_with(bump_config(), &source);

        controller.activate();
        settle().await;
        assert_eq!(controller.snapshot().ids(), vec!["a", "b"]);

        controller.reload();
        settle().await;
        let state = controller.snapshot();
        assert_eq!(state.load_status, LoadStatus::Error);
        assert_eq!(state.ids(), vec!["a", "b"]);
        assert!(state.last_error.unwrap().contains("offline"));
    }

    #[tokio::test]
    async fn test_error_recovers_only_on_reload() {
        let source = Arc::new(MockDataSource::new());
        source.fail_snapshot("bumpRequests", LoadError::Transport("offline".into()));
        source.set_snapshot("bumpRequests", vec![json!({"_id": "a"})]);
        let (controller, _) = controller_with(bump_config(), &source);

        controller.activate();
        settle().await;
        assert_eq!(controller.snapshot().load_status, LoadStatus::Error);

        controller.activate();
        settle().await;
        assert_eq!(controller.snapshot().load_status, LoadStatus::Error);

        controller.reload();
        settle().await;
        let state = controller.snapshot();
        assert_eq!(state.load_status, LoadStatus::Loaded);
        assert_eq!(state.last_error, None);
        assert_eq!(state.ids(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_events_applied_after_loaded() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot("bumpRequests", vec![json!({"_id": "a"})]);
        let (controller, _) = controller_with(bump_config(), &source);
        controller.activate();
        settle().await;

        source.emit(insert_event("b"));
        source.emit(QueueEvent::new(
            "bumpRequestUpdated",
            json!({"bumpRequest": {"_id": "a", "status": "approved"}}),
        ));
        source.emit(remove_event("b"));

        let state = controller.snapshot();
        assert_eq!(state.ids(), vec!["a"]);
        assert_eq!(state.items[0].status, crate::domain::ItemStatus::Approved);
    }

    #[tokio::test]
    async fn test_malformed_event_is_dropped() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot("bumpRequests", vec![json!({"_id": "a"})]);
        let (controller, _) = controller_with(bump_config(), &source);
        controller.activate();
        settle().await;

        source.emit(QueueEvent::new("newBumpRequest", json!({"bumpRequest": {"title": "?"}})));
        source.emit(QueueEvent::new("newBumpRequest", json!(null)));

        let state = controller.snapshot();
        assert_eq!(state.ids(), vec!["a"]);
        assert_eq!(state.load_status, LoadStatus::Loaded);
    }

    #[tokio::test]
    async fn test_foreign_event_is_ignored() {
        let source = Arc::new(MockDataSource::new());
        let (controller, observer) = controller_with(bump_config(), &source);
        controller.handle_event(&QueueEvent::new("newPendingAd", json!({"ad": {"_id": "x"}})));
        assert!(controller.snapshot().is_empty());
        assert_eq!(observer.count_for("bumpRequests"), 0);
    }

    #[tokio::test]
    async fn test_dispose_silences_events() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot("bumpRequests", vec![json!({"_id": "a"})]);
        let (controller, _) = controller_with(bump_config(), &source);
        controller.activate();
        settle().await;
        let before = controller.snapshot();

        controller.dispose();
        assert_eq!(source.subscriber_count("newBumpRequest"), 0);

        source.emit(insert_event("b"));
        controller.handle_event(&insert_event("c"));
        controller.handle_event(&remove_event("a"));
        controller.reload();
        controller.dispose();

        assert_eq!(controller.snapshot(), before);
        assert!(controller.is_disposed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_discards_in_flight_snapshot() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot_delayed(
            "bumpRequests",
            Duration::from_millis(100),
            vec![json!({"_id": "late"})],
        );
        let (controller, observer) = controller_with(bump_config(), &source);

        controller.activate();
        let notifications = observer.count_for("bumpRequests");
        controller.dispose();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let state = controller.snapshot();
        assert!(state.is_empty());
        assert_eq!(state.load_status, LoadStatus::Loading);
        assert_eq!(observer.count_for("bumpRequests"), notifications);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_while_loading_is_single_flight() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot_delayed("bumpRequests", Duration::from_millis(50), vec![]);
        let (controller, _) = controller_with(bump_config(), &source);

        controller.activate();
        controller.reload();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(source.snapshot_calls("bumpRequests"), 1);
        assert_eq!(controller.snapshot().load_status, LoadStatus::Loaded);
    }

    #[tokio::test]
    async fn test_reload_replaces_items() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot("bumpRequests", vec![json!({"_id": "a"}), json!({"_id": "b"})]);
        source.set_snapshot(
            "bumpRequests",
            vec![json!({"_id": "x"}), json!({"_id": "y"}), json!({"_id": "z"})],
        );
        let (controller, _) = controller_with(bump_config(), &source);

        controller.activate();
        settle().await;
        assert_eq!(controller.snapshot().ids(), vec!["a", "b"]);

        controller.reload();
        assert_eq!(controller.snapshot().load_status, LoadStatus::Loading);
        settle().await;
        assert_eq!(controller.snapshot().ids(), vec!["x", "y", "z"]);
    }

    #[tokio::test]
    async fn test_pushed_snapshot_settles_loading() {
        let config = bump_config().bind(
            EventBinding::new("pendingBumpRequestsLoaded", OperationKind::SnapshotReplace)
                .at("requests"),
        );
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot_delayed(
            "bumpRequests",
            Duration::from_secs(60),
            vec![json!({"_id": "never"})],
        );
        let (controller, _) = controller_with(config, &source);

        controller.activate();
        source.emit(insert_event("p"));
        source.emit(QueueEvent::new(
            "pendingBumpRequestsLoaded",
            json!({"requests": [{"_id": "s1"}]}),
        ));

        let state = controller.snapshot();
        assert_eq!(state.load_status, LoadStatus::Loaded);
        assert_eq!(state.ids(), vec!["p", "s1"]);
    }

    #[tokio::test]
    async fn test_watch_receiver_sees_latest_state() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot("bumpRequests", vec![json!({"_id": "a"})]);
        let (controller, _) = controller_with(bump_config(), &source);
        let mut rx = controller.subscribe();

        controller.activate();
        settle().await;
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().load_status, LoadStatus::Loaded);
    }

    #[test]
    fn test_activate_outside_runtime_surfaces_error() {
        let source = Arc::new(MockDataSource::new());
        let (controller, _) = controller_with(bump_config(), &source);
        controller.activate();

        let state = controller.snapshot();
        assert_eq!(state.load_status, LoadStatus::Error);
        assert!(state.last_error.unwrap().contains("runtime"));
    }

    #[test]
    fn test_validate_config_rejects_misconfiguration() {
        let empty_identity = QueueConfig::new("q", IdentityRule::new(""));
        assert!(matches!(
            validate_config(&empty_identity),
            Err(AppError::Config(_))
        ));

        let duplicate = QueueConfig::new("q", IdentityRule::new("_id"))
            .bind(EventBinding::insert("e", "x"))
            .bind(EventBinding::remove("e", "id"));
        assert!(validate_config(&duplicate).is_err());

        let nested_without_field = QueueConfig::new("q", IdentityRule::new("userId"))
            .bind(EventBinding::nested_append("redeemed", "userId", "r"));
        assert!(validate_config(&nested_without_field).is_err());

        let ok = bump_config().insert_at(InsertPosition::Append);
        assert!(validate_config(&ok).is_ok());
    }

    /// Records load statuses; stalls on `Loading` to let a later publish overtake it
    struct SlowObserver {
        seen: std::sync::Mutex<Vec<LoadStatus>>,
    }

    impl StateObserver for SlowObserver {
        fn on_state_change(&self, _queue: &str, state: &QueueState) {
            if state.load_status == LoadStatus::Loading {
                std::thread::sleep(Duration::from_millis(200));
            }
            self.seen.lock().unwrap().push(state.load_status);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_observer_sees_states_in_publish_order() {
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot("bumpRequests", vec![json!({"_id": "a"})]);
        let observer = Arc::new(SlowObserver {
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let controller = QueueController::new(
            bump_config(),
            source.clone(),
            AuthContext::bearer("admin"),
            Arc::new(ManualTimeProvider::new(1_000)),
            Some(observer.clone()),
        )
        .unwrap();

        controller.activate();
        for _ in 0..100 {
            if observer.seen.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(controller.snapshot().load_status, LoadStatus::Loaded);
        assert_eq!(
            *observer.seen.lock().unwrap(),
            vec![LoadStatus::Loading, LoadStatus::Loaded]
        );
    }

    #[tokio::test]
    async fn test_pushed_snapshot_before_activate_keeps_not_loaded() {
        let config = bump_config().bind(
            EventBinding::new("pendingBumpRequestsLoaded", OperationKind::SnapshotReplace)
                .at("requests"),
        );
        let source = Arc::new(MockDataSource::new());
        source.set_snapshot("bumpRequests", vec![json!({"_id": "fresh"})]);
        let (controller, _) = controller_with(config, &source);

        source.emit(QueueEvent::new(
            "pendingBumpRequestsLoaded",
            json!({"requests": [{"_id": "s1"}, {"_id": "s1"}]}),
        ));
        let state = controller.snapshot();
        assert_eq!(state.load_status, LoadStatus::NotLoaded);
        assert_eq!(state.ids(), vec!["s1"]);
        assert_eq!(state.last_synced_at, None);

        controller.activate();
        settle().await;
        assert_eq!(source.snapshot_calls("bumpRequests"), 1);
        let state = controller.snapshot();
        assert_eq!(state.load_status, LoadStatus::Loaded);
        assert_eq!(state.ids(), vec!["fresh"]);
    }
}
