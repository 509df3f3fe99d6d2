// Data Source Port (Interface)
// Realized as REST + WebSocket (or JSON-RPC) by infra crates

use crate::application::constants::{ACTION_APPROVE, ACTION_REJECT};
use crate::domain::{LoadError, MutationError, QueueEvent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Opaque session credentials passed through to the data source
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = self.token.as_ref().map(|_| "<redacted>");
        f.debug_struct("AuthContext").field("token", &token).finish()
    }
}

/// Approve/reject intent issued by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    pub queue: String,
    pub action: String,
    pub id: String,
    #[serde(default)]
    pub extra: Value,
}

impl MutationRequest {
    pub fn new(queue: impl Into<String>, action: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            action: action.into(),
            id: id.into(),
            extra: Value::Null,
        }
    }

    pub fn approve(queue: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(queue, ACTION_APPROVE, id)
    }

    pub fn reject(queue: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(queue, ACTION_REJECT, id)
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = extra;
        self
    }
}

/// Callback invoked for every event delivered under a subscribed name
pub type EventHandler = Arc<dyn Fn(QueueEvent) + Send + Sync>;

/// Live subscription handle; detaches on `unsubscribe()` or drop
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Push/pull source of queue contents
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the full current pending list for a queue
    ///
    /// # Errors
    /// - LoadError::Transport on network failure
    /// - LoadError::Unauthorized when the session is rejected
    async fn request_snapshot(&self, queue: &str, auth: &AuthContext)
        -> Result<Vec<Value>, LoadError>;

    /// Register a handler for one event name (socket `on`)
    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription;

    /// Send an approve/reject intent
    ///
    /// Success is expected to surface later as a subscribed event.
    async fn mutate(
        &self,
        request: &MutationRequest,
        auth: &AuthContext,
    ) -> Result<Value, MutationError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// One scripted snapshot reply
    #[derive(Debug, Clone)]
    pub struct ScriptedSnapshot {
        pub delay: Duration,
        pub result: Result<Vec<Value>, LoadError>,
    }

    type HandlerMap = HashMap<String, Vec<(u64, EventHandler)>>;

    /// In-memory data source with scripted snapshots and a local event bus
    ///
    /// Scripted replies are consumed in order; the last one keeps answering.
    #[derive(Default)]
    pub struct MockDataSource {
        snapshots: Mutex<HashMap<String, VecDeque<ScriptedSnapshot>>>,
        handlers: Arc<Mutex<HandlerMap>>,
        next_handler_id: AtomicU64,
        snapshot_calls: Mutex<HashMap<String, usize>>,
        mutations: Mutex<Vec<MutationRequest>>,
        mutation_result: Mutex<Option<Result<Value, MutationError>>>,
    }

    impl MockDataSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn script(&self, queue: &str, delay: Duration, result: Result<Vec<Value>, LoadError>) {
            self.snapshots
                .lock()
                .unwrap()
                .entry(queue.to_string())
                .or_default()
                .push_back(ScriptedSnapshot { delay, result });
        }

        pub fn set_snapshot(&self, queue: &str, items: Vec<Value>) {
            self.script(queue, Duration::ZERO, Ok(items));
        }

        pub fn set_snapshot_delayed(&self, queue: &str, delay: Duration, items: Vec<Value>) {
            self.script(queue, delay, Ok(items));
        }

        pub fn fail_snapshot(&self, queue: &str, error: LoadError) {
            self.script(queue, Duration::ZERO, Err(error));
        }

        pub fn set_mutation_result(&self, result: Result<Value, MutationError>) {
            *self.mutation_result.lock().unwrap() = Some(result);
        }

        /// Deliver an event to every handler subscribed under its name
        pub fn emit(&self, event: QueueEvent) {
            let handlers: Vec<EventHandler> = self
                .handlers
                .lock()
                .unwrap()
                .get(&event.name)
                .map(|hs| hs.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default();
            for handler in handlers {
                handler(event.clone());
            }
        }

        pub fn subscriber_count(&self, event: &str) -> usize {
            self.handlers
                .lock()
                .unwrap()
                .get(event)
                .map(Vec::len)
                .unwrap_or(0)
        }

        pub fn snapshot_calls(&self, queue: &str) -> usize {
            self.snapshot_calls
                .lock()
                .unwrap()
                .get(queue)
                .copied()
                .unwrap_or(0)
        }

        pub fn mutations(&self) -> Vec<MutationRequest> {
            self.mutations.lock().unwrap().clone()
        }

        fn next_script(&self, queue: &str) -> Option<ScriptedSnapshot> {
            let mut snapshots = self.snapshots.lock().unwrap();
            let script = snapshots.get_mut(queue)?;
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        }
    }

    #[async_trait]
    impl DataSource for MockDataSource {
        async fn request_snapshot(
            &self,
            queue: &str,
            _auth: &AuthContext,
        ) -> Result<Vec<Value>, LoadError> {
            *self
                .snapshot_calls
                .lock()
                .unwrap()
                .entry(queue.to_string())
                .or_insert(0) += 1;

            match self.next_script(queue) {
                Some(script) => {
                    if !script.delay.is_zero() {
                        tokio::time::sleep(script.delay).await;
                    }
                    script.result
                }
                None => Ok(Vec::new()),
            }
        }

        fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
            let id = self.next_handler_id.fetch_add(1, Ordering::SeqCst);
            self.handlers
                .lock()
                .unwrap()
                .entry(event.to_string())
                .or_default()
                .push((id, handler));

            let handlers = Arc::clone(&self.handlers);
            let event = event.to_string();
            Subscription::new(move || {
                if let Some(hs) = handlers.lock().unwrap().get_mut(&event) {
                    hs.retain(|(hid, _)| *hid != id);
                }
            })
        }

        async fn mutate(
            &self,
            request: &MutationRequest,
            _auth: &AuthContext,
        ) -> Result<Value, MutationError> {
            self.mutations.lock().unwrap().push(request.clone());
            self.mutation_result
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(serde_json::json!({"success": true})))
        }
    }
}
