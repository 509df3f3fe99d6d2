//! Local event fan-out
//!
//! The backend pushes every queue event over one subscription stream; the
//! dispatcher routes each `{event, data}` notification to the handlers
//! registered for that event name.

use livequeue_core::domain::QueueEvent;
use livequeue_core::port::{EventHandler, Subscription};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

type HandlerMap = HashMap<String, Vec<(u64, EventHandler)>>;

#[derive(Default)]
pub struct EventDispatcher {
    handlers: Mutex<HandlerMap>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a handler; the returned subscription removes it again
    pub fn register(self: &Arc<Self>, event: &str, handler: EventHandler) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .entry(event.to_string())
            .or_default()
            .push((id, handler));

        let dispatcher = Arc::downgrade(self);
        let event = event.to_string();
        Subscription::new(move || {
            if let Some(dispatcher) = dispatcher.upgrade() {
                dispatcher.unregister(&event, id);
            }
        })
    }

    fn unregister(&self, event: &str, id: u64) {
        let mut handlers = self.lock();
        if let Some(list) = handlers.get_mut(event) {
            list.retain(|(handler_id, _)| *handler_id != id);
            if list.is_empty() {
                handlers.remove(event);
            }
        }
    }

    /// Deliver one event; returns how many handlers received it
    pub fn dispatch(&self, event: QueueEvent) -> usize {
        // Handlers run outside the lock so they may (un)subscribe
        let targets: Vec<EventHandler> = self
            .lock()
            .get(&event.name)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        if targets.is_empty() {
            trace!(event = %event.name, "No handler for event");
        }
        for handler in &targets {
            handler(event.clone());
        }
        targets.len()
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HandlerMap> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
