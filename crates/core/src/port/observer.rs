// State Observer Port (UI consumer)

use crate::domain::QueueState;

/// Notified whenever a queue's items or load status change
pub trait StateObserver: Send + Sync {
    fn on_state_change(&self, queue: &str, state: &QueueState);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records every notification in order
    #[derive(Default)]
    pub struct RecordingObserver {
        calls: Mutex<Vec<(String, QueueState)>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<(String, QueueState)> {
            self.calls.lock().unwrap().clone()
        }

        pub fn count_for(&self, queue: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(q, _)| q == queue)
                .count()
        }

        pub fn last_for(&self, queue: &str) -> Option<QueueState> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(q, _)| q == queue)
                .map(|(_, s)| s.clone())
        }
    }

    impl StateObserver for RecordingObserver {
        fn on_state_change(&self, queue: &str, state: &QueueState) {
            self.calls
                .lock()
                .unwrap()
                .push((queue.to_string(), state.clone()));
        }
    }
}
