//! Staggered Activation Scheduler
//!
//! Spreads the initial snapshot loads of several queues over a delay ladder so
//! opening the admin view does not fire every request at once. All pending
//! timers can be cancelled together when the view closes.

use crate::application::constants::DEFAULT_STAGGER_LADDER_MS;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

/// Something that can be activated once its delay elapses
#[cfg_attr(test, mockall::automock)]
pub trait Activate: Send + Sync {
    fn activate(&self);
}

/// Delay ladder (configuration data, overridable per deployment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaggerLadder {
    delays_ms: Vec<u64>,
}

impl Default for StaggerLadder {
    fn default() -> Self {
        Self::new(DEFAULT_STAGGER_LADDER_MS.to_vec())
    }
}

impl StaggerLadder {
    pub fn new(delays_ms: Vec<u64>) -> Self {
        Self { delays_ms }
    }

    pub fn delays_ms(&self) -> &[u64] {
        &self.delays_ms
    }

    /// Delay for the i-th activation; past the end the last rung repeats
    pub fn delay_for(&self, index: usize) -> Duration {
        let ms = self
            .delays_ms
            .get(index)
            .or_else(|| self.delays_ms.last())
            .copied()
            .unwrap_or(0);
        Duration::from_millis(ms)
    }

    /// Pair each target with its rung, in order
    pub fn assign<T>(&self, targets: impl IntoIterator<Item = T>) -> Vec<(T, Duration)> {
        targets
            .into_iter()
            .enumerate()
            .map(|(i, target)| (target, self.delay_for(i)))
            .collect()
    }
}

/// Owns the pending activation timers
#[derive(Default)]
pub struct ActivationScheduler {
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl ActivationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate each target after its delay (measured from now)
    ///
    /// # Errors
    /// - AppError::Internal when called outside a Tokio runtime
    pub fn schedule(&self, activations: Vec<(Arc<dyn Activate>, Duration)>) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::Internal(format!("no async runtime: {}", e)))?;

        let mut timers = self.lock();
        timers.retain(|handle| !handle.is_finished());

        for (target, delay) in activations {
            debug!(delay_ms = delay.as_millis() as u64, "Scheduling activation");
            timers.push(runtime.spawn(async move {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                target.activate();
            }));
        }
        Ok(())
    }

    /// Cancel every activation that has not fired yet; returns how many were pending
    pub fn cancel_all(&self) -> usize {
        let timers = std::mem::take(&mut *self.lock());
        let pending = timers.iter().filter(|h| !h.is_finished()).count();
        for handle in timers {
            handle.abort();
        }
        if pending > 0 {
            info!(cancelled = pending, "Cancelled pending activations");
        }
        pending
    }

    /// Number of activations still waiting
    pub fn pending(&self) -> usize {
        self.lock().iter().filter(|h| !h.is_finished()).count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ActivationScheduler {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for handle in timers.drain(..) {
            handle.abort();
        }
    }
}
