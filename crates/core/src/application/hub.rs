//! Queue Hub - the surface a dashboard view talks to
//!
//! Builds one `QueueController` per configured queue, addresses them by name,
//! staggers their activation and forwards approve/reject intents to the data
//! source. Mutations never touch local state: the resulting push event does.

use crate::application::controller::QueueController;
use crate::application::stagger::{Activate, ActivationScheduler, StaggerLadder};
use crate::domain::{MutationError, QueueConfig, QueueState};
use crate::error::{AppError, Result};
use crate::port::{AuthContext, DataSource, MutationRequest, StateObserver, TimeProvider};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Registry of live queues for one admin session
pub struct QueueHub {
    controllers: Vec<Arc<QueueController>>,
    index: HashMap<String, usize>,
    data_source: Arc<dyn DataSource>,
    auth: AuthContext,
    ladder: StaggerLadder,
    scheduler: ActivationScheduler,
}

impl QueueHub {
    /// Validate the queue table and create a controller per queue
    ///
    /// # Errors
    /// - AppError::Config on duplicate queue names, event names shared across
    ///   queues, or any per-queue misconfiguration
    pub fn new(
        configs: Vec<QueueConfig>,
        data_source: Arc<dyn DataSource>,
        auth: AuthContext,
        time_provider: Arc<dyn TimeProvider>,
        observer: Option<Arc<dyn StateObserver>>,
        ladder: StaggerLadder,
    ) -> Result<Self> {
        validate_table(&configs)?;

        let mut controllers = Vec::with_capacity(configs.len());
        let mut index = HashMap::with_capacity(configs.len());
        for config in configs {
            index.insert(config.name.clone(), controllers.len());
            controllers.push(QueueController::new(
                config,
                Arc::clone(&data_source),
                auth.clone(),
                Arc::clone(&time_provider),
                observer.clone(),
            )?);
        }

        info!(queues = controllers.len(), "Queue hub ready");
        Ok(Self {
            controllers,
            index,
            data_source,
            auth,
            ladder,
            scheduler: ActivationScheduler::new(),
        })
    }

    /// Queue names in table order
    pub fn queue_names(&self) -> Vec<&str> {
        self.controllers.iter().map(|c| c.name()).collect()
    }

    pub fn controller(&self, queue: &str) -> Result<&Arc<QueueController>> {
        self.index
            .get(queue)
            .map(|&i| &self.controllers[i])
            .ok_or_else(|| AppError::NotFound(format!("queue '{}' is not registered", queue)))
    }

    pub fn activate(&self, queue: &str) -> Result<()> {
        self.controller(queue)?.activate();
        Ok(())
    }

    pub fn reload(&self, queue: &str) -> Result<()> {
        self.controller(queue)?.reload();
        Ok(())
    }

    pub fn dispose(&self, queue: &str) -> Result<()> {
        self.controller(queue)?.dispose();
        Ok(())
    }

    pub fn snapshot(&self, queue: &str) -> Result<QueueState> {
        Ok(self.controller(queue)?.snapshot())
    }

    /// States of every queue, in table order
    pub fn snapshots(&self) -> Vec<(String, QueueState)> {
        self.controllers
            .iter()
            .map(|c| (c.name().to_string(), c.snapshot()))
            .collect()
    }

    /// Activate every queue on the stagger ladder (table order)
    pub fn activate_all(&self) -> Result<()> {
        let targets = self
            .controllers
            .iter()
            .map(|c| Arc::clone(c) as Arc<dyn Activate>);
        self.scheduler.schedule(self.ladder.assign(targets))?;
        info!(
            queues = self.controllers.len(),
            ladder_ms = ?self.ladder.delays_ms(),
            "Staggered activation scheduled"
        );
        Ok(())
    }

    /// Activate a subset of queues on the stagger ladder
    pub fn activate_staggered(&self, queues: &[&str]) -> Result<()> {
        let targets = queues
            .iter()
            .map(|q| self.controller(q).map(|c| Arc::clone(c) as Arc<dyn Activate>))
            .collect::<Result<Vec<_>>>()?;
        self.scheduler.schedule(self.ladder.assign(targets))
    }

    /// Cancel staggered activations that have not fired yet
    pub fn cancel_pending_activations(&self) -> usize {
        self.scheduler.cancel_all()
    }

    /// Forward an approve/reject intent; the queue changes only when the event arrives
    ///
    /// # Errors
    /// - AppError::NotFound for an unknown queue
    /// - AppError::Mutation when the data source refuses or fails
    pub async fn mutate(&self, request: MutationRequest) -> Result<Value> {
        self.controller(&request.queue)?;
        info!(
            queue = %request.queue,
            action = %request.action,
            id = %request.id,
            "Sending mutation"
        );
        self.data_source
            .mutate(&request, &self.auth)
            .await
            .map_err(|e: MutationError| {
                warn!(queue = %request.queue, id = %request.id, error = %e, "Mutation failed");
                AppError::from(e)
            })
    }

    /// Cancel pending activations and dispose every controller (view unmount)
    pub fn dispose_all(&self) {
        self.scheduler.cancel_all();
        for controller in &self.controllers {
            controller.dispose();
        }
        info!("Queue hub disposed");
    }
}

impl Drop for QueueHub {
    fn drop(&mut self) {
        self.dispose_all();
    }
}

fn validate_table(configs: &[QueueConfig]) -> Result<()> {
    let mut names = HashMap::new();
    let mut events: HashMap<&str, &str> = HashMap::new();

    for config in configs {
        if names.insert(config.name.as_str(), ()).is_some() {
            return Err(AppError::Config(format!(
                "queue '{}' is configured twice",
                config.name
            )));
        }
        for event in config.rules.event_names() {
            if let Some(owner) = events.insert(event, config.name.as_str()) {
                if owner != config.name {
                    return Err(AppError::Config(format!(
                        "event '{}' is bound by both '{}' and '{}'",
                        event, owner, config.name
                    )));
                }
            }
        }
    }
    Ok(())
}
