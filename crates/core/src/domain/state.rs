// Queue State Domain Model

use crate::domain::item::{ItemId, QueueItem};
use serde::{Deserialize, Serialize};

/// Snapshot load lifecycle of one queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadStatus {
    NotLoaded,
    Loading,
    Loaded,
    Error,
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStatus::NotLoaded => write!(f, "NOT_LOADED"),
            LoadStatus::Loading => write!(f, "LOADING"),
            LoadStatus::Loaded => write!(f, "LOADED"),
            LoadStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Read-only view of one queue, handed to renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    pub items: Vec<QueueItem>,
    pub load_status: LoadStatus,
    pub last_error: Option<String>,
    pub last_synced_at: Option<i64>, // epoch ms of last successful snapshot
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            load_status: LoadStatus::NotLoaded,
            last_error: None,
            last_synced_at: None,
        }
    }
}

impl QueueState {
    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&QueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
