// Queue Event Domain Model

use crate::domain::item::{ItemId, QueueItem};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw push notification as delivered by the data source (socket event name + data)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    #[serde(rename = "event")]
    pub name: String,
    #[serde(rename = "data", default)]
    pub body: Value,
}

impl QueueEvent {
    pub fn new(name: impl Into<String>, body: Value) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }
}

/// How an event mutates a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    SnapshotReplace,
    Insert,
    Upsert,
    Remove,
    /// Append a sub-record into an existing item's nested array
    NestedAppend,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::SnapshotReplace => write!(f, "SNAPSHOT_REPLACE"),
            OperationKind::Insert => write!(f, "INSERT"),
            OperationKind::Upsert => write!(f, "UPSERT"),
            OperationKind::Remove => write!(f, "REMOVE"),
            OperationKind::NestedAppend => write!(f, "NESTED_APPEND"),
        }
    }
}

/// Decoded, typed mutation ready for the reducer
#[derive(Debug, Clone, PartialEq)]
pub enum QueueOp {
    SnapshotReplace(Vec<QueueItem>),
    Insert(QueueItem),
    Upsert(QueueItem),
    Remove(ItemId),
    NestedAppend { parent_id: ItemId, record: Value },
}

impl QueueOp {
    pub fn kind(&self) -> OperationKind {
        match self {
            QueueOp::SnapshotReplace(_) => OperationKind::SnapshotReplace,
            QueueOp::Insert(_) => OperationKind::Insert,
            QueueOp::Upsert(_) => OperationKind::Upsert,
            QueueOp::Remove(_) => OperationKind::Remove,
            QueueOp::NestedAppend { .. } => OperationKind::NestedAppend,
        }
    }
}
