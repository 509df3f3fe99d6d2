//! Entity Identity & Merge Rules
//!
//! Turns the implicit event shapes of the admin dashboard (`data.bumpRequest`,
//! `data.ad`, `{ requestId }`, ...) into an explicit per-queue contract:
//! - `IdentityRule` extracts the canonical id from a raw payload
//! - `EventBinding` maps one event name to an `OperationKind` and says where in
//!   the event body the item, id or sub-record lives
//! - `MergeRules` classifies and decodes raw events into typed `QueueOp`s

use crate::domain::error::MalformedItemError;
use crate::domain::event::{OperationKind, QueueEvent, QueueOp};
use crate::domain::item::{ItemId, QueueItem};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Where newly inserted items land in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    #[default]
    Prepend,
    Append,
}

/// Identity extraction: canonical field first, then aliases in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRule {
    pub field: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl IdentityRule {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    fn fields(&self) -> impl Iterator<Item = &String> {
        std::iter::once(&self.field).chain(self.aliases.iter())
    }

    /// Extract the item id from a raw payload
    ///
    /// Accepts non-empty strings and integers; anything else is not an identity.
    pub fn identify(&self, raw: &Value) -> Result<ItemId, MalformedItemError> {
        self.fields()
            .filter_map(|field| raw.get(field))
            .find_map(scalar_id)
            .ok_or_else(|| MalformedItemError::MissingId {
                fields: self.fields().cloned().collect(),
            })
    }

    /// Identify a raw payload and wrap it as a queue item
    pub fn to_item(&self, raw: Value) -> Result<QueueItem, MalformedItemError> {
        let id = self.identify(&raw)?;
        Ok(QueueItem::new(id, raw))
    }
}

/// Render a string or integer JSON value as an id
fn scalar_id(value: &Value) -> Option<ItemId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Contract for one event name within a queue namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBinding {
    pub event: String,
    pub kind: OperationKind,
    /// Body key holding the item / id / record (`None` = the whole body)
    #[serde(default)]
    pub key: Option<String>,
    /// Body key holding the parent id (NestedAppend only)
    #[serde(default)]
    pub parent_key: Option<String>,
}

impl EventBinding {
    pub fn new(event: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            event: event.into(),
            kind,
            key: None,
            parent_key: None,
        }
    }

    pub fn insert(event: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(event, OperationKind::Insert).at(key)
    }

    pub fn upsert(event: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(event, OperationKind::Upsert).at(key)
    }

    pub fn remove(event: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(event, OperationKind::Remove).at(key)
    }

    pub fn nested_append(
        event: impl Into<String>,
        parent_key: impl Into<String>,
        record_key: impl Into<String>,
    ) -> Self {
        let mut binding = Self::new(event, OperationKind::NestedAppend).at(record_key);
        binding.parent_key = Some(parent_key.into());
        binding
    }

    pub fn at(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    fn select<'a>(&self, body: &'a Value) -> Result<&'a Value, MalformedItemError> {
        match &self.key {
            None => Ok(body),
            Some(key) => body
                .get(key)
                .filter(|v| !v.is_null())
                .ok_or_else(|| MalformedItemError::MissingField {
                    event: self.event.clone(),
                    key: key.clone(),
                }),
        }
    }
}

/// Per-queue identity + event contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRules {
    pub identity: IdentityRule,
    #[serde(default)]
    pub bindings: Vec<EventBinding>,
    /// Payload array receiving NestedAppend records (e.g. `redemptions`)
    #[serde(default)]
    pub nested_field: Option<String>,
}

impl MergeRules {
    pub fn new(identity: IdentityRule) -> Self {
        Self {
            identity,
            bindings: Vec::new(),
            nested_field: None,
        }
    }

    pub fn bind(mut self, binding: EventBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn nested_into(mut self, field: impl Into<String>) -> Self {
        self.nested_field = Some(field.into());
        self
    }

    pub fn identify(&self, raw: &Value) -> Result<ItemId, MalformedItemError> {
        self.identity.identify(raw)
    }

    /// Identify a batch of raw entries, dropping the ones without identity
    pub fn items_from(&self, entries: &[Value]) -> Vec<QueueItem> {
        entries
            .iter()
            .filter_map(|entry| match self.identity.to_item(entry.clone()) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(error = %e, "Dropping snapshot entry without identity");
                    None
                }
            })
            .collect()
    }

    pub fn binding(&self, event_name: &str) -> Option<&EventBinding> {
        self.bindings.iter().find(|b| b.event == event_name)
    }

    /// Classify an event name; `None` means it is outside this queue's namespace
    pub fn classify(&self, event_name: &str) -> Option<OperationKind> {
        self.binding(event_name).map(|b| b.kind)
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.event.as_str())
    }

    /// Decode a raw event into a typed operation
    ///
    /// Returns `Ok(None)` for events this queue does not own.
    pub fn decode(&self, event: &QueueEvent) -> Result<Option<QueueOp>, MalformedItemError> {
        let Some(binding) = self.binding(&event.name) else {
            return Ok(None);
        };

        let op = match binding.kind {
            OperationKind::SnapshotReplace => {
                let raw = binding.select(&event.body)?;
                let entries = raw.as_array().ok_or_else(|| MalformedItemError::InvalidRecord {
                    event: event.name.clone(),
                    reason: "snapshot is not an array".to_string(),
                })?;
                QueueOp::SnapshotReplace(self.items_from(entries))
            }
            OperationKind::Insert => {
                let raw = binding.select(&event.body)?;
                QueueOp::Insert(self.identity.to_item(raw.clone())?)
            }
            OperationKind::Upsert => {
                let raw = binding.select(&event.body)?;
                QueueOp::Upsert(self.identity.to_item(raw.clone())?)
            }
            OperationKind::Remove => {
                // Either a bare id (`{ requestId: "r1" }`) or a full item
                let raw = binding.select(&event.body)?;
                let id = match scalar_id(raw) {
                    Some(id) => id,
                    None => self.identity.identify(raw)?,
                };
                QueueOp::Remove(id)
            }
            OperationKind::NestedAppend => {
                let parent_key = binding.parent_key.as_deref().unwrap_or(&self.identity.field);
                let parent_id = event
                    .body
                    .get(parent_key)
                    .and_then(scalar_id)
                    .ok_or_else(|| MalformedItemError::MissingField {
                        event: event.name.clone(),
                        key: parent_key.to_string(),
                    })?;
                let record = binding.select(&event.body)?.clone();
                QueueOp::NestedAppend { parent_id, record }
            }
        };

        Ok(Some(op))
    }
}
