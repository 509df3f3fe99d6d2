//! Event Reducer - folds one operation into a queue's item list
//!
//! Pure and synchronous: the result depends only on `(items, op, policy)`.
//! Every branch keeps the list free of duplicate ids.

use crate::domain::{InsertPosition, QueueItem, QueueOp, ReducerPolicy};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

/// Apply one operation to `items`, returning the new list
pub fn reduce(items: Vec<QueueItem>, op: &QueueOp, policy: &ReducerPolicy) -> Vec<QueueItem> {
    match op {
        QueueOp::SnapshotReplace(snapshot) => dedup(snapshot.clone()),
        QueueOp::Insert(item) => insert(items, item.clone(), policy.insert_position),
        QueueOp::Upsert(item) => upsert(items, item.clone(), policy.insert_position),
        QueueOp::Remove(id) => {
            let mut items = items;
            items.retain(|existing| existing.id != *id);
            items
        }
        QueueOp::NestedAppend { parent_id, record } => {
            nested_append(items, parent_id, record, policy)
        }
    }
}

/// Apply a sequence of operations in order
pub fn reduce_all<'a>(
    items: Vec<QueueItem>,
    ops: impl IntoIterator<Item = &'a QueueOp>,
    policy: &ReducerPolicy,
) -> Vec<QueueItem> {
    ops.into_iter()
        .fold(items, |acc, op| reduce(acc, op, policy))
}

/// Keep the first occurrence of each id
pub fn dedup(items: Vec<QueueItem>) -> Vec<QueueItem> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

fn insert(mut items: Vec<QueueItem>, item: QueueItem, position: InsertPosition) -> Vec<QueueItem> {
    if items.iter().any(|existing| existing.id == item.id) {
        return items;
    }
    match position {
        InsertPosition::Prepend => items.insert(0, item),
        InsertPosition::Append => items.push(item),
    }
    items
}

fn upsert(mut items: Vec<QueueItem>, item: QueueItem, position: InsertPosition) -> Vec<QueueItem> {
    match items.iter().position(|existing| existing.id == item.id) {
        Some(index) => {
            items[index] = item;
            items
        }
        None => insert(items, item, position),
    }
}

fn nested_append(
    mut items: Vec<QueueItem>,
    parent_id: &str,
    record: &Value,
    policy: &ReducerPolicy,
) -> Vec<QueueItem> {
    let Some(field) = policy.nested_field.as_deref() else {
        warn!(parent_id = %parent_id, "Nested append on a queue without nested field, ignoring");
        return items;
    };

    if let Some(index) = items.iter().position(|existing| existing.id == parent_id) {
        append_record(items[index].payload.as_value_mut(), field, record);
        return items;
    }

    // Parent not present yet: synthesize one holding only this record
    let mut payload = Map::new();
    payload.insert(policy.id_field.clone(), Value::String(parent_id.to_string()));
    payload.insert(field.to_string(), Value::Array(vec![record.clone()]));
    let parent = QueueItem::new(parent_id, Value::Object(payload));
    insert(items, parent, policy.insert_position)
}

/// Push `record` into `payload[field]`, creating the array when needed
fn append_record(payload: &mut Value, field: &str, record: &Value) {
    if !payload.is_object() {
        warn!(field = %field, "Parent payload is not an object, replacing with empty object");
        *payload = Value::Object(Map::new());
    }
    let Some(object) = payload.as_object_mut() else {
        return;
    };

    let slot = object
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !slot.is_array() {
        *slot = Value::Array(Vec::new());
    }
    if let Value::Array(records) = slot {
        // Redelivered records are not appended twice
        if !records.contains(record) {
            records.push(record.clone());
        }
    }
}
