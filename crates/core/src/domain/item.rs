// Queue Item Domain Model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical item identity (normalized from `_id`, `id`, `orderId`, ...)
pub type ItemId = String;

/// Review status carried by most pending-queue payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl ItemStatus {
    /// Read the `status` field of a payload (missing field means pending)
    pub fn from_payload(payload: &Value) -> Self {
        match payload.get("status").and_then(Value::as_str) {
            None => ItemStatus::Pending,
            Some(s) => match s.to_ascii_lowercase().as_str() {
                "pending" => ItemStatus::Pending,
                "approved" => ItemStatus::Approved,
                "rejected" => ItemStatus::Rejected,
                _ => ItemStatus::Unknown,
            },
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Pending => write!(f, "pending"),
            ItemStatus::Approved => write!(f, "approved"),
            ItemStatus::Rejected => write!(f, "rejected"),
            ItemStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Opaque business data (ad, purchase, service, order, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPayload(Value);

impl ItemPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn as_value_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// One entry of a pending admin queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub payload: ItemPayload,
    pub status: ItemStatus,
}

impl QueueItem {
    /// Build an item whose status is read from the payload
    pub fn new(id: impl Into<String>, payload: Value) -> Self {
        let status = ItemStatus::from_payload(&payload);
        Self {
            id: id.into(),
            payload: ItemPayload::new(payload),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_defaults_to_pending() {
        let item = QueueItem::new("a", json!({"_id": "a"}));
        assert_eq!(item.status, ItemStatus::Pending);
    }

    #[test]
    fn test_status_read_case_insensitively() {
        assert_eq!(
            ItemStatus::from_payload(&json!({"status": "Approved"})),
            ItemStatus::Approved
        );
        assert_eq!(
            ItemStatus::from_payload(&json!({"status": "on-hold"})),
            ItemStatus::Unknown
        );
    }
}
