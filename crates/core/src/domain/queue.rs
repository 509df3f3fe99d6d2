// Queue Domain Model

use crate::domain::rules::{EventBinding, IdentityRule, InsertPosition, MergeRules};
use serde::{Deserialize, Serialize};

/// Queue identifier (e.g. "bumpRequests")
pub type QueueName = String;

/// Queue configuration: identity, event contract and insert policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub name: QueueName,
    pub rules: MergeRules,
    #[serde(default)]
    pub insert_position: InsertPosition,
}

impl QueueConfig {
    pub fn new(name: impl Into<String>, identity: IdentityRule) -> Self {
        Self {
            name: name.into(),
            rules: MergeRules::new(identity),
            insert_position: InsertPosition::default(),
        }
    }

    pub fn bind(mut self, binding: EventBinding) -> Self {
        self.rules = self.rules.bind(binding);
        self
    }

    pub fn nested_into(mut self, field: impl Into<String>) -> Self {
        self.rules = self.rules.nested_into(field);
        self
    }

    pub fn insert_at(mut self, position: InsertPosition) -> Self {
        self.insert_position = position;
        self
    }

    /// Reducer policy derived from this configuration
    pub fn policy(&self) -> ReducerPolicy {
        ReducerPolicy {
            insert_position: self.insert_position,
            id_field: self.rules.identity.field.clone(),
            nested_field: self.rules.nested_field.clone(),
        }
    }
}

/// The slice of queue configuration the reducer needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducerPolicy {
    pub insert_position: InsertPosition,
    /// Canonical id field written into synthesized parents
    pub id_field: String,
    pub nested_field: Option<String>,
}

impl Default for ReducerPolicy {
    fn default() -> Self {
        Self {
            insert_position: InsertPosition::Prepend,
            id_field: "_id".to_string(),
            nested_field: None,
        }
    }
}
