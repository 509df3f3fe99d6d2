// Domain Layer - Queue items, state, events and merge contracts

pub mod error;
pub mod event;
pub mod item;
pub mod queue;
pub mod rules;
pub mod state;

// Re-exports
pub use error::{LoadError, MalformedItemError, MutationError};
pub use event::{OperationKind, QueueEvent, QueueOp};
pub use item::{ItemId, ItemPayload, ItemStatus, QueueItem};
pub use queue::{QueueConfig, QueueName, ReducerPolicy};
pub use rules::{EventBinding, IdentityRule, InsertPosition, MergeRules};
pub use state::{LoadStatus, QueueState};
