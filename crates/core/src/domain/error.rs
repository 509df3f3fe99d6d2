// Domain Error Types

use thiserror::Error;

/// An item or event did not carry the shape its queue contract requires.
///
/// Always recovered locally: the offending entry is logged and dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedItemError {
    #[error("No identity field found (tried: {})", fields.join(", "))]
    MissingId { fields: Vec<String> },

    #[error("Event '{event}' is missing field '{key}'")]
    MissingField { event: String, key: String },

    #[error("Event '{event}' carries an invalid record: {reason}")]
    InvalidRecord { event: String, reason: String },
}

/// Snapshot fetch failed.
///
/// Surfaced through `QueueState::last_error`, never thrown past the controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Data source error ({code}): {message}")]
    Status { code: i32, message: String },

    #[error("Invalid snapshot response: {0}")]
    InvalidResponse(String),
}

/// An approve/reject call was refused or could not be delivered.
///
/// Owned by the caller of the mutation; the queue state is never touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Mutation rejected ({code}): {message}")]
    Rejected { code: i32, message: String },

    #[error("Invalid mutation response: {0}")]
    InvalidResponse(String),
}
