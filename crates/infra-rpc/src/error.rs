//! RPC Adapter Error Types
//!
//! Connection-level failures are `RpcSourceError`; per-call failures are mapped
//! onto the core's `LoadError` / `MutationError` so controllers never see
//! jsonrpsee types.

use jsonrpsee::core::ClientError;
use livequeue_core::domain::{LoadError, MutationError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RpcSourceError>;

/// JSON-RPC codes the backend uses for rejected sessions
pub const UNAUTHORIZED_CODES: [i32; 2] = [401, -32001];

#[derive(Debug, Error)]
pub enum RpcSourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Event subscription failed: {0}")]
    Subscribe(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<ClientError> for RpcSourceError {
    fn from(e: ClientError) -> Self {
        RpcSourceError::Connection(e.to_string())
    }
}

/// Map a snapshot call failure
pub fn load_error(e: ClientError) -> LoadError {
    match e {
        ClientError::Call(call_err) if UNAUTHORIZED_CODES.contains(&call_err.code()) => {
            LoadError::Unauthorized(call_err.message().to_string())
        }
        ClientError::Call(call_err) => LoadError::Status {
            code: call_err.code(),
            message: call_err.message().to_string(),
        },
        ClientError::ParseError(e) => LoadError::InvalidResponse(e.to_string()),
        ClientError::RestartNeeded(_) => {
            LoadError::Transport("Connection restart needed".to_string())
        }
        ClientError::RequestTimeout => LoadError::Transport("Request timed out".to_string()),
        other => LoadError::Transport(other.to_string()),
    }
}

/// Map a mutation call failure
pub fn mutation_error(e: ClientError) -> MutationError {
    match e {
        ClientError::Call(call_err) => MutationError::Rejected {
            code: call_err.code(),
            message: call_err.message().to_string(),
        },
        ClientError::ParseError(e) => MutationError::InvalidResponse(e.to_string()),
        ClientError::RestartNeeded(_) => {
            MutationError::Transport("Connection restart needed".to_string())
        }
        other => MutationError::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::types::ErrorObject;

    fn call(code: i32, message: &str) -> ClientError {
        ClientError::Call(ErrorObject::owned(code, message.to_string(), None::<()>))
    }

    #[test]
    fn test_unauthorized_codes_map_to_unauthorized() {
        assert_eq!(
            load_error(call(401, "session expired")),
            LoadError::Unauthorized("session expired".to_string())
        );
        assert!(matches!(
            load_error(call(-32001, "no token")),
            LoadError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_other_call_errors_keep_code() {
        assert_eq!(
            load_error(call(-32602, "unknown queue")),
            LoadError::Status {
                code: -32602,
                message: "unknown queue".to_string()
            }
        );
        assert!(matches!(load_error(ClientError::RequestTimeout), LoadError::Transport(_)));
    }

    #[test]
    fn test_mutation_call_error_is_rejection() {
        assert_eq!(
            mutation_error(call(409, "already approved")),
            MutationError::Rejected {
                code: 409,
                message: "already approved".to_string()
            }
        );
    }
}
