//! JSON-RPC wire contract with the dashboard backend

use livequeue_core::domain::{LoadError, MutationError};
use livequeue_core::port::{AuthContext, MutationRequest};
use serde::Serialize;
use serde_json::Value;

pub const METHOD_SNAPSHOT: &str = "queue.snapshot.v1";
pub const METHOD_MUTATE: &str = "queue.mutate.v1";
pub const METHOD_EVENTS_SUBSCRIBE: &str = "queue.events.subscribe.v1";
pub const METHOD_EVENTS_UNSUBSCRIBE: &str = "queue.events.unsubscribe.v1";

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotParams<'a> {
    pub queue: &'a str,
    pub token: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MutateParams<'a> {
    pub queue: &'a str,
    pub action: &'a str,
    pub id: &'a str,
    pub extra: &'a Value,
    pub token: Option<&'a str>,
}

impl<'a> MutateParams<'a> {
    pub fn new(request: &'a MutationRequest, auth: &'a AuthContext) -> Self {
        Self {
            queue: &request.queue,
            action: &request.action,
            id: &request.id,
            extra: &request.extra,
            token: auth.token(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscribeParams<'a> {
    pub token: Option<&'a str>,
}

/// Snapshot replies are either a bare array or `{ "items": [...] }`
pub fn parse_snapshot(reply: Value) -> Result<Vec<Value>, LoadError> {
    match reply {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(LoadError::InvalidResponse(
                "snapshot object has no 'items' array".to_string(),
            )),
        },
        other => Err(LoadError::InvalidResponse(format!(
            "expected array, got {}",
            type_name(&other)
        ))),
    }
}

/// A `{ "success": false }` reply is a refusal even though the call succeeded
pub fn check_mutation_reply(reply: Value) -> Result<Value, MutationError> {
    if reply.get("success").and_then(Value::as_bool) == Some(false) {
        let code = reply
            .get("code")
            .and_then(Value::as_i64)
            .and_then(|c| i32::try_from(c).ok())
            .unwrap_or(0);
        let message = reply
            .get("message")
            .or_else(|| reply.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("mutation refused")
            .to_string();
        return Err(MutationError::Rejected { code, message });
    }
    Ok(reply)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_snapshot_shapes() {
        assert_eq!(
            parse_snapshot(json!([{"_id": "a"}])).unwrap(),
            vec![json!({"_id": "a"})]
        );
        assert_eq!(
            parse_snapshot(json!({"items": [{"_id": "b"}]})).unwrap(),
            vec![json!({"_id": "b"})]
        );
        assert!(matches!(
            parse_snapshot(json!("nope")),
            Err(LoadError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_snapshot(json!({"rows": []})),
            Err(LoadError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_refused_mutation_reply() {
        let err = check_mutation_reply(json!({"success": false, "code": 409, "message": "taken"}))
            .unwrap_err();
        assert_eq!(
            err,
            MutationError::Rejected {
                code: 409,
                message: "taken".to_string()
            }
        );
        assert!(check_mutation_reply(json!({"success": true})).is_ok());
        assert!(check_mutation_reply(json!({"ok": 1})).is_ok());
    }

    #[test]
    fn test_mutate_params_carry_token() {
        let request = MutationRequest::approve("voteBoosts", "b1").with_extra(json!({"note": "x"}));
        let auth = AuthContext::bearer("secret");
        let params = serde_json::to_value(MutateParams::new(&request, &auth)).unwrap();
        assert_eq!(
            params,
            json!({
                "queue": "voteBoosts",
                "action": "approve",
                "id": "b1",
                "extra": {"note": "x"},
                "token": "secret"
            })
        );
    }
}
