//! Wire-format types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming command.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Request identifier echoed in the response.
    #[serde(default)]
    pub id: String,
    /// Method name (e.g. `rules.select`).
    pub method: String,
    /// Optional parameters object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Outgoing response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Echoed request identifier.
    pub id: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// Result payload (present when `success == true`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload (present when `success == false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

/// Structured error body inside an [`RpcResponse`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcErrorBody {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl RpcResponse {
    /// Build a success response.
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn error(id: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(RpcErrorBody {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_without_id_or_params() {
        let req: RpcRequest = serde_json::from_value(json!({"method": "system.ping"})).unwrap();
        assert_eq!(req.id, "");
        assert!(req.params.is_none());
    }

    #[test]
    fn success_omits_error() {
        let json = serde_json::to_value(RpcResponse::success("1", json!(true))).unwrap();
        assert_eq!(json, json!({"id": "1", "success": true, "result": true}));
    }

    #[test]
    fn error_omits_result() {
        let json = serde_json::to_value(RpcResponse::error("2", "X", "bad")).unwrap();
        assert_eq!(
            json,
            json!({"id": "2", "success": false, "error": {"code": "X", "message": "bad"}})
        );
    }
}
