use jobtread_core::error::codes;
use serde_json::{Value, json};
use thiserror::Error;

use crate::dispatcher::SUPPORTED_PROTOCOL_VERSIONS;

/// Failures that are reported to the client as JSON-RPC errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Parse error")]
    Parse,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error("Unknown tool: {0}")]
    InvalidTool(String),
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProtocolError {
    pub fn code(&self) -> i64 {
        match self {
            ProtocolError::Parse => codes::PARSE_ERROR,
            ProtocolError::InvalidRequest(_) => codes::INVALID_REQUEST,
            ProtocolError::MethodNotFound(_) => codes::METHOD_NOT_FOUND,
            ProtocolError::InvalidTool(_) => codes::INVALID_TOOL,
            ProtocolError::InvalidParams(_) => codes::INVALID_PARAMS,
            ProtocolError::UnsupportedVersion(_) => codes::UNSUPPORTED_PROTOCOL_VERSION,
            ProtocolError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    fn data(&self) -> Option<Value> {
        match self {
            ProtocolError::UnsupportedVersion(requested) => Some(json!({
                "requested": requested,
                "supported": SUPPORTED_PROTOCOL_VERSIONS,
            })),
            ProtocolError::InvalidTool(name) => Some(json!({ "tool": name })),
            _ => None,
        }
    }
}

pub fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn error_response(id: Value, error: &ProtocolError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code(),
            "message": error.to_string()
        }
    });
    if let Some(data) = error.data() {
        payload["error"]["data"] = data;
    }
    payload
}
