use serde_json::{Value, json};

/// The three failure classes a tool call can surface to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidParams,
    MethodNotFound,
    InternalError,
}

impl ErrorCode {
    /// JSON-RPC 2.0 numeric code.
    pub fn rpc_code(self) -> i64 {
        match self {
            ErrorCode::InvalidParams => -32602,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InternalError => -32603,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCode::InvalidParams => "InvalidParams",
            ErrorCode::MethodNotFound => "MethodNotFound",
            ErrorCode::InternalError => "InternalError",
        };
        f.write_str(name)
    }
}

/// A classified failure returned by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProtocolError {
    pub code: ErrorCode,
    pub message: String,
}

impl ProtocolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MethodNotFound, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// JSON-RPC `error` object.
    pub fn to_json(&self) -> Value {
        json!({
            "code": self.code.rpc_code(),
            "message": self.message,
        })
    }
}
