//! Error types for the kb_Vegan service module.

use thiserror::Error;

/// Service error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Missing required config key: {0}")]
    MissingConfigKey(String),

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid object reference '{0}': expected ws/obj/version")]
    InvalidObjRef(String),

    #[error("Method {method} return value is not a mapping as required (got {found})")]
    ContractViolation {
        method: &'static str,
        found: &'static str,
    },

    /// Raised by the computation delegate; the message reaches the caller untouched.
    #[error("{0}")]
    Delegate(Box<dyn std::error::Error + Send + Sync>),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// Wrap a delegate-side failure.
    pub fn delegate(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Delegate(err.into())
    }
}

/// JSON-RPC error codes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum RpcErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    ServerError = -32000,
}

impl RpcErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Error name as reported by the host's JSON-RPC servers.
    pub fn name(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::ServerError => "Server error",
        }
    }
}
