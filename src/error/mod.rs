//! Error types and handling module.
//!
//! Defines all application-specific error types and conversions.

use rmcp::{model::ErrorCode, ErrorData as McpError};
use serde_json::{json, Value};
use thiserror::Error;

/// JSON-RPC error codes used at the transport boundary.
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const INVALID_SESSION: i64 = -32000;

/// Application-wide error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or empty input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Chain name not present in the relevant chain table.
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    /// Catalog or feed registry file could not be read or parsed.
    #[error("Catalog unavailable ({source_key}): {reason}")]
    CatalogUnavailable { source_key: String, reason: String },

    /// Remote query failed after exhausting retries.
    #[error("Remote query failed after {attempts} attempt(s): {message}")]
    RemoteQueryFailed { attempts: u32, message: String },

    /// Unknown or missing session identifier.
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Client message rejected before it reached a session handler.
    #[error("Invalid message: {message}")]
    InvalidMessage { code: i64, message: String },

    /// Dispatch to an unregistered tool.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Transport errors.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl AppError {
    /// Stable error kind used in tool error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "Config",
            AppError::InvalidArgument(_) => "InvalidArgument",
            AppError::UnsupportedChain(_) => "UnsupportedChain",
            AppError::CatalogUnavailable { .. } => "CatalogUnavailable",
            AppError::RemoteQueryFailed { .. } => "RemoteQueryFailed",
            AppError::InvalidSession(_) => "InvalidSession",
            AppError::InvalidMessage { .. } => "InvalidMessage",
            AppError::UnknownTool(_) => "UnknownTool",
            AppError::Transport(_) => "Transport",
            AppError::Parse(_) => "Parse",
        }
    }

    /// Serialized error marker returned inside a tool result.
    pub fn to_payload(&self) -> Value {
        json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}

impl From<AppError> for McpError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::InvalidArgument(_)
            | AppError::UnsupportedChain(_)
            | AppError::UnknownTool(_)
            | AppError::Parse(_) => McpError::invalid_params(err.to_string(), None),
            AppError::Config(_) | AppError::InvalidSession(_) => {
                McpError::invalid_request(err.to_string(), None)
            }
            AppError::InvalidMessage { code, .. } => {
                McpError::new(ErrorCode(code as i32), err.to_string(), None)
            }
            _ => McpError::internal_error(err.to_string(), None),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_config_display() {
        let err = AppError::Config("PORT must be a number".to_string());
        assert_eq!(err.to_string(), "Configuration error: PORT must be a number");
    }

    #[test]
    fn test_app_error_unsupported_chain_display() {
        let err = AppError::UnsupportedChain("Narnia".to_string());
        assert_eq!(err.to_string(), "Unsupported chain: Narnia");
        assert_eq!(err.kind(), "UnsupportedChain");
    }

    #[test]
    fn test_app_error_catalog_unavailable_display() {
        let err = AppError::CatalogUnavailable {
            source_key: "Coingecko.1".to_string(),
            reason: "No such file or directory".to_string(),
        };
        assert!(err.to_string().contains("Coingecko.1"));
        assert!(err.to_string().contains("No such file"));
    }

    #[test]
    fn test_app_error_remote_query_failed_display() {
        let err =
            AppError::RemoteQueryFailed { attempts: 3, message: "status 503".to_string() };
        assert_eq!(err.to_string(), "Remote query failed after 3 attempt(s): status 503");
    }

    #[test]
    fn test_error_payload_shape() {
        let payload = AppError::InvalidArgument("token0 is empty".to_string()).to_payload();
        assert_eq!(payload["error"]["kind"], "InvalidArgument");
        assert_eq!(payload["error"]["message"], "Invalid argument: token0 is empty");
    }

    #[test]
    fn test_app_error_to_mcp_error_invalid_params() {
        for err in [
            AppError::InvalidArgument("empty".to_string()),
            AppError::UnsupportedChain("x".to_string()),
            AppError::UnknownTool("nope".to_string()),
            AppError::Parse("bad json".to_string()),
        ] {
            let mcp_err: McpError = err.into();
            assert_eq!(mcp_err.code, ErrorCode::INVALID_PARAMS);
        }
    }

    #[test]
    fn test_app_error_to_mcp_error_invalid_request() {
        let mcp_err: McpError = AppError::InvalidSession("abc".to_string()).into();
        assert_eq!(mcp_err.code, ErrorCode::INVALID_REQUEST);
    }

    #[test]
    fn test_app_error_to_mcp_error_keeps_message_code() {
        let err = AppError::InvalidMessage {
            code: METHOD_NOT_FOUND,
            message: "Method not found: does/not/exist".to_string(),
        };
        assert_eq!(err.kind(), "InvalidMessage");
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_app_error_to_mcp_error_internal_error() {
        let err = AppError::RemoteQueryFailed { attempts: 3, message: "timeout".to_string() };
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code, ErrorCode::INTERNAL_ERROR);
        assert!(mcp_err.message.contains("timeout"));
        assert!(mcp_err.data.is_none());
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse_err = serde_json::from_str::<Value>("{not json").unwrap_err();
        let app_err: AppError = parse_err.into();
        assert_eq!(app_err.kind(), "Parse");
    }
}
