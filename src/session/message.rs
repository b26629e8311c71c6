//! JSON-RPC message classification and admission checks.
//!
//! A session handler stops for good when it receives a line its codec cannot
//! decode, so every client message is checked here before it is written to a
//! binding.

use rmcp::model::ClientJsonRpcMessage;
use serde_json::Value;

use crate::error::{AppError, Result, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND};

/// Request methods a client may send to a session handler.
const CLIENT_REQUEST_METHODS: &[&str] = &[
    "ping",
    "initialize",
    "completion/complete",
    "logging/setLevel",
    "prompts/get",
    "prompts/list",
    "resources/list",
    "resources/templates/list",
    "resources/read",
    "resources/subscribe",
    "resources/unsubscribe",
    "tools/call",
    "tools/list",
];

/// Notification methods a client may send to a session handler.
const CLIENT_NOTIFICATION_METHODS: &[&str] = &[
    "notifications/cancelled",
    "notifications/progress",
    "notifications/initialized",
    "notifications/roots/list_changed",
];

/// Notification that completes the initialize handshake.
pub const INITIALIZED_NOTIFICATION: &str = "notifications/initialized";

fn method(message: &Value) -> Option<&str> {
    message.get("method").and_then(Value::as_str)
}

/// Whether a JSON-RPC message is a response (result or error) to a request.
pub fn is_response(message: &Value) -> bool {
    message.get("method").is_none()
        && message.get("id").is_some()
        && (message.get("result").is_some() || message.get("error").is_some())
}

/// Whether a JSON-RPC message is a request expecting a response.
pub fn is_request(message: &Value) -> bool {
    method(message).is_some() && message.get("id").is_some_and(|id| !id.is_null())
}

/// Whether a JSON-RPC message is an `initialize` request.
pub fn is_initialize_request(message: &Value) -> bool {
    is_request(message) && method(message) == Some("initialize")
}

/// Whether a JSON-RPC message is the `notifications/initialized` notification.
pub fn is_initialized_notification(message: &Value) -> bool {
    !is_request(message) && method(message) == Some(INITIALIZED_NOTIFICATION)
}

fn reject(code: i64, message: impl Into<String>) -> AppError {
    AppError::InvalidMessage { code, message: message.into() }
}

/// Check that a client message is something a session handler can decode.
///
/// # Errors
/// `InvalidMessage` carrying the JSON-RPC code to answer with: invalid
/// request for malformed envelopes, method not found for unknown methods,
/// invalid params for known requests whose parameters do not decode.
pub fn validate_client_message(message: &Value) -> Result<()> {
    if !message.is_object() {
        return Err(reject(INVALID_REQUEST, "Expected a JSON-RPC message object"));
    }
    if message.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(reject(INVALID_REQUEST, "Expected jsonrpc version \"2.0\""));
    }
    if message.get("method").is_some_and(|m| !m.is_string()) {
        return Err(reject(INVALID_REQUEST, "Method must be a string"));
    }

    let request = is_request(message);
    if let Some(name) = method(message) {
        let known = if request { CLIENT_REQUEST_METHODS } else { CLIENT_NOTIFICATION_METHODS };
        if !known.contains(&name) {
            return Err(reject(METHOD_NOT_FOUND, format!("Method not found: {}", name)));
        }
    }

    match serde_json::from_value::<ClientJsonRpcMessage>(message.clone()) {
        Ok(_) => Ok(()),
        Err(e) if request => Err(reject(INVALID_PARAMS, format!("Invalid params: {}", e))),
        Err(e) => Err(reject(INVALID_REQUEST, format!("Invalid message: {}", e))),
    }
}
