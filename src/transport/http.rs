//! Streamable HTTP transport.
//!
//! `POST /mcp` carries client messages, `GET /mcp` opens a server-sent event
//! stream for a session, and `DELETE /mcp` terminates one. Sessions are
//! addressed by the `mcp-session-id` header.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

use super::shutdown_signal;
use crate::{
    chains::SUPPORTED_CHAINS,
    config::Config,
    error::{AppError, Result},
    mcp::ChainDataServer,
    session::{Routed, SessionManager, SESSION_ID_HEADER},
};

pub use crate::error::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, INVALID_SESSION, METHOD_NOT_FOUND,
    PARSE_ERROR,
};

#[derive(Clone)]
struct HttpState {
    sessions: SessionManager,
    tools: Arc<Vec<String>>,
}

/// Build the HTTP router over a session manager.
pub fn router(sessions: SessionManager) -> Router {
    let state = HttpState { sessions, tools: Arc::new(ChainDataServer::tool_names()) };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/mcp", get(handle_stream).post(handle_post).delete(handle_delete))
        .layer(cors_layer())
        .with_state(state)
}

/// Bind to the configured address and serve until a shutdown signal, then
/// close every session.
pub async fn serve_http(config: &Config, sessions: SessionManager) -> Result<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Transport(format!("Failed to bind {}: {}", addr, e)))?;
    info!("MCP endpoint listening on http://{}/mcp", listener.local_addr()?);

    let app = router(sessions.clone());
    let closing = sessions.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, closing sessions");
            // Ends every open event stream so graceful shutdown can finish.
            closing.shutdown_all().await;
        })
        .await?;

    sessions.shutdown_all().await;
    info!("HTTP transport stopped");
    Ok(())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_ID_HEADER)])
}

fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

fn with_session_header(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response.headers_mut().insert(HeaderName::from_static(SESSION_ID_HEADER), value);
    }
    response
}

fn rpc_error(status: StatusCode, code: i64, message: impl Into<String>, id: Value) -> Response {
    let body = json!({
        "jsonrpc": "2.0",
        "error": { "code": code, "message": message.into() },
        "id": id,
    });
    (status, Json(body)).into_response()
}

fn error_response(err: AppError, id: Value) -> Response {
    match err {
        AppError::InvalidSession(message) => rpc_error(
            StatusCode::BAD_REQUEST,
            INVALID_SESSION,
            format!("Bad Request: {}", message),
            id,
        ),
        AppError::InvalidMessage { code, message } => {
            debug!(code, message = %message, "Rejected MCP message");
            rpc_error(StatusCode::BAD_REQUEST, code, message, id)
        }
        AppError::InvalidArgument(message) => {
            rpc_error(StatusCode::BAD_REQUEST, INVALID_REQUEST, message, id)
        }
        other => {
            error!(error = %other, "Failed to route MCP message");
            rpc_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR, other.to_string(), id)
        }
    }
}

fn missing_session() -> AppError {
    AppError::InvalidSession(format!("missing {} header", SESSION_ID_HEADER))
}

/// POST /mcp - client-to-server JSON-RPC
async fn handle_post(State(state): State<HttpState>, headers: HeaderMap, body: Bytes) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            return rpc_error(
                StatusCode::BAD_REQUEST,
                PARSE_ERROR,
                format!("Parse error: {}", e),
                Value::Null,
            )
        }
    };

    if !message.is_object() {
        return rpc_error(
            StatusCode::BAD_REQUEST,
            INVALID_REQUEST,
            "Expected a single JSON-RPC message object",
            Value::Null,
        );
    }

    let id = message.get("id").cloned().unwrap_or(Value::Null);
    let method = message.get("method").and_then(Value::as_str).unwrap_or("-").to_string();
    debug!(method = %method, session_id = ?session_header(&headers), "POST /mcp");

    match state.sessions.handle(session_header(&headers), message).await {
        Ok(Routed { session_id, response }) => {
            let response = match response {
                Some(body) => Json(body).into_response(),
                None => StatusCode::ACCEPTED.into_response(),
            };
            match session_id {
                Some(session_id) => with_session_header(response, &session_id),
                None => response,
            }
        }
        Err(err) => error_response(err, id),
    }
}

/// GET /mcp - server-to-client event stream
async fn handle_stream(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(id) = session_header(&headers) else {
        return error_response(missing_session(), Value::Null);
    };

    let session = match state.sessions.resolve(id).await {
        Ok(session) => session,
        Err(err) => return error_response(err, Value::Null),
    };
    let session_id = session.id().to_string();
    let mut rx = session.subscribe();
    // The stream must not keep the session alive after it is closed.
    drop(session);

    info!(session_id = %session_id, "Event stream opened");

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    let event = Event::default().event("message").data(message.to_string());
                    yield Ok::<Event, Infallible>(event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event stream lagged, dropped {} messages", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    let sse = Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(30)).text("ping"));
    with_session_header(sse.into_response(), &session_id)
}

/// DELETE /mcp - explicit session termination
async fn handle_delete(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(id) = session_header(&headers) else {
        return error_response(missing_session(), Value::Null);
    };

    match state.sessions.close(id).await {
        Ok(()) => Json(json!({ "sessionId": id, "status": "closed" })).into_response(),
        Err(err) => error_response(err, Value::Null),
    }
}

/// GET /health
async fn health(State(state): State<HttpState>) -> Json<Value> {
    let chains: Vec<&str> = SUPPORTED_CHAINS.iter().map(|chain| chain.name).collect();

    Json(json!({
        "status": "ok",
        "activeSessions": state.sessions.active_count().await,
        "idleTimeoutSecs": state.sessions.idle_timeout().as_secs(),
        "supportedChains": chains,
        "tools": state.tools.as_slice(),
    }))
}

/// GET /
async fn root() -> Json<Value> {
    Json(json!({
        "name": "chain-data-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "transport": "streamable-http",
        "endpoints": {
            "mcp": "/mcp",
            "health": "/health",
        },
    }))
}
