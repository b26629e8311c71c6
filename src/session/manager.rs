//! Session registry for the HTTP transport.
//!
//! Each session owns a [`SessionBinding`] running its own protocol handler.
//! Sessions are created by an `initialize` request, looked up by id on every
//! later request, and removed on explicit termination, transport close, idle
//! expiry, or server shutdown. Whoever removes a session from the registry is
//! responsible for closing it, so cleanup runs exactly once.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    time::Duration,
};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::{
    sync::{broadcast, oneshot, RwLock},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    binding::SessionBinding,
    message::{
        is_initialize_request, is_initialized_notification, is_request, validate_client_message,
    },
};
use crate::{
    error::{AppError, Result, INVALID_REQUEST},
    mcp::ChainDataServer,
};

/// HTTP header carrying the session id.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Builds the protocol handler for a new session.
pub type HandlerFactory = Arc<dyn Fn() -> ChainDataServer + Send + Sync>;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// No request arrived within the idle timeout.
    IdleTimeout,
    /// The client asked for termination.
    Terminated,
    /// The handler side of the binding went away.
    TransportClosed,
    /// The server is shutting down.
    Shutdown,
}

impl CloseReason {
    fn from_supervisor(self) -> bool {
        matches!(self, Self::IdleTimeout | Self::TransportClosed)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::IdleTimeout => "idle timeout",
            Self::Terminated => "terminated by client",
            Self::TransportClosed => "transport closed",
            Self::Shutdown => "server shutdown",
        };
        f.write_str(text)
    }
}

/// One live session.
pub struct Session {
    id: String,
    binding: Arc<SessionBinding>,
    last_activity: Mutex<Instant>,
    ready: AtomicBool,
    closed: AtomicBool,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    fn new(id: String, binding: Arc<SessionBinding>) -> Self {
        Self {
            id,
            binding,
            last_activity: Mutex::new(Instant::now()),
            ready: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            supervisor: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether the client has completed the initialize handshake.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Time of the last request routed to this session.
    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    /// Refresh the activity timestamp. Fails once the session is closed.
    fn touch(&self) -> bool {
        if self.is_closed() {
            return false;
        }
        *self.last_activity.lock() = Instant::now();
        true
    }

    /// Messages the handler emits outside request/response.
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.binding.subscribe()
    }

    /// Forward a request and wait for its response.
    pub async fn request(&self, message: &Value) -> Result<Value> {
        self.binding.request(message).await
    }

    /// Forward a notification or response.
    pub async fn send(&self, message: &Value) -> Result<()> {
        self.binding.send(message).await
    }

    /// Forward the notification that ends the handshake.
    ///
    /// The handler accepts nothing else until the handshake is complete, so any
    /// other message is rejected here instead of being written to it.
    async fn complete_handshake(&self, message: &Value) -> Result<()> {
        if !is_initialized_notification(message) {
            return Err(AppError::InvalidMessage {
                code: INVALID_REQUEST,
                message: "Session not initialized: send notifications/initialized first".into(),
            });
        }
        self.binding.send(message).await?;
        self.ready.store(true, Ordering::SeqCst);
        debug!(session_id = %self.id, "Session handshake complete");
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("ready", &self.is_ready())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Result of routing one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    /// Session the message was routed to. `None` when an `initialize` request
    /// was answered with an error and no session was created.
    pub session_id: Option<String>,
    /// Response to return to the client, absent for notifications.
    pub response: Option<Value>,
}

struct Inner {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    factory: HandlerFactory,
    idle_timeout: Duration,
}

impl Inner {
    /// Remove `id` from the registry and close it.
    ///
    /// Returns `false` if the session was already gone.
    async fn finish(&self, id: &str, reason: CloseReason) -> bool {
        let Some(session) = self.sessions.write().await.remove(id) else {
            return false;
        };

        session.closed.store(true, Ordering::SeqCst);
        let supervisor = session.supervisor.lock().take();
        if let Some(handle) = supervisor {
            // The supervisor must not abort itself mid-cleanup.
            if !reason.from_supervisor() {
                handle.abort();
            }
        }
        session.binding.close().await;

        info!(session_id = %id, %reason, "Session closed");
        true
    }
}

/// Concurrent session registry.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a manager that builds one handler per session with `factory`.
    pub fn new<F>(factory: F, idle_timeout: Duration) -> Self
    where
        F: Fn() -> ChainDataServer + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                sessions: RwLock::new(HashMap::new()),
                factory: Arc::new(factory),
                idle_timeout,
            }),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.inner.idle_timeout
    }

    /// Route one inbound JSON-RPC message.
    ///
    /// Without a session id only `initialize` is accepted, and it creates a new
    /// session. With an id, the message goes to that session's handler. Messages
    /// the handler could not decode are rejected without reaching it.
    ///
    /// # Errors
    /// `InvalidMessage` for a malformed message, `InvalidSession` for a
    /// missing, unknown, or closed session.
    pub async fn handle(&self, session_id: Option<&str>, message: Value) -> Result<Routed> {
        validate_client_message(&message)?;

        match session_id {
            None if is_initialize_request(&message) => self.initialize(message).await,
            None => Err(AppError::InvalidSession("No valid session ID provided".into())),
            Some(id) => {
                let session = self.resolve(id).await?;
                let response = if !session.is_ready() {
                    session.complete_handshake(&message).await?;
                    None
                } else if is_request(&message) {
                    Some(session.request(&message).await?)
                } else {
                    session.send(&message).await?;
                    None
                };
                Ok(Routed { session_id: Some(session.id.clone()), response })
            }
        }
    }

    /// Create a session from an `initialize` request.
    ///
    /// The session is registered only after its handler answered the request
    /// successfully, so a failed handshake leaves nothing behind.
    pub async fn initialize(&self, message: Value) -> Result<Routed> {
        if !is_initialize_request(&message) {
            return Err(AppError::InvalidArgument("Expected an initialize request".into()));
        }
        validate_client_message(&message)?;

        let (binding, closed) = SessionBinding::start((self.inner.factory)());

        let response = match binding.request(&message).await {
            Ok(response) => response,
            Err(e) => {
                binding.close().await;
                return Err(AppError::InvalidArgument(format!("Initialization failed: {}", e)));
            }
        };

        if response.get("error").is_some() {
            debug!("Handler rejected initialize request");
            binding.close().await;
            return Ok(Routed { session_id: None, response: Some(response) });
        }

        let session = {
            let mut sessions = self.inner.sessions.write().await;
            let id = loop {
                let candidate = Uuid::new_v4().to_string();
                if !sessions.contains_key(&candidate) {
                    break candidate;
                }
            };
            let session = Arc::new(Session::new(id.clone(), binding));

            // A registered session always has its supervisor attached.
            let supervisor = tokio::spawn(supervise(
                Arc::downgrade(&self.inner),
                session.clone(),
                closed,
                self.inner.idle_timeout,
            ));
            *session.supervisor.lock() = Some(supervisor);

            sessions.insert(id, session.clone());
            session
        };

        info!(session_id = %session.id, "Session created");
        Ok(Routed { session_id: Some(session.id.clone()), response: Some(response) })
    }

    /// Look up a live session and refresh its activity time.
    ///
    /// # Errors
    /// `InvalidSession` if the id is unknown or the session is closing.
    pub async fn resolve(&self, id: &str) -> Result<Arc<Session>> {
        let session = self.inner.sessions.read().await.get(id).cloned();
        match session {
            Some(session) if session.touch() => Ok(session),
            _ => Err(AppError::InvalidSession(format!("Unknown or expired session: {}", id))),
        }
    }

    /// Terminate a session on client request.
    pub async fn close(&self, id: &str) -> Result<()> {
        if self.inner.finish(id, CloseReason::Terminated).await {
            Ok(())
        } else {
            Err(AppError::InvalidSession(format!("Unknown or expired session: {}", id)))
        }
    }

    /// Number of live sessions.
    pub async fn active_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Close every session.
    pub async fn shutdown_all(&self) {
        let ids: Vec<String> = self.inner.sessions.read().await.keys().cloned().collect();
        if ids.is_empty() {
            return;
        }

        info!("Closing {} active sessions", ids.len());
        for id in ids {
            self.inner.finish(&id, CloseReason::Shutdown).await;
        }
    }
}

/// Watch one session for idle expiry or transport close.
async fn supervise(
    inner: Weak<Inner>,
    session: Arc<Session>,
    mut closed: oneshot::Receiver<()>,
    idle_timeout: Duration,
) {
    let reason = loop {
        let deadline = session.last_activity() + idle_timeout;
        tokio::select! {
            _ = &mut closed => break CloseReason::TransportClosed,
            _ = tokio::time::sleep_until(deadline) => {
                // Activity may have moved the deadline while we slept.
                if session.last_activity() + idle_timeout <= Instant::now() {
                    break CloseReason::IdleTimeout;
                }
            }
        }
    };

    match inner.upgrade() {
        Some(inner) => {
            if reason == CloseReason::TransportClosed && !session.is_closed() {
                warn!(session_id = %session.id, "Session handler exited unexpectedly");
            }
            inner.finish(&session.id, reason).await;
        }
        None => session.binding.close().await,
    }
}
