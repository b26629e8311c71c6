//! In-process transport binding for one session.
//!
//! A binding runs its protocol handler as an rmcp service on one end of an
//! in-memory duplex pipe and speaks newline-delimited JSON-RPC on the other.
//! Responses are routed back to the waiting caller by JSON-RPC id; anything
//! else the handler emits (notifications, server requests) is broadcast to
//! notification subscribers.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use rmcp::ServiceExt;
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf},
    sync::{broadcast, oneshot, Mutex as AsyncMutex},
};
use tracing::{debug, warn};

use super::message::is_response;
use crate::{
    error::{AppError, Result},
    mcp::ChainDataServer,
};

/// Bytes buffered in each direction of the duplex pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Notifications buffered per subscriber before it starts lagging.
const NOTIFICATION_BUFFER: usize = 64;

fn closed_error() -> AppError {
    AppError::InvalidSession("session transport is closed".into())
}

/// Transport binding between one session and its protocol handler.
pub struct SessionBinding {
    writer: AsyncMutex<Option<WriteHalf<DuplexStream>>>,
    pending: Mutex<HashMap<String, oneshot::Sender<Value>>>,
    notifications: broadcast::Sender<Value>,
}

impl SessionBinding {
    /// Start `handler` behind a fresh binding.
    ///
    /// The returned receiver resolves exactly once, when the handler side of
    /// the pipe is gone (shutdown, handshake failure, or service exit).
    pub fn start(handler: ChainDataServer) -> (Arc<Self>, oneshot::Receiver<()>) {
        let (client_end, server_end) = tokio::io::duplex(PIPE_CAPACITY);

        tokio::spawn(async move {
            match handler.serve(tokio::io::split(server_end)).await {
                Ok(running) => match running.waiting().await {
                    Ok(reason) => debug!(?reason, "Session handler stopped"),
                    Err(e) => warn!(error = %e, "Session handler task failed"),
                },
                Err(e) => debug!(error = %e, "Session handler stopped during handshake"),
            }
        });

        let (client_read, client_write) = tokio::io::split(client_end);
        let (notifications, _) = broadcast::channel(NOTIFICATION_BUFFER);
        let binding = Arc::new(Self {
            writer: AsyncMutex::new(Some(client_write)),
            pending: Mutex::new(HashMap::new()),
            notifications,
        });

        let (closed_tx, closed_rx) = oneshot::channel();
        tokio::spawn(binding.clone().read_loop(client_read, closed_tx));

        (binding, closed_rx)
    }

    async fn read_loop(self: Arc<Self>, read: ReadHalf<DuplexStream>, closed: oneshot::Sender<()>) {
        let mut lines = BufReader::new(read).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => self.route(&line),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Session pipe read failed");
                    break;
                }
            }
        }

        // Dropping the senders fails every request still waiting.
        self.pending.lock().clear();
        let _ = closed.send(());
    }

    fn route(&self, line: &str) {
        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Discarding malformed message from session handler");
                return;
            }
        };

        if is_response(&message) {
            let waiter = message
                .get("id")
                .map(Value::to_string)
                .and_then(|key| self.pending.lock().remove(&key));
            match waiter {
                Some(waiter) => {
                    let _ = waiter.send(message);
                }
                None => debug!("Dropping response with no waiting request"),
            }
        } else {
            // No subscribers is fine; the message is simply dropped.
            let _ = self.notifications.send(message);
        }
    }

    /// Write one message to the handler without waiting for a reply.
    pub async fn send(&self, message: &Value) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(closed_error)?;
        writer.write_all(&line).await.map_err(|_| closed_error())?;
        writer.flush().await.map_err(|_| closed_error())?;
        Ok(())
    }

    /// Write a request and wait for the response carrying the same id.
    pub async fn request(&self, message: &Value) -> Result<Value> {
        let key = message
            .get("id")
            .filter(|id| !id.is_null())
            .map(Value::to_string)
            .ok_or_else(|| AppError::InvalidArgument("JSON-RPC request has no id".into()))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(key.clone(), tx);

        if let Err(e) = self.send(message).await {
            self.pending.lock().remove(&key);
            return Err(e);
        }

        rx.await.map_err(|_| closed_error())
    }

    /// Subscribe to messages the handler sends outside of request/response.
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.notifications.subscribe()
    }

    /// Close the client side of the pipe. The handler sees end-of-stream and
    /// stops; requests still in flight are discarded.
    pub async fn close(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    /// Whether [`close`](Self::close) has run.
    pub async fn is_closed(&self) -> bool {
        self.writer.lock().await.is_none()
    }
}
