//! Stream transport over stdin/stdout.

use rmcp::ServiceExt;
use tracing::info;

use super::shutdown_signal;
use crate::{
    error::{AppError, Result},
    mcp::ChainDataServer,
};

/// Serve one handler over stdio until the stream closes or a shutdown
/// signal arrives.
pub async fn serve_stdio(server: ChainDataServer) -> Result<()> {
    info!("Serving MCP over stdio");

    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| AppError::Transport(format!("stdio handshake failed: {}", e)))?;

    let cancel = running.cancellation_token();
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, closing stdio session");
        cancel.cancel();
    });

    let quit = running
        .waiting()
        .await
        .map_err(|e| AppError::Transport(format!("stdio service failed: {}", e)))?;
    signal_task.abort();

    info!(reason = ?quit, "stdio session ended");
    Ok(())
}
