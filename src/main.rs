//! Chain Data MCP Server
//!
//! A Model Context Protocol server for token, price-feed and pool lookups.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chain_data_mcp::{transport, ChainDataServer, Config, SessionManager, TransportKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging; stdout is reserved for the stdio transport
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::info!(transport = ?config.transport, "Starting Chain Data MCP Server");

    if config.graph_api_key.is_none() {
        tracing::warn!("THE_GRAPH_API_KEY is not set; pool queries may be rejected by the gateway");
    }

    // Build the handler once; sessions get cheap clones
    let server = ChainDataServer::new(&config)?;

    match config.transport {
        TransportKind::Stdio => transport::serve_stdio(server).await?,
        TransportKind::Http => {
            let sessions =
                SessionManager::new(move || server.clone(), config.session_idle_timeout);
            transport::serve_http(&config, sessions).await?;
        }
    }

    Ok(())
}
