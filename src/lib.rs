//! Chain Data MCP Server Library
//!
//! A Model Context Protocol server for blockchain reference data.
//! Provides tools for looking up token contracts, price-feed proxies and
//! Uniswap pools, over stdio or a session-based HTTP transport.
//!
//! # Features
//!
//! - **Token Lookup**: Resolve token symbols against file-backed token lists
//! - **Feed Lookup**: Find price-feed proxy addresses by pair name
//! - **Pool Queries**: Query Uniswap V2/V3 subgraphs for a token pair
//! - **Sessions**: Many concurrent HTTP clients, each with its own handler
//!
//! # Example
//!
//! ```rust,ignore
//! use chain_data_mcp::{transport, ChainDataServer, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let server = ChainDataServer::new(&config)?;
//!     transport::serve_stdio(server).await?;
//!     Ok(())
//! }
//! ```

pub mod chains;
pub mod config;
pub mod error;
pub mod mcp;
pub mod services;
pub mod session;
pub mod transport;
pub mod types;

pub use config::{Config, TransportKind};
pub use error::{AppError, Result};
pub use mcp::ChainDataServer;
pub use session::SessionManager;
