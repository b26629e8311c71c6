//! Configuration management module.
//!
//! Handles loading configuration from environment variables.

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::error::AppError;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default idle timeout for HTTP sessions (30 minutes).
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default subgraph gateway.
pub const DEFAULT_SUBGRAPH_GATEWAY_URL: &str = "https://gateway.thegraph.com";

/// Which transport the process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Newline-delimited JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// Session-based HTTP transport.
    Http,
}

impl FromStr for TransportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdio" => Ok(TransportKind::Stdio),
            "http" => Ok(TransportKind::Http),
            other => Err(AppError::Config(format!(
                "MCP_TRANSPORT must be 'stdio' or 'http', got '{}'",
                other
            ))),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Transport to serve.
    pub transport: TransportKind,
    /// HTTP bind host.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Directory holding token lists and the feed registry.
    pub data_dir: PathBuf,
    /// The Graph API key. Without it the unauthenticated gateway route is used.
    pub graph_api_key: Option<String>,
    /// Base URL of the subgraph gateway.
    pub subgraph_gateway_url: String,
    /// Idle time after which an HTTP session is evicted.
    pub session_idle_timeout: Duration,
    /// Logging level (default: info).
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("data"),
            graph_api_key: None,
            subgraph_gateway_url: DEFAULT_SUBGRAPH_GATEWAY_URL.to_string(),
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `MCP_TRANSPORT`: `stdio` (default) or `http`
    /// - `HOST` / `PORT`: HTTP bind address (default 127.0.0.1:3000)
    /// - `DATA_DIR`: token list and feed registry directory (default `data`)
    /// - `THE_GRAPH_API_KEY`: subgraph gateway API key
    /// - `SUBGRAPH_GATEWAY_URL`: gateway base URL
    /// - `SESSION_IDLE_TIMEOUT_SECS`: idle eviction timeout (default 1800)
    /// - `LOG_LEVEL`: Logging level (default: info)
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let defaults = Self::default();

        let transport = match env::var("MCP_TRANSPORT") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.transport,
        };

        let port = match env::var("PORT") {
            Ok(value) => value.trim().parse::<u16>().map_err(|_| {
                AppError::Config(format!("PORT must be a valid port number, got '{}'", value))
            })?,
            Err(_) => defaults.port,
        };

        let session_idle_timeout = match env::var("SESSION_IDLE_TIMEOUT_SECS") {
            Ok(value) => {
                let secs = value.trim().parse::<u64>().map_err(|_| {
                    AppError::Config(format!(
                        "SESSION_IDLE_TIMEOUT_SECS must be a number of seconds, got '{}'",
                        value
                    ))
                })?;
                if secs == 0 {
                    return Err(AppError::Config(
                        "SESSION_IDLE_TIMEOUT_SECS must be greater than zero".into(),
                    ));
                }
                Duration::from_secs(secs)
            }
            Err(_) => defaults.session_idle_timeout,
        };

        let graph_api_key = env::var("THE_GRAPH_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Ok(Self {
            transport,
            host: env::var("HOST").unwrap_or(defaults.host),
            port,
            data_dir: env::var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            graph_api_key,
            subgraph_gateway_url: env::var("SUBGRAPH_GATEWAY_URL")
                .unwrap_or(defaults.subgraph_gateway_url),
            session_idle_timeout,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    /// HTTP bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
