//! Common utilities for integration tests.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde_json::{json, Value};

use chain_data_mcp::{
    services::{FeedRegistry, PoolService, RetryPolicy, SubgraphTransport, TokenCatalog},
    AppError, ChainDataServer, Result, SessionManager,
};

pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
pub const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
pub const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";

pub const GATEWAY: &str = "https://gateway.test";

/// Write a mainnet token list and a two-chain feed registry into `dir`.
pub fn write_fixtures(dir: &Path) {
    let tokens = json!({
        "name": "Fixture",
        "tokens": [
            {"chainId": 1, "address": USDC.to_lowercase(), "name": "USD Coin", "symbol": "USDC", "decimals": 6},
            {"chainId": 1, "address": USDT, "name": "Tether USD", "symbol": "USDT", "decimals": 6},
            {"chainId": 1, "address": DAI, "name": "Dai Stablecoin", "symbol": "DAI", "decimals": 18},
            {"chainId": 1, "address": WETH, "name": "Wrapped Ether", "symbol": "WETH", "decimals": 18,
             "logoURI": "https://example.test/weth.png"}
        ]
    });
    std::fs::write(dir.join("Coingecko.1.json"), tokens.to_string()).unwrap();

    let feeds = json!({
        "ethereum": {
            "baseUrl": "https://etherscan.io/address/",
            "feeds": [
                {"name": "ETH / USD", "proxyAddress": "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419", "feedCategory": "low"},
                {"name": "BTC / USD", "proxyAddress": "0xF4030086522a5bEEa4988F8cA5B36dbC97BeE88c", "feedCategory": "low"}
            ]
        },
        "arbitrum": {
            "baseUrl": "https://arbiscan.io/address/",
            "feeds": [
                {"name": "ETH / USD", "proxyAddress": "0x639Fe6ab55C921f74e7fac1ee960C0B6293ba612", "feedCategory": "low"},
                {"name": "ARB / USD", "proxyAddress": "0xb2A824043730FE05F3DA2efaFa1CBbe83fa548D6", "feedCategory": "medium"}
            ]
        }
    });
    std::fs::write(dir.join("feeds.json"), feeds.to_string()).unwrap();
}

/// A subgraph pool record.
pub fn pool(id: &str, fee_tier: Option<&str>, symbols: (&str, &str), tvl: &str) -> Value {
    let mut pool = json!({
        "id": id,
        "token0": {"id": "0x01", "symbol": symbols.0, "name": symbols.0, "decimals": "18"},
        "token1": {"id": "0x02", "symbol": symbols.1, "name": symbols.1, "decimals": "6"},
        "totalValueLockedUSD": tvl,
        "volumeUSD": "1000000",
        "txCount": "100"
    });
    if let Some(fee) = fee_tier {
        pool["feeTier"] = json!(fee);
    }
    pool
}

/// A successful subgraph response carrying `pools`.
pub fn pools_response(pools: Vec<Value>) -> Value {
    json!({ "data": { "pools": pools } })
}

/// Scripted subgraph transport. Replies are consumed in order; once the script
/// runs out every call fails.
#[derive(Default)]
pub struct FakeSubgraph {
    replies: Mutex<VecDeque<Result<Value>>>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl FakeSubgraph {
    pub fn new(replies: Vec<Result<Value>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()) })
    }

    /// A transport that always answers with the same pools.
    pub fn always(pools: Vec<Value>) -> Arc<Self> {
        let replies = (0..32).map(|_| Ok(pools_response(pools.clone()))).collect();
        Self::new(replies)
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubgraphTransport for FakeSubgraph {
    async fn post_query(&self, url: &str, body: &Value) -> Result<Value> {
        self.requests.lock().unwrap().push((url.to_string(), body.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Transport("no scripted reply".into())))
    }
}

/// Pool service over a fake transport with the default retry policy.
pub fn pool_service(transport: Arc<FakeSubgraph>, api_key: Option<&str>) -> PoolService {
    PoolService::with_transport(
        transport,
        GATEWAY.to_string(),
        api_key.map(str::to_string),
        RetryPolicy::default(),
    )
}

/// Server reading fixtures from `dir` and pools from `transport`.
pub fn create_test_server(dir: &Path, transport: Arc<FakeSubgraph>) -> ChainDataServer {
    ChainDataServer::with_services(
        TokenCatalog::new(dir),
        FeedRegistry::new(dir),
        pool_service(transport, Some("test-key")),
    )
}

/// Session manager whose sessions share one fixture-backed server.
pub fn create_session_manager(dir: &Path, idle_timeout: Duration) -> SessionManager {
    let server = create_test_server(dir, FakeSubgraph::always(vec![]));
    SessionManager::new(move || server.clone(), idle_timeout)
}

/// Decode a tool result into its JSON payload and error flag.
pub fn tool_payload(result: &CallToolResult) -> (Value, bool) {
    let json = serde_json::to_value(result).unwrap();
    let text = json["content"][0]["text"].as_str().expect("text content").to_string();
    let is_error = json["isError"].as_bool().unwrap_or(false);
    (serde_json::from_str(&text).unwrap(), is_error)
}

pub fn initialize_request(id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": { "name": "integration-test", "version": "0.1.0" }
        }
    })
}

pub fn initialized_notification() -> Value {
    json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })
}

pub fn tool_call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}

/// Run the full handshake and return the new session id.
pub async fn open_session(manager: &SessionManager) -> String {
    let routed = manager.handle(None, initialize_request(1)).await.unwrap();
    let session_id = routed.session_id.expect("session created");
    let notified = manager.handle(Some(&session_id), initialized_notification()).await.unwrap();
    assert!(notified.response.is_none());
    session_id
}

/// Payload text of a `tools/call` JSON-RPC response.
pub fn rpc_tool_payload(response: &Value) -> (Value, bool) {
    let result = &response["result"];
    let text = result["content"][0]["text"].as_str().expect("text content");
    let is_error = result["isError"].as_bool().unwrap_or(false);
    (serde_json::from_str(text).unwrap(), is_error)
}
