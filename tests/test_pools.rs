//! Integration tests for the Uniswap pool tools.
//!
//! Run with: `cargo test --test test_pools`

mod common;

use std::time::Duration;

use rmcp::handler::server::wrapper::Parameters;
use serde_json::json;

use chain_data_mcp::{mcp::GetPoolsInput, types::Dex, AppError};

use common::{pool, pools_response, FakeSubgraph};

fn sorted_conditions(body: &serde_json::Value) -> Vec<String> {
    let mut conditions: Vec<String> = body["variables"]["where"]["or"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.to_string())
        .collect();
    conditions.sort();
    conditions
}

#[tokio::test]
async fn test_v3_pools_filtered_by_tvl() {
    let transport = FakeSubgraph::new(vec![Ok(pools_response(vec![
        pool("0xaaa", Some("500"), ("WETH", "USDC"), "150000000.25"),
        pool("0xbbb", Some("3000"), ("WETH", "USDC"), "1000"),
        pool("0xccc", Some("10000"), ("WETH", "USDC"), "1000.01"),
        pool("0xddd", Some("100"), ("WETH", "USDC"), "garbage"),
    ]))]);
    let service = common::pool_service(transport.clone(), Some("k3y"));

    let result = service.find_pools(Dex::UniswapV3, "WETH", "USDC", None).await.unwrap();

    let ids: Vec<&str> = result.pools.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["0xaaa", "0xccc"]);
    assert_eq!(result.metadata.count, 2);
    assert_eq!(result.metadata.chain, "Ethereum");
    assert_eq!(result.metadata.chain_id, 1);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].0.starts_with("https://gateway.test/api/k3y/subgraphs/id/"));
}

/// Swapping the tokens sends the same condition set.
#[tokio::test]
async fn test_pair_order_independent() {
    let pools = vec![pool("0xaaa", Some("500"), ("WETH", "USDC"), "5000")];
    let transport = FakeSubgraph::always(pools);
    let service = common::pool_service(transport.clone(), None);

    let forward = service.find_pools(Dex::UniswapV3, "WETH", "USDC", None).await.unwrap();
    let reverse = service.find_pools(Dex::UniswapV3, "USDC", "WETH", None).await.unwrap();

    assert_eq!(forward.pools, reverse.pools);
    let requests = transport.requests();
    assert_eq!(sorted_conditions(&requests[0].1), sorted_conditions(&requests[1].1));
}

#[tokio::test(start_paused = true)]
async fn test_retry_then_success() {
    let transport = FakeSubgraph::new(vec![
        Err(AppError::Transport("Subgraph returned status: 503 Service Unavailable".into())),
        Ok(json!({ "errors": [{ "message": "indexer not ready" }] })),
        Ok(pools_response(vec![pool("0xaaa", None, ("WETH", "DAI"), "25000")])),
    ]);
    let service = common::pool_service(transport.clone(), None);
    let started = tokio::time::Instant::now();

    let result =
        service.find_pools(Dex::UniswapV2, "WETH", "DAI", Some("ethereum")).await.unwrap();

    assert_eq!(result.pools.len(), 1);
    assert_eq!(transport.calls(), 3);
    assert!(started.elapsed() >= Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted() {
    let transport = FakeSubgraph::new(vec![]);
    let service = common::pool_service(transport.clone(), None);

    let err = service.find_pools(Dex::UniswapV3, "WETH", "USDC", None).await.unwrap_err();

    match err {
        AppError::RemoteQueryFailed { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("Expected RemoteQueryFailed, got {:?}", other),
    }
    assert_eq!(transport.calls(), 3);
}

/// Validation failures return immediately without touching the network.
#[tokio::test]
async fn test_validation_errors_skip_transport() {
    let transport = FakeSubgraph::new(vec![]);
    let service = common::pool_service(transport.clone(), None);

    let err = service.find_pools(Dex::UniswapV3, "  ", "USDC", None).await.unwrap_err();
    assert_eq!(err.kind(), "InvalidArgument");

    let err =
        service.find_pools(Dex::UniswapV2, "WETH", "USDC", Some("Arbitrum")).await.unwrap_err();
    assert_eq!(err.kind(), "UnsupportedChain");

    let err =
        service.find_pools(Dex::UniswapV3, "WETH", "USDC", Some("Narnia")).await.unwrap_err();
    assert_eq!(err.kind(), "UnsupportedChain");

    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_v2_tool_payload() {
    let dir = tempfile::tempdir().unwrap();
    let transport = FakeSubgraph::new(vec![Ok(pools_response(vec![pool(
        "0xpair",
        None,
        ("WETH", "USDT"),
        "98765.4",
    )]))]);
    let server = common::create_test_server(dir.path(), transport);

    let input = GetPoolsInput { token0: "WETH".into(), token1: "USDT".into(), chain: None };
    let result = server.get_uniswap_v2_pools(Parameters(input)).await.unwrap();
    let (payload, is_error) = common::tool_payload(&result);

    assert!(!is_error);
    assert_eq!(payload["metadata"]["dex"], "uniswap_v2");
    assert_eq!(payload["metadata"]["count"], 1);
    assert_eq!(payload["pools"][0]["id"], "0xpair");
    assert!(payload["pools"][0].get("feeTier").is_none());
}

#[tokio::test]
async fn test_v3_tool_unsupported_chain_is_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let server = common::create_test_server(dir.path(), FakeSubgraph::new(vec![]));

    let input =
        GetPoolsInput { token0: "WETH".into(), token1: "USDC".into(), chain: Some("Celo".into()) };
    let result = server.get_uniswap_v3_pools(Parameters(input)).await.unwrap();
    let (payload, is_error) = common::tool_payload(&result);

    assert!(is_error);
    assert_eq!(payload["error"]["kind"], "UnsupportedChain");
}

/// Requires network access and `THE_GRAPH_API_KEY`.
#[tokio::test]
#[ignore]
async fn test_live_v3_pools() {
    let _ = dotenvy::dotenv();
    let Ok(config) = chain_data_mcp::Config::from_env() else { return };
    if config.graph_api_key.is_none() {
        eprintln!("Skipping test: THE_GRAPH_API_KEY not set");
        return;
    }

    let service = chain_data_mcp::services::PoolService::new(&config).unwrap();
    let result = service.find_pools(Dex::UniswapV3, "WETH", "USDC", None).await.unwrap();
    assert!(!result.pools.is_empty());
}
