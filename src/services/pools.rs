//! DEX pool queries against The Graph subgraphs.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    chains::{pool_subgraph, DEFAULT_CHAIN},
    config::Config,
    error::{AppError, Result},
    services::RetryPolicy,
    types::{Dex, Pool, PoolQueryMetadata, PoolQueryResult},
};

/// Pools at or below this TVL (USD) are dropped from results.
pub const MIN_TVL_USD: u64 = 1000;

/// Number of pools requested from the subgraph.
const PAGE_SIZE: u32 = 20;

const POOL_FIELDS: &str = "token0 { id symbol name decimals } \
     token1 { id symbol name decimals } volumeUSD txCount";

// ============================================================================
// Subgraph Transport
// ============================================================================

/// Sends a GraphQL request body to a subgraph endpoint.
///
/// Implementations return the decoded JSON response, or an error for transport
/// failures and non-success statuses.
#[async_trait]
pub trait SubgraphTransport: Send + Sync {
    async fn post_query(&self, url: &str, body: &Value) -> Result<Value>;
}

/// `reqwest`-backed subgraph transport.
pub struct HttpSubgraphTransport {
    client: reqwest::Client,
}

impl HttpSubgraphTransport {
    /// Create a transport with a 30 second request timeout.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SubgraphTransport for HttpSubgraphTransport {
    async fn post_query(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AppError::Transport(format!("Subgraph request failed: {}", e.without_url()))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Transport(format!(
                "Subgraph returned status: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Failed to parse subgraph response: {}", e)))
    }
}

// ============================================================================
// Query Construction
// ============================================================================

/// The four pair conditions: symbol or name substring, in either token order.
fn pair_conditions(a: &str, b: &str) -> Vec<Value> {
    let mut conditions = Vec::with_capacity(4);
    for field in ["symbol_contains_nocase", "name_contains_nocase"] {
        for (first, second) in [(a, b), (b, a)] {
            conditions.push(json!({
                "token0_": { field: first },
                "token1_": { field: second },
            }));
        }
    }
    conditions
}

/// Build the GraphQL request body for a pair lookup.
///
/// V2 pairs are aliased onto the V3 response shape so both variants decode
/// into [`Pool`].
pub fn build_pool_query(dex: Dex, token0: &str, token1: &str) -> Value {
    let query = match dex {
        Dex::UniswapV3 => format!(
            "query Pools($where: Pool_filter!) {{ pools(first: {PAGE_SIZE}, \
             orderBy: totalValueLockedUSD, orderDirection: desc, where: $where) \
             {{ id feeTier totalValueLockedUSD {POOL_FIELDS} }} }}"
        ),
        Dex::UniswapV2 => format!(
            "query Pairs($where: Pair_filter!) {{ pools: pairs(first: {PAGE_SIZE}, \
             orderBy: reserveUSD, orderDirection: desc, where: $where) \
             {{ id totalValueLockedUSD: reserveUSD {POOL_FIELDS} }} }}"
        ),
    };

    json!({
        "query": query,
        "variables": { "where": { "or": pair_conditions(token0, token1) } },
    })
}

/// Extract `data.pools` from a subgraph response.
///
/// A non-empty `errors` array counts as a failure even when data is present.
fn parse_pools(response: &Value) -> Result<Vec<Pool>> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .map(|e| e.get("message").and_then(Value::as_str).unwrap_or("unknown error"))
                .collect();
            return Err(AppError::Transport(format!(
                "Subgraph returned errors: {}",
                messages.join("; ")
            )));
        }
    }

    let pools = response
        .pointer("/data/pools")
        .cloned()
        .ok_or_else(|| AppError::Parse("Subgraph response has no data.pools".into()))?;

    Ok(serde_json::from_value(pools)?)
}

// ============================================================================
// Pool Service
// ============================================================================

/// Service for querying DEX pools by token pair.
#[derive(Clone)]
pub struct PoolService {
    transport: Arc<dyn SubgraphTransport>,
    gateway_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl PoolService {
    /// Create a pool service from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_transport(
            Arc::new(HttpSubgraphTransport::new()?),
            config.subgraph_gateway_url.clone(),
            config.graph_api_key.clone(),
            RetryPolicy::default(),
        ))
    }

    /// Create a pool service over an explicit transport.
    pub fn with_transport(
        transport: Arc<dyn SubgraphTransport>,
        gateway_url: String,
        api_key: Option<String>,
        retry: RetryPolicy,
    ) -> Self {
        let gateway_url = gateway_url.trim_end_matches('/').to_string();
        Self { transport, gateway_url, api_key, retry }
    }

    /// Endpoint URL for a subgraph. Contains the API key when one is set.
    pub fn endpoint(&self, subgraph_id: &str) -> String {
        match &self.api_key {
            Some(key) => format!("{}/api/{}/subgraphs/id/{}", self.gateway_url, key, subgraph_id),
            None => format!("{}/api/subgraphs/id/{}", self.gateway_url, subgraph_id),
        }
    }

    /// Find pools for a token pair on `dex`.
    ///
    /// Token order does not matter. Only pools with TVL above
    /// [`MIN_TVL_USD`] are returned.
    ///
    /// # Errors
    /// `InvalidArgument` for blank tokens and `UnsupportedChain` for chains
    /// without a subgraph (both immediate), `RemoteQueryFailed` once retries
    /// are exhausted.
    pub async fn find_pools(
        &self,
        dex: Dex,
        token0: &str,
        token1: &str,
        chain: Option<&str>,
    ) -> Result<PoolQueryResult> {
        let token0 = token0.trim();
        let token1 = token1.trim();
        if token0.is_empty() || token1.is_empty() {
            return Err(AppError::InvalidArgument(
                "token0 and token1 must be non-empty strings".into(),
            ));
        }

        let chain_name = chain.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(DEFAULT_CHAIN);
        let (chain, subgraph_id) = pool_subgraph(dex, chain_name)?;

        info!(dex = %dex, chain = chain.name, token0, token1, "Querying pools");

        let url = self.endpoint(subgraph_id);
        let body = build_pool_query(dex, token0, token1);

        let pools = self
            .retry
            .run("pool_query", |attempt| {
                let url = &url;
                let body = &body;
                async move {
                    debug!(attempt, subgraph = subgraph_id, "Sending subgraph query");
                    let response = self.transport.post_query(url, body).await?;
                    parse_pools(&response)
                }
            })
            .await?;

        let threshold = Decimal::from(MIN_TVL_USD);
        let total = pools.len();
        let pools: Vec<Pool> = pools
            .into_iter()
            .filter(|pool| pool.tvl().is_some_and(|tvl| tvl > threshold))
            .collect();
        debug!("Kept {} of {} pools above TVL threshold", pools.len(), total);

        Ok(PoolQueryResult {
            metadata: PoolQueryMetadata {
                dex,
                chain: chain.name.to_string(),
                chain_id: chain.chain_id,
                count: pools.len(),
            },
            pools,
        })
    }
}
