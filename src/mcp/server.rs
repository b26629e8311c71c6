//! MCP server implementation.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, tool::ToolCallContext, wrapper::Parameters},
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParam, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool, tool_router, ErrorData as McpError, RoleServer, ServerHandler,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    chains::{pool_chains, SUPPORTED_CHAINS},
    config::Config,
    error::AppError,
    services::{FeedRegistry, PoolService, TokenCatalog},
    types::Dex,
};

/// Chain Data MCP Server.
///
/// One instance is the protocol handler for one session. Instances are cheap
/// to clone; the services behind them are stateless.
#[derive(Clone)]
pub struct ChainDataServer {
    token_catalog: Arc<TokenCatalog>,
    feed_registry: Arc<FeedRegistry>,
    pool_service: PoolService,
    tool_router: ToolRouter<Self>,
}

impl ChainDataServer {
    /// Create a new server from configuration.
    ///
    /// No file or network access happens here; catalogs are read per call.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        tracing::info!(data_dir = %config.data_dir.display(), "Initializing Chain Data MCP Server");

        Ok(Self::with_services(
            TokenCatalog::new(&config.data_dir),
            FeedRegistry::new(&config.data_dir),
            PoolService::new(config)?,
        ))
    }

    /// Create a server over explicit services.
    pub fn with_services(
        token_catalog: TokenCatalog,
        feed_registry: FeedRegistry,
        pool_service: PoolService,
    ) -> Self {
        Self {
            token_catalog: Arc::new(token_catalog),
            feed_registry: Arc::new(feed_registry),
            pool_service,
            tool_router: Self::tool_router(),
        }
    }

    /// Names of all registered tools.
    pub fn tool_names() -> Vec<String> {
        Self::tool_router().list_all().into_iter().map(|tool| tool.name.to_string()).collect()
    }
}

/// Input parameters for the get_tokens_by_symbol tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct GetTokensBySymbolInput {
    /// Token symbols to look up (e.g., ["USDC", "DAI"]). Matching is case-insensitive.
    pub symbols: Vec<String>,
    /// Chain name (e.g., "Ethereum", "Arbitrum"). Defaults to "Ethereum".
    #[serde(default)]
    pub chain: Option<String>,
    /// Token list name. Defaults to "Coingecko".
    #[serde(default)]
    pub token_list: Option<String>,
}

/// Input parameters for the pool lookup tools.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct GetPoolsInput {
    /// First token symbol or name (e.g., "WETH").
    pub token0: String,
    /// Second token symbol or name (e.g., "USDC").
    pub token1: String,
    /// Chain name. Defaults to "Ethereum".
    #[serde(default)]
    pub chain: Option<String>,
}

/// Input parameters for the get_feed_addresses tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct GetFeedAddressesInput {
    /// Feed pair names (e.g., ["ETH / USD", "BTC / USD"]). Matching is case-insensitive.
    pub pairs: Vec<String>,
    /// Restrict the search to one chain (e.g., "ethereum"). Searches all chains if omitted.
    #[serde(default)]
    pub chain: Option<String>,
}

/// Input parameters for the list_feeds_for_chain tool.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
pub struct ListFeedsForChainInput {
    /// Chain name as listed in the feed registry (e.g., "ethereum").
    pub chain: String,
}

/// Turn a service result into a tool result.
///
/// Failures become an `isError` result carrying the error marker, so a failed
/// lookup never surfaces as a protocol fault.
fn into_tool_result<T: Serialize>(
    tool: &str,
    result: Result<T, AppError>,
) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => {
            let text = serde_json::to_string_pretty(&value)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            Ok(CallToolResult::success(vec![Content::text(text)]))
        }
        Err(err) => {
            tracing::warn!(tool, kind = err.kind(), error = %err, "Tool call failed");
            let text = serde_json::to_string_pretty(&err.to_payload())
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            Ok(CallToolResult::error(vec![Content::text(text)]))
        }
    }
}

#[tool_router]
impl ChainDataServer {
    /// Look up token contract details by symbol.
    ///
    /// Returns matches in query order plus the symbols that found nothing.
    #[tool(
        description = "Look up token contract addresses, names and decimals by symbol from a token list. Unmatched symbols are reported alongside matches."
    )]
    pub async fn get_tokens_by_symbol(
        &self,
        Parameters(input): Parameters<GetTokensBySymbolInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(
            symbols = ?input.symbols,
            chain = ?input.chain,
            token_list = ?input.token_list,
            "get_tokens_by_symbol called"
        );

        let result = self
            .token_catalog
            .find_by_symbols(&input.symbols, input.chain.as_deref(), input.token_list.as_deref())
            .await;

        into_tool_result("get_tokens_by_symbol", result)
    }

    /// Find Uniswap V3 pools for a token pair.
    #[tool(
        description = "Find Uniswap V3 pools (with fee tiers) for a token pair. Token order does not matter; pools with TVL of $1000 or less are omitted."
    )]
    pub async fn get_uniswap_v3_pools(
        &self,
        Parameters(input): Parameters<GetPoolsInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(
            token0 = %input.token0,
            token1 = %input.token1,
            chain = ?input.chain,
            "get_uniswap_v3_pools called"
        );

        let result = self
            .pool_service
            .find_pools(Dex::UniswapV3, &input.token0, &input.token1, input.chain.as_deref())
            .await;

        into_tool_result("get_uniswap_v3_pools", result)
    }

    /// Find Uniswap V2 pairs for a token pair.
    #[tool(
        description = "Find Uniswap V2 pairs for a token pair. Token order does not matter; pairs with TVL of $1000 or less are omitted."
    )]
    pub async fn get_uniswap_v2_pools(
        &self,
        Parameters(input): Parameters<GetPoolsInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(
            token0 = %input.token0,
            token1 = %input.token1,
            chain = ?input.chain,
            "get_uniswap_v2_pools called"
        );

        let result = self
            .pool_service
            .find_pools(Dex::UniswapV2, &input.token0, &input.token1, input.chain.as_deref())
            .await;

        into_tool_result("get_uniswap_v2_pools", result)
    }

    /// List chains with token catalogs and the chains each DEX covers.
    #[tool(description = "List supported chain names with chain IDs, and the chains supported by each pool lookup tool.")]
    pub async fn list_supported_chains(&self) -> Result<CallToolResult, McpError> {
        tracing::info!("list_supported_chains called");

        // A missing feed registry only empties the feed section.
        let feed_chains = match self.feed_registry.chains().await {
            Ok(chains) => chains,
            Err(e) => {
                tracing::debug!(error = %e, "Feed registry unavailable");
                Vec::new()
            }
        };

        let result = json!({
            "chains": SUPPORTED_CHAINS,
            "poolChains": {
                "uniswap_v3": pool_chains(Dex::UniswapV3),
                "uniswap_v2": pool_chains(Dex::UniswapV2),
            },
            "feedChains": feed_chains,
        });

        into_tool_result("list_supported_chains", Ok::<_, AppError>(result))
    }

    /// Look up price-feed proxy addresses by pair name.
    #[tool(
        description = "Look up price feed proxy addresses by pair name (e.g., \"ETH / USD\"), optionally restricted to one chain. Unmatched pairs are reported alongside matches."
    )]
    pub async fn get_feed_addresses(
        &self,
        Parameters(input): Parameters<GetFeedAddressesInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(pairs = ?input.pairs, chain = ?input.chain, "get_feed_addresses called");

        let result =
            self.feed_registry.find_feed_addresses(&input.pairs, input.chain.as_deref()).await;

        into_tool_result("get_feed_addresses", result)
    }

    /// List every price feed registered for a chain.
    #[tool(description = "List all price feeds registered for a chain.")]
    pub async fn list_feeds_for_chain(
        &self,
        Parameters(input): Parameters<ListFeedsForChainInput>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(chain = %input.chain, "list_feeds_for_chain called");

        let result = self.feed_registry.list_feeds(&input.chain).await;

        into_tool_result("list_feeds_for_chain", result)
    }
}

impl ServerHandler for ChainDataServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "chain-data-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Chain Data MCP Server. Provides tools for looking up token contracts by \
                 symbol, price feed proxy addresses, and Uniswap pools for a token pair."
                    .to_string(),
            ),
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        if !self.tool_router.has_route(&request.name) {
            tracing::warn!(tool = %request.name, "Unknown tool requested");
            return Err(AppError::UnknownTool(request.name.to_string()).into());
        }

        let tcc = ToolCallContext::new(self, request, context);
        self.tool_router.call(tcc).await
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.tool_router.list_all()))
    }
}
