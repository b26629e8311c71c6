//! DEX pool types.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Supported DEX subgraph variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dex {
    /// Uniswap V3 (fee-tiered pools).
    UniswapV3,
    /// Uniswap V2 (constant-product pairs).
    UniswapV2,
}

impl fmt::Display for Dex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dex::UniswapV3 => write!(f, "Uniswap V3"),
            Dex::UniswapV2 => write!(f, "Uniswap V2"),
        }
    }
}

/// Token side of a pool, as reported by the subgraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolToken {
    pub id: String,
    pub symbol: String,
    pub name: String,
    /// BigInt encoded as a string by the subgraph.
    pub decimals: String,
}

/// A liquidity pool record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool (or pair) contract address.
    pub id: String,
    /// Fee tier in hundredths of a bip (V3 only).
    #[serde(rename = "feeTier", default, skip_serializing_if = "Option::is_none")]
    pub fee_tier: Option<String>,
    pub token0: PoolToken,
    pub token1: PoolToken,
    /// Total value locked, in USD.
    #[serde(rename = "totalValueLockedUSD")]
    pub total_value_locked_usd: String,
    #[serde(rename = "volumeUSD")]
    pub volume_usd: String,
    #[serde(rename = "txCount")]
    pub tx_count: String,
}

impl Pool {
    /// Parsed TVL, `None` when the subgraph value is not a decimal number.
    pub fn tvl(&self) -> Option<Decimal> {
        let raw = self.total_value_locked_usd.trim();
        Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)).ok()
    }
}

/// Metadata attached to a pool query result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolQueryMetadata {
    pub dex: Dex,
    pub chain: String,
    pub chain_id: u64,
    /// Number of pools returned after liquidity filtering.
    pub count: usize,
}

/// Result of a pool lookup.
#[derive(Debug, Clone, Serialize)]
pub struct PoolQueryResult {
    pub pools: Vec<Pool>,
    pub metadata: PoolQueryMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with_tvl(tvl: &str) -> Pool {
        let token = PoolToken {
            id: "0x0".to_string(),
            symbol: "T".to_string(),
            name: "Token".to_string(),
            decimals: "18".to_string(),
        };
        Pool {
            id: "0xpool".to_string(),
            fee_tier: None,
            token0: token.clone(),
            token1: token,
            total_value_locked_usd: tvl.to_string(),
            volume_usd: "0".to_string(),
            tx_count: "0".to_string(),
        }
    }

    #[test]
    fn test_tvl_parsing() {
        assert_eq!(pool_with_tvl("1234.5").tvl(), Some(Decimal::new(12345, 1)));
        assert_eq!(pool_with_tvl("1e3").tvl(), Some(Decimal::from(1000)));
        assert_eq!(pool_with_tvl("n/a").tvl(), None);
    }

    #[test]
    fn test_pool_deserializes_subgraph_shape() {
        let json = serde_json::json!({
            "id": "0x88e6a0c2ddd26feeb64f039a2c41296fcb3f5640",
            "feeTier": "500",
            "token0": {"id": "0xa0b8", "symbol": "USDC", "name": "USD Coin", "decimals": "6"},
            "token1": {"id": "0xc02a", "symbol": "WETH", "name": "Wrapped Ether", "decimals": "18"},
            "totalValueLockedUSD": "150000000.12",
            "volumeUSD": "9000000",
            "txCount": "42"
        });
        let pool: Pool = serde_json::from_value(json).unwrap();
        assert_eq!(pool.fee_tier.as_deref(), Some("500"));
        assert_eq!(pool.token1.symbol, "WETH");
    }

    #[test]
    fn test_dex_display_and_serde() {
        assert_eq!(Dex::UniswapV3.to_string(), "Uniswap V3");
        assert_eq!(serde_json::to_value(Dex::UniswapV2).unwrap(), "uniswap_v2");
    }
}
