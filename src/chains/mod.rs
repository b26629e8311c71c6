//! Chain name tables.
//!
//! Maps human-readable chain names to numeric chain IDs, and lists which
//! chains each DEX subgraph covers.

use serde::Serialize;

use crate::{
    error::{AppError, Result},
    types::Dex,
};

/// Chain used when a caller does not name one.
pub const DEFAULT_CHAIN: &str = "Ethereum";

/// A chain known to the catalog lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    /// Canonical display name.
    pub name: &'static str,
    /// EVM chain ID.
    pub chain_id: u64,
    /// Alternative spellings accepted on input.
    #[serde(skip)]
    pub aliases: &'static [&'static str],
}

// ============================================================================
// Chain IDs
// ============================================================================

/// All chains with token catalogs.
pub const SUPPORTED_CHAINS: &[ChainInfo] = &[
    ChainInfo { name: "Ethereum", chain_id: 1, aliases: &["mainnet", "eth"] },
    ChainInfo { name: "Optimism", chain_id: 10, aliases: &["op", "op mainnet"] },
    ChainInfo { name: "BNB Chain", chain_id: 56, aliases: &["bsc", "bnb", "binance"] },
    ChainInfo { name: "Gnosis", chain_id: 100, aliases: &["xdai"] },
    ChainInfo { name: "Polygon", chain_id: 137, aliases: &["matic"] },
    ChainInfo { name: "Fantom", chain_id: 250, aliases: &[] },
    ChainInfo { name: "zkSync", chain_id: 324, aliases: &["zksync era"] },
    ChainInfo { name: "Base", chain_id: 8453, aliases: &[] },
    ChainInfo { name: "Arbitrum", chain_id: 42161, aliases: &["arbitrum one"] },
    ChainInfo { name: "Celo", chain_id: 42220, aliases: &[] },
    ChainInfo { name: "Avalanche", chain_id: 43114, aliases: &["avax"] },
    ChainInfo { name: "Linea", chain_id: 59144, aliases: &[] },
    ChainInfo { name: "Blast", chain_id: 81457, aliases: &[] },
    ChainInfo { name: "Scroll", chain_id: 534352, aliases: &[] },
];

// ============================================================================
// Subgraph IDs (The Graph decentralized network)
// ============================================================================

/// Uniswap V3 subgraphs by chain name.
const UNISWAP_V3_SUBGRAPHS: &[(&str, &str)] = &[
    ("Ethereum", "5zvR82QoaXYFyDEKLZ9t6v9adgnptxYpKpSbxtgVENFV"),
    ("Arbitrum", "FbCGRftH4a3yZugY7TnbYgPJVEv2LvMT6oF1fxPe9aJM"),
    ("Optimism", "Cghf4LfVqPiFw6fp6Y5X5Ubc8UpmUhSfJL82zwiBFLaj"),
    ("Polygon", "3hCPRGf4z88VC5rsBKU5AA9FBBq5nF3jbKJG7VZCbhjm"),
    ("Base", "43Hwfi3dJSoGpyas9VwNoDAv55yjgGrPpNSmbQZArzMG"),
];

/// Uniswap V2 subgraphs by chain name.
const UNISWAP_V2_SUBGRAPHS: &[(&str, &str)] =
    &[("Ethereum", "A3Np3RQbaBA6oKJgiwDJeo5T3zrYfGHPWFYayMwtNDum")];

/// Resolve a chain name (case-insensitive, aliases accepted).
pub fn resolve_chain(name: &str) -> Result<&'static ChainInfo> {
    let wanted = name.trim().to_lowercase();
    SUPPORTED_CHAINS
        .iter()
        .find(|chain| {
            chain.name.to_lowercase() == wanted || chain.aliases.iter().any(|a| *a == wanted)
        })
        .ok_or_else(|| AppError::UnsupportedChain(name.trim().to_string()))
}

/// Resolve an optional chain name, falling back to [`DEFAULT_CHAIN`].
pub fn resolve_chain_or_default(name: Option<&str>) -> Result<&'static ChainInfo> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => resolve_chain(name),
        None => resolve_chain(DEFAULT_CHAIN),
    }
}

fn subgraphs(dex: Dex) -> &'static [(&'static str, &'static str)] {
    match dex {
        Dex::UniswapV3 => UNISWAP_V3_SUBGRAPHS,
        Dex::UniswapV2 => UNISWAP_V2_SUBGRAPHS,
    }
}

/// Find the subgraph serving `dex` on `chain`.
///
/// Returns the canonical chain and the subgraph ID, or `UnsupportedChain` when
/// the chain is unknown or the DEX has no subgraph there.
pub fn pool_subgraph(dex: Dex, chain: &str) -> Result<(&'static ChainInfo, &'static str)> {
    let unsupported = || {
        AppError::UnsupportedChain(format!(
            "{} (pool queries for {} support: {})",
            chain.trim(),
            dex,
            pool_chains(dex).join(", ")
        ))
    };

    let info = resolve_chain(chain).map_err(|_| unsupported())?;
    subgraphs(dex)
        .iter()
        .find(|(name, _)| *name == info.name)
        .map(|(_, id)| (info, *id))
        .ok_or_else(unsupported)
}

/// Chain names with pool query support for `dex`.
pub fn pool_chains(dex: Dex) -> Vec<&'static str> {
    subgraphs(dex).iter().map(|(name, _)| *name).collect()
}
