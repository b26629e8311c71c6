//! Token-related types.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize, Serializer};

// ============================================================================
// Token List Types (following tokenlists.org schema)
// ============================================================================

/// Token information as stored in a token list file.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenListToken {
    /// Chain ID where the token exists.
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    /// Token contract address.
    pub address: String,
    /// Token symbol (e.g., "USDC").
    pub symbol: String,
    /// Token name (e.g., "USD Coin").
    pub name: String,
    /// Number of decimals.
    pub decimals: u8,
    /// Logo URI (optional).
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
}

/// A token list file.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenList {
    /// List name.
    pub name: String,
    /// List of tokens.
    pub tokens: Vec<TokenListToken>,
}

// ============================================================================
// Catalog Entry
// ============================================================================

/// A catalog entry with parsed address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenEntry {
    /// Chain ID.
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    /// Token contract address.
    #[serde(serialize_with = "serialize_checksummed")]
    pub address: Address,
    /// Token name.
    pub name: String,
    /// Token symbol.
    pub symbol: String,
    /// Number of decimals.
    pub decimals: u8,
    /// Icon reference.
    #[serde(rename = "logoURI", skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
}

impl TokenEntry {
    /// Build an entry from a raw token list record.
    ///
    /// Returns `None` when the address is not a valid EVM address.
    pub fn from_list_token(token: TokenListToken) -> Option<Self> {
        let address = token.address.trim().parse::<Address>().ok()?;
        Some(Self {
            chain_id: token.chain_id,
            address,
            name: token.name,
            symbol: token.symbol,
            decimals: token.decimals,
            logo_uri: token.logo_uri,
        })
    }
}

/// Result of a symbol lookup.
#[derive(Debug, Clone, Serialize)]
pub struct TokenLookup {
    /// Matched entries, in query order.
    pub matches: Vec<TokenEntry>,
    /// Comma-joined terms with no match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmatched: Option<String>,
}

/// Serialize an address in EIP-55 checksum form.
pub fn serialize_checksummed<S: Serializer>(
    address: &Address,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}
