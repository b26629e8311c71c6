//! Price-feed registry types.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::token::serialize_checksummed;

/// A feed as stored in the registry file.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRecord {
    /// Pair name (e.g., "ETH / USD").
    pub name: String,
    /// Proxy contract address.
    #[serde(rename = "proxyAddress")]
    pub proxy_address: String,
    /// Feed category (e.g., "low", "medium").
    #[serde(rename = "feedCategory", default)]
    pub feed_category: Option<String>,
}

/// All feeds registered for one chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainFeeds {
    /// Explorer / documentation base URL.
    #[serde(rename = "baseUrl", default)]
    pub base_url: String,
    /// Feeds on this chain.
    #[serde(default)]
    pub feeds: Vec<FeedRecord>,
}

/// A resolved feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    /// Registry chain key.
    pub chain: String,
    /// Pair name.
    pub name: String,
    /// Proxy contract address.
    #[serde(serialize_with = "serialize_checksummed")]
    pub proxy_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_category: Option<String>,
}

impl FeedEntry {
    /// Build an entry from a registry record, `None` if the proxy address is invalid.
    pub fn from_record(chain: &str, record: &FeedRecord) -> Option<Self> {
        let proxy_address = record.proxy_address.trim().parse::<Address>().ok()?;
        Some(Self {
            chain: chain.to_string(),
            name: record.name.clone(),
            proxy_address,
            feed_category: record.feed_category.clone(),
        })
    }
}

/// Result of a feed lookup.
#[derive(Debug, Clone, Serialize)]
pub struct FeedLookup {
    /// Matched feeds, in query order.
    pub matches: Vec<FeedEntry>,
    /// Comma-joined pairs with no match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unmatched: Option<String>,
}

/// Every feed registered for one chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainFeedList {
    pub chain: String,
    pub base_url: String,
    pub count: usize,
    pub feeds: Vec<FeedEntry>,
}
