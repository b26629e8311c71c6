//! Price-feed registry backed by a single JSON file.
//!
//! The registry maps lowercase chain names to their feeds. It is re-read on
//! every call; chain order follows the file.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    error::{AppError, Result},
    services::match_terms,
    types::{ChainFeedList, ChainFeeds, FeedEntry, FeedLookup},
};

/// Registry file name inside the data directory.
pub const FEED_REGISTRY_FILE: &str = "feeds.json";

/// File-backed feed registry.
#[derive(Debug, Clone)]
pub struct FeedRegistry {
    path: PathBuf,
}

/// One chain's feeds after parsing.
struct ChainGroup {
    chain: String,
    base_url: String,
    feeds: Vec<FeedEntry>,
}

impl FeedRegistry {
    /// Registry at `{data_dir}/feeds.json`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self { path: data_dir.as_ref().join(FEED_REGISTRY_FILE) }
    }

    /// Registry at an explicit file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the registry, keeping the file's chain order.
    async fn load(&self) -> Result<Vec<ChainGroup>> {
        let unavailable = |reason: String| AppError::CatalogUnavailable {
            source_key: FEED_REGISTRY_FILE.to_string(),
            reason,
        };

        let bytes = tokio::fs::read(&self.path).await.map_err(|e| unavailable(e.to_string()))?;
        let raw: Map<String, Value> =
            serde_json::from_slice(&bytes).map_err(|e| unavailable(e.to_string()))?;

        let mut chains = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let chain = key.to_lowercase();
            let group: ChainFeeds = serde_json::from_value(value)
                .map_err(|e| unavailable(format!("chain '{}': {}", key, e)))?;

            let feeds = group
                .feeds
                .iter()
                .filter_map(|record| {
                    let entry = FeedEntry::from_record(&chain, record);
                    if entry.is_none() {
                        warn!(
                            "Invalid proxy address {} for feed {}",
                            record.proxy_address, record.name
                        );
                    }
                    entry
                })
                .collect();
            chains.push(ChainGroup { chain, base_url: group.base_url, feeds });
        }

        debug!("Loaded feed registry with {} chains", chains.len());
        Ok(chains)
    }

    /// Look up feed proxy addresses by pair name.
    ///
    /// With `chain`, only that chain's feeds are searched. Without it, every
    /// chain is searched in registry order and the first chain holding a
    /// match wins for each pair.
    pub async fn find_feed_addresses(
        &self,
        pairs: &[String],
        chain: Option<&str>,
    ) -> Result<FeedLookup> {
        let registry = self.load().await?;

        let searched: Vec<&ChainGroup> = match chain.map(str::trim).filter(|c| !c.is_empty()) {
            Some(name) => {
                let wanted = name.to_lowercase();
                let group = registry
                    .iter()
                    .find(|group| group.chain == wanted)
                    .ok_or_else(|| AppError::UnsupportedChain(name.to_string()))?;
                vec![group]
            }
            None => registry.iter().collect(),
        };

        let (matches, unmatched) = match_terms(pairs, |pair| {
            let wanted = pair.to_lowercase();
            searched
                .iter()
                .find_map(|group| {
                    group.feeds.iter().find(|f| f.name.trim().to_lowercase() == wanted)
                })
                .cloned()
        });

        Ok(FeedLookup { matches, unmatched })
    }

    /// Every feed registered for `chain`.
    pub async fn list_feeds(&self, chain: &str) -> Result<ChainFeedList> {
        let wanted = chain.trim().to_lowercase();
        if wanted.is_empty() {
            return Err(AppError::InvalidArgument("chain cannot be empty".into()));
        }

        let group = self
            .load()
            .await?
            .into_iter()
            .find(|group| group.chain == wanted)
            .ok_or_else(|| AppError::UnsupportedChain(chain.trim().to_string()))?;

        Ok(ChainFeedList {
            chain: group.chain,
            base_url: group.base_url,
            count: group.feeds.len(),
            feeds: group.feeds,
        })
    }

    /// Chain keys present in the registry, in file order.
    pub async fn chains(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.into_iter().map(|group| group.chain).collect())
    }
}
