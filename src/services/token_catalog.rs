//! Token catalog backed by token list files.
//!
//! Each lookup reads `{data_dir}/{list}.{chain_id}.json` in full. Nothing is
//! cached, so results always reflect the file currently on disk.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    chains::{resolve_chain_or_default, ChainInfo},
    error::{AppError, Result},
    services::match_terms,
    types::{TokenEntry, TokenList, TokenLookup},
};

/// Token list used when the caller does not name one.
pub const DEFAULT_TOKEN_LIST: &str = "Coingecko";

/// File-backed token catalog.
#[derive(Debug, Clone)]
pub struct TokenCatalog {
    data_dir: PathBuf,
}

impl TokenCatalog {
    /// Create a catalog reading token lists from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    /// Directory the catalog reads from.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Source key for a list on a chain, e.g. `Coingecko.1`.
    pub fn source_key(list_name: &str, chain_id: u64) -> String {
        format!("{}.{}", list_name, chain_id)
    }

    /// Load every entry of `list_name` for `chain_id`.
    ///
    /// Entries belonging to another chain or carrying an invalid address are
    /// skipped.
    pub async fn load(&self, list_name: &str, chain_id: u64) -> Result<Vec<TokenEntry>> {
        validate_list_name(list_name)?;

        let key = Self::source_key(list_name, chain_id);
        let path = self.data_dir.join(format!("{}.json", key));
        debug!(path = %path.display(), "Reading token list");

        let bytes = tokio::fs::read(&path).await.map_err(|e| AppError::CatalogUnavailable {
            source_key: key.clone(),
            reason: e.to_string(),
        })?;

        let list: TokenList = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::CatalogUnavailable { source_key: key.clone(), reason: e.to_string() }
        })?;

        let mut entries = Vec::with_capacity(list.tokens.len());
        for token in list.tokens {
            // Only include tokens for our target chain
            if token.chain_id != chain_id {
                continue;
            }

            let address = token.address.clone();
            match TokenEntry::from_list_token(token) {
                Some(entry) => entries.push(entry),
                None => warn!("Invalid token address {} in {}", address, key),
            }
        }

        debug!("Loaded {} tokens from {} ({})", entries.len(), key, list.name);
        Ok(entries)
    }

    /// Look up tokens by symbol.
    ///
    /// # Arguments
    /// * `symbols` - Query terms, matched case-insensitively against entry symbols
    /// * `chain` - Chain name (default "Ethereum")
    /// * `list_name` - Token list name (default "Coingecko")
    ///
    /// # Errors
    /// `UnsupportedChain` before any read when the chain is unknown,
    /// `CatalogUnavailable` when the list cannot be read or parsed.
    pub async fn find_by_symbols(
        &self,
        symbols: &[String],
        chain: Option<&str>,
        list_name: Option<&str>,
    ) -> Result<TokenLookup> {
        let chain: &ChainInfo = resolve_chain_or_default(chain)?;
        let list_name =
            list_name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(DEFAULT_TOKEN_LIST);

        let entries = self.load(list_name, chain.chain_id).await?;

        // First match in file order wins.
        let (matches, unmatched) = match_terms(symbols, |term| {
            let wanted = term.to_lowercase();
            entries.iter().find(|entry| entry.symbol.trim().to_lowercase() == wanted).cloned()
        });

        Ok(TokenLookup { matches, unmatched })
    }
}

/// List names become file names, so only a conservative character set is allowed.
fn validate_list_name(list_name: &str) -> Result<()> {
    let valid = !list_name.is_empty()
        && list_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!("Invalid token list name: '{}'", list_name)))
    }
}
