//! Business logic services module.

pub mod feed_registry;
pub mod pools;
pub mod retry;
pub mod token_catalog;

pub use feed_registry::{FeedRegistry, FEED_REGISTRY_FILE};
pub use pools::{HttpSubgraphTransport, PoolService, SubgraphTransport, MIN_TVL_USD};
pub use retry::RetryPolicy;
pub use token_catalog::{TokenCatalog, DEFAULT_TOKEN_LIST};

/// Placeholder for a blank query term in an unmatched list.
const BLANK_TERM: &str = "<empty>";

/// Match each query term with `find`, preserving input order.
///
/// Blank terms never match and are reported as `<empty>`. Returns the matches
/// and the comma-joined list of terms that found nothing, `None` when every
/// term matched.
pub(crate) fn match_terms<T>(
    terms: &[String],
    mut find: impl FnMut(&str) -> Option<T>,
) -> (Vec<T>, Option<String>) {
    let mut matches = Vec::new();
    let mut unmatched = Vec::new();

    for term in terms {
        let needle = term.trim();
        if needle.is_empty() {
            unmatched.push(BLANK_TERM.to_string());
            continue;
        }
        match find(needle) {
            Some(item) => matches.push(item),
            None => unmatched.push(needle.to_string()),
        }
    }

    let unmatched = if unmatched.is_empty() { None } else { Some(unmatched.join(", ")) };
    (matches, unmatched)
}
