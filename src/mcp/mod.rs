//! MCP server module.
//!
//! Contains the MCP server implementation with tool handlers.

pub mod server;

pub use server::ChainDataServer;
pub use server::{
    GetFeedAddressesInput, GetPoolsInput, GetTokensBySymbolInput, ListFeedsForChainInput,
};
