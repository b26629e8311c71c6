//! Type definitions module.
//!
//! Contains shared types used across the application.

pub mod feed;
pub mod pool;
pub mod token;

pub use feed::*;
pub use pool::*;
pub use token::*;
