//! Per-client sessions for the HTTP transport.

pub mod binding;
pub mod manager;
pub mod message;

pub use binding::SessionBinding;
pub use manager::{CloseReason, Routed, Session, SessionManager, SESSION_ID_HEADER};
pub use message::validate_client_message;
