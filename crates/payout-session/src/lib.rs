//! WebSocket statement client for the trading API.
//!
//! One call opens a connection, authorizes with the token, requests a
//! statement for a date window, and closes. Provides:
//! - An explicit session state machine (`SessionMachine`) that owns
//!   request-id correlation and phase ordering
//! - A single deadline covering connect, authorize and statement
//! - Guaranteed close on every exit path

pub mod client;
pub mod error;
pub mod machine;
pub mod message;

pub use client::{SessionConfig, StatementClient};
pub use error::{SessionError, SessionResult};
pub use machine::{RequestIds, SessionGoal, SessionMachine, SessionOutcome, SessionPhase, Step};
pub use message::{
    AccountEntry, AccountInfo, AuthorizeInfo, AuthorizeRequest, ErrorBody, OutgoingMessage,
    SessionMessage, StatementRequest,
};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
