//! Stateless HTTP access to the trading account statement API.
//!
//! One POST per call, authenticated with the caller's bearer token. The
//! proxy depends on the `StatementSource` seam rather than on the client
//! directly, so handlers can be tested against `MockStatementSource`.

pub mod client;
pub mod error;
pub mod source;

pub use client::{StatementApiClient, DEFAULT_API_URL};
pub use error::{UpstreamError, UpstreamResult, DEFAULT_FAILURE_MESSAGE};
pub use source::{BoxFuture, MockStatementSource, StatementSource};
