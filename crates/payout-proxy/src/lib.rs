//! payout-proxy - HTTP front for the statement API.
//!
//! Validates a commission request, forwards it to the statement API with
//! the caller's bearer token, extracts commissions and answers with a JSON
//! envelope. Every path, including panics, produces a JSON response.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  axum HTTP Server (port 5000)                 │
//! │  GET  /                     → health                          │
//! │  POST /api/deriv-commissions → commissions (alias /commissions)│
//! │  GET  /metrics              → Prometheus text                 │
//! │                                                              │
//! │  CorsLayer ─ CatchPanicLayer ─ request metrics                │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ StatementSource (Arc<dyn>)
//!                                ▼
//!              StatementApiClient ── POST {api_url}/statement
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use payout_proxy::{ProxyConfig, ProxyState, run_server};
//!
//! let source = Arc::new(StatementApiClient::new("https://api.deriv.com")?);
//! let state = ProxyState::new(source, ProxyConfig::default());
//! run_server(state, CancellationToken::new()).await?;
//! ```

mod config;
mod error;
mod server;
mod types;

pub use config::ProxyConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use server::{create_router, run_server, serve, ProxyState, COMMISSIONS_ROUTE};
pub use types::{ApiFailure, ApiSuccess, CommissionRequest, HealthResponse};
