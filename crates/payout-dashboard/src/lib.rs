//! Commission dashboard: view state, date ranges, session and rendering.
//!
//! The controller is transport-agnostic. It asks a `CommissionFetcher`
//! for reports, which is either the WebSocket `StatementClient` or a
//! `ProxyFetcher` talking to the HTTP proxy.
//!
//! ```text
//!   SessionContext ──token──┐
//!                           ▼
//!   RangeSelection ──▶ DashboardController ──▶ CommissionFetcher
//!                           │                   (socket | proxy)
//!                           ▼
//!                       ViewState ──▶ render
//! ```

pub mod controller;
pub mod error;
pub mod fetcher;
pub mod range;
pub mod render;
pub mod session;

pub use controller::{DashboardController, FetchTicket, ViewState};
pub use error::{DashboardError, DashboardResult};
pub use fetcher::{
    BoxFuture, CommissionFetcher, FetchError, MockFetcher, ProxyFetcher, TokenVerifier,
};
pub use range::{RangePreset, RangeSelection};
pub use render::{format_amount, render_view};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionContext, SessionStore};
