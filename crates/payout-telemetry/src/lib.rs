//! Prometheus metrics and structured logging for the payout services.
//!
//! - Structured logging with tracing (pretty in development, JSON in production)
//! - Prometheus counters and histograms for proxy requests, upstream latency,
//!   session outcomes and extracted commissions
//! - Text exposition for the `/metrics` endpoint

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, is_development, is_production, RuntimeEnv};
pub use metrics::Metrics;
