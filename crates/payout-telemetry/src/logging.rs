//! Structured logging initialization.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Deployment mode, read from `PAYOUT_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Development,
    Production,
    /// Unset or unrecognised.
    Default,
}

impl RuntimeEnv {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("PAYOUT_ENV").ok().as_deref())
    }

    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("development") => Self::Development,
            Some("production") => Self::Production,
            _ => Self::Default,
        }
    }
}

pub fn is_production() -> bool {
    RuntimeEnv::from_env() == RuntimeEnv::Production
}

pub fn is_development() -> bool {
    RuntimeEnv::from_env() == RuntimeEnv::Development
}

/// Initialize structured logging.
///
/// `RUST_LOG` wins when set; otherwise `level` applies globally with
/// debug output from the payout crates. JSON output in production,
/// pretty output otherwise. Both write to stderr.
pub fn init_logging(level: &str) -> TelemetryResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level)))
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    let result = if is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty().with_target(true).with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn default_directive(level: &str) -> String {
    // Quiet levels apply everywhere; otherwise our crates log at debug.
    match level {
        "error" | "warn" => level.to_string(),
        _ => format!("{level},payout=debug"),
    }
}
