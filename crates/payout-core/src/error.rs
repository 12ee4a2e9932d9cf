//! Error types for payout-core.

use thiserror::Error;

/// Failure category shared across the workspace.
///
/// Every crate error maps onto one of these so the outer surfaces (proxy
/// envelope, dashboard error panel) can decide status codes and wording
/// without knowing the concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad caller input (missing token, malformed date). Never retried.
    Validation,
    /// The trading API answered with an error or a malformed payload.
    Upstream,
    /// Connection failure, timeout, unexpected close, unparseable frame.
    Transport,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Stable lowercase label, used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Upstream => "upstream",
            Self::Transport => "transport",
            Self::Internal => "internal",
        }
    }
}

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Token must not be empty")]
    EmptyToken,

    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Invalid amount '{value}' on transaction {reference}")]
    InvalidAmount { reference: String, value: String },

    #[error("Missing field '{field}' on transaction {reference}")]
    MissingField {
        reference: String,
        field: &'static str,
    },

    #[error("Invalid transaction time '{value}' on transaction {reference}")]
    InvalidTimestamp { reference: String, value: String },

    #[error("Commission total over {count} transactions is out of range")]
    TotalOverflow { count: usize },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyToken | Self::InvalidDate(_) | Self::InvalidRange { .. } => {
                ErrorKind::Validation
            }
            // Malformed statement rows come from the trading API.
            Self::InvalidAmount { .. }
            | Self::MissingField { .. }
            | Self::InvalidTimestamp { .. }
            | Self::TotalOverflow { .. } => ErrorKind::Upstream,
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
