//! Upstream error types.

use payout_core::ErrorKind;
use serde_json::Value;
use thiserror::Error;

/// Message used when the upstream gives no usable error text.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Failed to fetch commission data";

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The API answered with a failure (non-2xx, or an error-shaped body).
    #[error("{message}")]
    Api {
        status: u16,
        message: String,
        /// Upstream response body, when there was one.
        details: Option<Value>,
    },

    /// No response: connection refused, DNS, TLS, timeout.
    #[error("Failed to fetch commission data")]
    Transport(String),

    /// A 2xx body that is not a statement response.
    #[error("Failed to fetch commission data")]
    Parse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl UpstreamError {
    /// HTTP status to surface to callers. Upstream statuses pass through;
    /// everything else is a 500.
    pub fn status(&self) -> u16 {
        match self {
            Self::Api { status, .. } => *status,
            _ => 500,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Api { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { .. } => ErrorKind::Upstream,
            Self::Transport(_) | Self::Parse(_) => ErrorKind::Transport,
            Self::HttpClient(_) => ErrorKind::Internal,
        }
    }
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;
