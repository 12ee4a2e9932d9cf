//! Proxy error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use payout_core::{CoreError, ErrorKind};
use payout_upstream::UpstreamError;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use crate::types::ApiFailure;

/// A failed commission request. Rendered as the JSON failure envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required field")]
    MissingToken,

    #[error("Invalid date format")]
    InvalidDate(String),

    #[error("Invalid date range")]
    InvalidRange(String),

    /// Body is not JSON, or has the wrong shape.
    #[error("Invalid request body")]
    InvalidBody(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The statement arrived but a commission row is malformed.
    #[error("{0}")]
    Statement(CoreError),

    #[error("Internal server error")]
    Internal(Option<String>),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::EmptyToken => Self::MissingToken,
            CoreError::InvalidDate(value) => Self::InvalidDate(value),
            CoreError::InvalidRange { start, end } => {
                Self::InvalidRange(format!("date_from {start} is after date_to {end}"))
            }
            other => Self::Statement(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken
            | Self::InvalidDate(_)
            | Self::InvalidRange(_)
            | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(e) => {
                StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Statement(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingToken
            | Self::InvalidDate(_)
            | Self::InvalidRange(_)
            | Self::InvalidBody(_) => ErrorKind::Validation,
            Self::Upstream(e) => e.kind(),
            Self::Statement(e) => e.kind(),
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::MissingToken => Some(Value::from("API token is required")),
            Self::InvalidDate(_) => Some(Value::from("Use YYYY-MM-DD format for dates")),
            Self::InvalidRange(detail) | Self::InvalidBody(detail) => {
                Some(Value::from(detail.as_str()))
            }
            Self::Upstream(e) => e.details().cloned(),
            Self::Statement(_) => None,
            Self::Internal(detail) => detail.as_deref().map(Value::from),
        }
    }

    pub fn into_failure(self) -> (StatusCode, ApiFailure) {
        let status = self.status();
        let details = self.details();
        (status, ApiFailure::new(self.to_string(), details))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.kind() {
            ErrorKind::Validation => warn!(error = %self, "Rejected commission request"),
            _ => error!(error = %self, status = self.status().as_u16(), "Commission request failed"),
        }
        let (status, body) = self.into_failure();
        (status, Json(body)).into_response()
    }
}

/// Server startup failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid allowed origin: {0}")]
    InvalidOrigin(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
