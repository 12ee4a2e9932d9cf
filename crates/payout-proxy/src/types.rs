//! Proxy API types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/deriv-commissions`.
///
/// Everything is optional at this layer so that a missing token is
/// reported as a validation failure rather than a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommissionRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
}

impl CommissionRequest {
    /// Empty strings count as absent.
    pub fn date_from(&self) -> Option<&str> {
        self.date_from.as_deref().filter(|s| !s.is_empty())
    }

    pub fn date_to(&self) -> Option<&str> {
        self.date_to.as_deref().filter(|s| !s.is_empty())
    }
}

/// `{success: true, data}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiSuccess<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{success: false, error, details}`; `details` is `null` when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFailure {
    pub success: bool,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiFailure {
    pub fn new(error: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details,
        }
    }
}

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// RFC3339.
    pub timestamp: String,
}
