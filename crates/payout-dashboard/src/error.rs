//! Dashboard error types.

use chrono::NaiveDate;
use payout_core::ErrorKind;
use thiserror::Error;

use crate::fetcher::FetchError;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("End date {end} cannot be after today ({today})")]
    EndInFuture { end: NaiveDate, today: NaiveDate },

    #[error("Start date {start} cannot be after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("Unknown date range: {0}")]
    UnknownRange(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EndInFuture { .. } | Self::StartAfterEnd { .. } | Self::UnknownRange(_) => {
                ErrorKind::Validation
            }
            Self::Fetch(e) => e.kind,
            Self::HttpClient(_) | Self::Storage(_) | Self::Json(_) | Self::Io(_) => {
                ErrorKind::Internal
            }
        }
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;
