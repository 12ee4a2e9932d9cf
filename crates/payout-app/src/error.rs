//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session error: {0}")]
    Session(#[from] payout_session::SessionError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] payout_upstream::UpstreamError),

    #[error("Server error: {0}")]
    Server(#[from] payout_proxy::ServerError),

    #[error(transparent)]
    Dashboard(#[from] payout_dashboard::DashboardError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] payout_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
