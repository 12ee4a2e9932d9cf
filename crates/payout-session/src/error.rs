//! Session error types.

use payout_core::{CoreError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please enter a valid API token")]
    InvalidToken,

    #[error("Connection timeout. Please check your network.")]
    Timeout,

    #[error("Failed to connect to Deriv API. Please try again.")]
    ConnectionFailed(String),

    #[error("Connection closed unexpectedly")]
    UnexpectedClose { code: u16, reason: String },

    #[error("Invalid server response")]
    Parse(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Error-shaped reply from the trading API; the message is shown as-is.
    #[error("{message}")]
    Api {
        code: Option<String>,
        message: String,
    },

    #[error("Malformed statement: {0}")]
    Extract(#[from] CoreError),

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidToken => ErrorKind::Validation,
            Self::Api { .. } | Self::Extract(_) => ErrorKind::Upstream,
            Self::Timeout
            | Self::ConnectionFailed(_)
            | Self::UnexpectedClose { .. }
            | Self::Parse(_)
            | Self::SendFailed(_)
            | Self::Tungstenite(_) => ErrorKind::Transport,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
