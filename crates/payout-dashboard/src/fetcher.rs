//! Fetcher seams: where reports and account checks come from.
//!
//! Two production implementations:
//! - `StatementClient` (session variant) talks to the trading API directly
//! - `ProxyFetcher` posts to the HTTP proxy
//!
//! `MockFetcher` scripts both traits for tests.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use parking_lot::Mutex;
use payout_core::{CommissionReport, DateWindow, ErrorKind, Token};
use payout_session::{AccountInfo, SessionError, StatementClient};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{DashboardError, DashboardResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// A failed fetch as the view sees it: a category and a message to show
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Only transport failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transport
    }
}

impl From<SessionError> for FetchError {
    fn from(e: SessionError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

/// Source of commission reports.
pub trait CommissionFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        token: &'a Token,
        window: DateWindow,
    ) -> BoxFuture<'a, Result<CommissionReport, FetchError>>;

    /// Label for metrics and logs.
    fn transport(&self) -> &'static str;
}

/// Checks a token and returns its account.
pub trait TokenVerifier: Send + Sync {
    fn verify<'a>(&'a self, token: &'a Token) -> BoxFuture<'a, Result<AccountInfo, FetchError>>;
}

impl CommissionFetcher for StatementClient {
    fn fetch<'a>(
        &'a self,
        token: &'a Token,
        window: DateWindow,
    ) -> BoxFuture<'a, Result<CommissionReport, FetchError>> {
        Box::pin(async move {
            self.fetch_commissions(token, window)
                .await
                .map_err(FetchError::from)
        })
    }

    fn transport(&self) -> &'static str {
        "socket"
    }
}

impl TokenVerifier for StatementClient {
    fn verify<'a>(&'a self, token: &'a Token) -> BoxFuture<'a, Result<AccountInfo, FetchError>> {
        Box::pin(async move { self.verify_token(token).await.map_err(FetchError::from) })
    }
}

// ============================================================================
// Proxy variant
// ============================================================================

/// Fallback when the proxy answers with a failure but no message.
const PROXY_FAILURE_MESSAGE: &str = "Failed to fetch data";

#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    token: &'a str,
    date_from: String,
    date_to: String,
}

#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    #[serde(default)]
    data: Option<CommissionReport>,
    #[serde(default)]
    error: Option<String>,
}

/// Fetches reports through the HTTP proxy.
#[derive(Debug, Clone)]
pub struct ProxyFetcher {
    client: Client,
    url: String,
}

impl ProxyFetcher {
    /// `url` is the full commissions endpoint, e.g.
    /// `http://localhost:5000/api/deriv-commissions`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> DashboardResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, token: &Token, window: DateWindow) -> Result<CommissionReport, FetchError> {
        let body = ProxyRequest {
            token: token.expose(),
            date_from: window.start_wire(),
            date_to: window.end_wire(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url = %self.url, "Proxy request failed");
                FetchError::new(
                    ErrorKind::Transport,
                    "Failed to connect to the commission service. Please try again.",
                )
            })?;

        let status = response.status();
        let envelope = response.json::<ProxyEnvelope>().await;
        debug!(status = status.as_u16(), "Proxy responded");

        if !status.is_success() {
            let message = envelope
                .ok()
                .and_then(|e| e.error)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| PROXY_FAILURE_MESSAGE.to_string());
            let kind = if status == StatusCode::BAD_REQUEST {
                ErrorKind::Validation
            } else {
                ErrorKind::Upstream
            };
            return Err(FetchError::new(kind, message));
        }

        // Decoding the report recomputes its summary and checks its window.
        let invalid = || FetchError::new(ErrorKind::Transport, "Invalid server response");
        envelope
            .map_err(|e| {
                warn!(error = %e, "Undecodable proxy response");
                invalid()
            })?
            .data
            .ok_or_else(invalid)
    }
}

impl CommissionFetcher for ProxyFetcher {
    fn fetch<'a>(
        &'a self,
        token: &'a Token,
        window: DateWindow,
    ) -> BoxFuture<'a, Result<CommissionReport, FetchError>> {
        Box::pin(self.post(token, window))
    }

    fn transport(&self) -> &'static str {
        "proxy"
    }
}

// ============================================================================
// Mock
// ============================================================================

/// Mock fetcher for testing.
///
/// Replies are consumed in order; when the script runs out, fetches
/// return an empty report and verifications a default account.
#[derive(Debug, Default)]
pub struct MockFetcher {
    reports: Mutex<VecDeque<Result<CommissionReport, FetchError>>>,
    accounts: Mutex<VecDeque<Result<AccountInfo, FetchError>>>,
    /// Windows requested, in call order.
    calls: Mutex<Vec<DateWindow>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_report(&self, result: Result<CommissionReport, FetchError>) {
        self.reports.lock().push_back(result);
    }

    pub fn push_account(&self, result: Result<AccountInfo, FetchError>) {
        self.accounts.lock().push_back(result);
    }

    pub fn calls(&self) -> Vec<DateWindow> {
        self.calls.lock().clone()
    }
}

impl CommissionFetcher for MockFetcher {
    fn fetch<'a>(
        &'a self,
        _token: &'a Token,
        window: DateWindow,
    ) -> BoxFuture<'a, Result<CommissionReport, FetchError>> {
        Box::pin(async move {
            self.calls.lock().push(window);
            let next = self.reports.lock().pop_front();
            next.unwrap_or_else(|| Ok(CommissionReport::empty(window)))
        })
    }

    fn transport(&self) -> &'static str {
        "mock"
    }
}

impl TokenVerifier for MockFetcher {
    fn verify<'a>(&'a self, _token: &'a Token) -> BoxFuture<'a, Result<AccountInfo, FetchError>> {
        Box::pin(async move {
            let next = self.accounts.lock().pop_front();
            next.unwrap_or_else(|| {
                Ok(AccountInfo {
                    currency: "USD".to_string(),
                    account_type: "standard".to_string(),
                    loginid: None,
                })
            })
        })
    }
}
