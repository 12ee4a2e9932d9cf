//! HTTP client for the statement endpoint.
//!
//! `POST {api_url}/statement` with `Authorization: Bearer <token>` and
//! body `{statement: 1, description: 1, date_from, date_to}`. A success
//! response carries `{statement: {transactions: [...]}}`.

use std::time::{Duration, Instant};

use payout_core::{DateWindow, RawTransaction, StatementPayload, Token};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{UpstreamError, UpstreamResult, DEFAULT_FAILURE_MESSAGE};
use crate::source::{BoxFuture, StatementSource};

/// Production API base URL.
pub const DEFAULT_API_URL: &str = "https://api.deriv.com";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct StatementBody<'a> {
    statement: u8,
    description: u8,
    date_from: &'a str,
    date_to: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    statement: Option<StatementPayload>,
}

/// Client for the statement endpoint.
#[derive(Debug, Clone)]
pub struct StatementApiClient {
    client: Client,
    statement_url: String,
}

impl StatementApiClient {
    /// Create a client for `api_url` (e.g. "https://api.deriv.com").
    pub fn new(api_url: &str) -> UpstreamResult<Self> {
        Self::with_timeout(api_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_url: &str, timeout: Duration) -> UpstreamResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            statement_url: format!("{}/statement", api_url.trim_end_matches('/')),
        })
    }

    pub fn statement_url(&self) -> &str {
        &self.statement_url
    }

    /// Fetch the raw statement rows for `window`.
    pub async fn fetch_statement(
        &self,
        token: &Token,
        window: DateWindow,
    ) -> UpstreamResult<Vec<RawTransaction>> {
        let date_from = window.start_wire();
        let date_to = window.end_wire();
        let body = StatementBody {
            statement: 1,
            description: 1,
            date_from: &date_from,
            date_to: &date_to,
        };

        debug!(url = %self.statement_url, %window, "Requesting statement");
        let started = Instant::now();

        let response = self
            .client
            .post(&self.statement_url)
            .bearer_auth(token.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Statement request failed");
                UpstreamError::Transport(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Statement API returned failure");
            return Err(api_failure(status.as_u16(), &text));
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| UpstreamError::Parse(format!("Failed to parse response: {e}")))?;

        // Error-shaped body under a 2xx status.
        if value.get("error").is_some_and(|e| !e.is_null()) {
            warn!("Statement API returned error body with success status");
            return Err(UpstreamError::Api {
                status: 500,
                message: error_message(&value),
                details: Some(value),
            });
        }

        let parsed: StatementResponse = serde_json::from_value(value)
            .map_err(|e| UpstreamError::Parse(format!("Unexpected statement shape: {e}")))?;
        let payload = parsed
            .statement
            .ok_or_else(|| UpstreamError::Parse("response has no statement".to_string()))?;
        let transactions = payload.into_transactions();

        info!(
            rows = transactions.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Statement received"
        );
        Ok(transactions)
    }
}

impl StatementSource for StatementApiClient {
    fn fetch_statement<'a>(
        &'a self,
        token: &'a Token,
        window: DateWindow,
    ) -> BoxFuture<'a, UpstreamResult<Vec<RawTransaction>>> {
        Box::pin(StatementApiClient::fetch_statement(self, token, window))
    }
}

/// Build the failure for a non-2xx response. Non-JSON bodies are kept as
/// text in `details`.
fn api_failure(status: u16, body: &str) -> UpstreamError {
    let details = match serde_json::from_str::<Value>(body) {
        Ok(value) => Some(value),
        Err(_) if body.trim().is_empty() => None,
        Err(_) => Some(Value::String(body.to_string())),
    };
    let message = details
        .as_ref()
        .map(error_message)
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
    UpstreamError::Api {
        status,
        message,
        details,
    }
}

/// `error.message` from an upstream body, or the default.
fn error_message(body: &Value) -> String {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_FAILURE_MESSAGE)
        .to_string()
}
