//! Statement source seam.

use std::pin::Pin;

use parking_lot::Mutex;
use payout_core::{DateWindow, RawTransaction, Token};
use serde_json::Value;

use crate::error::{UpstreamError, UpstreamResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Anything that can produce statement rows for a token and window.
pub trait StatementSource: Send + Sync {
    fn fetch_statement<'a>(
        &'a self,
        token: &'a Token,
        window: DateWindow,
    ) -> BoxFuture<'a, UpstreamResult<Vec<RawTransaction>>>;
}

/// Canned reply for `MockStatementSource`.
#[derive(Debug, Clone)]
enum MockReply {
    Rows(Vec<RawTransaction>),
    Api {
        status: u16,
        message: String,
        details: Option<Value>,
    },
    Transport(String),
}

/// Mock statement source for testing.
#[derive(Debug)]
pub struct MockStatementSource {
    reply: Mutex<MockReply>,
    /// (token, window) of every call.
    calls: Mutex<Vec<(String, DateWindow)>>,
}

impl Default for MockStatementSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStatementSource {
    /// A source that returns an empty statement.
    pub fn new() -> Self {
        Self {
            reply: Mutex::new(MockReply::Rows(Vec::new())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_rows(rows: Vec<RawTransaction>) -> Self {
        let source = Self::new();
        source.set_rows(rows);
        source
    }

    pub fn set_rows(&self, rows: Vec<RawTransaction>) {
        *self.reply.lock() = MockReply::Rows(rows);
    }

    pub fn set_api_error(&self, status: u16, message: &str, details: Option<Value>) {
        *self.reply.lock() = MockReply::Api {
            status,
            message: message.to_string(),
            details,
        };
    }

    pub fn set_transport_error(&self, detail: &str) {
        *self.reply.lock() = MockReply::Transport(detail.to_string());
    }

    /// Recorded calls as (token, window).
    pub fn calls(&self) -> Vec<(String, DateWindow)> {
        self.calls.lock().clone()
    }
}

impl StatementSource for MockStatementSource {
    fn fetch_statement<'a>(
        &'a self,
        token: &'a Token,
        window: DateWindow,
    ) -> BoxFuture<'a, UpstreamResult<Vec<RawTransaction>>> {
        Box::pin(async move {
            self.calls.lock().push((token.expose().to_string(), window));
            match self.reply.lock().clone() {
                MockReply::Rows(rows) => Ok(rows),
                MockReply::Api {
                    status,
                    message,
                    details,
                } => Err(UpstreamError::Api {
                    status,
                    message,
                    details,
                }),
                MockReply::Transport(detail) => Err(UpstreamError::Transport(detail)),
            }
        })
    }
}
