//! Session protocol message types.

use payout_core::{DateWindow, RawTransaction, StatementPayload};
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

// ============================================================================
// Outgoing
// ============================================================================

/// `{"authorize": "<token>", "req_id": n}`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeRequest {
    pub authorize: String,
    pub req_id: u64,
}

/// `{"statement": 1, "description": 1, "date_from", "date_to", "req_id"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementRequest {
    pub statement: u8,
    pub description: u8,
    pub date_from: String,
    pub date_to: String,
    pub req_id: u64,
}

impl StatementRequest {
    pub fn new(window: &DateWindow, req_id: u64) -> Self {
        Self {
            statement: 1,
            description: 1,
            date_from: window.start_wire(),
            date_to: window.end_wire(),
            req_id,
        }
    }
}

/// A frame the session will write, tagged with the id it expects back.
#[derive(Clone)]
pub enum OutgoingMessage {
    Authorize(AuthorizeRequest),
    Statement(StatementRequest),
}

impl OutgoingMessage {
    pub fn req_id(&self) -> u64 {
        match self {
            Self::Authorize(r) => r.req_id,
            Self::Statement(r) => r.req_id,
        }
    }

    /// Label for logs. Never includes the payload.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Authorize(_) => "authorize",
            Self::Statement(_) => "statement",
        }
    }

    pub fn to_json(&self) -> SessionResult<String> {
        let json = match self {
            Self::Authorize(r) => serde_json::to_string(r),
            Self::Statement(r) => serde_json::to_string(r),
        };
        json.map_err(|e| SessionError::SendFailed(format!("serialize {}: {e}", self.label())))
    }
}

// The authorize payload carries the token; keep it out of debug output.
impl std::fmt::Debug for OutgoingMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authorize(r) => f
                .debug_struct("Authorize")
                .field("req_id", &r.req_id)
                .finish_non_exhaustive(),
            Self::Statement(r) => f.debug_tuple("Statement").field(r).finish(),
        }
    }
}

// ============================================================================
// Incoming
// ============================================================================

/// `error` object of a failed reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn into_error(self) -> SessionError {
        SessionError::Api {
            code: self.code,
            message: self
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Unknown error from Deriv API".to_string()),
        }
    }
}

/// One trading account listed in an authorize reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccountEntry {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub loginid: Option<String>,
}

/// `authorize` object of a successful reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorizeInfo {
    #[serde(default)]
    pub loginid: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub account_list: Vec<AccountEntry>,
}

/// Account details kept next to the token after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub currency: String,
    pub account_type: String,
    #[serde(default)]
    pub loginid: Option<String>,
}

impl AccountInfo {
    /// First listed account wins; falls back to the top-level currency,
    /// then to USD / "standard".
    pub fn from_authorize(info: &AuthorizeInfo) -> Self {
        let first = info.account_list.first();
        let currency = first
            .and_then(|a| a.currency.clone())
            .or_else(|| info.currency.clone())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| payout_core::DEFAULT_CURRENCY.to_string());
        let account_type = first
            .and_then(|a| a.account_type.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "standard".to_string());
        Self {
            currency,
            account_type,
            loginid: info.loginid.clone(),
        }
    }
}

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMessage {
    Authorized {
        req_id: Option<u64>,
        info: AuthorizeInfo,
    },
    Statement {
        req_id: Option<u64>,
        transactions: Vec<RawTransaction>,
    },
    Error {
        req_id: Option<u64>,
        error: ErrorBody,
    },
    /// Anything else (pings, unrelated subscriptions).
    Other { msg_type: Option<String> },
}

impl SessionMessage {
    /// Parse and classify a text frame.
    ///
    /// Classification is by field presence, in order: `error`, `authorize`,
    /// `statement`. A frame that is not a JSON object, or whose recognised
    /// field has the wrong shape, is a parse error.
    pub fn parse(text: &str) -> SessionResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| SessionError::Parse(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| SessionError::Parse("frame is not a JSON object".to_string()))?;

        let req_id = obj.get("req_id").and_then(|v| v.as_u64());

        if let Some(error) = obj.get("error").filter(|v| !v.is_null()) {
            let error: ErrorBody = serde_json::from_value(error.clone())
                .map_err(|e| SessionError::Parse(format!("error field: {e}")))?;
            return Ok(Self::Error { req_id, error });
        }

        if let Some(authorize) = obj.get("authorize").filter(|v| !v.is_null()) {
            let mut info: AuthorizeInfo = serde_json::from_value(authorize.clone())
                .map_err(|e| SessionError::Parse(format!("authorize field: {e}")))?;
            // Some deployments put account_list next to authorize, not inside it.
            if info.account_list.is_empty() {
                if let Some(list) = obj.get("account_list") {
                    info.account_list = serde_json::from_value(list.clone())
                        .map_err(|e| SessionError::Parse(format!("account_list: {e}")))?;
                }
            }
            return Ok(Self::Authorized { req_id, info });
        }

        if let Some(statement) = obj.get("statement").filter(|v| !v.is_null()) {
            let payload: StatementPayload = serde_json::from_value(statement.clone())
                .map_err(|e| SessionError::Parse(format!("statement field: {e}")))?;
            return Ok(Self::Statement {
                req_id,
                transactions: payload.into_transactions(),
            });
        }

        Ok(Self::Other {
            msg_type: obj
                .get("msg_type")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }

    pub fn req_id(&self) -> Option<u64> {
        match self {
            Self::Authorized { req_id, .. }
            | Self::Statement { req_id, .. }
            | Self::Error { req_id, .. } => *req_id,
            Self::Other { .. } => None,
        }
    }
}
