//! Session state machine.
//!
//! Pure protocol logic, no I/O. The client feeds it transport events
//! (open, text frame, close, timeout) and performs whatever `Step` it
//! returns. Phases only move forward:
//!
//! ```text
//! Connecting ──open──▶ Authorizing ──authorize ok──▶ RequestingStatement ──statement──▶ Done
//!      │                    │   (Verify goal) ───────────────────────────────────────▶ Done
//!      └────────────────────┴──── error / close / timeout / bad frame ───────────────▶ Failed
//! ```
//!
//! Once `Done` or `Failed`, every further event is ignored, so a late or
//! duplicate frame can never produce a second outcome.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use payout_core::{extract_commissions, CommissionReport, DateWindow, Token};
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::message::{AccountInfo, AuthorizeRequest, OutgoingMessage, SessionMessage, StatementRequest};

/// Source of distinct, increasing request ids.
#[derive(Debug, Default)]
pub struct RequestIds {
    last: AtomicU64,
}

impl RequestIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id, starting at 1.
    pub fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Authorizing,
    RequestingStatement,
    Done,
    Failed,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// What the session is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionGoal {
    /// Authorize only (login check).
    Verify,
    /// Authorize, then fetch and extract a statement.
    Statement(DateWindow),
}

/// Successful result of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Verified(AccountInfo),
    Statement {
        account: AccountInfo,
        report: CommissionReport,
    },
}

/// Action requested by the machine.
#[derive(Debug)]
pub enum Step {
    /// Write this frame.
    Send(OutgoingMessage),
    /// Terminal success; close the connection.
    Finished(SessionOutcome),
    /// Terminal failure; close the connection.
    Failed(SessionError),
    /// Nothing to do.
    Ignore,
}

/// Protocol state for one session.
pub struct SessionMachine {
    goal: SessionGoal,
    phase: SessionPhase,
    ids: Arc<RequestIds>,
    /// Id of the request we are waiting on.
    pending: Option<u64>,
    account: Option<AccountInfo>,
}

impl SessionMachine {
    pub fn new(goal: SessionGoal, ids: Arc<RequestIds>) -> Self {
        Self {
            goal,
            phase: SessionPhase::Connecting,
            ids,
            pending: None,
            account: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Id of the outstanding request, if any.
    pub fn pending_req_id(&self) -> Option<u64> {
        self.pending
    }

    /// Connection is ready: send the authorization.
    pub fn on_open(&mut self, token: &Token) -> Step {
        if self.phase != SessionPhase::Connecting {
            return Step::Ignore;
        }
        let req_id = self.ids.next_id();
        self.pending = Some(req_id);
        self.phase = SessionPhase::Authorizing;
        Step::Send(OutgoingMessage::Authorize(AuthorizeRequest {
            authorize: token.expose().to_string(),
            req_id,
        }))
    }

    /// A text frame arrived.
    pub fn on_text(&mut self, text: &str) -> Step {
        if self.is_terminal() {
            debug!(phase = ?self.phase, "Ignoring frame after session end");
            return Step::Ignore;
        }
        match SessionMessage::parse(text) {
            Ok(msg) => self.on_message(msg),
            Err(e) => self.fail(e),
        }
    }

    /// A classified frame arrived.
    pub fn on_message(&mut self, msg: SessionMessage) -> Step {
        if self.is_terminal() {
            return Step::Ignore;
        }

        match msg {
            SessionMessage::Error { req_id, error } => {
                debug!(?req_id, code = ?error.code, "Error reply from upstream");
                self.fail(error.into_error())
            }
            SessionMessage::Authorized { req_id, info } => {
                if self.phase != SessionPhase::Authorizing || !self.is_pending(req_id) {
                    warn!(?req_id, phase = ?self.phase, "Ignoring unexpected authorize reply");
                    return Step::Ignore;
                }
                let account = AccountInfo::from_authorize(&info);
                match self.goal {
                    SessionGoal::Verify => self.finish(SessionOutcome::Verified(account)),
                    SessionGoal::Statement(window) => {
                        self.account = Some(account);
                        let req_id = self.ids.next_id();
                        self.pending = Some(req_id);
                        self.phase = SessionPhase::RequestingStatement;
                        Step::Send(OutgoingMessage::Statement(StatementRequest::new(
                            &window, req_id,
                        )))
                    }
                }
            }
            SessionMessage::Statement {
                req_id,
                transactions,
            } => {
                let SessionGoal::Statement(window) = self.goal else {
                    return Step::Ignore;
                };
                if self.phase != SessionPhase::RequestingStatement || !self.is_pending(req_id) {
                    warn!(?req_id, phase = ?self.phase, "Ignoring unexpected statement reply");
                    return Step::Ignore;
                }
                match extract_commissions(&transactions, window) {
                    Ok(report) => {
                        let account = self.account.take().unwrap_or_else(|| {
                            AccountInfo::from_authorize(&Default::default())
                        });
                        self.finish(SessionOutcome::Statement { account, report })
                    }
                    Err(e) => self.fail(SessionError::Extract(e)),
                }
            }
            SessionMessage::Other { msg_type } => {
                debug!(?msg_type, "Ignoring unrelated frame");
                Step::Ignore
            }
        }
    }

    /// The peer closed (or the stream ended) before a terminal frame.
    pub fn on_close(&mut self, code: u16, reason: String) -> SessionError {
        self.phase = SessionPhase::Failed;
        SessionError::UnexpectedClose { code, reason }
    }

    /// The deadline passed before a terminal frame.
    pub fn on_timeout(&mut self) -> SessionError {
        self.phase = SessionPhase::Failed;
        SessionError::Timeout
    }

    /// Transport-level failure.
    pub fn on_transport_error(&mut self, detail: String) -> SessionError {
        self.phase = SessionPhase::Failed;
        SessionError::ConnectionFailed(detail)
    }

    /// Replies without a `req_id` are accepted; otherwise it must match.
    fn is_pending(&self, req_id: Option<u64>) -> bool {
        req_id.map_or(true, |id| Some(id) == self.pending)
    }

    fn finish(&mut self, outcome: SessionOutcome) -> Step {
        self.phase = SessionPhase::Done;
        self.pending = None;
        Step::Finished(outcome)
    }

    fn fail(&mut self, error: SessionError) -> Step {
        self.phase = SessionPhase::Failed;
        self.pending = None;
        Step::Failed(error)
    }
}
