//! Statement client over a WebSocket session.
//!
//! Each call opens its own connection and drives a `SessionMachine` to a
//! terminal state. One deadline, armed before connecting, bounds the
//! whole exchange; the connection is closed on every exit path.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use payout_core::{CommissionReport, DateWindow, Token};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};
use crate::machine::{RequestIds, SessionGoal, SessionMachine, SessionOutcome, Step};
use crate::message::{AccountInfo, OutgoingMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on the close handshake after a terminal event.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Session client configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Deadline for the whole exchange, from connect to terminal reply.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "wss://ws.binaryws.com/websockets/v3?app_id=1089".to_string(),
            timeout: Duration::from_secs(8),
        }
    }
}

/// Statement client (session-oriented variant).
pub struct StatementClient {
    config: SessionConfig,
    ids: Arc<RequestIds>,
}

impl StatementClient {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            ids: Arc::new(RequestIds::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Authorize, fetch the statement for `window`, and extract commissions.
    pub async fn fetch_commissions(
        &self,
        token: &Token,
        window: DateWindow,
    ) -> SessionResult<CommissionReport> {
        match self.run(token, SessionGoal::Statement(window)).await? {
            SessionOutcome::Statement { report, .. } => {
                info!(
                    count = report.summary.count(),
                    window = %window,
                    "Commission statement received"
                );
                Ok(report)
            }
            SessionOutcome::Verified(_) => Err(SessionError::Parse(
                "session ended without a statement".to_string(),
            )),
        }
    }

    /// Authorize only; returns the account the token belongs to.
    pub async fn verify_token(&self, token: &Token) -> SessionResult<AccountInfo> {
        match self.run(token, SessionGoal::Verify).await? {
            SessionOutcome::Verified(account) => {
                info!(currency = %account.currency, account_type = %account.account_type, "Token verified");
                Ok(account)
            }
            SessionOutcome::Statement { account, .. } => Ok(account),
        }
    }

    /// Validate a raw token, then verify it. A blank token fails without
    /// opening a connection.
    pub async fn login(&self, raw: &str) -> SessionResult<(Token, AccountInfo)> {
        let token = Token::new(raw).map_err(|_| SessionError::InvalidToken)?;
        let account = self.verify_token(&token).await?;
        Ok((token, account))
    }

    async fn run(&self, token: &Token, goal: SessionGoal) -> SessionResult<SessionOutcome> {
        let deadline = Instant::now() + self.config.timeout;
        let mut machine = SessionMachine::new(goal, self.ids.clone());

        debug!(url = %self.config.url, "Opening session");
        // disable_nagle: small request/response frames
        let connect = connect_async_tls_with_config(&self.config.url, None, true, None);
        let connected = timeout_at(deadline, connect).await;
        let mut ws = match connected {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => {
                warn!(error = %e, "Session connect failed");
                return Err(machine.on_transport_error(e.to_string()));
            }
            Err(_) => {
                warn!("Session connect timed out");
                return Err(machine.on_timeout());
            }
        };

        let exchanged = timeout_at(deadline, drive(&mut ws, &mut machine, token)).await;
        let result = match exchanged {
            Ok(result) => result,
            Err(_) => {
                warn!(phase = ?machine.phase(), "Session timed out");
                Err(machine.on_timeout())
            }
        };

        close(&mut ws).await;
        result
    }
}

/// Run the exchange until the machine reaches a terminal state.
async fn drive(
    ws: &mut WsStream,
    machine: &mut SessionMachine,
    token: &Token,
) -> SessionResult<SessionOutcome> {
    let mut step = machine.on_open(token);

    loop {
        match step {
            Step::Send(msg) => send(ws, &msg).await?,
            Step::Finished(outcome) => return Ok(outcome),
            Step::Failed(e) => return Err(e),
            Step::Ignore => {}
        }

        step = match ws.next().await {
            Some(Ok(Message::Text(text))) => machine.on_text(&text),
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = frame
                    .map(|f| (f.code.into(), f.reason.to_string()))
                    .unwrap_or((1005, "No status".to_string()));
                warn!(code, %reason, "Session closed by server before reply");
                return Err(machine.on_close(code, reason));
            }
            // Pings are answered by tungstenite on the next read/write.
            Some(Ok(_)) => Step::Ignore,
            Some(Err(e)) => {
                warn!(error = %e, "Session read error");
                return Err(machine.on_transport_error(e.to_string()));
            }
            None => {
                warn!("Session stream ended before reply");
                return Err(machine.on_close(1006, "Stream ended".to_string()));
            }
        };
    }
}

async fn send(ws: &mut WsStream, msg: &OutgoingMessage) -> SessionResult<()> {
    let json = msg.to_json()?;
    ws.send(Message::Text(json))
        .await
        .map_err(|e| SessionError::SendFailed(e.to_string()))?;
    debug!(kind = msg.label(), req_id = msg.req_id(), "Request sent");
    Ok(())
}

/// Best-effort close; the connection may already be gone.
async fn close(ws: &mut WsStream) {
    match timeout(CLOSE_GRACE, ws.close(None)).await {
        Ok(Ok(())) => debug!("Session closed"),
        Ok(Err(e)) => debug!(error = %e, "Session close after disconnect"),
        Err(_) => debug!("Session close handshake timed out"),
    }
}
