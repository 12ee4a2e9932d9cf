//! Mock trading API session server for integration tests.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// How the mock answers.
#[derive(Debug, Clone)]
pub enum Script {
    /// Authorize succeeds; statement returns these transactions.
    Statement(Value),
    /// Authorize fails with this message.
    AuthorizeError(String),
    /// Authorize succeeds; statement fails with this message.
    StatementError(String),
    /// Never reply.
    Silent,
    /// Send a close frame instead of replying to authorize.
    CloseOnAuthorize,
    /// Reply to authorize with a non-JSON frame.
    Garbage,
}

#[derive(Debug, Default)]
struct Recorded {
    messages: Vec<Value>,
    client_closed: bool,
    connections: u32,
}

/// A mock session server.
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockUpstream {
    /// Start on an available port.
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let recorded_clone = recorded.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Ok((stream, _)) = listener.accept() => {
                        tokio::spawn(handle_connection(stream, script.clone(), recorded_clone.clone()));
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            recorded,
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Every JSON frame received from the client.
    pub async fn received(&self) -> Vec<Value> {
        self.recorded.lock().await.messages.clone()
    }

    /// Whether the client closed its side (close frame or disconnect).
    pub async fn client_closed(&self) -> bool {
        self.recorded.lock().await.client_closed
    }

    pub async fn connection_count(&self) -> u32 {
        self.recorded.lock().await.connections
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn handle_connection(stream: TcpStream, script: Script, recorded: Arc<Mutex<Recorded>>) {
    recorded.lock().await.connections += 1;

    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("WebSocket handshake failed: {}", e);
            return;
        }
    };
    let (mut write, mut read) = ws_stream.split();

    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            _ => continue,
        };
        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        recorded.lock().await.messages.push(request.clone());
        let req_id = request.get("req_id").cloned().unwrap_or(Value::Null);

        let reply = if request.get("authorize").is_some() {
            match &script {
                Script::AuthorizeError(message) => Some(json!({
                    "msg_type": "authorize",
                    "req_id": req_id,
                    "error": {"code": "InvalidToken", "message": message}
                })),
                Script::Silent => None,
                Script::CloseOnAuthorize => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
                Script::Garbage => {
                    let _ = write.send(Message::Text("<html>oops</html>".to_string())).await;
                    None
                }
                Script::Statement(_) | Script::StatementError(_) => Some(json!({
                    "msg_type": "authorize",
                    "req_id": req_id,
                    "authorize": {
                        "loginid": "CR100001",
                        "account_list": [{"currency": "USD", "account_type": "trading"}]
                    }
                })),
            }
        } else if request.get("statement").is_some() {
            match &script {
                Script::Statement(transactions) => Some(json!({
                    "msg_type": "statement",
                    "req_id": req_id,
                    "statement": {"transactions": transactions}
                })),
                Script::StatementError(message) => Some(json!({
                    "msg_type": "statement",
                    "req_id": req_id,
                    "error": {"code": "InputValidationFailed", "message": message}
                })),
                _ => None,
            }
        } else {
            None
        };

        if let Some(reply) = reply {
            if write.send(Message::Text(reply.to_string())).await.is_err() {
                break;
            }
        }
    }

    recorded.lock().await.client_closed = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_starts() {
        let server = MockUpstream::start(Script::Silent).await;
        assert!(server.url().starts_with("ws://127.0.0.1:"));
        server.shutdown().await;
    }
}
