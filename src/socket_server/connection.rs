//! WebSocket connection handler
//!
//! Drives one [`Session`] with the frames of one client, strictly in arrival
//! order, and closes the socket when the session hits a fatal error.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

use crate::error::SessionError;
use crate::logging::LogSink;
use crate::protocol::{OutgoingPacket, Session};

/// Close reasons are limited to 123 bytes by the WebSocket protocol
const MAX_CLOSE_REASON: usize = 123;

/// Reported by a connection whose session ended on a fatal error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub session: String,
    pub reason: String,
}

/// Handle a single WebSocket connection until the client leaves, the session
/// fails, or the server shuts down.
pub async fn handle_connection(
    stream: TcpStream,
    session: Session,
    log: Arc<dyn LogSink>,
    shutdown: watch::Receiver<bool>,
) -> Option<SessionFailure> {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            log.error(&format!("WebSocket handshake failed: {}", e));
            return None;
        }
    };
    log.info("New connection established");

    let mut conn = ConnectionState {
        ws,
        session,
        log,
        shutdown,
    };
    let failure = conn.run().await;

    conn.log.info("Connection closed");
    failure
}

struct ConnectionState {
    ws: WebSocketStream<TcpStream>,
    session: Session,
    log: Arc<dyn LogSink>,
    shutdown: watch::Receiver<bool>,
}

impl ConnectionState {
    async fn run(&mut self) -> Option<SessionFailure> {
        if *self.shutdown.borrow_and_update() {
            self.close(CloseCode::Away, "server shutting down").await;
            return None;
        }

        loop {
            tokio::select! {
                msg = self.ws.next() => {
                    let outcome = match msg {
                        Some(Ok(Message::Text(text))) => self.session.handle_frame(&text),
                        Some(Ok(Message::Binary(data))) => self.session.handle_bytes(&data),
                        Some(Ok(Message::Close(_))) | None => return None,
                        // tungstenite answers pings on its own
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            self.log.error(&format!("WebSocket error: {}", e));
                            return None;
                        }
                    };

                    match outcome {
                        Ok(Some(reply)) => {
                            if let Err(e) = self.send(&reply).await {
                                self.log.error(&format!("Failed to send reply: {}", e));
                                return None;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => return Some(self.fail(e).await),
                    }
                }

                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        self.close(CloseCode::Away, "server shutting down").await;
                        return None;
                    }
                }
            }
        }
    }

    async fn send(&mut self, packet: &OutgoingPacket) -> anyhow::Result<()> {
        let json = packet.to_json()?;
        self.ws.send(Message::Text(json)).await?;
        Ok(())
    }

    async fn fail(&mut self, error: SessionError) -> SessionFailure {
        let reason = error.to_string();
        self.close(CloseCode::Policy, &reason).await;
        SessionFailure {
            session: self.session.id().to_string(),
            reason,
        }
    }

    async fn close(&mut self, code: CloseCode, reason: &str) {
        let frame = CloseFrame {
            code,
            reason: truncate(reason, MAX_CLOSE_REASON).to_string().into(),
        };
        if let Err(e) = self.ws.close(Some(frame)).await {
            tracing::debug!("Close handshake failed: {}", e);
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
