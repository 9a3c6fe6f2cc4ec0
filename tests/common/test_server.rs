//! Real server on an ephemeral port, plus a game-side WebSocket client

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use vicky::{MemorySink, NullStore, Server, ServerConfig, ShutdownHandle, Store};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Server bound to 127.0.0.1:0 and running in the background
pub struct TestServer {
    pub addr: SocketAddr,
    pub log: Arc<MemorySink>,
    pub handle: ShutdownHandle,
    pub task: JoinHandle<vicky::Result<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::ephemeral(), Arc::new(NullStore)).await
    }

    pub async fn start_with(config: ServerConfig, store: Arc<dyn Store>) -> Self {
        let log = MemorySink::new();
        let server = Server::bind(config, log.clone(), store)
            .await
            .expect("Failed to bind test server");
        let addr = server.local_addr();
        let handle = server.shutdown_handle();
        let task = tokio::spawn(server.run());
        Self {
            addr,
            log,
            handle,
            task,
        }
    }

    pub async fn connect(&self) -> TestClient {
        let (ws, _) = connect_async(format!("ws://{}", self.addr))
            .await
            .expect("Failed to connect to test server");
        TestClient { ws }
    }

    /// Stop the server and return what `run` returned
    pub async fn stop(self) -> vicky::Result<()> {
        self.handle.shutdown();
        tokio::time::timeout(READ_TIMEOUT, self.task)
            .await
            .expect("Server did not stop in time")
            .expect("Server task panicked")
    }
}

/// How a read from the server ended
#[derive(Debug)]
pub enum Received {
    Packet(Value),
    Closed(Option<CloseCode>),
}

pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn send(&mut self, packet: Value) {
        self.ws
            .send(Message::Text(packet.to_string()))
            .await
            .expect("Failed to send packet");
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string()))
            .await
            .expect("Failed to send frame");
    }

    /// Next packet or close, skipping control frames
    pub async fn receive(&mut self) -> Received {
        loop {
            let next = tokio::time::timeout(READ_TIMEOUT, self.ws.next())
                .await
                .expect("Timed out waiting for the server");
            match next {
                Some(Ok(Message::Text(text))) => {
                    return Received::Packet(
                        serde_json::from_str(&text).expect("Server sent invalid JSON"),
                    )
                }
                Some(Ok(Message::Close(frame))) => {
                    return Received::Closed(frame.map(|f| f.code))
                }
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return Received::Closed(None),
            }
        }
    }

    pub async fn expect_packet(&mut self) -> Value {
        match self.receive().await {
            Received::Packet(value) => value,
            Received::Closed(code) => panic!("Expected a packet, connection closed ({:?})", code),
        }
    }

    pub async fn expect_close(&mut self) -> Option<CloseCode> {
        match self.receive().await {
            Received::Closed(code) => code,
            Received::Packet(value) => panic!("Expected close, got packet {}", value),
        }
    }

    pub async fn ping(&mut self, payload: &[u8]) {
        self.ws
            .send(Message::Ping(payload.to_vec()))
            .await
            .expect("Failed to send ping");
    }

    /// Pongs received within `wait`
    pub async fn pongs_within(&mut self, wait: Duration) -> usize {
        let mut pongs = 0;
        while let Ok(Some(Ok(message))) = tokio::time::timeout(wait, self.ws.next()).await {
            if matches!(message, Message::Pong(_)) {
                pongs += 1;
            }
        }
        pongs
    }

    /// True if nothing arrives within `wait`
    pub async fn is_silent_for(&mut self, wait: Duration) -> bool {
        tokio::time::timeout(wait, self.ws.next()).await.is_err()
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
