//! Listening socket and per-connection task spawning

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::error::{Result, VickyError};
use crate::logging::LogSink;
use crate::protocol::Session;
use crate::socket_server::connection::{handle_connection, SessionFailure};
use crate::store::Store;

/// Requests a graceful stop of a running [`Server`]
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }
}

/// A bound server that has not started accepting yet
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
    log: Arc<dyn LogSink>,
    store: Arc<dyn Store>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Bind the listening socket. A port already in use is reported here,
    /// before any connection is accepted.
    pub async fn bind(
        config: ServerConfig,
        log: Arc<dyn LogSink>,
        store: Arc<dyn Store>,
    ) -> Result<Self> {
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| VickyError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        log.info(&format!(
            "Starting WebSocket server on port {}",
            local_addr.port()
        ));

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            listener,
            local_addr,
            config,
            log,
            store,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Accept connections until shut down.
    ///
    /// Each connection gets its own task and its own [`Session`]. A session
    /// failure only ends that connection, unless the server is in strict
    /// mode, where the first failure stops everything and is returned as
    /// [`VickyError::StrictAbort`].
    pub async fn run(self) -> Result<()> {
        let Server {
            listener,
            local_addr,
            config,
            log,
            store,
            shutdown_tx,
        } = self;

        tracing::info!("Vicky listening on ws://{}", local_addr);

        let mut shutdown_rx = shutdown_tx.subscribe();
        let (failure_tx, mut failure_rx) = mpsc::unbounded_channel::<SessionFailure>();
        let mut tasks = JoinSet::new();

        let result = loop {
            if *shutdown_rx.borrow_and_update() {
                break Ok(());
            }

            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let session = Session::new(config.session, Arc::clone(&log), Arc::clone(&store));
                        let span = tracing::info_span!("session", id = %session.id(), %peer);
                        let log = Arc::clone(&log);
                        let shutdown = shutdown_tx.subscribe();
                        let failure_tx = config.strict.then(|| failure_tx.clone());

                        tasks.spawn(
                            async move {
                                if let Some(failure) = handle_connection(stream, session, log, shutdown).await {
                                    if let Some(tx) = failure_tx {
                                        let _ = tx.send(failure);
                                    }
                                }
                            }
                            .instrument(span),
                        );
                    }
                    Err(e) => {
                        log.error(&format!("Failed to accept connection: {}", e));
                    }
                },

                Some(failure) = failure_rx.recv() => {
                    log.error(&format!(
                        "Strict mode: stopping server after session {} failed",
                        failure.session
                    ));
                    break Err(VickyError::StrictAbort {
                        session: failure.session,
                        reason: failure.reason,
                    });
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        log.error(&format!("Connection task failed: {}", e));
                    }
                }

                _ = shutdown_rx.changed() => {}
            }
        };

        // Tell every open connection to close, then wait for them
        shutdown_tx.send_replace(true);
        while tasks.join_next().await.is_some() {}
        log.info("WebSocket server stopped");

        result
    }
}
