// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion server — accepts TLS connections, one request/response
// exchange per connection.
//
// Lifecycle is explicit: `start()` binds the listener before it returns, so
// a returned `Ok` doubles as the readiness signal (a client may connect the
// moment it sees it); `stop()` signals the accept loop and joins its task.
// No process-wide flags.
//
// Each accepted connection is handled in its own spawned task. Workers
// share nothing mutable: the TLS acceptor and output directory are
// read-only, and output names embed a per-request id, so no locking is
// needed around the output directory.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use wandler_core::config::AppConfig;
use wandler_core::error::{Result, WandlerError};
use wandler_core::types::{ConversionRequest, RequestId, ServerStatus, base_name};
use wandler_document::dispatch;

use crate::store::persist_outputs;
use crate::wire;

/// State shared across all connection-handling tasks.
struct SharedState {
    acceptor: TlsAcceptor,
    /// Where the server persists result copies, if enabled.
    output_dir: Option<PathBuf>,
    active_connections: Arc<AtomicU32>,
}

/// The TLS conversion server.
pub struct ConversionServer {
    config: AppConfig,
    status: ServerStatus,
    /// Notification handle used to signal a graceful shutdown.
    shutdown_signal: Arc<Notify>,
    /// Handle to the Tokio task running the accept loop.
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
    /// Bound address, available once `start()` has returned Ok.
    local_addr: Option<SocketAddr>,
}

impl ConversionServer {
    /// Create a new server in `Stopped` state. Call [`start`] to begin
    /// accepting connections.
    ///
    /// [`start`]: ConversionServer::start
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            status: ServerStatus::Stopped,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            active_connections: Arc::new(AtomicU32::new(0)),
            local_addr: None,
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// The bound socket address. `None` until the server has started;
    /// useful when the configured port is 0 (ephemeral).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Start the server: load TLS material, bind the listener, spawn the
    /// accept loop.
    ///
    /// # Errors
    ///
    /// Certificate/key files missing or unparseable, or the port already
    /// in use.
    pub async fn start(&mut self) -> Result<()> {
        if self.status == ServerStatus::Running {
            debug!(port = self.config.port, "conversion server already running");
            return Ok(());
        }

        self.status = ServerStatus::Starting;

        let tls_config =
            match wandler_security::server_config(&self.config.cert_path, &self.config.key_path) {
                Ok(config) => config,
                Err(e) => {
                    self.status = ServerStatus::Error;
                    return Err(e);
                }
            };
        let acceptor = TlsAcceptor::from(tls_config);

        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.status = ServerStatus::Error;
                return Err(WandlerError::Connect(format!("bind {bind_addr}: {e}")));
            }
        };
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        info!(addr = %local_addr, "conversion server listening");

        let shared = Arc::new(SharedState {
            acceptor,
            output_dir: self
                .config
                .server_persists_results
                .then(|| self.config.output_dir.clone()),
            active_connections: Arc::clone(&self.active_connections),
        });

        let shutdown = Arc::clone(&self.shutdown_signal);
        let handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, shared).await;
        });

        self.task_handle = Some(handle);
        self.status = ServerStatus::Running;
        Ok(())
    }

    /// Gracefully stop the server: signal the accept loop and await its
    /// completion. Connections mid-exchange are allowed to finish.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }

        info!("stopping conversion server");
        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| WandlerError::Connect(format!("accept loop join: {e}")))?;
        }

        self.status = ServerStatus::Stopped;
        self.local_addr = None;
        info!("conversion server stopped");
        Ok(())
    }

    /// Accept connections until the shutdown signal arrives; one spawned
    /// task per connection.
    async fn accept_loop(listener: TcpListener, shutdown: Arc<Notify>, shared: Arc<SharedState>) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            debug!(peer = %peer_addr, "incoming connection");
                            let state = Arc::clone(&shared);
                            tokio::spawn(async move {
                                state.active_connections.fetch_add(1, Ordering::Relaxed);
                                if let Err(e) =
                                    Self::handle_connection(stream, peer_addr, &state).await
                                {
                                    warn!(peer = %peer_addr, error = %e, "connection abandoned");
                                }
                                state.active_connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
    }

    /// Handle exactly one request/response exchange, then close.
    ///
    /// A request that fails to *decode* gets no response — the connection
    /// is simply dropped (the single-shot protocol has no resumption). A
    /// request that decodes but fails validation or dispatch gets a
    /// well-formed failure response.
    async fn handle_connection(
        stream: TcpStream,
        peer_addr: SocketAddr,
        state: &SharedState,
    ) -> Result<()> {
        let mut tls = state
            .acceptor
            .accept(stream)
            .await
            .map_err(|e| WandlerError::Tls(format!("handshake with {peer_addr}: {e}")))?;

        let (header, source) = wire::read_request(&mut tls).await?;
        let id = RequestId::new();
        info!(
            %id,
            peer = %peer_addr,
            op = %header.op,
            source = %header.source_name,
            bytes = source.len(),
            "request received"
        );

        let outcome = match header.parse_operation() {
            Ok(operation) => {
                let request = ConversionRequest {
                    operation,
                    // The wire name is peer-controlled; only its final
                    // component may influence output names.
                    source_name: base_name(&header.source_name).to_string(),
                    source,
                };
                // Conversion is CPU-bound; keep it off the runtime workers.
                tokio::task::spawn_blocking(move || dispatch::dispatch(&request))
                    .await
                    .map_err(|e| WandlerError::Conversion(format!("dispatch task: {e}")))
                    .and_then(|r| r)
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(files) => {
                if let Some(dir) = &state.output_dir {
                    // Server-side copies are best-effort; the client
                    // persists authoritatively from the response bytes.
                    if let Err(e) = persist_outputs(dir, &id, &files).await {
                        warn!(%id, error = %e, "server-side persistence failed");
                    }
                }
                info!(%id, files = files.len(), "request succeeded");
                wire::write_success(&mut tls, &files).await?;
            }
            Err(e) => {
                info!(%id, error = %e, "request rejected");
                wire::write_failure(&mut tls, e.wire_kind(), &e.to_string()).await?;
            }
        }

        tls.shutdown().await.ok();
        Ok(())
    }
}
