// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion client — one blocking round trip per invocation.
//
// The whole exchange (connect, TLS handshake, send, await response) runs
// under a single timeout. There is no retry and no backoff: this is an
// interactive, human-triggered request, and the caller decides what to do
// with a failure. Local transport failures (`Connect`, `Timeout`) are kept
// distinct from server-reported rejections so "server unreachable" never
// masquerades as "server rejected the request".

use std::path::{Path, PathBuf};
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info};

use wandler_core::config::AppConfig;
use wandler_core::error::{Result, WandlerError};
use wandler_core::types::{ConversionRequest, Operation, OutputFile, RequestId};

use crate::store::persist_outputs;
use crate::wire;

/// Client for the conversion service.
pub struct ConversionClient {
    host: String,
    port: u16,
    connector: TlsConnector,
    timeout: Duration,
    output_dir: PathBuf,
}

impl ConversionClient {
    /// Build a client from the shared configuration. Loads the server's
    /// certificate from `config.cert_path` as the sole trust root.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let tls_config = wandler_security::client_config(&config.cert_path)?;
        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            connector: TlsConnector::from(tls_config),
            timeout: Duration::from_secs(config.request_timeout_secs),
            output_dir: config.output_dir.clone(),
        })
    }

    /// Submit in-memory source bytes for conversion and return the
    /// converted files. This is the API surface a UI layer calls.
    ///
    /// # Errors
    ///
    /// `Connect` when the server is unreachable, `Timeout` when the round
    /// trip exceeds the configured window, `Framing` on malformed wire
    /// data, or the server's own rejection mapped to its kind.
    pub async fn submit(
        &self,
        source_name: &str,
        operation: Operation,
        source: Vec<u8>,
    ) -> Result<Vec<OutputFile>> {
        let request = ConversionRequest {
            operation,
            source_name: source_name.into(),
            source,
        };

        tokio::time::timeout(self.timeout, self.exchange(&request))
            .await
            .map_err(|_| WandlerError::Timeout(self.timeout.as_secs()))?
    }

    /// Read a local file, submit it, and persist the results into the
    /// output directory. Returns the written paths.
    pub async fn convert_file(&self, path: &Path, operation: Operation) -> Result<Vec<PathBuf>> {
        let source = tokio::fs::read(path).await?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".into());

        let files = self.submit(&source_name, operation, source).await?;

        let id = RequestId::new();
        let paths = persist_outputs(&self.output_dir, &id, &files).await?;
        info!(%id, files = paths.len(), "conversion results written");
        Ok(paths)
    }

    /// One complete request/response exchange on a fresh connection.
    async fn exchange(&self, request: &ConversionRequest) -> Result<Vec<OutputFile>> {
        let addr = format!("{}:{}", self.host, self.port);
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| WandlerError::Connect(format!("{addr}: {e}")))?;

        let server_name = ServerName::try_from(self.host.clone())
            .map_err(|e| WandlerError::Tls(format!("invalid server name {}: {e}", self.host)))?;
        let mut tls = self
            .connector
            .connect(server_name, tcp)
            .await
            .map_err(|e| WandlerError::Tls(format!("handshake with {addr}: {e}")))?;

        debug!(
            addr = %addr,
            op = request.operation.wire_name(),
            bytes = request.source.len(),
            "sending conversion request"
        );

        let header = wire::RequestHeader::from_request(request);
        wire::write_request(&mut tls, &header, &request.source).await?;

        let files = wire::read_response(&mut tls).await?;
        tls.shutdown().await.ok();

        debug!(files = files.len(), "response received");
        Ok(files)
    }
}
