// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rustls configuration loading for the conversion client and server.
//
// The trust model is deliberately narrow: the client trusts exactly one
// certificate (the server's own self-signed cert from disk), never the
// system root store. Both sides speak the workspace-pinned rustls with the
// ring provider.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use tracing::debug;

use wandler_core::error::{Result, WandlerError};

/// Build a rustls `ServerConfig` from PEM certificate and key files.
pub fn server_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| WandlerError::Tls(format!("server config: {e}")))?;

    debug!(cert = %cert_path.display(), "server TLS config loaded");
    Ok(Arc::new(config))
}

/// Build a rustls `ClientConfig` that trusts only the certificate(s) in
/// the given PEM file.
pub fn client_config(cert_path: &Path) -> Result<Arc<ClientConfig>> {
    let certs = load_certs(cert_path)?;
    let mut roots = RootCertStore::empty();
    for cert in certs {
        roots
            .add(cert)
            .map_err(|e| WandlerError::Tls(format!("trust root: {e}")))?;
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    debug!(cert = %cert_path.display(), "client TLS config loaded");
    Ok(Arc::new(config))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| {
        WandlerError::Certificate(format!("open {}: {e}", path.display()))
    })?;
    let mut reader = BufReader::new(file);
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| WandlerError::Certificate(format!("parse {}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(WandlerError::Certificate(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path).map_err(|e| {
        WandlerError::Certificate(format!("open {}: {e}", path.display()))
    })?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| WandlerError::Certificate(format!("parse {}: {e}", path.display())))?
        .ok_or_else(|| {
            WandlerError::Certificate(format!("no private key found in {}", path.display()))
        })
}
