// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// TLS certificate generation — self-signed ECDSA certificate for the local
// conversion server.
//
// The server presents this certificate; the client loads the same PEM file
// as its sole trust root. No CA, no chain: the pair of files on disk *is*
// the trust relationship between the two local processes.

use std::path::Path;

use chrono::Datelike as _;
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use tracing::{debug, info};

use wandler_core::error::{Result, WandlerError};

/// Validity window for generated certificates, in days.
const VALIDITY_DAYS: i64 = 365;

/// Common name placed in the certificate subject.
const COMMON_NAME: &str = "wandler";

/// A freshly generated certificate and private key, both PEM-encoded.
pub struct CertificatePair {
    pub cert_pem: String,
    pub key_pem: String,
}

impl CertificatePair {
    /// Generate a self-signed certificate for `localhost` / `127.0.0.1`,
    /// valid for one year from now.
    pub fn generate() -> Result<Self> {
        let mut params =
            CertificateParams::new(vec!["localhost".to_string(), "127.0.0.1".to_string()])
                .map_err(|e| WandlerError::Certificate(format!("params: {e}")))?;

        params.distinguished_name = DistinguishedName::new();
        params
            .distinguished_name
            .push(DnType::CommonName, COMMON_NAME);

        let now = chrono::Utc::now();
        let not_before = now.date_naive();
        let not_after = (now + chrono::Duration::days(VALIDITY_DAYS)).date_naive();
        params.not_before = rcgen::date_time_ymd(
            not_before.year(),
            not_before.month() as u8,
            not_before.day() as u8,
        );
        params.not_after = rcgen::date_time_ymd(
            not_after.year(),
            not_after.month() as u8,
            not_after.day() as u8,
        );

        let key_pair =
            KeyPair::generate().map_err(|e| WandlerError::Certificate(format!("keygen: {e}")))?;
        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| WandlerError::Certificate(format!("self-sign: {e}")))?;

        debug!(common_name = COMMON_NAME, "self-signed certificate generated");

        Ok(Self {
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }

    /// Write the pair to disk. The private key file is created with mode
    /// 0600 on Unix.
    pub fn write_to(&self, cert_path: &Path, key_path: &Path) -> Result<()> {
        write_cert_file(cert_path, &self.cert_pem)?;
        write_private_key_file(key_path, &self.key_pem)?;
        info!(
            cert = %cert_path.display(),
            key = %key_path.display(),
            "certificate material written"
        );
        Ok(())
    }
}

/// Make sure a certificate/key pair exists at the well-known paths,
/// generating a fresh one if either file is missing.
///
/// Returns `true` when a new pair was generated.
pub fn ensure_certificates(cert_path: &Path, key_path: &Path) -> Result<bool> {
    if cert_path.exists() && key_path.exists() {
        debug!(cert = %cert_path.display(), "certificate material already present");
        return Ok(false);
    }
    CertificatePair::generate()?.write_to(cert_path, key_path)?;
    Ok(true)
}

#[cfg(unix)]
fn write_cert_file(path: &Path, contents: &str) -> Result<()> {
    write_text_file(path, contents, 0o644)
}

#[cfg(not(unix))]
fn write_cert_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(unix)]
fn write_private_key_file(path: &Path, contents: &str) -> Result<()> {
    write_text_file(path, contents, 0o600)
}

#[cfg(not(unix))]
fn write_private_key_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(unix)]
fn write_text_file(path: &Path, contents: &str, mode: u32) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .mode(mode)
        .open(path)?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}
