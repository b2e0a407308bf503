// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings shared by the server and the client.
///
/// The certificate, key, and output paths are well-known locations relative
/// to the working directory; the client only needs the certificate (it
/// trusts the server's self-signed cert directly, no system roots).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host the server binds to / the client connects to.
    pub host: String,
    /// TCP port for the conversion service (default 8443).
    pub port: u16,
    /// Path to the PEM-encoded server certificate.
    pub cert_path: PathBuf,
    /// Path to the PEM-encoded server private key.
    pub key_path: PathBuf,
    /// Directory where converted artifacts are written.
    pub output_dir: PathBuf,
    /// Whole-round-trip timeout for a client request, in seconds.
    pub request_timeout_secs: u64,
    /// Whether the server also persists results to `output_dir` (the
    /// client always persists its own copy).
    pub server_persists_results: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8443,
            cert_path: PathBuf::from("cert.pem"),
            key_path: PathBuf::from("key.pem"),
            output_dir: PathBuf::from("converted_files"),
            request_timeout_secs: 60,
            server_persists_results: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_well_known_locations() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.port, 8443);
        assert_eq!(cfg.cert_path, PathBuf::from("cert.pem"));
        assert_eq!(cfg.output_dir, PathBuf::from("converted_files"));
        assert_eq!(cfg.request_timeout_secs, 60);
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = AppConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.host, cfg.host);
        assert_eq!(back.port, cfg.port);
    }
}
