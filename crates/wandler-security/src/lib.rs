// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wandler Security — self-signed certificate generation and rustls
// client/server configuration for the local conversion service.

pub mod certificates;
pub mod tls;

pub use certificates::{CertificatePair, ensure_certificates};
pub use tls::{client_config, server_config};
