// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wandler Net — the single-shot conversion wire protocol and the TLS
// client/server pair that speaks it. One connection carries exactly one
// request/response exchange; there is no pipelining, pooling, or
// resumption — the workload is a single local interactive user.

pub mod client;
pub mod server;
pub mod store;
pub mod wire;

pub use client::ConversionClient;
pub use server::ConversionServer;
