// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wandler-document — the conversion dispatcher and its capability providers.
//
// The dispatcher validates a request against the operation's contract
// (accepted input formats, parameter ranges) and delegates the actual byte
// transformation to the `image` crate or to pdfium. All of it is synchronous
// CPU-bound code; async callers wrap `dispatch` in
// `tokio::task::spawn_blocking`.

pub mod dispatch;
pub mod image;
pub mod pdf;

pub use dispatch::{dispatch, sniff_format};
pub use image::processor::ImageProcessor;
