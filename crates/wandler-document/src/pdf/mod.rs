// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page rasterisation via pdfium.

pub mod render;

pub use render::{pdfium_available, render_to_pngs};
