// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF rasterisation — render every page of a PDF to PNG bytes via the
// pdfium library.
//
// pdfium is bound at runtime from the system library search path. The
// binding is cheap to establish per call, and keeping it call-scoped means
// the rest of the workspace carries no global pdfium state. pdfium uses
// thread-local state internally, so callers on an async runtime must wrap
// these functions in `tokio::task::spawn_blocking`.

use pdfium_render::prelude::*;
use tracing::{debug, info};

use wandler_core::error::{Result, WandlerError};

use crate::image::processor::ImageProcessor;

/// Cap on either rendered edge, in pixels. Pages render at their natural
/// point size and are clamped to this bound, so an oversized page (an A0
/// poster, say) cannot balloon memory, while small pages are never
/// upscaled.
const MAX_RENDER_PX: i32 = 2048;

/// Whether a usable pdfium library can be bound on this machine.
///
/// Tests gate themselves on this so the suite stays green where pdfium is
/// not installed.
pub fn pdfium_available() -> bool {
    Pdfium::bind_to_system_library().is_ok()
}

/// Rasterise every page of `pdf_bytes` to PNG, in page order.
///
/// # Errors
///
/// `Decode` when pdfium rejects the bytes as not a PDF; `Conversion` when
/// the library cannot be bound or a page fails to render or encode.
pub fn render_to_pngs(pdf_bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        WandlerError::Conversion(format!("pdfium library unavailable: {e:?}"))
    })?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_byte_slice(pdf_bytes, None)
        .map_err(|e| WandlerError::Decode(format!("not a readable PDF: {e:?}")))?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    info!(page_count, "PDF loaded for rasterisation");

    let render_config = PdfRenderConfig::new()
        .set_maximum_width(MAX_RENDER_PX)
        .set_maximum_height(MAX_RENDER_PX);

    let mut outputs = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let page = pages.get(index as u16).map_err(|e| {
            WandlerError::Conversion(format!("page {} unreadable: {e:?}", index + 1))
        })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            WandlerError::Conversion(format!("page {} render failed: {e:?}", index + 1))
        })?;

        let image = bitmap.as_image();
        debug!(
            page = index + 1,
            width = image.width(),
            height = image.height(),
            "page rendered"
        );

        // Re-encode through the shared processor so PNG output settings
        // stay uniform across all operations.
        let png = ImageProcessor::from_dynamic(image).to_png_bytes()?;
        outputs.push(png);
    }

    Ok(outputs)
}
