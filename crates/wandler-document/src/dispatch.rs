// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion dispatcher — validates a request against the operation's
// contract and invokes the matching capability provider.
//
// Contract per operation:
//
//   pdf_to_png    no params          PDF in        one PNG per page
//   png_to_jpg    no params          PNG in        single JPG
//   jpg_to_png    no params          JPG in        single PNG
//   to_grayscale  no params          PNG/JPG in    same format out
//   resize        width>0,height>0   PNG/JPG in    same format out, exact WxH
//
// Every failure comes back as a typed `WandlerError`; nothing panics and
// no provider error escapes unclassified. The server turns whatever this
// returns into a single well-formed wire response.

use image::ImageFormat;
use tracing::{info, instrument};

use wandler_core::error::{Result, WandlerError};
use wandler_core::types::{
    ConversionRequest, Operation, OutputFile, SourceFormat, source_stem,
};

use crate::image::processor::ImageProcessor;
use crate::pdf::render;

/// JPEG quality used by every JPEG-producing operation.
const JPEG_QUALITY: u8 = 90;

/// Identify the payload format from its leading bytes.
///
/// PDF is matched on the `%PDF-` signature; rasters are sniffed with
/// `image::guess_format`. Returns `None` for anything else — extension
/// claims are never trusted over content.
pub fn sniff_format(data: &[u8]) -> Option<SourceFormat> {
    if data.starts_with(b"%PDF-") {
        return Some(SourceFormat::Pdf);
    }
    match image::guess_format(data) {
        Ok(ImageFormat::Png) => Some(SourceFormat::Png),
        Ok(ImageFormat::Jpeg) => Some(SourceFormat::Jpeg),
        _ => None,
    }
}

/// Run one conversion request to completion.
///
/// Synchronous and CPU-bound; the server calls this inside
/// `tokio::task::spawn_blocking`.
#[instrument(skip(request), fields(op = request.operation.wire_name(), source = %request.source_name, bytes = request.source.len()))]
pub fn dispatch(request: &ConversionRequest) -> Result<Vec<OutputFile>> {
    let format = sniff_format(&request.source).ok_or_else(|| {
        WandlerError::Decode(format!(
            "{}: input is not a recognised PDF, PNG, or JPG",
            request.source_name
        ))
    })?;

    if !request.operation.accepts(format) {
        return Err(WandlerError::Decode(format!(
            "{} expects {} input, got {}",
            request.operation.wire_name(),
            request
                .operation
                .accepted_formats()
                .iter()
                .map(|f| f.mime_type())
                .collect::<Vec<_>>()
                .join(" or "),
            format.mime_type()
        )));
    }

    let stem = source_stem(&request.source_name);

    let outputs = match request.operation {
        Operation::PdfToPng => {
            let pages = render::render_to_pngs(&request.source)?;
            pages
                .into_iter()
                .enumerate()
                .map(|(i, bytes)| OutputFile {
                    name: format!("{}_page_{}.png", stem, i + 1),
                    bytes,
                })
                .collect()
        }

        Operation::PngToJpg => {
            let bytes = ImageProcessor::from_bytes(&request.source)?
                .to_jpeg_bytes(JPEG_QUALITY)?;
            vec![OutputFile {
                name: format!("{stem}.jpg"),
                bytes,
            }]
        }

        Operation::JpgToPng => {
            let bytes = ImageProcessor::from_bytes(&request.source)?.to_png_bytes()?;
            vec![OutputFile {
                name: format!("{stem}.png"),
                bytes,
            }]
        }

        Operation::ToGrayscale => {
            let bytes = ImageProcessor::from_bytes(&request.source)?
                .grayscale()
                .encode_as(format, JPEG_QUALITY)?;
            vec![OutputFile {
                name: format!("{}_gray.{}", stem, format.extension()),
                bytes,
            }]
        }

        Operation::Resize { width, height } => {
            // The parse boundary already enforces this; requests built in
            // process could still carry a zero, so the contract is checked
            // where the provider is invoked.
            if width == 0 || height == 0 {
                return Err(WandlerError::InvalidParameter(format!(
                    "resize dimensions must be positive (got {width}x{height})"
                )));
            }
            let bytes = ImageProcessor::from_bytes(&request.source)?
                .resize_exact(width, height)
                .encode_as(format, JPEG_QUALITY)?;
            vec![OutputFile {
                name: format!("{stem}_{width}x{height}.{}", format.extension()),
                bytes,
            }]
        }
    };

    info!(outputs = outputs.len(), "conversion complete");
    Ok(outputs)
}
