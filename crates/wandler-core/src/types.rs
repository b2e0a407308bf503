// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Wandler conversion service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, WandlerError};

/// Unique identifier for a single conversion request.
///
/// The identifier travels with the request through the server and is folded
/// into every persisted output file name, so concurrent requests can never
/// overwrite each other's artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short form used as a file-name suffix: the first 8 hex chars.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input formats the conversion operations accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    Pdf,
    Png,
    Jpeg,
}

impl SourceFormat {
    /// MIME type string for UI display and logging.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Canonical file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Infer a source format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// One supported conversion, with its parameters baked in.
///
/// Parameters are part of the variant rather than a side-table of key/value
/// pairs, so an operation with a missing or extraneous parameter is
/// unrepresentable past the parsing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Rasterise every PDF page to a PNG, page order preserved.
    PdfToPng,
    /// Re-encode a PNG as JPG.
    PngToJpg,
    /// Re-encode a JPG as PNG.
    JpgToPng,
    /// Convert a raster image to grayscale, keeping its format.
    ToGrayscale,
    /// Scale a raster image to exactly `width` x `height` pixels,
    /// keeping its format.
    Resize { width: u32, height: u32 },
}

impl Operation {
    /// Name of this operation on the wire and on the CLI.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::PdfToPng => "pdf_to_png",
            Self::PngToJpg => "png_to_jpg",
            Self::JpgToPng => "jpg_to_png",
            Self::ToGrayscale => "to_grayscale",
            Self::Resize { .. } => "resize",
        }
    }

    /// All wire names, for error messages and CLI help.
    pub const WIRE_NAMES: &'static [&'static str] = &[
        "pdf_to_png",
        "png_to_jpg",
        "jpg_to_png",
        "to_grayscale",
        "resize",
    ];

    /// Resolve an operation name and its optional parameters into a
    /// validated `Operation`.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` for an unknown name; `InvalidParameter` when
    /// `resize` is missing a dimension or a dimension is zero, or when a
    /// parameterless operation is given dimensions anyway.
    pub fn parse(name: &str, width: Option<u32>, height: Option<u32>) -> Result<Self> {
        let op = match name {
            "pdf_to_png" => Self::PdfToPng,
            "png_to_jpg" => Self::PngToJpg,
            "jpg_to_png" => Self::JpgToPng,
            "to_grayscale" => Self::ToGrayscale,
            "resize" => {
                let width = width.ok_or_else(|| {
                    WandlerError::InvalidParameter("resize requires --width".into())
                })?;
                let height = height.ok_or_else(|| {
                    WandlerError::InvalidParameter("resize requires --height".into())
                })?;
                if width == 0 || height == 0 {
                    return Err(WandlerError::InvalidParameter(format!(
                        "resize dimensions must be positive (got {}x{})",
                        width, height
                    )));
                }
                return Ok(Self::Resize { width, height });
            }
            other => {
                return Err(WandlerError::UnsupportedOperation(format!(
                    "{} (supported: {})",
                    other,
                    Self::WIRE_NAMES.join(", ")
                )));
            }
        };

        if width.is_some() || height.is_some() {
            return Err(WandlerError::InvalidParameter(format!(
                "{} takes no parameters",
                op.wire_name()
            )));
        }
        Ok(op)
    }

    /// The input formats this operation accepts.
    pub fn accepted_formats(&self) -> &'static [SourceFormat] {
        match self {
            Self::PdfToPng => &[SourceFormat::Pdf],
            Self::PngToJpg => &[SourceFormat::Png],
            Self::JpgToPng => &[SourceFormat::Jpeg],
            Self::ToGrayscale | Self::Resize { .. } => {
                &[SourceFormat::Png, SourceFormat::Jpeg]
            }
        }
    }

    pub fn accepts(&self, format: SourceFormat) -> bool {
        self.accepted_formats().contains(&format)
    }
}

/// A fully validated conversion request.
///
/// Immutable once built; the client constructs it from user input, the
/// server reconstructs it from the wire.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub operation: Operation,
    /// Original file name of the source (basename only, used to derive
    /// output names).
    pub source_name: String,
    pub source: Vec<u8>,
}

/// One converted output file: suggested name plus encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Insert a request-id suffix before a file name's extension.
///
/// `page_1.png` + `ab12cd34` → `page_1.ab12cd34.png`. Names without an
/// extension get the suffix appended.
pub fn unique_file_name(name: &str, id: &RequestId) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}.{}.{}", stem, id.short(), ext),
        None => format!("{}.{}", name, id.short()),
    }
}

/// Reduce a file name to its final path component.
///
/// Wire peers control `source_name`, so separators and parent components
/// must never reach the output directory. Falls back to `"input"` when
/// nothing usable remains (trailing separator, bare `..`).
pub fn base_name(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if base.is_empty() || base == "." || base == ".." {
        "input"
    } else {
        base
    }
}

/// Strip the extension from a source file name, yielding the stem used to
/// derive output names. Falls back to `"output"` for empty/dot-only names.
pub fn source_stem(name: &str) -> &str {
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => name,
    };
    if stem.is_empty() { "output" } else { stem }
}

/// Lifecycle states of the conversion server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_operations() {
        assert_eq!(
            Operation::parse("pdf_to_png", None, None).unwrap(),
            Operation::PdfToPng
        );
        assert_eq!(
            Operation::parse("resize", Some(800), Some(600)).unwrap(),
            Operation::Resize {
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn unknown_operation_is_rejected_with_supported_list() {
        let err = Operation::parse("img_rotate", None, None).unwrap_err();
        assert!(matches!(err, WandlerError::UnsupportedOperation(_)));
        assert!(err.to_string().contains("resize"));
    }

    #[test]
    fn resize_requires_both_positive_dimensions() {
        for (w, h) in [(None, Some(600)), (Some(800), None), (None, None)] {
            let err = Operation::parse("resize", w, h).unwrap_err();
            assert!(matches!(err, WandlerError::InvalidParameter(_)), "{w:?}x{h:?}");
        }
        let err = Operation::parse("resize", Some(0), Some(600)).unwrap_err();
        assert!(matches!(err, WandlerError::InvalidParameter(_)));
        let err = Operation::parse("resize", Some(800), Some(0)).unwrap_err();
        assert!(matches!(err, WandlerError::InvalidParameter(_)));
    }

    #[test]
    fn stray_dimensions_on_parameterless_op_are_rejected() {
        let err = Operation::parse("to_grayscale", Some(800), None).unwrap_err();
        assert!(matches!(err, WandlerError::InvalidParameter(_)));
    }

    #[test]
    fn accepted_formats_follow_the_contract_table() {
        assert!(Operation::PdfToPng.accepts(SourceFormat::Pdf));
        assert!(!Operation::PdfToPng.accepts(SourceFormat::Png));
        assert!(Operation::PngToJpg.accepts(SourceFormat::Png));
        assert!(!Operation::PngToJpg.accepts(SourceFormat::Jpeg));
        assert!(Operation::ToGrayscale.accepts(SourceFormat::Jpeg));
        assert!(
            Operation::Resize {
                width: 1,
                height: 1
            }
            .accepts(SourceFormat::Png)
        );
    }

    #[test]
    fn unique_file_name_keeps_extension_last() {
        let id = RequestId::new();
        let name = unique_file_name("page_1.png", &id);
        assert!(name.starts_with("page_1."));
        assert!(name.ends_with(".png"));
        assert_eq!(name.len(), "page_1.".len() + 8 + ".png".len());
    }

    #[test]
    fn unique_names_differ_across_requests() {
        let a = unique_file_name("out.png", &RequestId::new());
        let b = unique_file_name("out.png", &RequestId::new());
        assert_ne!(a, b);
    }

    #[test]
    fn base_name_strips_directory_components() {
        assert_eq!(base_name("photo.png"), "photo.png");
        assert_eq!(base_name("a/b/c.png"), "c.png");
        assert_eq!(base_name("../../pwned.png"), "pwned.png");
        assert_eq!(base_name("..\\..\\pwned.png"), "pwned.png");
        assert_eq!(base_name("dir/"), "input");
        assert_eq!(base_name(".."), "input");
        assert_eq!(base_name("a/.."), "input");
    }

    #[test]
    fn source_stem_handles_odd_names() {
        assert_eq!(source_stem("photo.png"), "photo");
        assert_eq!(source_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(source_stem("noext"), "noext");
        assert_eq!(source_stem(".png"), "output");
    }
}
