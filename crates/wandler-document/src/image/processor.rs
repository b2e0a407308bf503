// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — the raster capability provider. Wraps the `image`
// crate's decode/transform/encode routines behind the error taxonomy the
// dispatcher needs: decode failures are `Decode`, encode failures are
// `Conversion` (internal).

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use wandler_core::error::{Result, WandlerError};
use wandler_core::types::SourceFormat;

/// In-memory raster image with the transformations the conversion
/// operations need.
///
/// Transformations consume `self` and return a new processor, so a
/// dispatch handler reads as a short chain:
///
/// ```ignore
/// let out = ImageProcessor::from_bytes(&source)?
///     .resize_exact(800, 600)
///     .encode_as(SourceFormat::Png)?;
/// ```
#[derive(Debug)]
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    /// Decode an image from raw encoded bytes (PNG or JPEG).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(data)
            .map_err(|err| WandlerError::Decode(format!("image decode failed: {err}")))?;
        debug!(
            width = image.width(),
            height = image.height(),
            "image decoded from bytes"
        );
        Ok(Self { image })
    }

    /// Wrap an already-decoded `DynamicImage` (e.g. a rendered PDF page).
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Scale to exactly `width` x `height`, ignoring aspect ratio.
    /// Lanczos3 filtering, same as the rest of the pipeline.
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        let resized =
            self.image
                .resize_exact(width, height, image::imageops::FilterType::Lanczos3);
        Self { image: resized }
    }

    /// Convert to grayscale (luma).
    pub fn grayscale(self) -> Self {
        Self {
            image: self.image.grayscale(),
        }
    }

    /// Encode as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| WandlerError::Conversion(format!("PNG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode as JPEG bytes with the given quality (1-100). JPEG has no
    /// alpha channel, so the image is flattened to RGB first.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| WandlerError::Conversion(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode in the given source format — used by the format-preserving
    /// operations (grayscale, resize).
    pub fn encode_as(&self, format: SourceFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        match format {
            SourceFormat::Png => self.to_png_bytes(),
            SourceFormat::Jpeg => self.to_jpeg_bytes(jpeg_quality),
            SourceFormat::Pdf => Err(WandlerError::Conversion(
                "cannot encode a raster image as PDF".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }));
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode fixture");
        buf
    }

    #[test]
    fn decode_rejects_junk_bytes() {
        let err = ImageProcessor::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, WandlerError::Decode(_)));
    }

    #[test]
    fn resize_exact_hits_requested_dimensions() {
        let src = png_fixture(64, 48);
        let out = ImageProcessor::from_bytes(&src)
            .expect("decode")
            .resize_exact(17, 31)
            .to_png_bytes()
            .expect("encode");
        let decoded = ImageProcessor::from_bytes(&out).expect("re-decode");
        assert_eq!((decoded.width(), decoded.height()), (17, 31));
    }

    #[test]
    fn jpeg_round_trip_preserves_dimensions() {
        let src = png_fixture(40, 25);
        let jpg = ImageProcessor::from_bytes(&src)
            .expect("decode png")
            .to_jpeg_bytes(90)
            .expect("encode jpg");
        assert_eq!(image::guess_format(&jpg).expect("sniff"), ImageFormat::Jpeg);
        let back = ImageProcessor::from_bytes(&jpg).expect("decode jpg");
        assert_eq!((back.width(), back.height()), (40, 25));
    }

    #[test]
    fn grayscale_flattens_color() {
        let src = png_fixture(10, 10);
        let gray = ImageProcessor::from_bytes(&src).expect("decode").grayscale();
        let rgb = gray.image.to_rgb8();
        let px = rgb.get_pixel(3, 7);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
    }
}
