//! Exact-dimension resize and re-encode.
//!
//! This is the normalization step of the pipeline: whatever the crop tool
//! hands over is decoded, stretched to the exact target dimensions, and
//! re-encoded at the configured quality. Stretching is deliberate: the crop
//! step is responsible for aspect ratio, so by the time bytes reach the
//! resizer the ratio is expected to match and no letterboxing is done.
//!
//! Failure here is non-fatal by contract: a blob that cannot be decoded or
//! re-encoded yields `None`, with a `warn` log for the developer. Callers
//! must check for `None` before persisting; silently persisting nothing is
//! the failure mode this contract exists to prevent.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::warn;

/// Quality setting for lossy re-encoding (1-100).
///
/// Out-of-range values are clamped, both in [`Quality::new`] and on
/// deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for Quality {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(70)
    }
}

/// Re-encode target for resized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

/// Full specification for one resize: target dimensions, quality, format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeSpec {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
    pub format: OutputFormat,
}

impl ResizeSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            quality: Quality::default(),
            format: OutputFormat::default(),
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }
}

/// Resize encoded image bytes to exact dimensions and re-encode.
///
/// Returns `None` if the input cannot be decoded or the output cannot be
/// encoded. Both are treated as rendering-environment failures, not errors
/// worth propagating; the caller degrades gracefully.
pub fn resize(bytes: &[u8], spec: &ResizeSpec) -> Option<Vec<u8>> {
    let img = match decode(bytes) {
        Some(img) => img,
        None => {
            warn!(
                len = bytes.len(),
                "resize skipped: input bytes did not decode as an image"
            );
            return None;
        }
    };

    // Exact stretch; aspect ratio distortion is accepted by contract.
    let resized = img.resize_exact(spec.width, spec.height, FilterType::Lanczos3);

    match encode(&resized, spec) {
        Ok(out) => Some(out),
        Err(e) => {
            warn!(error = %e, "resize skipped: re-encode failed");
            None
        }
    }
}

/// Decoded pixel dimensions of encoded image bytes, if decodable.
pub fn dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

fn decode(bytes: &[u8]) -> Option<DynamicImage> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .decode()
        .ok()
}

fn encode(img: &DynamicImage, spec: &ResizeSpec) -> image::ImageResult<Vec<u8>> {
    let mut out = Vec::new();
    match spec.format {
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel; flatten first
            let rgb = img.to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut out, spec.quality.value());
            encoder.write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        OutputFormat::Png => {
            img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{encode_test_jpeg, encode_test_png};

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(70).value(), 70);
        assert_eq!(Quality::new(255).value(), 100);
    }

    #[test]
    fn quality_default_is_70() {
        assert_eq!(Quality::default().value(), 70);
    }

    #[test]
    fn resize_produces_exact_dimensions() {
        let src = encode_test_jpeg(400, 300);
        let out = resize(&src, &ResizeSpec::new(280, 400)).unwrap();
        assert_eq!(dimensions(&out), Some((280, 400)));
    }

    #[test]
    fn resize_stretches_rather_than_letterboxes() {
        // 4:3 source into a 1:1 target still fills the full 1:1 frame
        let src = encode_test_jpeg(400, 300);
        let out = resize(&src, &ResizeSpec::new(200, 200)).unwrap();
        assert_eq!(dimensions(&out), Some((200, 200)));
    }

    #[test]
    fn resize_is_deterministic() {
        let src = encode_test_jpeg(640, 480);
        let spec = ResizeSpec::new(800, 600).with_quality(Quality::new(70));
        let a = resize(&src, &spec).unwrap();
        let b = resize(&src, &spec).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(dimensions(&a), dimensions(&b));
    }

    #[test]
    fn resize_of_undecodable_bytes_is_none() {
        assert_eq!(resize(b"definitely not an image", &ResizeSpec::new(10, 10)), None);
    }

    #[test]
    fn resize_of_truncated_jpeg_is_none() {
        let mut src = encode_test_jpeg(100, 100);
        src.truncate(20);
        assert_eq!(resize(&src, &ResizeSpec::new(10, 10)), None);
    }

    #[test]
    fn png_input_flattens_into_jpeg_output() {
        let src = encode_test_png(64, 64);
        let out = resize(&src, &ResizeSpec::new(32, 32)).unwrap();
        // Output is JPEG regardless of input container
        assert!(out.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn png_output_format_respected() {
        let src = encode_test_jpeg(64, 64);
        let spec = ResizeSpec {
            format: OutputFormat::Png,
            ..ResizeSpec::new(32, 32)
        };
        let out = resize(&src, &spec).unwrap();
        assert!(out.starts_with(&[0x89, b'P', b'N', b'G']));
        assert_eq!(OutputFormat::Png.mime(), "image/png");
    }

    #[test]
    fn dimensions_reads_without_full_decode() {
        let src = encode_test_jpeg(123, 77);
        assert_eq!(dimensions(&src), Some((123, 77)));
        assert_eq!(dimensions(b"garbage"), None);
    }
}
