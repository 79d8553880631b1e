//! Upload validation: byte-signature sniffing and the size ceiling.
//!
//! The format decision is made from the first bytes of the file, never from
//! the filename or a caller-supplied MIME string. A JPEG renamed to `.png`
//! is still a JPEG here. This matters because the file comes straight from a
//! user's picker and the name is whatever their OS happens to say.
//!
//! Validation is pure: it inspects a byte slice and returns a verdict. No
//! decoding happens at this stage; full decode is deferred to the resizer,
//! which has its own failure mode.

use thiserror::Error;

/// Default upload ceiling: 20 MiB, inclusive.
pub const MAX_PHOTO_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("file is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("file content is not a supported image format")]
    UnsupportedFormat,
}

/// Image formats recognized by signature sniffing.
///
/// These are the formats a browser file input would hand us as `image/*`.
/// Output formats are a separate, smaller set; see
/// [`OutputFormat`](crate::resize::OutputFormat).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
}

impl PhotoFormat {
    /// Canonical MIME type for the sniffed format.
    pub fn mime(self) -> &'static str {
        match self {
            PhotoFormat::Jpeg => "image/jpeg",
            PhotoFormat::Png => "image/png",
            PhotoFormat::WebP => "image/webp",
            PhotoFormat::Gif => "image/gif",
            PhotoFormat::Bmp => "image/bmp",
            PhotoFormat::Tiff => "image/tiff",
        }
    }
}

/// Sniff the image format from leading byte signatures.
///
/// Returns `None` for anything that is not a recognized image container.
pub fn sniff_format(bytes: &[u8]) -> Option<PhotoFormat> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(PhotoFormat::Jpeg);
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(PhotoFormat::Png);
    }
    // RIFF container with a WEBP fourcc at offset 8
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some(PhotoFormat::WebP);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(PhotoFormat::Gif);
    }
    if bytes.starts_with(b"BM") {
        return Some(PhotoFormat::Bmp);
    }
    // TIFF: little-endian "II*\0" or big-endian "MM\0*"
    if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
    {
        return Some(PhotoFormat::Tiff);
    }
    None
}

/// Validate an upload against the default 20 MiB ceiling.
pub fn validate(bytes: &[u8]) -> Result<PhotoFormat, ValidationError> {
    validate_with_limit(bytes, MAX_PHOTO_BYTES)
}

/// Validate an upload against an explicit size ceiling.
///
/// Size is checked first so an oversized file is rejected without looking at
/// its content. The limit is inclusive: a file of exactly `limit` bytes
/// passes.
pub fn validate_with_limit(bytes: &[u8], limit: u64) -> Result<PhotoFormat, ValidationError> {
    let size = bytes.len() as u64;
    if size > limit {
        return Err(ValidationError::FileTooLarge { size, limit });
    }
    sniff_format(bytes).ok_or(ValidationError::UnsupportedFormat)
}
