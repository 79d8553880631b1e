//! Crop-region state and extraction.
//!
//! The interactive crop widget itself lives outside this crate; only its
//! contract is fixed here as the [`CropTool`] trait (bind, zoom, extract,
//! destroy). Any widget that can report a zoom level and hand back its
//! current crop region as encoded bytes can be plugged in.
//!
//! [`CropController`] wraps a bound tool with the two behaviors the widget
//! is not trusted with: the 1.0× zoom floor (the prospective level is
//! computed *before* the adjustment is applied, so the floor can never be
//! crossed) and the crop → resize normalization chain.
//!
//! [`CenterCrop`] is the built-in headless tool: it extracts the largest
//! centered window at a target aspect ratio, shrunk by the zoom level. The
//! CLI uses it; tests use it alongside a recording mock.

use crate::resize::{self, OutputFormat, Quality, ResizeSpec};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::warn;

/// Zoom change applied per wheel notch.
const ZOOM_STEP: f64 = 0.1;

/// Never zoom below the original (fitted) size.
const ZOOM_FLOOR: f64 = 1.0;

/// Contract for an interactive (or headless) crop widget.
pub trait CropTool {
    /// Current magnification. 1.0 means the image exactly fits the view.
    fn zoom_level(&self) -> f64;

    /// Apply a relative zoom adjustment. The caller has already verified
    /// the resulting level is acceptable.
    fn zoom_by(&mut self, delta: f64);

    /// Extract the current crop region as encoded image bytes.
    ///
    /// `None` when the tool has no image or extraction fails.
    fn crop_region(&mut self) -> Option<Vec<u8>>;

    /// Release internal resources. Called once when the tool is replaced or
    /// the photo is removed.
    fn destroy(&mut self);
}

/// Dimensions and quality for the final cropped output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropOptions {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

/// Owns the bound crop tool and its zoom discipline.
#[derive(Default)]
pub struct CropController {
    tool: Option<Box<dyn CropTool>>,
}

impl CropController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a tool once it reports ready. A previously bound tool is
    /// destroyed first.
    pub fn bind(&mut self, tool: Box<dyn CropTool>) {
        self.release();
        self.tool = Some(tool);
    }

    pub fn is_bound(&self) -> bool {
        self.tool.is_some()
    }

    /// Handle a wheel event: negative delta zooms in, positive zooms out.
    ///
    /// The prospective level is computed first and the adjustment rejected
    /// outright if it would land below 1.0×. Returns whether a zoom was
    /// applied.
    pub fn wheel_zoom(&mut self, delta_y: f64) -> bool {
        let Some(tool) = self.tool.as_mut() else {
            return false;
        };
        let step = if delta_y < 0.0 { ZOOM_STEP } else { -ZOOM_STEP };
        let prospective = tool.zoom_level() + step;
        if prospective < ZOOM_FLOOR {
            return false;
        }
        tool.zoom_by(step);
        true
    }

    /// Extract the crop region and normalize it through the resizer.
    ///
    /// Two chained steps; `None` from either one (no tool, extraction
    /// failure, undecodable region) is the final answer and nothing must be
    /// persisted from it.
    pub fn cropped_blob(&mut self, options: &CropOptions) -> Option<Vec<u8>> {
        let region = self.tool.as_mut()?.crop_region()?;
        resize::resize(
            &region,
            &ResizeSpec {
                width: options.width,
                height: options.height,
                quality: options.quality,
                format: OutputFormat::Jpeg,
            },
        )
    }

    /// Destroy and drop the bound tool, if any. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(mut tool) = self.tool.take() {
            tool.destroy();
        }
    }
}

impl Drop for CropController {
    fn drop(&mut self) {
        self.release();
    }
}

/// Headless crop tool: largest centered window at a fixed aspect ratio.
///
/// Zooming in shrinks the window around the center, mimicking what a user
/// does with an interactive cropper before saving. Extraction crops that
/// window out of the source and re-encodes it; exact output dimensions are
/// the resizer's job downstream.
pub struct CenterCrop {
    image: Option<DynamicImage>,
    aspect: (u32, u32),
    zoom: f64,
}

impl CenterCrop {
    /// Decode source bytes and prepare a centered crop at `aspect`
    /// (width, height). `None` when the bytes don't decode or the aspect is
    /// degenerate.
    pub fn from_bytes(bytes: &[u8], aspect: (u32, u32)) -> Option<Self> {
        if aspect.0 == 0 || aspect.1 == 0 {
            return None;
        }
        let image = match image::load_from_memory(bytes) {
            Ok(img) => img,
            Err(e) => {
                warn!(error = %e, "center crop: source did not decode");
                return None;
            }
        };
        Some(Self {
            image: Some(image),
            aspect,
            zoom: 1.0,
        })
    }

    /// The centered window for the current zoom: largest rect with the
    /// target aspect that fits the source, divided by the zoom level.
    fn window(&self, src_w: u32, src_h: u32) -> (u32, u32, u32, u32) {
        let (aw, ah) = (self.aspect.0 as f64, self.aspect.1 as f64);
        let (sw, sh) = (src_w as f64, src_h as f64);

        let (mut w, mut h) = if sw / sh > aw / ah {
            // Source wider than target aspect: height binds
            (sh * aw / ah, sh)
        } else {
            (sw, sw * ah / aw)
        };
        w /= self.zoom;
        h /= self.zoom;

        let w = (w.round() as u32).clamp(1, src_w);
        let h = (h.round() as u32).clamp(1, src_h);
        let x = (src_w - w) / 2;
        let y = (src_h - h) / 2;
        (x, y, w, h)
    }
}

impl CropTool for CenterCrop {
    fn zoom_level(&self) -> f64 {
        self.zoom
    }

    fn zoom_by(&mut self, delta: f64) {
        self.zoom += delta;
    }

    fn crop_region(&mut self) -> Option<Vec<u8>> {
        let image = self.image.as_ref()?;
        let (x, y, w, h) = self.window(image.width(), image.height());
        let cropped = image.crop_imm(x, y, w, h).to_rgb8();

        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, 90);
        if let Err(e) = encoder.write_image(
            cropped.as_raw(),
            cropped.width(),
            cropped.height(),
            ExtendedColorType::Rgb8,
        ) {
            warn!(error = %e, "center crop: region re-encode failed");
            return None;
        }
        Some(out)
    }

    fn destroy(&mut self) {
        self.image = None;
    }
}
