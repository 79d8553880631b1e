//! Pipeline configuration.
//!
//! Loaded from a single `photoslot.toml`. All values have defaults; config
//! files are sparse; override just what you want:
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [limits]
//! max_bytes = 20971520   # Upload ceiling in bytes (20 MiB)
//!
//! [crop]
//! width = 280            # Final crop dimensions in pixels
//! height = 400
//! quality = 75           # JPEG quality (1-100)
//!
//! [display]
//! width = 800            # Display-normalized rendition
//! height = 600
//! quality = 70
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::resize::{Quality, ResizeSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Pipeline configuration loaded from `photoslot.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhotoConfig {
    /// Upload limits.
    pub limits: LimitsConfig,
    /// Final crop dimensions and quality.
    pub crop: RenditionConfig,
    /// Display-normalized rendition dimensions and quality.
    pub display: RenditionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Upload ceiling in bytes, inclusive.
    pub max_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_bytes: crate::validate::MAX_PHOTO_BYTES,
        }
    }
}

/// One output rendition: target dimensions plus JPEG quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenditionConfig {
    pub width: u32,
    pub height: u32,
    pub quality: Quality,
}

impl Default for RenditionConfig {
    fn default() -> Self {
        // Serves as the crop default; PhotoConfig::default overrides display
        Self {
            width: 280,
            height: 400,
            quality: Quality::new(75),
        }
    }
}

impl RenditionConfig {
    pub fn spec(&self) -> ResizeSpec {
        ResizeSpec::new(self.width, self.height).with_quality(self.quality)
    }
}

impl PhotoConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file if it exists, falling back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "limits.max_bytes must be non-zero".into(),
            ));
        }
        for (name, rendition) in [("crop", &self.crop), ("display", &self.display)] {
            if rendition.width == 0 || rendition.height == 0 {
                return Err(ConfigError::Validation(format!(
                    "{name}.width and {name}.height must be non-zero"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            limits: LimitsConfig::default(),
            crop: RenditionConfig::default(),
            display: RenditionConfig {
                width: 800,
                height: 600,
                quality: Quality::new(70),
            },
        }
    }
}

/// Stock config with every option documented, for `gen-config`.
pub fn stock_config_toml() -> String {
    let defaults = PhotoConfig::default();
    format!(
        "\
# photoslot configuration
# All options are optional - defaults shown below

[limits]
max_bytes = {max_bytes}   # Upload ceiling in bytes (20 MiB)

[crop]
width = {crop_w}          # Final crop dimensions in pixels
height = {crop_h}
quality = {crop_q}        # JPEG quality (1-100)

[display]
width = {disp_w}          # Display-normalized rendition
height = {disp_h}
quality = {disp_q}
",
        max_bytes = defaults.limits.max_bytes,
        crop_w = defaults.crop.width,
        crop_h = defaults.crop.height,
        crop_q = defaults.crop.quality.value(),
        disp_w = defaults.display.width,
        disp_h = defaults.display.height,
        disp_q = defaults.display.quality.value(),
    )
}
