//! Session options and their TOML representation.
//!
//! ```toml
//! max_preview_dim = 1000
//! inpaint_radius = 5
//! jpeg_quality = 95
//! ```
//!
//! Missing keys take their default; unknown keys are rejected.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::inpaint::DEFAULT_RADIUS;

/// Options controlling preview scaling, reconstruction and export.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionOptions {
    /// Largest preview width or height; larger images are halved until they fit.
    pub max_preview_dim: u32,
    /// Neighborhood radius of the inpainting algorithm.
    pub inpaint_radius: u32,
    /// JPEG quality (1-100) used when saving to `.jpg`/`.jpeg`.
    pub jpeg_quality: u8,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_preview_dim: 1000,
            inpaint_radius: DEFAULT_RADIUS,
            jpeg_quality: 95,
        }
    }
}

impl SessionOptions {
    /// Parse and validate options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed TOML or unknown keys, and
    /// [`Error::InvalidConfig`] when a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let opts: Self = toml::from_str(text)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise the errors
    /// of [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        if self.max_preview_dim == 0 {
            return Err(Error::InvalidConfig(
                "max_preview_dim must be at least 1".to_string(),
            ));
        }
        if self.inpaint_radius == 0 {
            return Err(Error::InvalidConfig(
                "inpaint_radius must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::InvalidConfig(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
