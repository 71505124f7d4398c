//! Error types for the watermark-inpaint crate.

use std::path::PathBuf;

/// Errors that can occur while loading, marking, reconstructing or saving.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The image file could not be read or decoded.
    #[error("failed to open {}: {source}", .path.display())]
    ImageDecode {
        /// Path that was being opened.
        path: PathBuf,
        /// Underlying decoder error.
        source: image::ImageError,
    },

    /// A stroke or reconstruction was requested before any image was loaded.
    #[error("no image loaded")]
    NoImageLoaded,

    /// Mask and image sizes diverged.
    #[error(
        "mask is {mask_width}x{mask_height} but image is {image_width}x{image_height}"
    )]
    DimensionMismatch {
        /// Image width in pixels.
        image_width: u32,
        /// Image height in pixels.
        image_height: u32,
        /// Mask width in pixels.
        mask_width: u32,
        /// Mask height in pixels.
        mask_height: u32,
    },

    /// Save was requested but there is no reconstructed output.
    #[error("nothing to save: reconstruct the image first")]
    NothingToSave,

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The inpainting backend failed.
    #[error("inpainting failed: {0}")]
    Inpaint(#[from] ::inpaint::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred while encoding an image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Whether this error signals a broken internal invariant rather than a
    /// recoverable user mistake.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DimensionMismatch { .. })
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let mismatch = Error::DimensionMismatch {
            image_width: 20,
            image_height: 10,
            mask_width: 10,
            mask_height: 20,
        };
        let msg = mismatch.to_string();
        assert!(msg.contains("10x20"));
        assert!(msg.contains("20x10"));

        assert!(Error::NothingToSave.to_string().contains("nothing to save"));

        let backend = Error::from(::inpaint::Error::NoData);
        assert!(backend.to_string().starts_with("inpainting failed"));
        assert!(!backend.is_fatal());
    }

    #[test]
    fn only_dimension_mismatch_is_fatal() {
        let mismatch = Error::DimensionMismatch {
            image_width: 1,
            image_height: 1,
            mask_width: 2,
            mask_height: 2,
        };
        assert!(mismatch.is_fatal());
        assert!(!Error::NothingToSave.is_fatal());
        assert!(!Error::NoImageLoaded.is_fatal());
        assert!(!Error::InvalidConfig("radius".into()).is_fatal());
    }
}
