//! Reconstruction of masked pixels.
//!
//! [`Inpainter`] is the seam the session calls through. [`TeleaInpainter`]
//! delegates to the `inpaint` crate's implementation of Telea's fast marching
//! method ("An Image Inpainting Technique Based on the Fast Marching Method",
//! 2004), which fills the mask from its boundary inwards.

use ::inpaint::prelude::ImageInpaint;
use image::RgbImage;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mask::{Mask, UNMARKED};

/// Neighborhood radius used when none is configured.
pub const DEFAULT_RADIUS: u32 = 5;

/// Reconstructs the marked pixels of an image.
pub trait Inpainter {
    /// Return a copy of `image` with every pixel marked in `mask` replaced.
    ///
    /// Unmarked pixels must come back unchanged, and an empty mask must yield
    /// an exact copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `mask` and `image` differ in size,
    /// or a backend error if reconstruction itself fails.
    fn inpaint(&self, image: &RgbImage, mask: &Mask) -> Result<RgbImage>;
}

/// Telea fast-marching inpainting with a fixed neighborhood radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeleaInpainter {
    radius: u32,
}

impl Default for TeleaInpainter {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS)
    }
}

impl TeleaInpainter {
    /// Create an inpainter; a radius of zero is raised to one.
    #[must_use]
    pub fn new(radius: u32) -> Self {
        Self {
            radius: radius.max(1),
        }
    }

    /// Neighborhood radius in pixels.
    #[must_use]
    pub fn radius(&self) -> u32 {
        self.radius
    }
}

impl Inpainter for TeleaInpainter {
    fn inpaint(&self, image: &RgbImage, mask: &Mask) -> Result<RgbImage> {
        check_dimensions(image, mask)?;
        if mask.is_empty() {
            return Ok(image.clone());
        }

        let area = u64::from(image.width()) * u64::from(image.height());
        let marked = mask.marked_count();
        if marked == area {
            debug!("mask covers the whole image, nothing to fill from");
            return Ok(image.clone());
        }

        let radius = i32::try_from(self.radius).unwrap_or(i32::MAX);
        let mut filled = image.clone();
        filled.telea_inpaint(mask.as_gray(), radius)?;
        debug!(marked, radius, "telea inpainting finished");
        Ok(keep_unmarked(image, filled, mask))
    }
}

/// Restore every unmarked pixel of `filled` from `original`.
fn keep_unmarked(original: &RgbImage, mut filled: RgbImage, mask: &Mask) -> RgbImage {
    for ((out, src), m) in filled
        .pixels_mut()
        .zip(original.pixels())
        .zip(mask.as_gray().pixels())
    {
        if m[0] == UNMARKED {
            *out = *src;
        }
    }
    filled
}

/// Fail with [`Error::DimensionMismatch`] unless `mask` matches `image`.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] when the sizes differ.
pub fn check_dimensions(image: &RgbImage, mask: &Mask) -> Result<()> {
    if image.dimensions() == mask.dimensions() {
        return Ok(());
    }
    Err(Error::DimensionMismatch {
        image_width: image.width(),
        image_height: image.height(),
        mask_width: mask.width(),
        mask_height: mask.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SourceRect;
    use image::Rgb;

    fn masked(width: u32, height: u32, x0: i64, y0: i64, x1: i64, y1: i64) -> Mask {
        let mut m = Mask::new(width, height);
        m.mark(SourceRect { x0, y0, x1, y1 });
        m
    }

    #[allow(clippy::cast_possible_truncation)]
    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]))
    }

    #[test]
    fn empty_mask_returns_identical_image() {
        let img = gradient_image(32, 24);
        let out = TeleaInpainter::default()
            .inpaint(&img, &Mask::new(32, 24))
            .unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let img = RgbImage::new(10, 10);
        let err = TeleaInpainter::default()
            .inpaint(&img, &Mask::new(10, 11))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                image_height: 10,
                mask_height: 11,
                ..
            }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn unmarked_pixels_pass_through() {
        let img = gradient_image(40, 40);
        let mask = masked(40, 40, 10, 10, 20, 20);
        let out = TeleaInpainter::default().inpaint(&img, &mask).unwrap();
        for (x, y, px) in out.enumerate_pixels() {
            if !mask.is_marked(x, y) {
                assert_eq!(px, img.get_pixel(x, y), "pixel ({x}, {y}) changed");
            }
        }
    }

    #[test]
    fn flat_region_is_filled_with_surrounding_color() {
        let mut img = RgbImage::from_pixel(30, 30, Rgb([40, 90, 200]));
        for y in 12..18 {
            for x in 12..18 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let mask = masked(30, 30, 12, 12, 18, 18);
        let out = TeleaInpainter::new(3).inpaint(&img, &mask).unwrap();
        for y in 12..18 {
            for x in 12..18 {
                let px = out.get_pixel(x, y);
                for (got, want) in px.0.iter().zip([40_u8, 90, 200]) {
                    assert!(got.abs_diff(want) <= 1, "({x}, {y}): {px:?}");
                }
            }
        }
    }

    #[test]
    fn horizontal_ramp_is_continued_smoothly() {
        let img = RgbImage::from_fn(40, 20, |x, _| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 6) as u8;
            Rgb([v, v, v])
        });
        let mut stamped = img.clone();
        for y in 8..12 {
            for x in 18..22 {
                stamped.put_pixel(x, y, Rgb([0, 255, 0]));
            }
        }
        let mask = masked(40, 20, 18, 8, 22, 12);
        let out = TeleaInpainter::default().inpaint(&stamped, &mask).unwrap();
        for y in 8..12 {
            for x in 18..22 {
                let got = out.get_pixel(x, y);
                let want = img.get_pixel(x, y)[0];
                assert_eq!(got[0], got[1]);
                assert!(
                    got[0].abs_diff(want) <= 24,
                    "({x}, {y}): got {}, expected about {want}",
                    got[0]
                );
            }
        }
    }

    #[test]
    fn mask_touching_image_border_is_filled() {
        let mut img = RgbImage::from_pixel(16, 16, Rgb([10, 20, 30]));
        img.put_pixel(0, 0, Rgb([250, 250, 250]));
        let mask = masked(16, 16, 0, 0, 3, 3);
        let out = TeleaInpainter::default().inpaint(&img, &mask).unwrap();
        let px = out.get_pixel(0, 0);
        for (got, want) in px.0.iter().zip([10_u8, 20, 30]) {
            assert!(got.abs_diff(want) <= 1, "{px:?}");
        }
    }

    #[test]
    fn fully_masked_image_is_left_unchanged() {
        let img = gradient_image(8, 8);
        let mask = masked(8, 8, 0, 0, 8, 8);
        let out = TeleaInpainter::default().inpaint(&img, &mask).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn zero_radius_is_raised_to_one() {
        assert_eq!(TeleaInpainter::new(0).radius(), 1);
        assert_eq!(TeleaInpainter::default().radius(), DEFAULT_RADIUS);
    }

    #[test]
    fn restoring_unmarked_pixels_keeps_only_the_fill() {
        let original = RgbImage::from_pixel(4, 1, Rgb([1, 1, 1]));
        let filled = RgbImage::from_pixel(4, 1, Rgb([9, 9, 9]));
        let mask = masked(4, 1, 1, 0, 3, 1);
        let out = keep_unmarked(&original, filled, &mask);
        let row: Vec<u8> = out.pixels().map(|p| p[0]).collect();
        assert_eq!(row, vec![1, 9, 9, 1]);
    }
}
