//! Mapping between preview space and source space.
//!
//! Pointer events arrive in the coordinate space of the on-screen preview,
//! which is the source image shrunk by a power-of-two [`ScaleFactor`]. The mask
//! and the reconstruction work on the full-resolution source, so every
//! rectangle the user drags is mapped through [`ScaleFactor::map_rect`] and
//! then clipped with [`SourceRect::clip`] before it touches any pixel buffer.

use std::fmt;

/// A pointer position on the preview surface.
///
/// Drags can leave the canvas, so coordinates may be negative or larger than
/// the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewPoint {
    /// Horizontal position, left to right.
    pub x: i32,
    /// Vertical position, top to bottom.
    pub y: i32,
}

impl PreviewPoint {
    /// Create a preview-space point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A position in source (full-resolution) space. Not clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePoint {
    /// Horizontal position, left to right.
    pub x: i64,
    /// Vertical position, top to bottom.
    pub y: i64,
}

impl SourcePoint {
    /// Create a source-space point.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Downscale factor `1 / 2^n` between the source image and its preview.
///
/// Always a power of two no greater than one, chosen once per loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScaleFactor {
    halvings: u32,
}

impl ScaleFactor {
    /// No downscaling.
    pub const IDENTITY: Self = Self { halvings: 0 };

    /// Halve until both `width` and `height` times the factor fit in `max_dim`.
    ///
    /// A `max_dim` of zero is treated as one.
    #[must_use]
    pub fn fit(width: u32, height: u32, max_dim: u32) -> Self {
        let limit = u64::from(max_dim.max(1));
        let longest = u64::from(width.max(height));
        let mut halvings = 0;
        while longest > limit << halvings {
            halvings += 1;
        }
        Self { halvings }
    }

    /// Factor of exactly `1 / 2^halvings`, or `None` past 32 halvings, which
    /// no `u32` image needs.
    #[must_use]
    pub fn from_halvings(halvings: u32) -> Option<Self> {
        (halvings <= 32).then_some(Self { halvings })
    }

    /// How many times the source was halved.
    #[must_use]
    pub const fn halvings(self) -> u32 {
        self.halvings
    }

    /// The reciprocal of the factor: source pixels per preview pixel.
    #[must_use]
    pub const fn divisor(self) -> i64 {
        1_i64 << self.halvings
    }

    /// The factor as a float (`1.0`, `0.5`, `0.25`, ...).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        1.0 / self.divisor() as f64
    }

    /// Scale one source dimension down to preview size, never below one pixel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn scale_dimension(self, dim: u32) -> u32 {
        // result <= dim, so the narrowing cast is lossless
        (u64::from(dim) >> self.halvings).max(1) as u32
    }

    /// Preview `(width, height)` for a source of the given size.
    #[must_use]
    pub fn preview_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        (self.scale_dimension(width), self.scale_dimension(height))
    }

    /// Map a preview point into source space (`floor(p / factor)`).
    #[must_use]
    pub fn to_source(self, p: PreviewPoint) -> SourcePoint {
        let d = self.divisor();
        SourcePoint::new(i64::from(p.x) * d, i64::from(p.y) * d)
    }

    /// Map a source point back onto the preview (`floor(p * factor)`).
    #[must_use]
    pub fn to_preview(self, p: SourcePoint) -> PreviewPoint {
        let d = self.divisor();
        PreviewPoint::new(saturate_i32(p.x.div_euclid(d)), saturate_i32(p.y.div_euclid(d)))
    }

    /// Map a preview rectangle into source space. No clipping is done here.
    #[must_use]
    pub fn map_rect(self, r: PreviewRect) -> SourceRect {
        let min = self.to_source(PreviewPoint::new(r.x0, r.y0));
        let max = self.to_source(PreviewPoint::new(r.x1, r.y1));
        SourceRect {
            x0: min.x,
            y0: min.y,
            x1: max.x,
            y1: max.y,
        }
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.halvings == 0 {
            write!(f, "1")
        } else {
            write!(f, "1/{}", self.divisor())
        }
    }
}

fn saturate_i32(v: i64) -> i32 {
    i32::try_from(v).unwrap_or(if v < 0 { i32::MIN } else { i32::MAX })
}

/// A half-open rectangle `[x0, x1) x [y0, y1)` in preview space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewRect {
    /// Left edge, inclusive.
    pub x0: i32,
    /// Top edge, inclusive.
    pub y0: i32,
    /// Right edge, exclusive.
    pub x1: i32,
    /// Bottom edge, exclusive.
    pub y1: i32,
}

impl PreviewRect {
    /// The rectangle spanned by two drag points, in either order.
    #[must_use]
    pub fn spanning(a: PreviewPoint, b: PreviewPoint) -> Self {
        Self {
            x0: a.x.min(b.x),
            y0: a.y.min(b.y),
            x1: a.x.max(b.x),
            y1: a.y.max(b.y),
        }
    }

    /// True when the rectangle covers no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// A half-open rectangle in source space, possibly outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceRect {
    /// Left edge, inclusive.
    pub x0: i64,
    /// Top edge, inclusive.
    pub y0: i64,
    /// Right edge, exclusive.
    pub x1: i64,
    /// Bottom edge, exclusive.
    pub y1: i64,
}

impl SourceRect {
    /// Intersect with `[0, width) x [0, height)`.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn clip(&self, width: u32, height: u32) -> Option<PixelRect> {
        let x0 = self.x0.clamp(0, i64::from(width));
        let x1 = self.x1.clamp(0, i64::from(width));
        let y0 = self.y0.clamp(0, i64::from(height));
        let y1 = self.y1.clamp(0, i64::from(height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        // all four are within [0, u32::MAX] after clamping
        Some(PixelRect {
            x0: x0 as u32,
            y0: y0 as u32,
            x1: x1 as u32,
            y1: y1 as u32,
        })
    }
}

/// A non-empty half-open rectangle guaranteed to lie inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge, inclusive.
    pub x0: u32,
    /// Top edge, inclusive.
    pub y0: u32,
    /// Right edge, exclusive.
    pub x1: u32,
    /// Bottom edge, exclusive.
    pub y1: u32,
}

impl PixelRect {
    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Whether `(x, y)` lies inside.
    #[must_use]
    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_within_limit_are_not_scaled() {
        assert_eq!(ScaleFactor::fit(1000, 1000, 1000), ScaleFactor::IDENTITY);
        assert_eq!(ScaleFactor::fit(640, 480, 1000), ScaleFactor::IDENTITY);
        assert_eq!(ScaleFactor::fit(1, 1000, 1000), ScaleFactor::IDENTITY);
    }

    #[test]
    fn large_images_halve_until_they_fit() {
        let s = ScaleFactor::fit(2000, 1000, 1000);
        assert_eq!(s.halvings(), 1);
        assert_eq!(s.preview_dimensions(2000, 1000), (1000, 500));

        // 2001 * 1/2 = 1000.5 still exceeds the limit
        assert_eq!(ScaleFactor::fit(2001, 10, 1000).halvings(), 2);

        let s = ScaleFactor::fit(1200, 9000, 1000);
        assert_eq!(s.halvings(), 4);
        let (w, h) = s.preview_dimensions(1200, 9000);
        assert!(w <= 1000 && h <= 1000);
    }

    #[test]
    fn fitted_factor_keeps_both_dimensions_in_bounds() {
        for &(w, h) in &[(1001, 1), (4000, 3000), (1, 65_000), (99_999, 2)] {
            let s = ScaleFactor::fit(w, h, 1000);
            assert!(s.halvings() > 0);
            assert!(f64::from(w) * s.as_f64() <= 1000.0);
            assert!(f64::from(h) * s.as_f64() <= 1000.0);
        }
    }

    #[test]
    fn preview_dimension_never_collapses_to_zero() {
        let s = ScaleFactor::fit(5000, 1, 1000);
        assert_eq!(s.preview_dimensions(5000, 1), (625, 1));
    }

    #[test]
    fn display_shows_fraction() {
        assert_eq!(ScaleFactor::IDENTITY.to_string(), "1");
        assert_eq!(ScaleFactor::from_halvings(2).unwrap().to_string(), "1/4");
        assert!((ScaleFactor::from_halvings(1).unwrap().as_f64() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn halvings_past_u32_range_are_rejected() {
        assert_eq!(ScaleFactor::from_halvings(32).map(ScaleFactor::halvings), Some(32));
        assert!(ScaleFactor::from_halvings(33).is_none());
    }

    #[test]
    fn mapping_multiplies_by_divisor() {
        let s = ScaleFactor::from_halvings(1).unwrap();
        assert_eq!(s.to_source(PreviewPoint::new(100, 150)), SourcePoint::new(200, 300));
        assert_eq!(s.to_source(PreviewPoint::new(-3, 0)), SourcePoint::new(-6, 0));
    }

    #[test]
    fn round_trip_is_within_one_pixel() {
        for halvings in 0..5 {
            let s = ScaleFactor::from_halvings(halvings).unwrap();
            for &(x, y) in &[(0, 0), (1, 7), (333, 999), (-5, 12)] {
                let p = PreviewPoint::new(x, y);
                let back = s.to_preview(s.to_source(p));
                assert!((back.x - p.x).abs() <= 1);
                assert!((back.y - p.y).abs() <= 1);
            }
        }
    }

    #[test]
    fn source_to_preview_floors() {
        let s = ScaleFactor::from_halvings(2).unwrap();
        assert_eq!(s.to_preview(SourcePoint::new(7, 8)), PreviewPoint::new(1, 2));
        assert_eq!(s.to_preview(SourcePoint::new(-1, 0)), PreviewPoint::new(-1, 0));
    }

    #[test]
    fn spanning_rect_is_order_independent() {
        let a = PreviewPoint::new(200, 150);
        let b = PreviewPoint::new(100, 100);
        assert_eq!(PreviewRect::spanning(a, b), PreviewRect::spanning(b, a));
        let r = PreviewRect::spanning(a, b);
        assert_eq!((r.x0, r.y0, r.x1, r.y1), (100, 100, 200, 150));
        assert!(PreviewRect::spanning(a, a).is_empty());
    }

    #[test]
    fn map_rect_scales_both_corners() {
        let s = ScaleFactor::from_halvings(1).unwrap();
        let r = PreviewRect::spanning(PreviewPoint::new(100, 100), PreviewPoint::new(200, 150));
        let m = s.map_rect(r);
        assert_eq!((m.x0, m.y0, m.x1, m.y1), (200, 200, 400, 300));
    }

    #[test]
    fn clip_keeps_rect_inside_image() {
        let r = SourceRect {
            x0: -10,
            y0: 5,
            x1: 50,
            y1: 500,
        };
        let c = r.clip(40, 100).unwrap();
        assert_eq!((c.x0, c.y0, c.x1, c.y1), (0, 5, 40, 100));
        assert_eq!(c.area(), 40 * 95);
        assert!(c.contains(0, 5));
        assert!(!c.contains(40, 5));
    }

    #[test]
    fn clip_outside_image_is_none() {
        let r = SourceRect {
            x0: 100,
            y0: 0,
            x1: 200,
            y1: 10,
        };
        assert!(r.clip(100, 100).is_none());
        let r = SourceRect {
            x0: -20,
            y0: -20,
            x1: -1,
            y1: 10,
        };
        assert!(r.clip(100, 100).is_none());
    }
}
