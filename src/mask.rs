//! Full-resolution inpainting mask and the stroke accumulator that fills it.
//!
//! The mask is the union of every rectangle dragged since the last reset.
//! Strokes are recorded in preview space and committed in source space: each
//! [`MaskAccumulator::extend_stroke`] maps the anchor/current rectangle through
//! the [`ScaleFactor`], clips it and marks it. Marking is idempotent, so a drag
//! that reports hundreds of intermediate positions only ever grows the mask.

use image::{GrayImage, Luma};
use tracing::debug;

use crate::geometry::{PixelRect, PreviewPoint, PreviewRect, ScaleFactor, SourceRect};

/// Value stored for pixels that should be reconstructed.
pub const MARKED: u8 = 255;
/// Value stored for pixels that pass through unchanged.
pub const UNMARKED: u8 = 0;

/// Rectangles shorter than this are filled on the calling thread.
#[cfg(feature = "cli")]
const PARALLEL_MIN_ROWS: u32 = 64;

/// Single-channel binary mask at source resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    buffer: GrayImage,
}

impl Mask {
    /// A zero-filled mask of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: GrayImage::new(width, height),
        }
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Mark every pixel of `rect` that lies inside the mask.
    ///
    /// Returns the clipped rectangle that was marked, or `None` if `rect` missed
    /// the mask entirely.
    pub fn mark(&mut self, rect: SourceRect) -> Option<PixelRect> {
        let clipped = rect.clip(self.width(), self.height())?;
        self.fill(clipped);
        Some(clipped)
    }

    fn fill(&mut self, rect: PixelRect) {
        let stride = self.width() as usize;
        let (x0, x1) = (rect.x0 as usize, rect.x1 as usize);
        let rows: &mut [u8] = &mut self.buffer;
        let rows = &mut rows[rect.y0 as usize * stride..rect.y1 as usize * stride];

        #[cfg(feature = "cli")]
        {
            if rect.height() >= PARALLEL_MIN_ROWS {
                use rayon::prelude::*;
                rows.par_chunks_exact_mut(stride)
                    .for_each(|row| row[x0..x1].fill(MARKED));
                return;
            }
        }

        for row in rows.chunks_exact_mut(stride) {
            row[x0..x1].fill(MARKED);
        }
    }

    /// Whether `(x, y)` is marked. Coordinates outside the mask are unmarked.
    #[must_use]
    pub fn is_marked(&self, x: u32, y: u32) -> bool {
        self.buffer
            .get_pixel_checked(x, y)
            .is_some_and(|px| px[0] != UNMARKED)
    }

    /// Number of marked pixels.
    #[must_use]
    pub fn marked_count(&self) -> u64 {
        self.buffer.as_raw().iter().filter(|&&v| v != UNMARKED).count() as u64
    }

    /// True when no pixel is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.as_raw().iter().all(|&v| v == UNMARKED)
    }

    /// Smallest rectangle containing every marked pixel.
    #[must_use]
    pub fn bounding_box(&self) -> Option<PixelRect> {
        let mut bbox: Option<PixelRect> = None;
        for (x, y, px) in self.buffer.enumerate_pixels() {
            if px[0] == UNMARKED {
                continue;
            }
            bbox = Some(match bbox {
                None => PixelRect {
                    x0: x,
                    y0: y,
                    x1: x + 1,
                    y1: y + 1,
                },
                Some(b) => PixelRect {
                    x0: b.x0.min(x),
                    y0: b.y0.min(y),
                    x1: b.x1.max(x + 1),
                    y1: b.y1.max(y + 1),
                },
            });
        }
        bbox
    }

    /// Unmark every pixel.
    pub fn clear(&mut self) {
        for px in self.buffer.pixels_mut() {
            *px = Luma([UNMARKED]);
        }
    }

    /// The underlying 0/255 grayscale buffer.
    #[must_use]
    pub fn as_gray(&self) -> &GrayImage {
        &self.buffer
    }
}

/// One press-drag-release sequence, kept in preview space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stroke {
    anchor: PreviewPoint,
    current: PreviewPoint,
}

impl Stroke {
    fn rect(&self) -> PreviewRect {
        PreviewRect::spanning(self.anchor, self.current)
    }
}

/// Accumulates rectangular strokes into a [`Mask`].
///
/// The live rectangle of the stroke in progress ([`Self::live_rect`]) is kept
/// apart from the committed mask, so redrawing it never alters marked pixels.
#[derive(Debug, Clone)]
pub struct MaskAccumulator {
    mask: Mask,
    scale: ScaleFactor,
    stroke: Option<Stroke>,
}

impl MaskAccumulator {
    /// A zero-filled accumulator for a `width` x `height` source.
    #[must_use]
    pub fn new(width: u32, height: u32, scale: ScaleFactor) -> Self {
        Self {
            mask: Mask::new(width, height),
            scale,
            stroke: None,
        }
    }

    /// Record the anchor of a new stroke. Nothing is marked yet.
    pub fn begin_stroke(&mut self, at: PreviewPoint) {
        debug!(x = at.x, y = at.y, "stroke started");
        self.stroke = Some(Stroke {
            anchor: at,
            current: at,
        });
    }

    /// Move the stroke to `to` and mark the rectangle it spans.
    ///
    /// Ignored when no stroke is in progress.
    pub fn extend_stroke(&mut self, to: PreviewPoint) -> Option<PixelRect> {
        let stroke = self.stroke.as_mut()?;
        stroke.current = to;
        let rect = stroke.rect();
        self.commit(rect)
    }

    /// Mark the final rectangle and finish the stroke.
    pub fn end_stroke(&mut self, at: PreviewPoint) -> Option<PixelRect> {
        let marked = self.extend_stroke(at);
        if self.stroke.take().is_some() {
            debug!(x = at.x, y = at.y, ?marked, "stroke finished");
        }
        marked
    }

    fn commit(&mut self, rect: PreviewRect) -> Option<PixelRect> {
        if rect.is_empty() {
            return None;
        }
        self.mask.mark(self.scale.map_rect(rect))
    }

    /// Preview-space rectangle of the stroke in progress, for drawing only.
    #[must_use]
    pub fn live_rect(&self) -> Option<PreviewRect> {
        self.stroke.map(|s| s.rect())
    }

    /// Whether a stroke is in progress.
    #[must_use]
    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    /// Unmark everything and drop any stroke in progress.
    pub fn reset(&mut self) {
        self.mask.clear();
        self.stroke = None;
    }

    /// The committed mask.
    #[must_use]
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Scale used to map strokes into source space.
    #[must_use]
    pub fn scale(&self) -> ScaleFactor {
        self.scale
    }
}
