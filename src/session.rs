//! The editing session: load, mark, reconstruct, save.
//!
//! A [`Session`] owns everything about the image being edited and moves
//! through four phases:
//!
//! ```text
//! Empty --open--> Loaded --stroke--> Marking --reconstruct--> Reconstructed
//!                   ^                   ^                           |
//!                   |                   +----------stroke-----------+
//!                   +------------------ open (from any phase) ------+
//! ```
//!
//! Opening always starts over: the mask is zero-filled and any previous output
//! is dropped. Reconstruction consumes the marks exactly once. Only a
//! reconstructed session has anything to save.

use std::fmt;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::{debug, error, info, warn};

use crate::config::SessionOptions;
use crate::error::{Error, Result};
use crate::geometry::{PixelRect, PreviewPoint, PreviewRect, ScaleFactor};
use crate::image_io;
use crate::inpaint::{Inpainter, TeleaInpainter};
use crate::mask::{Mask, MaskAccumulator};

/// Outline color of the rectangle being dragged.
const LIVE_RECT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Lifecycle phase of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No image loaded.
    Empty,
    /// An image is loaded and the mask is empty.
    Loaded,
    /// At least one stroke has been made since the last load or reconstruction.
    Marking,
    /// A reconstructed output is available for saving.
    Reconstructed,
}

/// Dimensions shown next to the preview, recomputed on every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readout {
    /// Preview width in pixels.
    pub preview_width: u32,
    /// Preview height in pixels.
    pub preview_height: u32,
    /// Source width in pixels.
    pub original_width: u32,
    /// Source height in pixels.
    pub original_height: u32,
    /// Preview-to-source scale.
    pub scale: ScaleFactor,
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "width:  {}, original width:  {}",
            self.preview_width, self.original_width
        )?;
        writeln!(
            f,
            "height: {}, original height: {}",
            self.preview_height, self.original_height
        )?;
        write!(
            f,
            "scale:  {} (reconstruction and saving use the original size)",
            self.scale
        )
    }
}

/// What an open replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOutcome {
    /// Readout for the newly loaded image.
    pub readout: Readout,
    /// Marks (or a stroke in progress) were thrown away.
    pub discarded_marks: bool,
    /// A reconstructed output that was never saved was thrown away.
    pub discarded_output: bool,
}

#[derive(Debug)]
struct Document {
    path: Option<PathBuf>,
    source: RgbImage,
    preview: RgbImage,
    marks: MaskAccumulator,
    output: Option<RgbImage>,
    output_saved: bool,
}

impl Document {
    fn new(source: RgbImage, max_preview_dim: u32) -> Self {
        let (width, height) = source.dimensions();
        let scale = ScaleFactor::fit(width, height, max_preview_dim);
        let preview = make_preview(&source, scale);
        Self {
            path: None,
            preview,
            marks: MaskAccumulator::new(width, height, scale),
            source,
            output: None,
            output_saved: false,
        }
    }

    fn readout(&self) -> Readout {
        Readout {
            preview_width: self.preview.width(),
            preview_height: self.preview.height(),
            original_width: self.source.width(),
            original_height: self.source.height(),
            scale: self.marks.scale(),
        }
    }

    fn has_pending_marks(&self) -> bool {
        self.marks.is_stroking() || !self.marks.mask().is_empty()
    }

    fn has_unsaved_output(&self) -> bool {
        self.output.is_some() && !self.output_saved
    }
}

fn make_preview(source: &RgbImage, scale: ScaleFactor) -> RgbImage {
    if scale == ScaleFactor::IDENTITY {
        return source.clone();
    }
    let (w, h) = scale.preview_dimensions(source.width(), source.height());
    imageops::resize(source, w, h, FilterType::Lanczos3)
}

/// Single owner of the loaded image, its mask and the last reconstruction.
pub struct Session<I = TeleaInpainter> {
    options: SessionOptions,
    inpainter: I,
    phase: Phase,
    doc: Option<Document>,
}

impl Session {
    /// An empty session reconstructing with [`TeleaInpainter`] at the
    /// configured radius.
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        let inpainter = TeleaInpainter::new(options.inpaint_radius);
        Self::with_inpainter(options, inpainter)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl<I: Inpainter> Session<I> {
    /// An empty session using a custom reconstruction backend.
    #[must_use]
    pub fn with_inpainter(options: SessionOptions, inpainter: I) -> Self {
        Self {
            options,
            inpainter,
            phase: Phase::Empty,
            doc: None,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Options this session was created with.
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Decode `path` and make it the current image.
    ///
    /// On failure the session is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageDecode`] if the file cannot be read or decoded.
    pub fn open(&mut self, path: &Path) -> Result<OpenOutcome> {
        let image = match image_io::load_image(path) {
            Ok(image) => image,
            Err(e) => {
                warn!(path = %path.display(), "open failed, keeping current image: {e}");
                return Err(e);
            }
        };
        let outcome = self.load(image);
        if let Some(doc) = self.doc.as_mut() {
            doc.path = Some(path.to_path_buf());
        }
        Ok(outcome)
    }

    /// Make an already decoded image the current one.
    ///
    /// Discards the mask, any stroke in progress and any previous output.
    pub fn load(&mut self, image: RgbImage) -> OpenOutcome {
        let (discarded_marks, discarded_output) = self
            .doc
            .as_ref()
            .map_or((false, false), |d| (d.has_pending_marks(), d.has_unsaved_output()));
        if discarded_marks {
            warn!("discarding unreconstructed marks");
        }
        if discarded_output {
            warn!("discarding unsaved reconstruction");
        }

        let doc = Document::new(image, self.options.max_preview_dim);
        let readout = doc.readout();
        info!(
            width = readout.original_width,
            height = readout.original_height,
            scale = %readout.scale,
            "image loaded"
        );
        self.doc = Some(doc);
        self.phase = Phase::Loaded;

        OpenOutcome {
            readout,
            discarded_marks,
            discarded_output,
        }
    }

    fn doc_mut(&mut self) -> Result<&mut Document> {
        self.doc.as_mut().ok_or(Error::NoImageLoaded)
    }

    /// Start a stroke at a preview-space point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoImageLoaded`] in the empty phase.
    pub fn begin_stroke(&mut self, at: PreviewPoint) -> Result<()> {
        self.doc_mut()?.marks.begin_stroke(at);
        self.phase = Phase::Marking;
        Ok(())
    }

    /// Drag the current stroke to `to`, marking the rectangle it spans.
    ///
    /// Returns the source-space rectangle that was marked, if any. Without a
    /// stroke in progress this does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoImageLoaded`] in the empty phase.
    pub fn extend_stroke(&mut self, to: PreviewPoint) -> Result<Option<PixelRect>> {
        let marks = &mut self.doc_mut()?.marks;
        if !marks.is_stroking() {
            return Ok(None);
        }
        let marked = marks.extend_stroke(to);
        self.phase = Phase::Marking;
        Ok(marked)
    }

    /// Release the current stroke at `at`, marking its final rectangle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoImageLoaded`] in the empty phase.
    pub fn end_stroke(&mut self, at: PreviewPoint) -> Result<Option<PixelRect>> {
        let marks = &mut self.doc_mut()?.marks;
        if !marks.is_stroking() {
            return Ok(None);
        }
        let marked = marks.end_stroke(at);
        self.phase = Phase::Marking;
        Ok(marked)
    }

    /// Reconstruct the marked pixels of the source image.
    ///
    /// Stores the result as the new output and resets the mask. Once
    /// reconstructed, the marks are spent: calling again before a new stroke
    /// returns the existing output without running the inpainter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoImageLoaded`] in the empty phase, or whatever the
    /// inpainter reports. A [`Error::DimensionMismatch`] is logged as an
    /// internal fault.
    pub fn reconstruct(&mut self) -> Result<&RgbImage> {
        if self.phase == Phase::Reconstructed {
            info!("no new marks since the last reconstruction");
            return self.output().ok_or(Error::NoImageLoaded);
        }
        let doc = self.doc.as_mut().ok_or(Error::NoImageLoaded)?;
        let marked = doc.marks.mask().marked_count();
        info!(marked, "reconstructing");

        let output = match self.inpainter.inpaint(&doc.source, doc.marks.mask()) {
            Ok(output) => output,
            Err(e) => {
                if e.is_fatal() {
                    error!("mask and image diverged: {e}");
                }
                return Err(e);
            }
        };

        doc.marks.reset();
        doc.output_saved = false;
        self.phase = Phase::Reconstructed;
        Ok(&*doc.output.insert(output))
    }

    /// Write the reconstructed output to `path`.
    ///
    /// A path without an extension gets `.jpg`. Returns the path written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NothingToSave`] unless the session is in the
    /// reconstructed phase, or the I/O and encoding errors of
    /// [`image_io::save_image`].
    pub fn save(&mut self, path: &Path) -> Result<PathBuf> {
        if self.phase != Phase::Reconstructed {
            info!("nothing to save");
            return Err(Error::NothingToSave);
        }
        let doc = self.doc.as_mut().ok_or(Error::NothingToSave)?;
        let output = doc.output.as_ref().ok_or(Error::NothingToSave)?;

        let path = image_io::with_default_extension(path);
        image_io::save_image(output, &path, self.options.jpeg_quality)?;
        doc.output_saved = true;
        info!(path = %path.display(), "output saved");
        Ok(path)
    }

    /// Readout for the loaded image.
    #[must_use]
    pub fn readout(&self) -> Option<Readout> {
        self.doc.as_ref().map(Document::readout)
    }

    /// Preview-to-source scale of the loaded image.
    #[must_use]
    pub fn scale(&self) -> Option<ScaleFactor> {
        self.doc.as_ref().map(|d| d.marks.scale())
    }

    /// Path the current image was opened from, if it came from a file.
    #[must_use]
    pub fn source_path(&self) -> Option<&Path> {
        self.doc.as_ref().and_then(|d| d.path.as_deref())
    }

    /// Where to save when no path is given: `<stem>_cleaned.jpg` next to the
    /// source file.
    #[must_use]
    pub fn default_save_path(&self) -> Option<PathBuf> {
        self.source_path().map(image_io::default_output_path)
    }

    /// Full-resolution source image.
    #[must_use]
    pub fn source(&self) -> Option<&RgbImage> {
        self.doc.as_ref().map(|d| &d.source)
    }

    /// Downscaled image for display.
    #[must_use]
    pub fn preview(&self) -> Option<&RgbImage> {
        self.doc.as_ref().map(|d| &d.preview)
    }

    /// The committed mask.
    #[must_use]
    pub fn mask(&self) -> Option<&Mask> {
        self.doc.as_ref().map(|d| d.marks.mask())
    }

    /// The most recent reconstruction.
    #[must_use]
    pub fn output(&self) -> Option<&RgbImage> {
        self.doc.as_ref().and_then(|d| d.output.as_ref())
    }

    /// Preview-space rectangle of the stroke in progress.
    #[must_use]
    pub fn live_rect(&self) -> Option<PreviewRect> {
        self.doc.as_ref().and_then(|d| d.marks.live_rect())
    }

    /// The preview with the stroke in progress outlined.
    #[must_use]
    pub fn render_preview(&self) -> Option<RgbImage> {
        let doc = self.doc.as_ref()?;
        let mut canvas = doc.preview.clone();
        if let Some(rect) = doc.marks.live_rect() {
            draw_outline(&mut canvas, rect, LIVE_RECT_COLOR);
        }
        Some(canvas)
    }

    /// The latest output shrunk to preview size.
    #[must_use]
    pub fn output_preview(&self) -> Option<RgbImage> {
        let doc = self.doc.as_ref()?;
        let output = doc.output.as_ref()?;
        Some(make_preview(output, doc.marks.scale()))
    }
}

/// Draw a one-pixel outline of `rect`, skipping parts off the canvas.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_outline(canvas: &mut RgbImage, rect: PreviewRect, color: Rgb<u8>) {
    if rect.is_empty() {
        return;
    }
    let (w, h) = (i64::from(canvas.width()), i64::from(canvas.height()));
    let (x0, y0) = (i64::from(rect.x0), i64::from(rect.y0));
    let (x1, y1) = (i64::from(rect.x1) - 1, i64::from(rect.y1) - 1);

    let mut plot = |x: i64, y: i64| {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    };
    for x in x0.max(0)..=x1.min(w - 1) {
        plot(x, y0);
        plot(x, y1);
    }
    for y in y0.max(0)..=y1.min(h - 1) {
        plot(x0, y);
        plot(x1, y);
    }
    debug!(?rect, "live rectangle drawn");
}
