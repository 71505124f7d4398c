//! Remove watermarks by masking them on a preview and inpainting the region.
//!
//! Large images are shown as a preview shrunk by a power of two. Rectangles
//! dragged on that preview are mapped back to full resolution and collected in
//! a binary mask, which Telea's fast marching method (from the `inpaint`
//! crate) then fills from the surrounding pixels. Reconstruction and export always happen at the
//! original size.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use watermark_inpaint::{PreviewPoint, Session, SessionOptions};
//!
//! let mut session = Session::new(SessionOptions::default());
//! let opened = session.open(Path::new("photo.jpg")).expect("failed to open");
//! println!("{}", opened.readout);
//!
//! // a drag on the preview, from press to release
//! session.begin_stroke(PreviewPoint::new(100, 100)).unwrap();
//! session.extend_stroke(PreviewPoint::new(160, 130)).unwrap();
//! session.end_stroke(PreviewPoint::new(200, 150)).unwrap();
//!
//! session.reconstruct().expect("reconstruction failed");
//! session.save(Path::new("photo_cleaned.jpg")).expect("save failed");
//! ```
//!
//! # Custom reconstruction
//!
//! [`Session::with_inpainter`] accepts any [`Inpainter`]. The contract is
//! that unmarked pixels come back unchanged and an empty mask is the identity.

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod geometry;
pub mod image_io;
pub mod inpaint;
pub mod mask;
pub mod session;

pub use config::SessionOptions;
pub use error::{Error, Result};
pub use geometry::{PixelRect, PreviewPoint, PreviewRect, ScaleFactor, SourcePoint, SourceRect};
pub use image_io::{default_output_path, is_supported_image, load_image, save_image};
pub use crate::inpaint::{Inpainter, TeleaInpainter};
pub use mask::{Mask, MaskAccumulator};
pub use session::{OpenOutcome, Phase, Readout, Session};
