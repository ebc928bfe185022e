//! The rendering engine seam.
//!
//! The pipeline never talks to pdfium directly. It sees three traits that
//! mirror the engine's own object graph:
//!
//! ```text
//! RenderEngine ──open──▶ EngineDocument ──page──▶ EnginePage ──rasterize──▶ RgbaImage
//! ```
//!
//! and an [`EngineFactory`] that knows how to bring the engine up. The
//! production backend is [`pdfium::PdfiumFactory`]; tests plug in doubles.
//!
//! All trait methods are blocking. The conversion layer calls them from
//! `spawn_blocking`, never from an async worker thread.

pub mod loader;
pub mod pdfium;

pub use loader::EngineLoader;
pub use pdfium::{PdfiumEngine, PdfiumFactory};

use crate::error::{ConvertError, LoadError};
use image::RgbaImage;

/// Intrinsic page size in PDF points (1/72 inch), before scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A loaded rendering engine, shared by every conversion in the process.
pub trait RenderEngine: Send + Sync + 'static {
    /// Human-readable engine name, for diagnostics.
    fn name(&self) -> &str;

    /// Parse `bytes` as a document.
    ///
    /// Fails with [`ConvertError::InvalidDocument`] when the bytes are not a
    /// readable PDF.
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn EngineDocument + 'a>, ConvertError>;
}

/// An open document. Owned by exactly one [`crate::pipeline::session::DocumentSession`].
pub trait EngineDocument {
    fn page_count(&self) -> usize;

    /// Look up a page by 0-based index. Callers range-check first.
    fn page<'d>(&'d self, index: usize) -> Result<Box<dyn EnginePage + 'd>, ConvertError>;

    /// Release engine-side resources. Called at most once, by the session.
    fn close(self: Box<Self>) -> Result<(), ConvertError> {
        Ok(())
    }
}

/// A page borrowed from an open document for the duration of one render.
pub trait EnginePage {
    /// Intrinsic size in points, rotation 0.
    fn size(&self) -> PageSize;

    /// Draw the page into a `width × height` RGBA bitmap.
    ///
    /// Unpainted regions may be transparent; the renderer composites the
    /// result onto an opaque background.
    fn rasterize(&self, width: u32, height: u32) -> Result<RgbaImage, ConvertError>;
}

/// Brings an engine up. Invoked at most once per successful load by
/// [`EngineLoader`], on the blocking pool.
pub trait EngineFactory: Send + Sync + 'static {
    type Engine: RenderEngine;

    fn acquire(&self) -> Result<Self::Engine, LoadError>;
}
