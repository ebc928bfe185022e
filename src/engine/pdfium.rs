//! pdfium backend for the engine traits.
//!
//! Binding order for the shared library:
//!
//! 1. [`EngineConfig::library_path`] — the library file itself, or a
//!    directory holding the platform library name (`libpdfium.so`, …).
//! 2. The working directory.
//! 3. The system library search path.
//!
//! pdfium-render is built with `thread_safe` (every FFI call goes through a
//! global lock) and `sync` (`Pdfium: Send + Sync`), so one [`PdfiumEngine`]
//! is shared between the blocking threads of concurrent conversions.
//!
//! Dropping the last [`PdfiumEngine`] calls `FPDF_DestroyLibrary`, which
//! tears down pdfium's process-global state. Keep a single engine alive for
//! the life of the process rather than binding one per task.

use super::{EngineDocument, EngineFactory, EnginePage, PageSize, RenderEngine};
use crate::config::EngineConfig;
use crate::error::{ConvertError, LoadError};
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Binds pdfium according to an [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct PdfiumFactory {
    config: EngineConfig,
}

impl PdfiumFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for PdfiumFactory {
    type Engine = PdfiumEngine;

    fn acquire(&self) -> Result<PdfiumEngine, LoadError> {
        let bindings = match &self.config.library_path {
            Some(path) => bind_explicit(path)?,
            None => Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| {
                    LoadError::new(format!(
                        "no pdfium library in the working directory or on the system path ({e:?}); \
                         set {} to point at one",
                        crate::config::PDFIUM_LIB_PATH_ENV
                    ))
                })?,
        };
        Ok(PdfiumEngine {
            pdfium: Pdfium::new(bindings),
        })
    }
}

fn bind_explicit(path: &Path) -> Result<Box<dyn PdfiumLibraryBindings>, LoadError> {
    let resolved = if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    };
    debug!("Binding pdfium from {}", resolved.display());
    Pdfium::bind_to_library(&resolved).map_err(|e| {
        LoadError::new(format!(
            "failed to bind pdfium from '{}': {e:?}",
            resolved.display()
        ))
    })
}

/// A bound pdfium library.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl RenderEngine for PdfiumEngine {
    fn name(&self) -> &str {
        "pdfium"
    }

    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn EngineDocument + 'a>, ConvertError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| ConvertError::InvalidDocument {
                detail: format!("{e:?}"),
            })?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> EngineDocument for PdfiumDocument<'a> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page<'d>(&'d self, index: usize) -> Result<Box<dyn EnginePage + 'd>, ConvertError> {
        let number = page_number(index);
        let pdf_index = u16::try_from(index)
            .map_err(|_| ConvertError::render(number, "page index exceeds pdfium's limit"))?;
        let page = self
            .document
            .pages()
            .get(pdf_index)
            .map_err(|e| ConvertError::render(number, format!("{e:?}")))?;
        Ok(Box::new(PdfiumPage { page, number }))
    }

    // Dropping `PdfDocument` closes it inside pdfium.
}

struct PdfiumPage<'a> {
    page: PdfPage<'a>,
    number: u32,
}

impl<'a> EnginePage for PdfiumPage<'a> {
    fn size(&self) -> PageSize {
        PageSize::new(self.page.width().value, self.page.height().value)
    }

    fn rasterize(&self, width: u32, height: u32) -> Result<RgbaImage, ConvertError> {
        let width = i32::try_from(width)
            .map_err(|_| ConvertError::render(self.number, format!("width {width} too large")))?;
        let height = i32::try_from(height)
            .map_err(|_| ConvertError::render(self.number, format!("height {height} too large")))?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height)
            .rotate(PdfPageRenderRotation::None, false)
            .set_clear_color(PdfColor::WHITE);

        let bitmap = self
            .page
            .render_with_config(&render_config)
            .map_err(|e| ConvertError::render(self.number, format!("{e:?}")))?;

        Ok(bitmap.as_image().into_rgba8())
    }
}

fn page_number(index: usize) -> u32 {
    u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<Pdfium>();
        assert_send_sync::<PdfiumEngine>();
    }

    #[test]
    fn page_numbers_are_one_based() {
        assert_eq!(page_number(0), 1);
        assert_eq!(page_number(41), 42);
    }

    #[test]
    fn missing_explicit_library_is_a_load_error() {
        let factory = PdfiumFactory::new(
            EngineConfig::default().with_library_path("/definitely/not/libpdfium.so"),
        );
        let err = factory.acquire().err().expect("binding should fail");
        assert!(err.detail().contains("/definitely/not/libpdfium.so"), "got: {err}");
    }
}
