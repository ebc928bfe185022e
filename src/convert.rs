//! Conversion entry points.
//!
//! [`Converter`] composes the pipeline stages: ensure the engine is loaded,
//! open a session, render and encode, close. Both public operations return
//! values rather than `Result`s; every failure becomes a
//! [`ConversionResult::Failure`] whose message says which stage failed.
//!
//! pdfium is blocking, so each call moves its whole session onto
//! `spawn_blocking`. The session never leaves that closure, which keeps
//! document handles private to the call that opened them.

use crate::config::{ConversionOptions, EngineConfig, RangeOptions};
use crate::engine::{EngineFactory, EngineLoader, PdfiumFactory, RenderEngine};
use crate::error::ConvertError;
use crate::output::{ConversionResult, ConversionResultList};
use crate::pipeline::encode::{self, EncodedImage};
use crate::pipeline::input::SourceDocument;
use crate::pipeline::render;
use crate::pipeline::session::{with_session, PageHandle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Converts PDF pages to PNG images with a shared, lazily loaded engine.
///
/// Cloning is cheap; clones share the same [`EngineLoader`].
///
/// # Example
/// ```rust,no_run
/// use pdf2img::{ConversionOptions, Converter, EngineConfig, SourceDocument};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = Converter::pdfium(EngineConfig::from_env());
/// let source = SourceDocument::from_path("resume.pdf").await?;
/// let result = converter
///     .convert_page(&source, &ConversionOptions::default())
///     .await;
/// match result.error() {
///     None => println!("{}", result.file().unwrap().name),
///     Some(msg) => eprintln!("{msg}"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct Converter<F: EngineFactory = PdfiumFactory> {
    loader: Arc<EngineLoader<F>>,
}

impl<F: EngineFactory> Clone for Converter<F> {
    fn clone(&self) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
        }
    }
}

impl Converter<PdfiumFactory> {
    /// A converter backed by pdfium, bound according to `config` on first use.
    ///
    /// Build one per process and clone it. Each call creates its own loader,
    /// and dropping the last clone of a loaded converter unloads pdfium's
    /// global state even while other converters are still rendering.
    pub fn pdfium(config: EngineConfig) -> Self {
        Self::new(Arc::new(EngineLoader::new(PdfiumFactory::new(config))))
    }
}

impl<F: EngineFactory> Converter<F> {
    pub fn new(loader: Arc<EngineLoader<F>>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Arc<EngineLoader<F>> {
        &self.loader
    }

    /// Convert a single page.
    ///
    /// An out-of-range page yields
    /// `"Invalid page number: N. Document has M pages."`; any other failure
    /// yields `"Failed to convert PDF: <cause>"`.
    pub async fn convert_page(
        &self,
        source: &SourceDocument,
        options: &ConversionOptions,
    ) -> ConversionResult {
        let start = Instant::now();
        info!(
            "Converting page {} of '{}' (scale {}, quality {})",
            options.page_number,
            source.name(),
            options.scale,
            options.quality
        );

        let engine = match self.loader.ensure_loaded().await {
            Ok(engine) => engine,
            Err(e) => return document_failure(e.into()),
        };

        let bytes = source.shared_bytes();
        let name = source.name().to_string();
        let options = *options;
        let task = tokio::task::spawn_blocking(move || {
            convert_page_blocking(&*engine, &bytes, &name, &options)
        });

        let result = match task.await {
            Ok(result) => result,
            Err(e) => document_failure(ConvertError::Internal(format!("conversion task failed: {e}"))),
        };

        match result.error() {
            None => info!("Page converted in {}ms", start.elapsed().as_millis()),
            Some(msg) => warn!("{}", msg),
        }
        result
    }

    /// Convert a page range.
    ///
    /// The range is clamped to the document. The returned list has one entry
    /// per page in the clamped range, in page order, and a failing page never
    /// stops the pages after it. A call that fails before any page is
    /// attempted (engine, document, empty range) returns a single failure.
    pub async fn convert_range(
        &self,
        source: &SourceDocument,
        options: &RangeOptions,
    ) -> ConversionResultList {
        let start = Instant::now();
        info!(
            "Converting pages {}..{} of '{}'",
            options.start_page,
            options
                .end_page
                .map_or_else(|| "end".to_string(), |e| e.to_string()),
            source.name()
        );

        let engine = match self.loader.ensure_loaded().await {
            Ok(engine) => engine,
            Err(e) => return vec![document_failure(e.into())],
        };

        let bytes = source.shared_bytes();
        let name = source.name().to_string();
        let options = options.clone();
        let task = tokio::task::spawn_blocking(move || {
            convert_range_blocking(&*engine, &bytes, &name, &options)
        });

        let results = match task.await {
            Ok(results) => results,
            Err(e) => vec![document_failure(ConvertError::Internal(format!(
                "conversion task failed: {e}"
            )))],
        };

        let ok = results.iter().filter(|r| r.is_success()).count();
        info!(
            "Range conversion complete: {}/{} pages in {}ms",
            ok,
            results.len(),
            start.elapsed().as_millis()
        );
        results
    }

    /// Blocking wrapper around [`Converter::convert_page`].
    ///
    /// Creates a temporary tokio runtime; do not call from inside one.
    pub fn convert_page_sync(
        &self,
        source: &SourceDocument,
        options: &ConversionOptions,
    ) -> ConversionResult {
        match runtime() {
            Ok(rt) => rt.block_on(self.convert_page(source, options)),
            Err(e) => document_failure(e),
        }
    }

    /// Blocking wrapper around [`Converter::convert_range`].
    ///
    /// Creates a temporary tokio runtime; do not call from inside one.
    pub fn convert_range_sync(
        &self,
        source: &SourceDocument,
        options: &RangeOptions,
    ) -> ConversionResultList {
        match runtime() {
            Ok(rt) => rt.block_on(self.convert_range(source, options)),
            Err(e) => vec![document_failure(e)],
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {e}")))
}

fn document_failure(e: ConvertError) -> ConversionResult {
    ConversionResult::failure(format!("Failed to convert PDF: {e}"))
}

fn render_and_encode(
    page: &PageHandle<'_>,
    scale: f32,
    quality: f32,
    source_name: &str,
) -> Result<EncodedImage, ConvertError> {
    let surface = render::render_page(page, scale)?;
    encode::encode_surface(&surface, quality, source_name)
}

fn convert_page_blocking(
    engine: &dyn RenderEngine,
    bytes: &[u8],
    source_name: &str,
    options: &ConversionOptions,
) -> ConversionResult {
    let outcome = with_session(engine, bytes, |session| {
        let page = match session.page(options.page_number) {
            Ok(page) => page,
            Err(e @ ConvertError::InvalidPage { .. }) => {
                return ConversionResult::failure(e.to_string())
            }
            Err(e) => return document_failure(e),
        };
        match render_and_encode(&page, options.scale, options.quality, source_name) {
            Ok(image) => ConversionResult::success(image),
            Err(e) => document_failure(e),
        }
    });
    outcome.unwrap_or_else(document_failure)
}

fn convert_range_blocking(
    engine: &dyn RenderEngine,
    bytes: &[u8],
    source_name: &str,
    options: &RangeOptions,
) -> ConversionResultList {
    let callback = options.progress_callback.as_ref();

    let outcome = with_session(engine, bytes, |session| {
        let (start, end) = options.clamp_to(session.page_count());
        if start > end {
            return vec![ConversionResult::failure(
                ConvertError::EmptyRange { start, end }.to_string(),
            )];
        }

        let total = (end - start + 1) as usize;
        debug!("Clamped range {}..={} ({} pages)", start, end, total);
        if let Some(cb) = callback {
            cb.on_conversion_start(total);
        }

        let mut results = Vec::with_capacity(total);
        for page_number in start..=end {
            if let Some(cb) = callback {
                cb.on_page_start(page_number, total);
            }

            let outcome = session.page(page_number).and_then(|page| {
                render_and_encode(&page, options.scale, options.quality, source_name)
            });

            match outcome {
                Ok(image) => {
                    if let Some(cb) = callback {
                        cb.on_page_complete(page_number, total, image.len());
                    }
                    results.push(ConversionResult::success(image));
                }
                Err(e) => {
                    let message = format!("Failed to convert page {page_number}: {e}");
                    warn!("{}", message);
                    if let Some(cb) = callback {
                        cb.on_page_error(page_number, total, &message);
                    }
                    results.push(ConversionResult::failure(message));
                }
            }
        }

        if let Some(cb) = callback {
            let ok = results.iter().filter(|r| r.is_success()).count();
            cb.on_conversion_complete(total, ok);
        }
        results
    });

    outcome.unwrap_or_else(|e| vec![document_failure(e)])
}

/// Write every successful artifact in `results` into `dir`.
///
/// Each file is written to a temporary name and renamed into place, so a
/// reader never sees a half-written image. Failures are skipped. Returns the
/// written paths in result order.
pub async fn write_images(
    results: &[ConversionResult],
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, ConvertError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::new();
    for file in results.iter().filter_map(ConversionResult::file) {
        let path = dir.join(&file.name);
        let tmp_path = dir.join(format!("{}.tmp", file.name));

        tokio::fs::write(&tmp_path, &file.bytes)
            .await
            .map_err(|e| ConvertError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| ConvertError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!("Wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(name: &str) -> EncodedImage {
        EncodedImage {
            name: name.into(),
            mime_type: encode::PNG_MIME.into(),
            page_number: 1,
            width: 1,
            height: 1,
            bytes: b"png-bytes".to_vec(),
        }
    }

    #[tokio::test]
    async fn write_images_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let results = vec![
            ConversionResult::success(encoded("a_page_1.png")),
            ConversionResult::failure("Failed to convert page 2: boom"),
            ConversionResult::success(encoded("a_page_3.png")),
        ];

        let paths = write_images(&results, &out).await.unwrap();
        assert_eq!(
            paths,
            vec![out.join("a_page_1.png"), out.join("a_page_3.png")]
        );
        assert_eq!(std::fs::read(&paths[0]).unwrap(), b"png-bytes");
        let leftovers: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn load_failure_message_names_the_engine() {
        let r = document_failure(crate::error::LoadError::new("no libpdfium").into());
        assert_eq!(
            r.error(),
            Some("Failed to convert PDF: PDF engine failed to load: no libpdfium")
        );
    }
}
