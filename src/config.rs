//! Configuration types for PDF-to-image conversion.
//!
//! Per-call behaviour lives in [`ConversionOptions`] (one page) and
//! [`RangeOptions`] (a page range). Process-wide engine settings live in
//! [`EngineConfig`]. Options are built through builders whose setters clamp
//! obviously-out-of-range values and whose `build()` rejects the rest.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default rasterisation scale (2 device pixels per PDF point).
pub const DEFAULT_SCALE: f32 = 2.0;

/// Default encoder quality.
pub const DEFAULT_QUALITY: f32 = 1.0;

/// Environment variable naming an existing pdfium library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Options for a single-page conversion.
///
/// # Example
/// ```rust
/// use pdf2img::ConversionOptions;
///
/// let options = ConversionOptions::builder()
///     .scale(1.5)
///     .page_number(2)
///     .build()
///     .unwrap();
/// assert_eq!(options.page_number, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Device pixels per PDF point. Must be finite and > 0. Default: 2.0.
    pub scale: f32,

    /// Encoder quality in `[0, 1]`. Default: 1.0.
    ///
    /// PNG is lossless, so this only trades encode time for file size.
    pub quality: f32,

    /// 1-indexed page to convert. Default: 1.
    ///
    /// Not validated here: an out-of-range page is reported in the
    /// conversion result, where the document's page count is known.
    pub page_number: u32,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            quality: DEFAULT_QUALITY,
            page_number: 1,
        }
    }
}

impl ConversionOptions {
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`ConversionOptions`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.options.scale = scale;
        self
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.options.quality = clamp_quality(quality);
        self
    }

    pub fn page_number(mut self, page: u32) -> Self {
        self.options.page_number = page;
        self
    }

    pub fn build(self) -> Result<ConversionOptions, ConvertError> {
        validate_scale(self.options.scale)?;
        Ok(self.options)
    }
}

/// Options for a ranged multi-page conversion.
///
/// `start_page` is clamped to 1 and `end_page` to the document's page count
/// at conversion time, so `end_page: None` means "through the last page".
#[derive(Clone)]
pub struct RangeOptions {
    /// Device pixels per PDF point. Default: 2.0.
    pub scale: f32,

    /// Encoder quality in `[0, 1]`. Default: 1.0.
    pub quality: f32,

    /// First page (1-indexed, inclusive). Default: 1.
    pub start_page: u32,

    /// Last page (1-indexed, inclusive). Default: `None` (last page).
    pub end_page: Option<u32>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RangeOptions {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            quality: DEFAULT_QUALITY,
            start_page: 1,
            end_page: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RangeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeOptions")
            .field("scale", &self.scale)
            .field("quality", &self.quality)
            .field("start_page", &self.start_page)
            .field("end_page", &self.end_page)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl RangeOptions {
    pub fn builder() -> RangeOptionsBuilder {
        RangeOptionsBuilder {
            options: Self::default(),
        }
    }

    /// Clamp the requested range against a document of `page_count` pages.
    ///
    /// Returns `(start, end)`; the range is empty when `start > end`.
    pub fn clamp_to(&self, page_count: usize) -> (u32, u32) {
        let count = u32::try_from(page_count).unwrap_or(u32::MAX);
        let start = self.start_page.max(1);
        let end = self.end_page.map_or(count, |e| e.min(count));
        (start, end)
    }
}

/// Builder for [`RangeOptions`].
#[derive(Debug)]
pub struct RangeOptionsBuilder {
    options: RangeOptions,
}

impl RangeOptionsBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.options.scale = scale;
        self
    }

    pub fn quality(mut self, quality: f32) -> Self {
        self.options.quality = clamp_quality(quality);
        self
    }

    pub fn start_page(mut self, page: u32) -> Self {
        self.options.start_page = page.max(1);
        self
    }

    pub fn end_page(mut self, page: u32) -> Self {
        self.options.end_page = Some(page);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.options.progress_callback = Some(cb);
        self
    }

    pub fn build(self) -> Result<RangeOptions, ConvertError> {
        validate_scale(self.options.scale)?;
        if self.options.end_page == Some(0) {
            return Err(ConvertError::InvalidConfig(
                "End page must be ≥ 1".into(),
            ));
        }
        Ok(self.options)
    }
}

/// Process-wide engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Explicit pdfium library: either the library file itself or a
    /// directory containing the platform library name. When `None` the
    /// working directory and then the system library path are searched.
    pub library_path: Option<PathBuf>,
}

impl EngineConfig {
    /// Read [`PDFIUM_LIB_PATH_ENV`]; an empty value counts as unset.
    pub fn from_env() -> Self {
        let library_path = std::env::var_os(PDFIUM_LIB_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { library_path }
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }
}

fn clamp_quality(q: f32) -> f32 {
    if q.is_nan() {
        DEFAULT_QUALITY
    } else {
        q.clamp(0.0, 1.0)
    }
}

fn validate_scale(scale: f32) -> Result<(), ConvertError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(ConvertError::InvalidConfig(format!(
            "Scale must be a positive number, got {scale}"
        )));
    }
    Ok(())
}
