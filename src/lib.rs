//! # pdf2img
//!
//! Convert PDF pages into PNG images for on-screen preview and for handing
//! to downstream image-analysis services.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Engine   lazily bind pdfium once per process (memoised, shared)
//!  ├─ 2. Session  open the document, validate pages, guaranteed close
//!  ├─ 3. Render   scaled viewport → opaque white RGBA surface
//!  ├─ 4. Encode   PNG artifact + `<name>_page_<n>.png` + data URL
//!  └─ 5. Result   one `ConversionResult` per page, failures as values
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2img::{Converter, EngineConfig, RangeOptions, SourceDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::pdfium(EngineConfig::from_env());
//!     let source = SourceDocument::from_path("slides.pdf").await?;
//!     let options = RangeOptions::builder().start_page(1).end_page(3).build()?;
//!
//!     let results = converter.convert_range(&source, &options).await;
//!     for r in &results {
//!         match r.file() {
//!             Some(file) => println!("{} ({} bytes)", file.name, file.len()),
//!             None => eprintln!("{}", r.error().unwrap_or_default()),
//!         }
//!     }
//!     pdf2img::write_images(&results, "out").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2img` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2img = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionOptions, ConversionOptionsBuilder, EngineConfig, RangeOptions, RangeOptionsBuilder,
};
pub use convert::{write_images, Converter};
pub use engine::{
    EngineDocument, EngineFactory, EngineLoader, EnginePage, PageSize, PdfiumEngine,
    PdfiumFactory, RenderEngine,
};
pub use error::{ConvertError, ErrorKind, LoadError};
pub use output::{ConversionResult, ConversionResultList};
pub use pipeline::encode::EncodedImage;
pub use pipeline::input::SourceDocument;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
