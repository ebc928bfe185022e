//! Error types for the pdf2img library.
//!
//! Two types cover two lifetimes of failure:
//!
//! * [`LoadError`] — the rendering engine could not be brought up. It is
//!   `Clone` because one failed acquisition is handed to every caller that
//!   was waiting on it (see [`crate::engine::EngineLoader`]).
//!
//! * [`ConvertError`] — everything that can go wrong after that: the bytes
//!   are not a document, a page number is out of range, a page fails to
//!   rasterise or encode, an output file cannot be written.
//!
//! The conversion entry points on [`crate::Converter`] never return these
//! directly. They are folded into [`crate::ConversionResult::Failure`] so a
//! caller always receives a value it can display.

use std::path::PathBuf;
use thiserror::Error;

/// The rendering engine failed to initialise.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("PDF engine failed to load: {detail}")]
pub struct LoadError {
    detail: String,
}

impl LoadError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Coarse classification of a [`ConvertError`], for callers that branch on
/// the failure class rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Load,
    Document,
    PageRange,
    Render,
    Encode,
    Input,
    Config,
    Io,
    Internal,
}

/// All errors raised inside the conversion pipeline.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Engine ────────────────────────────────────────────────────────────
    #[error(transparent)]
    EngineLoad(#[from] LoadError),

    // ── Document ──────────────────────────────────────────────────────────
    /// The bytes could not be opened as a PDF.
    #[error("Invalid PDF document: {detail}")]
    InvalidDocument { detail: String },

    /// The session was already torn down when a page was requested.
    #[error("Document session is already closed")]
    DocumentClosed,

    // ── Page range ────────────────────────────────────────────────────────
    /// A page number outside `[1, total]`.
    #[error("Invalid page number: {page}. Document has {total} pages.")]
    InvalidPage { page: u32, total: usize },

    /// A range that is empty or inverted once clamped to the document.
    #[error("Start page is greater than end page ({start} > {end})")]
    EmptyRange { start: u32, end: u32 },

    // ── Per-page ──────────────────────────────────────────────────────────
    /// Viewport computation or rasterisation failed.
    #[error("rasterisation failed for page {page}: {detail}")]
    Render { page: u32, detail: String },

    /// The rendered surface could not be serialised.
    #[error("image encoding failed for page {page}: {detail}")]
    Encode { page: u32, detail: String },

    // ── Input ─────────────────────────────────────────────────────────────
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    #[error("File '{path}' is {size} bytes; the limit is {limit} bytes")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("File is not a valid PDF: '{path}' (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Output ────────────────────────────────────────────────────────────
    #[error("Failed to write image '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config ────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::EngineLoad(_) => ErrorKind::Load,
            ConvertError::InvalidDocument { .. } | ConvertError::DocumentClosed => {
                ErrorKind::Document
            }
            ConvertError::InvalidPage { .. } | ConvertError::EmptyRange { .. } => {
                ErrorKind::PageRange
            }
            ConvertError::Render { .. } => ErrorKind::Render,
            ConvertError::Encode { .. } => ErrorKind::Encode,
            ConvertError::FileNotFound { .. }
            | ConvertError::PermissionDenied { .. }
            | ConvertError::TooLarge { .. }
            | ConvertError::NotAPdf { .. } => ErrorKind::Input,
            ConvertError::OutputWriteFailed { .. } => ErrorKind::Io,
            ConvertError::InvalidConfig(_) => ErrorKind::Config,
            ConvertError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand used by engine backends.
    pub fn render(page: u32, detail: impl Into<String>) -> Self {
        ConvertError::Render {
            page,
            detail: detail.into(),
        }
    }

    pub fn encode(page: u32, detail: impl Into<String>) -> Self {
        ConvertError::Encode {
            page,
            detail: detail.into(),
        }
    }
}
