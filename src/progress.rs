//! Progress-callback trait for per-page conversion events.
//!
//! Attach an [`Arc<dyn ConversionProgressCallback>`] to
//! [`crate::config::RangeOptionsBuilder::progress_callback`] to receive
//! events while a range is rendered. Callbacks fire on the blocking thread
//! that owns the document session, in page order.
//!
//! # Example
//!
//! ```rust
//! use pdf2img::{ConversionProgressCallback, RangeOptions};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: u32, total_pages: usize, image_bytes: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_num, total_pages, image_bytes);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let options = RangeOptions::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the range conversion as it processes each page.
///
/// All methods default to no-ops so implementors override only what they
/// need. Implementations must be `Send + Sync` because the session runs on
/// tokio's blocking pool.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the range has been clamped, before the first page.
    ///
    /// `total_pages` is the number of pages that will be attempted.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page is rasterised.
    fn on_page_start(&self, page_num: u32, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been rendered and encoded.
    ///
    /// `image_bytes` is the size of the encoded PNG.
    fn on_page_complete(&self, page_num: u32, total_pages: usize, image_bytes: usize) {
        let _ = (page_num, total_pages, image_bytes);
    }

    /// Called when a page fails; the batch continues with the next page.
    fn on_page_error(&self, page_num: u32, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page in the range has been attempted.
    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RangeOptions`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
