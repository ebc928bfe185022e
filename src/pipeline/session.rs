//! Document sessions: open, page lookup, guaranteed teardown.
//!
//! A [`DocumentSession`] owns the engine-side document for the duration of
//! one conversion call. Teardown happens through [`DocumentSession::close`],
//! which is idempotent and swallows engine errors, and through `Drop`, so an
//! early return or a panic inside the body still releases the document.
//! [`with_session`] wraps the whole open → body → close sequence.

use crate::engine::{EngineDocument, EnginePage, PageSize, RenderEngine};
use crate::error::ConvertError;
use image::RgbaImage;
use tracing::{debug, warn};

/// An open document, exclusively owned by the call that opened it.
pub struct DocumentSession<'e> {
    document: Option<Box<dyn EngineDocument + 'e>>,
    page_count: usize,
}

impl<'e> DocumentSession<'e> {
    /// Parse `bytes` with `engine`.
    pub fn open(engine: &'e dyn RenderEngine, bytes: &'e [u8]) -> Result<Self, ConvertError> {
        let document = engine.open(bytes)?;
        let page_count = document.page_count();
        debug!("Opened document: {} pages, {} bytes", page_count, bytes.len());
        Ok(Self {
            document: Some(document),
            page_count,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn is_closed(&self) -> bool {
        self.document.is_none()
    }

    /// Check a 1-indexed page number against the page count.
    pub fn check_page(&self, page_number: u32) -> Result<(), ConvertError> {
        if page_number == 0 || page_number as usize > self.page_count {
            return Err(ConvertError::InvalidPage {
                page: page_number,
                total: self.page_count,
            });
        }
        Ok(())
    }

    /// Borrow a 1-indexed page for rendering.
    pub fn page(&self, page_number: u32) -> Result<PageHandle<'_>, ConvertError> {
        let document = self.document.as_ref().ok_or(ConvertError::DocumentClosed)?;
        self.check_page(page_number)?;
        let inner = document.page(page_number as usize - 1)?;
        Ok(PageHandle {
            number: page_number,
            inner,
        })
    }

    /// Release the document. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(document) = self.document.take() {
            match document.close() {
                Ok(()) => debug!("Closed document"),
                Err(e) => warn!("Ignoring error while closing document: {}", e),
            }
        }
    }
}

impl Drop for DocumentSession<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Open a session, run `body`, close the session, and return the body's value.
///
/// An open failure is returned as `Err`; the body's own outcome is returned
/// unchanged inside `Ok` and is never affected by teardown.
pub fn with_session<'e, R>(
    engine: &'e dyn RenderEngine,
    bytes: &'e [u8],
    body: impl FnOnce(&DocumentSession<'e>) -> R,
) -> Result<R, ConvertError> {
    let mut session = DocumentSession::open(engine, bytes)?;
    let outcome = body(&session);
    session.close();
    Ok(outcome)
}

/// A page borrowed from a session for a single render.
pub struct PageHandle<'s> {
    number: u32,
    inner: Box<dyn EnginePage + 's>,
}

impl PageHandle<'_> {
    /// 1-indexed page number.
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> PageSize {
        self.inner.size()
    }

    pub(crate) fn rasterize(&self, width: u32, height: u32) -> Result<RgbaImage, ConvertError> {
        self.inner.rasterize(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubEngine {
        pages: usize,
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    struct StubDocument {
        pages: usize,
        closes: Arc<AtomicUsize>,
        fail_close: bool,
    }

    struct StubPage;

    impl RenderEngine for StubEngine {
        fn name(&self) -> &str {
            "stub"
        }

        fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn EngineDocument + 'a>, ConvertError> {
            if !bytes.starts_with(b"%PDF") {
                return Err(ConvertError::InvalidDocument {
                    detail: "missing header".into(),
                });
            }
            Ok(Box::new(StubDocument {
                pages: self.pages,
                closes: Arc::clone(&self.closes),
                fail_close: self.fail_close,
            }))
        }
    }

    impl EngineDocument for StubDocument {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn page<'d>(&'d self, _index: usize) -> Result<Box<dyn EnginePage + 'd>, ConvertError> {
            Ok(Box::new(StubPage))
        }

        fn close(self: Box<Self>) -> Result<(), ConvertError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(ConvertError::Internal("close exploded".into()))
            } else {
                Ok(())
            }
        }
    }

    impl EnginePage for StubPage {
        fn size(&self) -> PageSize {
            PageSize::new(100.0, 50.0)
        }

        fn rasterize(&self, width: u32, height: u32) -> Result<RgbaImage, ConvertError> {
            Ok(RgbaImage::new(width, height))
        }
    }

    fn engine(pages: usize, fail_close: bool) -> StubEngine {
        StubEngine {
            pages,
            closes: Arc::new(AtomicUsize::new(0)),
            fail_close,
        }
    }

    #[test]
    fn open_rejects_garbage() {
        let engine = engine(1, false);
        let err = DocumentSession::open(&engine, b"hello").err().unwrap();
        assert!(matches!(err, ConvertError::InvalidDocument { .. }));
        assert_eq!(engine.closes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let engine = engine(2, false);
        let mut session = DocumentSession::open(&engine, b"%PDF-1.7").unwrap();
        session.close();
        session.close();
        assert!(session.is_closed());
        drop(session);
        assert_eq!(engine.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_errors_are_swallowed() {
        let engine = engine(1, true);
        let mut session = DocumentSession::open(&engine, b"%PDF-1.7").unwrap();
        session.close();
        session.close();
        assert_eq!(engine.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_document() {
        let engine = engine(1, false);
        {
            let _session = DocumentSession::open(&engine, b"%PDF-1.7").unwrap();
        }
        assert_eq!(engine.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn page_lookup_validates_range() {
        let engine = engine(2, false);
        let session = DocumentSession::open(&engine, b"%PDF-1.7").unwrap();
        assert!(session.page(1).is_ok());
        assert!(session.page(2).is_ok());
        for bad in [0, 3, 99] {
            match session.page(bad) {
                Err(ConvertError::InvalidPage { page, total }) => {
                    assert_eq!(page, bad);
                    assert_eq!(total, 2);
                }
                _ => panic!("page {bad} should be rejected"),
            }
        }
    }

    #[test]
    fn page_after_close_is_rejected() {
        let engine = engine(2, false);
        let mut session = DocumentSession::open(&engine, b"%PDF-1.7").unwrap();
        session.close();
        assert!(matches!(session.page(1), Err(ConvertError::DocumentClosed)));
    }

    #[test]
    fn with_session_closes_after_body() {
        let engine = engine(3, false);
        let count = with_session(&engine, b"%PDF-1.7", |s| {
            assert!(!s.is_closed());
            s.page_count()
        })
        .unwrap();
        assert_eq!(count, 3);
        assert_eq!(engine.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn with_session_keeps_outcome_when_close_fails() {
        let engine = engine(1, true);
        let outcome = with_session(&engine, b"%PDF-1.7", |_| "rendered").unwrap();
        assert_eq!(outcome, "rendered");
        assert_eq!(engine.closes.load(Ordering::SeqCst), 1);
    }
}
