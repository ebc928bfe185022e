//! In-memory engine double for integration tests.
//!
//! A fake document is plain text starting with `%PDF-FAKE`, followed by
//! `key=value` settings:
//!
//! ```text
//! %PDF-FAKE pages=3 fail=2 size=612x792 close=fail
//! ```
//!
//! `fail` lists pages (comma-separated) whose rasterisation errors, `size` is
//! the page size in points for every page, and `close=fail` makes teardown
//! report an error. Anything not starting with the header fails to open.

#![allow(dead_code)]

use pdf2img::{
    ConvertError, Converter, EngineDocument, EngineFactory, EngineLoader, EnginePage, LoadError,
    PageSize, RenderEngine, SourceDocument,
};
use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const HEADER: &str = "%PDF-FAKE";

/// Shared call counters.
#[derive(Debug, Default)]
pub struct Counters {
    pub acquisitions: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub rasterized: AtomicUsize,
}

impl Counters {
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
    pub fn rasterized(&self) -> usize {
        self.rasterized.load(Ordering::SeqCst)
    }
}

/// Description of a fake document.
#[derive(Debug, Clone)]
pub struct FakePdf {
    pages: usize,
    failing: Vec<u32>,
    size: (f32, f32),
    close_fails: bool,
}

impl FakePdf {
    pub fn pages(pages: usize) -> Self {
        Self {
            pages,
            failing: Vec::new(),
            size: (612.0, 792.0),
            close_fails: false,
        }
    }

    pub fn failing(mut self, page: u32) -> Self {
        self.failing.push(page);
        self
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn close_fails(mut self) -> Self {
        self.close_fails = true;
        self
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut s = format!(
            "{HEADER} pages={} size={}x{}",
            self.pages, self.size.0, self.size.1
        );
        if !self.failing.is_empty() {
            let list: Vec<String> = self.failing.iter().map(u32::to_string).collect();
            s.push_str(&format!(" fail={}", list.join(",")));
        }
        if self.close_fails {
            s.push_str(" close=fail");
        }
        s.into_bytes()
    }

    pub fn source(&self, name: &str) -> SourceDocument {
        SourceDocument::new(name, self.bytes())
    }
}

/// Factory that counts acquisitions and can fail the first few.
pub struct FakeFactory {
    counters: Arc<Counters>,
    fail_first: usize,
    delay: Duration,
}

impl FakeFactory {
    pub fn new(counters: Arc<Counters>) -> Self {
        Self {
            counters,
            fail_first: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn fail_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl EngineFactory for FakeFactory {
    type Engine = FakeEngine;

    fn acquire(&self) -> Result<FakeEngine, LoadError> {
        let n = self.counters.acquisitions.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if n < self.fail_first {
            return Err(LoadError::new("fake engine refused to start"));
        }
        Ok(FakeEngine {
            counters: Arc::clone(&self.counters),
        })
    }
}

#[derive(Debug)]
pub struct FakeEngine {
    counters: Arc<Counters>,
}

impl RenderEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn EngineDocument + 'a>, ConvertError> {
        let text = std::str::from_utf8(bytes).map_err(|_| invalid("not utf-8"))?;
        let mut tokens = text.split_whitespace();
        if tokens.next() != Some(HEADER) {
            return Err(invalid("missing %PDF-FAKE header"));
        }

        let mut doc = FakeDocument {
            pages: 0,
            failing: Vec::new(),
            size: PageSize::new(612.0, 792.0),
            close_fails: false,
            counters: Arc::clone(&self.counters),
        };
        for token in tokens {
            let (key, value) = token.split_once('=').ok_or_else(|| invalid(token))?;
            match key {
                "pages" => doc.pages = value.parse().map_err(|_| invalid(token))?,
                "fail" => {
                    doc.failing = value
                        .split(',')
                        .map(|p| p.parse().map_err(|_| invalid(token)))
                        .collect::<Result<_, _>>()?
                }
                "size" => {
                    let (w, h) = value.split_once('x').ok_or_else(|| invalid(token))?;
                    doc.size = PageSize::new(
                        w.parse().map_err(|_| invalid(token))?,
                        h.parse().map_err(|_| invalid(token))?,
                    );
                }
                "close" => doc.close_fails = value == "fail",
                _ => return Err(invalid(token)),
            }
        }

        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(doc))
    }
}

fn invalid(detail: &str) -> ConvertError {
    ConvertError::InvalidDocument {
        detail: detail.to_string(),
    }
}

struct FakeDocument {
    pages: usize,
    failing: Vec<u32>,
    size: PageSize,
    close_fails: bool,
    counters: Arc<Counters>,
}

impl EngineDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn page<'d>(&'d self, index: usize) -> Result<Box<dyn EnginePage + 'd>, ConvertError> {
        let number = index as u32 + 1;
        Ok(Box::new(FakePage {
            number,
            size: self.size,
            corrupt: self.failing.contains(&number),
            counters: &self.counters,
        }))
    }

    fn close(self: Box<Self>) -> Result<(), ConvertError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        if self.close_fails {
            Err(ConvertError::Internal("fake close failure".into()))
        } else {
            Ok(())
        }
    }
}

struct FakePage<'d> {
    number: u32,
    size: PageSize,
    corrupt: bool,
    counters: &'d Counters,
}

impl EnginePage for FakePage<'_> {
    fn size(&self) -> PageSize {
        self.size
    }

    /// Transparent bitmap with one black pixel in the corner.
    fn rasterize(&self, width: u32, height: u32) -> Result<RgbaImage, ConvertError> {
        if self.corrupt {
            return Err(ConvertError::Render {
                page: self.number,
                detail: "corrupt content stream".into(),
            });
        }
        self.counters.rasterized.fetch_add(1, Ordering::SeqCst);
        let mut img = RgbaImage::new(width, height);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        Ok(img)
    }
}

/// A converter over a fresh fake engine, plus its counters.
pub fn converter() -> (Converter<FakeFactory>, Arc<Counters>) {
    converter_with(|f| f)
}

pub fn converter_with(
    configure: impl FnOnce(FakeFactory) -> FakeFactory,
) -> (Converter<FakeFactory>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let factory = configure(FakeFactory::new(Arc::clone(&counters)));
    let converter = Converter::new(Arc::new(EngineLoader::new(factory)));
    (converter, counters)
}
