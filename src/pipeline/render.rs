//! Page rasterisation: scaled viewport → opaque RGBA surface.
//!
//! The viewport is `ceil(width · scale) × ceil(height · scale)` pixels with
//! rotation fixed at 0. The engine draws into a bitmap of that size, and the
//! result is composited over a white canvas so any transparent region of the
//! page comes out white; the PNG encoder downstream assumes an opaque image.

use super::session::PageHandle;
use crate::engine::PageSize;
use crate::error::ConvertError;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::debug;

/// Longest surface edge we are willing to allocate, in pixels.
pub const MAX_SURFACE_EDGE: u32 = 32_767;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// The pixel-space rectangle a page is projected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Project a page of intrinsic `size` (points) at `scale`.
    pub fn for_page(size: PageSize, scale: f32) -> Result<Self, String> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(format!("scale must be a positive number, got {scale}"));
        }
        let width = scaled_edge(size.width, scale)?;
        let height = scaled_edge(size.height, scale)?;
        Ok(Self { width, height })
    }
}

fn scaled_edge(points: f32, scale: f32) -> Result<u32, String> {
    let px = (f64::from(points) * f64::from(scale)).ceil();
    if !px.is_finite() || px < 1.0 {
        return Err(format!("page edge of {points}pt at scale {scale} is empty"));
    }
    if px > f64::from(MAX_SURFACE_EDGE) {
        return Err(format!(
            "page edge of {points}pt at scale {scale} needs {px}px (limit {MAX_SURFACE_EDGE}px)"
        ));
    }
    Ok(px as u32)
}

/// A rendered page, consumed by the encoder.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    page_number: u32,
    image: RgbaImage,
}

impl RasterSurface {
    /// Wrap an already-rendered image.
    pub fn from_image(page_number: u32, image: RgbaImage) -> Self {
        Self { page_number, image }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

/// Rasterise `page` at `scale`.
pub fn render_page(page: &PageHandle<'_>, scale: f32) -> Result<RasterSurface, ConvertError> {
    let number = page.number();
    let viewport =
        Viewport::for_page(page.size(), scale).map_err(|e| ConvertError::render(number, e))?;

    let drawn = page.rasterize(viewport.width, viewport.height)?;
    let image = composite_on_white(drawn, viewport);

    debug!(
        "Rendered page {} → {}x{} px",
        number,
        image.width(),
        image.height()
    );

    Ok(RasterSurface {
        page_number: number,
        image,
    })
}

fn composite_on_white(drawn: RgbaImage, viewport: Viewport) -> RgbaImage {
    let drawn = if drawn.dimensions() == (viewport.width, viewport.height) {
        drawn
    } else {
        imageops::resize(&drawn, viewport.width, viewport.height, FilterType::Triangle)
    };
    let mut canvas = RgbaImage::from_pixel(viewport.width, viewport.height, WHITE);
    imageops::overlay(&mut canvas, &drawn, 0, 0);
    canvas
}
