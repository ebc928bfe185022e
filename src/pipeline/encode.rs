//! Image encoding: `RasterSurface` → PNG artifact + addressable reference.
//!
//! Output is always PNG. The surface is opaque, so the alpha channel is
//! dropped and the artifact is written as 8-bit RGB. `quality` cannot make
//! a lossless format lossy; it picks how hard the deflate stage works.
//!
//! The addressable reference is a base64 `data:` URL, usable immediately by
//! a display collaborator that has no persistent storage yet.

use super::render::RasterSurface;
use crate::error::ConvertError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

pub const PNG_MIME: &str = "image/png";
pub const PNG_EXTENSION: &str = "png";

static PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").expect("static regex"));

/// An encoded page image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedImage {
    /// `<source>_page_<n>.png`
    pub name: String,
    pub mime_type: String,
    pub page_number: u32,
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:image/png;base64,…` reference to the artifact.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Derive the artifact name for `page_number` of the document called `source_name`.
pub fn image_name(source_name: &str, page_number: u32) -> String {
    let base = PDF_SUFFIX.replace(source_name, "");
    format!("{base}_page_{page_number}.{PNG_EXTENSION}")
}

fn compression_for(quality: f32) -> CompressionType {
    if quality >= 0.75 {
        CompressionType::Best
    } else if quality >= 0.35 {
        CompressionType::Default
    } else {
        CompressionType::Fast
    }
}

/// Serialise `surface` as a PNG named after `source_name`.
pub fn encode_surface(
    surface: &RasterSurface,
    quality: f32,
    source_name: &str,
) -> Result<EncodedImage, ConvertError> {
    let page = surface.page_number();
    let rgb = DynamicImage::ImageRgba8(surface.image().clone()).into_rgb8();

    let mut bytes = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut bytes, compression_for(quality), FilterType::Adaptive);
    encoder
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| ConvertError::encode(page, e.to_string()))?;

    if bytes.is_empty() {
        return Err(ConvertError::encode(page, "encoder produced no data"));
    }

    debug!("Encoded page {} → {} bytes PNG", page, bytes.len());

    Ok(EncodedImage {
        name: image_name(source_name, page),
        mime_type: PNG_MIME.to_string(),
        page_number: page,
        width: rgb.width(),
        height: rgb.height(),
        bytes,
    })
}
