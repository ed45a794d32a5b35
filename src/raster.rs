//! # Page Rasters and Chunk Thumbnails
//!
//! Source pages are shown to the user as rasters rendered at a fixed
//! magnification ([`LayoutConfig::raster_scale`](crate::config::LayoutConfig)).
//! Rendering itself belongs to a collaborator behind [`PageRasterizer`]: a
//! browser host renders with its own engine and hands the images over
//! ([`PrerenderedPages`]); headless exports only need correctly sized
//! canvases ([`BlankRasterizer`]).
//!
//! Chunk thumbnails are crops of a page raster. Areas of the chunk that fall
//! outside the raster stay transparent.

use std::io::Cursor;
use std::path::Path;

use image::{ImageOutputFormat, Rgba, RgbaImage};

use crate::error::{PrintDiffError, Result};
use crate::model::Rect;
use crate::pdf::SourcePdf;

/// Produces the raster for one source page.
pub trait PageRasterizer {
    /// Render page `page_index` of `source` at `scale` raster pixels per PDF unit.
    fn rasterize(&self, source: &SourcePdf, page_index: usize, scale: f64) -> Result<RgbaImage>;
}

/// Renders every page as an opaque white canvas of the right size.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankRasterizer;

impl PageRasterizer for BlankRasterizer {
    fn rasterize(&self, source: &SourcePdf, page_index: usize, scale: f64) -> Result<RgbaImage> {
        let (width, height) = source
            .page_size(page_index)
            .ok_or(PrintDiffError::PageOutOfRange(page_index))?;
        let px_w = (width * scale).round().max(1.0) as u32;
        let px_h = (height * scale).round().max(1.0) as u32;
        Ok(RgbaImage::from_pixel(px_w, px_h, Rgba([255, 255, 255, 255])))
    }
}

/// Page images rendered by the host, one per source page.
#[derive(Debug, Clone, Default)]
pub struct PrerenderedPages {
    images: Vec<RgbaImage>,
}

impl PrerenderedPages {
    pub fn new(images: Vec<RgbaImage>) -> Self {
        Self { images }
    }

    /// Decode one image per page. Each source is a data URI, the path of an
    /// image file, or bare base64 image data.
    pub fn from_sources<S: AsRef<str>>(sources: &[S]) -> Result<Self> {
        let images = sources
            .iter()
            .enumerate()
            .map(|(page, src)| load_page_image(page, src.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { images })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl PageRasterizer for PrerenderedPages {
    fn rasterize(&self, _source: &SourcePdf, page_index: usize, _scale: f64) -> Result<RgbaImage> {
        self.images
            .get(page_index)
            .cloned()
            .ok_or_else(|| PrintDiffError::Render {
                page: page_index,
                message: "no pre-rendered image supplied for this page".to_string(),
            })
    }
}

/// Cut `rect` out of `page`. The result is `rect.w` x `rect.h` pixels; parts
/// of the rectangle outside the page are transparent.
pub fn crop(page: &RgbaImage, rect: &Rect) -> RgbaImage {
    let width = rect.w.round().max(1.0) as u32;
    let height = rect.h.round().max(1.0) as u32;
    let mut canvas = RgbaImage::new(width, height);
    image::imageops::overlay(
        &mut canvas,
        page,
        -(rect.x.round() as i64),
        -(rect.y.round() as i64),
    );
    canvas
}

/// Encode a raster as PNG bytes.
pub fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    raster.write_to(&mut buf, ImageOutputFormat::Png)?;
    Ok(buf.into_inner())
}

/// Encode a raster as a `data:image/png;base64,...` URI for display.
pub fn to_data_uri(raster: &RgbaImage) -> Result<String> {
    let png = encode_png(raster)?;
    Ok(format!("data:image/png;base64,{}", base64_encode(&png)))
}

/// Where a host-rendered page image is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageSource<'a> {
    /// The payload of a `data:` URI.
    DataUri(&'a str),
    File(&'a Path),
    Base64(&'a str),
}

impl<'a> ImageSource<'a> {
    /// A string naming an existing file is a path; anything else that is not
    /// a data URI is taken as base64. There is no filesystem on wasm, so
    /// there every non-URI source is base64.
    fn classify(src: &'a str) -> std::result::Result<Self, String> {
        if let Some(rest) = src.strip_prefix("data:") {
            let (_, payload) = rest
                .split_once(',')
                .ok_or_else(|| "data URI has no payload".to_string())?;
            return Ok(Self::DataUri(payload));
        }
        let path = Path::new(src);
        if path.is_file() {
            return Ok(Self::File(path));
        }
        Ok(Self::Base64(src))
    }

    fn read(self) -> std::result::Result<Vec<u8>, String> {
        match self {
            Self::DataUri(payload) | Self::Base64(payload) => base64_decode(payload),
            Self::File(path) => {
                std::fs::read(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
            }
        }
    }
}

/// Decode the image for source page `page` from `src`.
pub fn load_page_image(page: usize, src: &str) -> Result<RgbaImage> {
    let render_error = |message: String| PrintDiffError::Render { page, message };
    let bytes = ImageSource::classify(src)
        .and_then(ImageSource::read)
        .map_err(render_error)?;
    image::load_from_memory(&bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| render_error(format!("not a PNG or JPEG image: {}", e)))
}

pub(crate) fn base64_encode(input: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(input)
}

fn base64_decode(input: &str) -> std::result::Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| format!("invalid base64: {}", e))
}
