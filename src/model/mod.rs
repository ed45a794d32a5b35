//! # Document Model
//!
//! A [`Document`] is the loaded source PDF plus, for every source page, its
//! raster and the chunks the user marked on it. Chunk rectangles live in
//! page-local raster pixels with the origin at the top-left corner.
//!
//! Pages are shared behind [`Arc`]s. Every mutation goes through
//! [`Arc::make_mut`], so it copies exactly the page it touches and a clone
//! taken earlier (for example the snapshot an export works from) never sees
//! the change.

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::LayoutConfig;
use crate::error::{PrintDiffError, Result};
use crate::pdf::SourcePdf;
use crate::raster::{self, PageRasterizer};

/// An axis-aligned rectangle, origin top-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Both sides strictly positive.
    pub fn has_area(&self) -> bool {
        self.w > 0.0 && self.h > 0.0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.w
            && point.y >= self.y
            && point.y <= self.y + self.h
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

/// A pointer position in page-local raster pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A user-selected region of a source page.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub rect: Rect,
    /// Cropped thumbnail of the region, refreshed when an edit finishes.
    pub image: Option<Arc<RgbaImage>>,
}

impl Chunk {
    pub fn new(rect: Rect) -> Self {
        Self { rect, image: None }
    }

    pub fn is_empty(&self) -> bool {
        !self.rect.has_area()
    }

    /// The cached thumbnail as a PNG data URI, if one has been cropped.
    pub fn image_data_uri(&self) -> Result<Option<String>> {
        self.image
            .as_deref()
            .map(raster::to_data_uri)
            .transpose()
    }
}

/// One source page: its raster, its native size and its chunks.
#[derive(Debug, Clone)]
pub struct Page {
    pub raster: Arc<RgbaImage>,
    /// Raster size in pixels.
    pub width: f64,
    pub height: f64,
    /// Size of the source page in PDF units.
    pub native_width: f64,
    pub native_height: f64,
    /// Chunks in insertion order.
    pub chunks: Vec<Chunk>,
}

impl Page {
    pub fn new(raster: RgbaImage, native_width: f64, native_height: f64) -> Self {
        let (width, height) = raster.dimensions();
        Self {
            raster: Arc::new(raster),
            width: width as f64,
            height: height as f64,
            native_width,
            native_height,
            chunks: Vec::new(),
        }
    }

    /// Crop the thumbnail for a rectangle on this page.
    pub fn crop(&self, rect: &Rect) -> RgbaImage {
        raster::crop(&self.raster, rect)
    }
}

/// Addresses one chunk. Indices are validated at the point of use:
/// [`ChunkRef::resolve`] yields `None` for a reference that went stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRef {
    pub page_index: usize,
    pub chunk_index: usize,
}

impl ChunkRef {
    pub fn new(page_index: usize, chunk_index: usize) -> Self {
        Self {
            page_index,
            chunk_index,
        }
    }

    pub fn resolve<'a>(&self, document: &'a Document) -> Option<&'a Chunk> {
        document
            .pages
            .get(self.page_index)?
            .chunks
            .get(self.chunk_index)
    }
}

/// A loaded source document and the user's chunk selections.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: Arc<SourcePdf>,
    pages: Vec<Arc<Page>>,
    current_page: usize,
}

impl Document {
    /// Decode `bytes`, rasterize every page and start with no chunks.
    pub fn load(bytes: &[u8], rasterizer: &dyn PageRasterizer, config: &LayoutConfig) -> Result<Self> {
        let source = SourcePdf::load(bytes)?;
        let mut pages = Vec::with_capacity(source.page_count());
        for index in 0..source.page_count() {
            let (native_width, native_height) = source
                .page_size(index)
                .ok_or(PrintDiffError::PageOutOfRange(index))?;
            let raster = rasterizer.rasterize(&source, index, config.raster_scale)?;
            pages.push(Page::new(raster, native_width, native_height));
        }
        info!(pages = pages.len(), bytes = bytes.len(), "loaded source document");
        Ok(Self::from_pages(source, pages))
    }

    pub fn from_pages(source: SourcePdf, pages: Vec<Page>) -> Self {
        Self {
            source: Arc::new(source),
            pages: pages.into_iter().map(Arc::new).collect(),
            current_page: 0,
        }
    }

    pub fn pages(&self) -> &[Arc<Page>] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index).map(Arc::as_ref)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn set_current_page(&mut self, index: usize) -> Result<()> {
        if index >= self.pages.len() {
            return Err(PrintDiffError::PageOutOfRange(index));
        }
        self.current_page = index;
        Ok(())
    }

    pub fn chunk(&self, page_index: usize, chunk_index: usize) -> Option<&Chunk> {
        ChunkRef::new(page_index, chunk_index).resolve(self)
    }

    fn page_mut(&mut self, index: usize) -> Result<&mut Page> {
        self.pages
            .get_mut(index)
            .map(Arc::make_mut)
            .ok_or(PrintDiffError::PageOutOfRange(index))
    }

    /// Append a chunk to `page_index`; returns its index.
    pub fn add_chunk_to(&mut self, page_index: usize, chunk: Chunk) -> Result<usize> {
        let page = self.page_mut(page_index)?;
        page.chunks.push(chunk);
        Ok(page.chunks.len() - 1)
    }

    /// Append a chunk to the current page; returns its index.
    pub fn add_chunk(&mut self, chunk: Chunk) -> Result<usize> {
        self.add_chunk_to(self.current_page, chunk)
    }

    pub fn update_chunk_at(&mut self, at: ChunkRef, chunk: Chunk) -> Result<()> {
        let page = self.page_mut(at.page_index)?;
        let slot = page
            .chunks
            .get_mut(at.chunk_index)
            .ok_or(PrintDiffError::ChunkOutOfRange {
                page: at.page_index,
                chunk: at.chunk_index,
            })?;
        *slot = chunk;
        Ok(())
    }

    /// Replace chunk `index` on the current page.
    pub fn update_chunk(&mut self, index: usize, chunk: Chunk) -> Result<()> {
        self.update_chunk_at(ChunkRef::new(self.current_page, index), chunk)
    }

    pub fn delete_chunk_at(&mut self, at: ChunkRef) -> Result<Chunk> {
        let page = self.page_mut(at.page_index)?;
        if at.chunk_index >= page.chunks.len() {
            return Err(PrintDiffError::ChunkOutOfRange {
                page: at.page_index,
                chunk: at.chunk_index,
            });
        }
        Ok(page.chunks.remove(at.chunk_index))
    }

    /// Remove chunk `index` from the current page.
    pub fn delete_chunk(&mut self, index: usize) -> Result<Chunk> {
        self.delete_chunk_at(ChunkRef::new(self.current_page, index))
    }

    /// Drop every chunk on the current page without positive area.
    /// Returns how many were removed.
    pub fn cleanup_empty_chunks(&mut self) -> usize {
        let index = self.current_page;
        let has_empty = self
            .pages
            .get(index)
            .is_some_and(|page| page.chunks.iter().any(Chunk::is_empty));
        if !has_empty {
            return 0;
        }
        match self.page_mut(index) {
            Ok(page) => {
                let before = page.chunks.len();
                page.chunks.retain(|chunk| !chunk.is_empty());
                before - page.chunks.len()
            }
            Err(_) => 0,
        }
    }

    /// Re-crop the thumbnail of one chunk from its page raster.
    pub fn refresh_thumbnail(&mut self, at: ChunkRef) -> Result<()> {
        let page = self.page_mut(at.page_index)?;
        let rect = page
            .chunks
            .get(at.chunk_index)
            .map(|chunk| chunk.rect)
            .ok_or(PrintDiffError::ChunkOutOfRange {
                page: at.page_index,
                chunk: at.chunk_index,
            })?;
        let thumbnail = Arc::new(page.crop(&rect));
        page.chunks[at.chunk_index].image = Some(thumbnail);
        Ok(())
    }

    /// Add every rectangle of a [`ChunkSet`] to its page.
    pub fn apply_chunk_set(&mut self, set: &ChunkSet) -> Result<()> {
        for selection in &set.pages {
            for rect in &selection.chunks {
                self.add_chunk_to(selection.page, Chunk::new(*rect))?;
            }
        }
        Ok(())
    }

    /// The current selections as a serializable [`ChunkSet`].
    pub fn chunk_set(&self) -> ChunkSet {
        ChunkSet {
            pages: self
                .pages
                .iter()
                .enumerate()
                .filter(|(_, page)| !page.chunks.is_empty())
                .map(|(index, page)| PageSelection {
                    page: index,
                    chunks: page.chunks.iter().map(|chunk| chunk.rect).collect(),
                })
                .collect(),
        }
    }
}

/// Chunk selections in serializable form, used by the CLI and the wasm
/// bindings. Rectangles are in raster pixels of their page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkSet {
    pub pages: Vec<PageSelection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSelection {
    /// Zero-based source page index.
    pub page: usize,
    #[serde(default)]
    pub chunks: Vec<Rect>,
}

impl ChunkSet {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
