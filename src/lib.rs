//! # printdiff
//!
//! Mark rectangular regions ("chunks") on the pages of a PDF and pack them
//! onto as few print pages as possible.
//!
//! A lecture deck or a long diff rarely needs every inch of every page on
//! paper. printdiff lets the user cut out the parts that matter and
//! shelf-packs them, labelled with where they came from, onto fresh pages.
//! The regions are embedded from the source document rather than
//! rasterized, so text stays vector and selectable.
//!
//! ## Architecture
//!
//! ```text
//! PDF bytes
//!       ↓
//!   [pdf]      — Decode the source, page sizes, title
//!       ↓
//!   [raster]   — Page rasters (2x) and chunk thumbnails
//!       ↓
//!   [model]    — Document: pages and their chunks
//!       ↑
//!   [select]   — Pointer/key events → chunk edits
//!       ↓
//!   [layout]   — Flatten, shelf-pack, compose output pages
//!       ↓
//!   [pdf]      — Embed source regions, draw labels, serialize
//! ```
//!
//! [`session`] wraps the whole flow in the page state a host UI moves
//! through.

pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod raster;
pub mod select;
pub mod session;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{LabelStyle, LayoutConfig, PageSize};
pub use error::{PrintDiffError, Result};
pub use layout::{flatten, Layout, LayoutEngine, PositionedChunk};
pub use model::{Chunk, ChunkRef, ChunkSet, Document, Rect};

use raster::{BlankRasterizer, PageRasterizer};

/// Decode a PDF and rasterize its pages into a [`Document`] with no chunks.
pub fn process_file(
    bytes: &[u8],
    rasterizer: &dyn PageRasterizer,
    config: &LayoutConfig,
) -> Result<Document> {
    Document::load(bytes, rasterizer, config)
}

/// Pack the document's chunks onto output pages and serialize the result.
pub fn generate_layout(document: &Document, config: &LayoutConfig) -> Result<Layout> {
    LayoutEngine::new(config.clone()).generate(document)
}

/// Lay out a chunk set over a source PDF without any page rendering.
///
/// This is the headless entry point used by the CLI and the wasm bindings:
/// chunk rectangles are taken as given, so pages only need correctly sized
/// blank rasters.
pub fn layout_chunks(pdf_bytes: &[u8], chunks: &ChunkSet, config: &LayoutConfig) -> Result<Layout> {
    let mut document = process_file(pdf_bytes, &BlankRasterizer, config)?;
    document.apply_chunk_set(chunks)?;
    generate_layout(&document, config)
}

/// Load a source PDF with page images from `rasterizer`, mark a chunk set on
/// it and crop every chunk's thumbnail.
pub fn open_chunks(
    pdf_bytes: &[u8],
    chunks: &ChunkSet,
    rasterizer: &dyn PageRasterizer,
    config: &LayoutConfig,
) -> Result<Document> {
    let mut document = process_file(pdf_bytes, rasterizer, config)?;
    document.apply_chunk_set(chunks)?;
    for chunk in flatten(&document) {
        document.refresh_thumbnail(chunk.source)?;
    }
    Ok(document)
}

/// A chunk's cropped thumbnail under its gallery name.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    /// `"<page>.<position>"`, the same name the output label carries.
    pub name: String,
    pub png: Vec<u8>,
}

/// PNG thumbnails of every chunk in gallery order. Chunks whose thumbnail
/// was never cropped are skipped.
pub fn chunk_thumbnails(document: &Document) -> Result<Vec<Thumbnail>> {
    let mut thumbnails = Vec::new();
    for chunk in flatten(document) {
        let Some(image) = chunk.source.resolve(document).and_then(|c| c.image.as_deref()) else {
            continue;
        };
        thumbnails.push(Thumbnail {
            name: chunk.name,
            png: raster::encode_png(image)?,
        });
    }
    Ok(thumbnails)
}

/// [`layout_chunks`] with the chunk set given as JSON, returning PDF bytes.
pub fn layout_json(pdf_bytes: &[u8], chunks_json: &str) -> Result<Vec<u8>> {
    let chunks = ChunkSet::from_json(chunks_json)?;
    Ok(layout_chunks(pdf_bytes, &chunks, &LayoutConfig::default())?.into_bytes())
}
