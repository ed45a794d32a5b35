//! # Chunk Layout Engine
//!
//! Turns a document's chunk selections into output pages:
//!
//! 1. [`flatten`] every page's chunks into one named, deterministically
//!    ordered sequence
//! 2. [`Packer`] assigns each chunk an output page and a position, opening
//!    pages as needed and shrinking chunks that fit no empty page
//! 3. [`LayoutEngine::compose`] turns placements into draw commands: the
//!    clipped source region, a border around chunk and label, and the name tag
//! 4. [`PdfWriter`](crate::pdf::PdfWriter) serializes the pages
//!
//! Chunk sizes are carried over from raster pixels unchanged, so with the
//! default 2x raster a chunk prints at twice its source size. Only the clip
//! box is converted back to source PDF units.
//!
//! All of this is pure and re-run in full on every export.

pub mod flatten;
pub mod packer;
pub mod shelf;

use serde::Serialize;
use tracing::info;

use crate::config::LayoutConfig;
use crate::error::{PrintDiffError, Result};
use crate::model::{ChunkRef, Document, Rect};
use crate::pdf::{Metadata, PdfWriter, SourcePdf};

pub use flatten::flatten;
pub use packer::{PackItem, Packer, Placement};

/// A chunk on its way through flattening and packing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedChunk {
    /// The chunk this was made from.
    pub source: ChunkRef,
    /// `"<page>.<position>"`, drawn as the label and used for navigation.
    pub name: String,
    /// The source rectangle in raster pixels.
    pub rect: Rect,
    /// Packed position of the padded box, bottom-up output page coordinates.
    pub x: f64,
    pub y: f64,
    /// Packed size, smaller than `rect` when the chunk had to be shrunk.
    pub width: f64,
    pub height: f64,
    pub output_page: usize,
    pub shrink_steps: u32,
}

impl PositionedChunk {
    pub(crate) fn unplaced(source: ChunkRef, name: String, rect: Rect) -> Self {
        Self {
            source,
            name,
            rect,
            x: 0.0,
            y: 0.0,
            width: rect.w,
            height: rect.h,
            output_page: 0,
            shrink_steps: 0,
        }
    }

    fn place(&mut self, placement: &Placement) {
        self.x = placement.x;
        self.y = placement.y;
        self.width = placement.width;
        self.height = placement.height;
        self.output_page = placement.page;
        self.shrink_steps = placement.shrink_steps;
    }
}

/// A region of a source page in PDF units, measured from the page's
/// lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl ClipBox {
    /// Convert a top-down raster rectangle on a page of `native_height` PDF
    /// units rendered at `scale` raster pixels per unit.
    pub fn from_raster(rect: &Rect, native_height: f64, scale: f64) -> Self {
        let x = rect.x / scale;
        let y = rect.y / scale;
        let w = rect.w / scale;
        let h = rect.h / scale;
        Self {
            left: x,
            right: x + w,
            bottom: native_height - (y + h),
            top: native_height - y,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }
}

/// An RGB color with components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub fn gray(level: f64) -> Self {
        Self {
            r: level,
            g: level,
            b: level,
        }
    }
}

/// A laid-out output page.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
}

/// One thing drawn on an output page. Coordinates are PDF user space:
/// `(x, y)` is the lower-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutElement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Draw `clip` of source page `page`, scaled to the element's frame.
    SourceRegion { page: usize, clip: ClipBox },
    Rect {
        fill: Option<Color>,
        stroke: Option<(Color, f64)>,
    },
    /// Single-line label in the label font, baseline at the element origin.
    Text {
        content: String,
        font_size: f64,
        color: Color,
    },
}

/// Serializes composed pages into an output document.
pub trait OutputSurface {
    fn render(&self, pages: &[LayoutPage], source: &SourcePdf, metadata: &Metadata) -> Result<Vec<u8>>;
}

impl OutputSurface for PdfWriter {
    fn render(&self, pages: &[LayoutPage], source: &SourcePdf, metadata: &Metadata) -> Result<Vec<u8>> {
        self.write(pages, source, metadata)
    }
}

/// The result of one export: final placements and the serialized document.
#[derive(Debug, Clone)]
pub struct Layout {
    pub positioned_chunks: Vec<PositionedChunk>,
    pages: Vec<LayoutPage>,
    document: Vec<u8>,
}

impl Layout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[LayoutPage] {
        &self.pages
    }

    /// The output PDF.
    pub fn bytes(&self) -> &[u8] {
        &self.document
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.document
    }

    /// The output PDF as a `data:application/pdf;base64,...` URI for preview.
    pub fn data_uri(&self) -> String {
        format!(
            "data:application/pdf;base64,{}",
            crate::raster::base64_encode(&self.document)
        )
    }
}

/// Flattens, packs and composes chunk layouts.
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Flatten and pack. The result is ordered by output page, then by
    /// flattening order.
    pub fn arrange(&self, document: &Document) -> Result<Vec<PositionedChunk>> {
        self.config.validate()?;
        let mut flattened = flatten(document);
        let items: Vec<PackItem> = flattened
            .iter()
            .enumerate()
            .map(|(id, chunk)| PackItem {
                id,
                width: chunk.width,
                height: chunk.height,
            })
            .collect();

        let placements = Packer::from_config(&self.config).pack(&items)?;
        for placement in &placements {
            flattened[placement.id].place(placement);
        }

        let mut slots: Vec<Option<PositionedChunk>> = flattened.into_iter().map(Some).collect();
        Ok(placements
            .iter()
            .filter_map(|placement| slots[placement.id].take())
            .collect())
    }

    /// Turn arranged chunks into output pages. There is always at least one
    /// page, even with nothing to place.
    pub fn compose(
        &self,
        document: &Document,
        chunks: &[PositionedChunk],
    ) -> Result<Vec<LayoutPage>> {
        let (page_width, page_height) = self.config.page_size.dimensions();
        let padding = self.config.padding;
        let label = &self.config.label;
        let new_page = || LayoutPage {
            width: page_width,
            height: page_height,
            elements: Vec::new(),
        };
        let mut pages = vec![new_page()];

        for chunk in chunks {
            while pages.len() <= chunk.output_page {
                pages.push(new_page());
            }
            let source_page = document
                .page(chunk.source.page_index)
                .ok_or(PrintDiffError::PageOutOfRange(chunk.source.page_index))?;
            let clip = ClipBox::from_raster(
                &chunk.rect,
                source_page.native_height,
                self.config.raster_scale,
            );

            let x = chunk.x + padding;
            let y = chunk.y + padding / 2.0;
            let tag_width = label.tag_width(&chunk.name);
            let elements = &mut pages[chunk.output_page].elements;

            elements.push(LayoutElement {
                x,
                y,
                width: chunk.width + tag_width,
                height: chunk.height,
                draw: DrawCommand::Rect {
                    fill: None,
                    stroke: Some((Color::gray(label.border_gray), label.border_width)),
                },
            });
            elements.push(LayoutElement {
                x,
                y,
                width: chunk.width,
                height: chunk.height,
                draw: DrawCommand::SourceRegion {
                    page: chunk.source.page_index,
                    clip,
                },
            });
            elements.push(LayoutElement {
                x: x + chunk.width,
                y: y + label.tag_rise,
                width: tag_width,
                height: label.tag_height,
                draw: DrawCommand::Rect {
                    fill: Some(Color::gray(label.tag_gray)),
                    stroke: None,
                },
            });
            elements.push(LayoutElement {
                x: x + chunk.width,
                y: y + label.tag_rise,
                width: tag_width,
                height: label.tag_height,
                draw: DrawCommand::Text {
                    content: chunk.name.clone(),
                    font_size: label.font_size,
                    color: Color::gray(label.text_gray),
                },
            });
        }

        Ok(pages)
    }

    /// Run the full export: arrange, compose, and serialize against the
    /// document's source PDF.
    pub fn generate(&self, document: &Document) -> Result<Layout> {
        self.generate_with(document, &PdfWriter::new())
    }

    /// [`generate`](Self::generate) with a caller-supplied output surface.
    pub fn generate_with(&self, document: &Document, surface: &dyn OutputSurface) -> Result<Layout> {
        let positioned_chunks = self.arrange(document)?;
        let pages = self.compose(document, &positioned_chunks)?;
        let metadata = Metadata::for_source(&document.source);
        let bytes = surface.render(&pages, &document.source, &metadata)?;
        info!(
            chunks = positioned_chunks.len(),
            pages = pages.len(),
            bytes = bytes.len(),
            "generated layout"
        );
        Ok(Layout {
            positioned_chunks,
            pages,
            document: bytes,
        })
    }
}
