//! # Chunk Flattening
//!
//! Turns the per-page chunk lists into one sequence in packing order: pages
//! in document order, and within a page chunks sorted by `x + y` (a cheap
//! top-left-first order; ties keep insertion order). Each chunk is named
//! `"<page>.<position>"` after the sort. Chunks without area are skipped.

use super::PositionedChunk;
use crate::model::{ChunkRef, Document};

/// Linearize every chunk of `document` into unplaced [`PositionedChunk`]s.
pub fn flatten(document: &Document) -> Vec<PositionedChunk> {
    let mut flattened = Vec::new();

    for (page_index, page) in document.pages().iter().enumerate() {
        let mut ordered: Vec<(usize, f64)> = page
            .chunks
            .iter()
            .enumerate()
            .filter(|(_, chunk)| !chunk.is_empty())
            .map(|(chunk_index, chunk)| (chunk_index, chunk.rect.x + chunk.rect.y))
            .collect();
        // Stable: equal keys stay in insertion order.
        ordered.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (position, (chunk_index, _)) in ordered.into_iter().enumerate() {
            let rect = page.chunks[chunk_index].rect;
            flattened.push(PositionedChunk::unplaced(
                ChunkRef::new(page_index, chunk_index),
                format!("{}.{}", page_index, position),
                rect,
            ));
        }
    }

    flattened
}
