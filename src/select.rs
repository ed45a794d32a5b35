//! # Chunk Selection and Editing
//!
//! Pointer and key events on the current page, turned into chunk edits on a
//! [`Document`]. One chunk at a time is active:
//!
//! ```text
//!            press on empty area ──► DrawingNew ─┐
//! Idle ───── press on chunk body ──► MovingExisting ├── release / Escape ──► Idle
//!            press on a handle   ──► Resizing(c) ─┘
//! ```
//!
//! While drawing or resizing, the rectangle is the bounding box of a fixed
//! anchor and the pointer, so dragging in any direction gives a valid
//! rectangle. Moving keeps the size and follows the pointer at the offset
//! recorded on press.
//!
//! The active chunk is addressed by a [`ChunkRef`] that is re-resolved on
//! every event. Pointer events that arrive after the document's current page
//! changed underneath the interaction are ignored, and [`Selector::switch_page`]
//! refuses to change pages mid-drag.

use tracing::debug;

use crate::error::{PrintDiffError, Result};
use crate::model::{Chunk, ChunkRef, Document, Point, Rect};

/// Default edge length of the square resize handles, in raster pixels.
pub const HANDLE_SIZE: f64 = 16.0;

/// A corner of a chunk rectangle. North is the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Corner {
    /// Hit-test order for handles.
    pub const ALL: [Corner; 4] = [
        Corner::NorthWest,
        Corner::NorthEast,
        Corner::SouthWest,
        Corner::SouthEast,
    ];

    pub fn opposite(self) -> Corner {
        match self {
            Corner::NorthWest => Corner::SouthEast,
            Corner::NorthEast => Corner::SouthWest,
            Corner::SouthWest => Corner::NorthEast,
            Corner::SouthEast => Corner::NorthWest,
        }
    }

    /// Where this corner of `rect` lies.
    pub fn of(self, rect: &Rect) -> Point {
        match self {
            Corner::NorthWest => Point::new(rect.x, rect.y),
            Corner::NorthEast => Point::new(rect.right(), rect.y),
            Corner::SouthWest => Point::new(rect.x, rect.bottom()),
            Corner::SouthEast => Point::new(rect.right(), rect.bottom()),
        }
    }
}

/// The pointer interaction in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragMode {
    #[default]
    Idle,
    /// A new chunk grows from `anchor`.
    DrawingNew { anchor: Point },
    /// The chunk follows the pointer, `offset` from its origin.
    MovingExisting { offset: Point },
    /// `corner` is being dragged; `anchor` is the opposite corner.
    Resizing { corner: Corner, anchor: Point },
}

/// What lies under the pointer on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Empty,
    Body(usize),
    Handle(usize, Corner),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Other,
}

/// Rectangle spanned by two points: of the four candidate corners, the one
/// with the smallest `x + y` is the origin and the largest the far corner.
pub fn rect_between(a: Point, b: Point) -> Rect {
    let mut corners = [a, b, Point::new(a.x, b.y), Point::new(b.x, a.y)];
    corners.sort_by(|p, q| (p.x + p.y).total_cmp(&(q.x + q.y)));
    let (min, max) = (corners[0], corners[3]);
    Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
}

/// Drives chunk edits from pointer and key events.
#[derive(Debug, Clone)]
pub struct Selector {
    mode: DragMode,
    selected: Option<ChunkRef>,
    handle_size: f64,
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector {
    pub fn new() -> Self {
        Self {
            mode: DragMode::Idle,
            selected: None,
            handle_size: HANDLE_SIZE,
        }
    }

    pub fn with_handle_size(mut self, handle_size: f64) -> Self {
        self.handle_size = handle_size;
        self
    }

    pub fn mode(&self) -> DragMode {
        self.mode
    }

    pub fn is_dragging(&self) -> bool {
        self.mode != DragMode::Idle
    }

    /// The selected chunk, if it still exists.
    pub fn selected(&self, document: &Document) -> Option<ChunkRef> {
        self.selected.filter(|at| at.resolve(document).is_some())
    }

    /// The selected chunk's resize handles, for drawing.
    pub fn handles(&self, document: &Document) -> Vec<(Corner, Rect)> {
        let Some(chunk) = self.selected(document).and_then(|at| at.resolve(document)) else {
            return Vec::new();
        };
        let half = self.handle_size / 2.0;
        Corner::ALL
            .iter()
            .map(|&corner| {
                let p = corner.of(&chunk.rect);
                (corner, Rect::new(p.x - half, p.y - half, self.handle_size, self.handle_size))
            })
            .collect()
    }

    /// Handles of the selected chunk win over bodies; among bodies the most
    /// recently added is on top.
    pub fn hit_test(&self, document: &Document, point: Point) -> Hit {
        let current = document.current_page();
        if let Some(at) = self.selected(document).filter(|at| at.page_index == current) {
            for (corner, handle) in self.handles(document) {
                if handle.contains(point) {
                    return Hit::Handle(at.chunk_index, corner);
                }
            }
        }

        let Some(page) = document.page(current) else {
            return Hit::Empty;
        };
        page.chunks
            .iter()
            .enumerate()
            .rev()
            .find(|(_, chunk)| chunk.rect.contains(point))
            .map_or(Hit::Empty, |(index, _)| Hit::Body(index))
    }

    /// Start an interaction at `point` on the current page. Ignored while
    /// another interaction is in progress.
    pub fn press(&mut self, document: &mut Document, point: Point) -> Result<Hit> {
        if self.is_dragging() {
            return Ok(Hit::Empty);
        }
        let page_index = document.current_page();
        let hit = self.hit_test(document, point);

        match hit {
            Hit::Empty => {
                let chunk_index = document.add_chunk(Chunk::new(Rect::new(point.x, point.y, 0.0, 0.0)))?;
                self.selected = Some(ChunkRef::new(page_index, chunk_index));
                self.mode = DragMode::DrawingNew { anchor: point };
            }
            Hit::Body(chunk_index) => {
                let rect = self.rect_of(document, ChunkRef::new(page_index, chunk_index))?;
                self.selected = Some(ChunkRef::new(page_index, chunk_index));
                self.mode = DragMode::MovingExisting {
                    offset: Point::new(point.x - rect.x, point.y - rect.y),
                };
            }
            Hit::Handle(chunk_index, corner) => {
                let rect = self.rect_of(document, ChunkRef::new(page_index, chunk_index))?;
                self.selected = Some(ChunkRef::new(page_index, chunk_index));
                self.mode = DragMode::Resizing {
                    corner,
                    anchor: corner.opposite().of(&rect),
                };
            }
        }
        debug!(?hit, mode = ?self.mode, "selection press");
        Ok(hit)
    }

    /// Update the active chunk for a pointer at `point`.
    pub fn pointer_move(&mut self, document: &mut Document, point: Point) -> Result<()> {
        let Some(at) = self.active(document) else {
            return Ok(());
        };
        let Some(current) = at.resolve(document) else {
            return Ok(());
        };

        let rect = match self.mode {
            DragMode::Idle => return Ok(()),
            DragMode::DrawingNew { anchor } | DragMode::Resizing { anchor, .. } => {
                rect_between(anchor, point)
            }
            DragMode::MovingExisting { offset } => Rect::new(
                point.x - offset.x,
                point.y - offset.y,
                current.rect.w,
                current.rect.h,
            ),
        };

        let mut chunk = current.clone();
        chunk.rect = rect;
        document.update_chunk_at(at, chunk)
    }

    /// Finish the interaction. An active chunk left without area is
    /// deleted; otherwise empty chunks on the page are cleaned up and the
    /// active chunk's thumbnail is re-cropped. The chunk stays selected.
    pub fn release(&mut self, document: &mut Document) -> Result<()> {
        self.mode = DragMode::Idle;
        let Some(at) = self.selected(document) else {
            self.selected = None;
            return Ok(());
        };

        let is_empty = at.resolve(document).is_some_and(Chunk::is_empty);
        if is_empty {
            debug!(page = at.page_index, chunk = at.chunk_index, "dropping empty chunk");
            document.delete_chunk_at(at)?;
            self.selected = None;
            return Ok(());
        }

        let mut at = at;
        if at.page_index == document.current_page() {
            // Cleanup shifts the active chunk down by the empties before it.
            let shift = document
                .page(at.page_index)
                .map_or(0, |page| page.chunks[..at.chunk_index].iter().filter(|c| c.is_empty()).count());
            document.cleanup_empty_chunks();
            at.chunk_index -= shift;
        }
        document.refresh_thumbnail(at)?;
        self.selected = Some(at);
        Ok(())
    }

    pub fn key(&mut self, document: &mut Document, key: Key) -> Result<()> {
        match key {
            Key::Escape => {
                self.release(document)?;
                self.selected = None;
            }
            Key::Delete | Key::Backspace => {
                self.mode = DragMode::Idle;
                if let Some(at) = self.selected(document) {
                    document.delete_chunk_at(at)?;
                }
                self.selected = None;
                self.release(document)?;
            }
            Key::Other => {}
        }
        Ok(())
    }

    /// Change the current page. Returns `false`, leaving everything as is,
    /// while an interaction is in progress.
    pub fn switch_page(&mut self, document: &mut Document, page_index: usize) -> Result<bool> {
        if self.is_dragging() {
            return Ok(false);
        }
        document.set_current_page(page_index)?;
        self.selected = None;
        Ok(true)
    }

    /// Navigate to and select a chunk, e.g. from a gallery thumbnail.
    pub fn select(&mut self, document: &mut Document, at: ChunkRef) -> Result<bool> {
        if self.is_dragging() {
            return Ok(false);
        }
        if at.resolve(document).is_none() {
            return Err(PrintDiffError::ChunkOutOfRange {
                page: at.page_index,
                chunk: at.chunk_index,
            });
        }
        document.set_current_page(at.page_index)?;
        self.selected = Some(at);
        Ok(true)
    }

    /// The chunk being dragged, provided it is on the current page.
    fn active(&self, document: &Document) -> Option<ChunkRef> {
        if !self.is_dragging() {
            return None;
        }
        self.selected
            .filter(|at| at.page_index == document.current_page())
    }

    fn rect_of(&self, document: &Document, at: ChunkRef) -> Result<Rect> {
        at.resolve(document)
            .map(|chunk| chunk.rect)
            .ok_or(PrintDiffError::ChunkOutOfRange {
                page: at.page_index,
                chunk: at.chunk_index,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::tests::document_with_pages;

    fn drag(selector: &mut Selector, doc: &mut Document, from: (f64, f64), to: (f64, f64)) {
        selector.press(doc, Point::new(from.0, from.1)).unwrap();
        selector.pointer_move(doc, Point::new(to.0, to.1)).unwrap();
        selector.release(doc).unwrap();
    }

    #[test]
    fn test_rect_between_any_direction() {
        let expected = Rect::new(10.0, 20.0, 30.0, 40.0);
        let (a, b) = (Point::new(10.0, 20.0), Point::new(40.0, 60.0));
        assert_eq!(rect_between(a, b), expected);
        assert_eq!(rect_between(b, a), expected);
        assert_eq!(rect_between(Point::new(10.0, 60.0), Point::new(40.0, 20.0)), expected);
        assert_eq!(rect_between(Point::new(40.0, 20.0), Point::new(10.0, 60.0)), expected);
    }

    #[test]
    fn test_draw_new_chunk() {
        let mut doc = document_with_pages(1);
        let mut selector = Selector::new();

        assert_eq!(selector.press(&mut doc, Point::new(100.0, 100.0)).unwrap(), Hit::Empty);
        assert!(matches!(selector.mode(), DragMode::DrawingNew { .. }));
        // Dragged up and to the left of the anchor.
        selector.pointer_move(&mut doc, Point::new(40.0, 70.0)).unwrap();
        assert_eq!(doc.chunk(0, 0).unwrap().rect, Rect::new(40.0, 70.0, 60.0, 30.0));

        selector.release(&mut doc).unwrap();
        assert_eq!(selector.mode(), DragMode::Idle);
        assert_eq!(selector.selected(&doc), Some(ChunkRef::new(0, 0)));
        assert_eq!(
            doc.chunk(0, 0).unwrap().image.as_ref().unwrap().dimensions(),
            (60, 30)
        );
    }

    #[test]
    fn test_click_without_drag_leaves_no_chunk() {
        let mut doc = document_with_pages(1);
        let mut selector = Selector::new();
        selector.press(&mut doc, Point::new(5.0, 5.0)).unwrap();
        selector.release(&mut doc).unwrap();
        assert!(doc.page(0).unwrap().chunks.is_empty());
        assert_eq!(selector.selected(&doc), None);
    }

    #[test]
    fn test_move_existing_keeps_size() {
        let mut doc = document_with_pages(1);
        let mut selector = Selector::new();
        drag(&mut selector, &mut doc, (10.0, 10.0), (110.0, 60.0));

        assert_eq!(selector.press(&mut doc, Point::new(50.0, 30.0)).unwrap(), Hit::Body(0));
        selector.pointer_move(&mut doc, Point::new(250.0, 330.0)).unwrap();
        selector.release(&mut doc).unwrap();
        assert_eq!(doc.chunk(0, 0).unwrap().rect, Rect::new(210.0, 310.0, 100.0, 50.0));
    }

    #[test]
    fn test_resize_from_corner_handle() {
        let mut doc = document_with_pages(1);
        let mut selector = Selector::new();
        drag(&mut selector, &mut doc, (100.0, 100.0), (200.0, 200.0));

        // Grab the north-west handle a few pixels off the corner.
        let hit = selector.press(&mut doc, Point::new(104.0, 97.0)).unwrap();
        assert_eq!(hit, Hit::Handle(0, Corner::NorthWest));
        assert_eq!(
            selector.mode(),
            DragMode::Resizing {
                corner: Corner::NorthWest,
                anchor: Point::new(200.0, 200.0),
            }
        );
        selector.pointer_move(&mut doc, Point::new(50.0, 150.0)).unwrap();
        selector.release(&mut doc).unwrap();
        assert_eq!(doc.chunk(0, 0).unwrap().rect, Rect::new(50.0, 150.0, 150.0, 50.0));

        // Past the anchor the rectangle flips instead of going negative.
        selector.press(&mut doc, Point::new(200.0, 200.0)).unwrap();
        selector.pointer_move(&mut doc, Point::new(20.0, 100.0)).unwrap();
        selector.release(&mut doc).unwrap();
        assert_eq!(doc.chunk(0, 0).unwrap().rect, Rect::new(20.0, 100.0, 30.0, 50.0));
    }

    #[test]
    fn test_handles_only_on_selected_chunk() {
        let mut doc = document_with_pages(1);
        let mut selector = Selector::new();
        drag(&mut selector, &mut doc, (100.0, 100.0), (200.0, 200.0));
        drag(&mut selector, &mut doc, (300.0, 300.0), (400.0, 400.0));
        assert_eq!(selector.selected(&doc), Some(ChunkRef::new(0, 1)));

        // Corner of the unselected first chunk is just its body.
        assert_eq!(selector.hit_test(&doc, Point::new(199.0, 199.0)), Hit::Body(0));
        // Outside the body but within the selected chunk's handle.
        assert_eq!(
            selector.hit_test(&doc, Point::new(405.0, 405.0)),
            Hit::Handle(1, Corner::SouthEast)
        );
        assert_eq!(selector.handles(&doc).len(), 4);
    }

    #[test]
    fn test_handle_size_sets_grab_area() {
        let mut doc = document_with_pages(1);
        let mut selector = Selector::new();
        drag(&mut selector, &mut doc, (100.0, 100.0), (200.0, 200.0));
        assert_eq!(selector.hit_test(&doc, Point::new(215.0, 215.0)), Hit::Empty);

        let mut wide = Selector::new().with_handle_size(40.0);
        wide.select(&mut doc, ChunkRef::new(0, 0)).unwrap();
        assert_eq!(
            wide.hit_test(&doc, Point::new(215.0, 215.0)),
            Hit::Handle(0, Corner::SouthEast)
        );
        let (_, handle) = wide.handles(&doc)[0];
        assert_eq!((handle.w, handle.h), (40.0, 40.0));
    }

    #[test]
    fn test_topmost_body_wins() {
        let mut doc = document_with_pages(1);
        let mut selector = Selector::new();
        drag(&mut selector, &mut doc, (0.0, 0.0), (100.0, 100.0));
        // Started outside the first chunk, dragged back over it.
        drag(&mut selector, &mut doc, (150.0, 150.0), (50.0, 50.0));
        selector.key(&mut doc, Key::Escape).unwrap();
        assert_eq!(doc.chunk(0, 1).unwrap().rect, Rect::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!(selector.hit_test(&doc, Point::new(75.0, 75.0)), Hit::Body(1));
        assert_eq!(selector.hit_test(&doc, Point::new(500.0, 500.0)), Hit::Empty);
    }

    #[test]
    fn test_escape_keeps_chunk_and_clears_selection() {
        let mut doc = document_with_pages(1);
        let mut selector = Selector::new();
        selector.press(&mut doc, Point::new(10.0, 10.0)).unwrap();
        selector.pointer_move(&mut doc, Point::new(30.0, 40.0)).unwrap();
        selector.key(&mut doc, Key::Escape).unwrap();

        assert_eq!(selector.mode(), DragMode::Idle);
        assert_eq!(selector.selected(&doc), None);
        let chunk = doc.chunk(0, 0).unwrap();
        assert_eq!(chunk.rect, Rect::new(10.0, 10.0, 20.0, 30.0));
        assert!(chunk.image.is_some());
    }

    #[test]
    fn test_delete_and_backspace_remove_selected() {
        let mut doc = document_with_pages(1);
        let mut selector = Selector::new();
        drag(&mut selector, &mut doc, (0.0, 0.0), (10.0, 10.0));
        drag(&mut selector, &mut doc, (20.0, 20.0), (40.0, 40.0));

        selector.key(&mut doc, Key::Delete).unwrap();
        assert_eq!(doc.page(0).unwrap().chunks.len(), 1);
        assert_eq!(selector.selected(&doc), None);

        // Nothing selected: another delete is a no-op.
        selector.key(&mut doc, Key::Backspace).unwrap();
        assert_eq!(doc.page(0).unwrap().chunks.len(), 1);

        selector.press(&mut doc, Point::new(5.0, 5.0)).unwrap();
        selector.release(&mut doc).unwrap();
        selector.key(&mut doc, Key::Backspace).unwrap();
        assert!(doc.page(0).unwrap().chunks.is_empty());

        selector.key(&mut doc, Key::Other).unwrap();
    }

    #[test]
    fn test_release_remaps_after_cleanup() {
        let mut doc = document_with_pages(1);
        doc.add_chunk(Chunk::new(Rect::new(0.0, 0.0, 0.0, 0.0))).unwrap();
        let mut selector = Selector::new();
        drag(&mut selector, &mut doc, (100.0, 100.0), (150.0, 150.0));

        assert_eq!(doc.page(0).unwrap().chunks.len(), 1);
        assert_eq!(selector.selected(&doc), Some(ChunkRef::new(0, 0)));
        assert!(doc.chunk(0, 0).unwrap().image.is_some());
    }

    #[test]
    fn test_page_switch_refused_while_dragging() {
        let mut doc = document_with_pages(2);
        let mut selector = Selector::new();
        selector.press(&mut doc, Point::new(10.0, 10.0)).unwrap();
        assert!(!selector.switch_page(&mut doc, 1).unwrap());
        assert_eq!(doc.current_page(), 0);

        selector.pointer_move(&mut doc, Point::new(50.0, 50.0)).unwrap();
        selector.release(&mut doc).unwrap();
        assert!(selector.switch_page(&mut doc, 1).unwrap());
        assert_eq!(doc.current_page(), 1);
        assert_eq!(selector.selected(&doc), None);
    }

    #[test]
    fn test_moves_ignored_when_page_changed_underneath() {
        let mut doc = document_with_pages(2);
        let mut selector = Selector::new();
        drag(&mut selector, &mut doc, (10.0, 10.0), (50.0, 50.0));
        selector.press(&mut doc, Point::new(20.0, 20.0)).unwrap();

        doc.set_current_page(1).unwrap();
        selector.pointer_move(&mut doc, Point::new(300.0, 300.0)).unwrap();
        assert_eq!(doc.chunk(0, 0).unwrap().rect, Rect::new(10.0, 10.0, 40.0, 40.0));
        assert!(doc.page(1).unwrap().chunks.is_empty());
    }

    #[test]
    fn test_select_navigates_to_chunk() {
        let mut doc = document_with_pages(3);
        doc.add_chunk_to(2, Chunk::new(Rect::new(1.0, 1.0, 5.0, 5.0))).unwrap();
        let mut selector = Selector::new();
        assert!(selector.select(&mut doc, ChunkRef::new(2, 0)).unwrap());
        assert_eq!(doc.current_page(), 2);
        assert_eq!(selector.selected(&doc), Some(ChunkRef::new(2, 0)));
        assert!(selector.select(&mut doc, ChunkRef::new(2, 4)).is_err());
    }
}
