//! # Shelf Packing
//!
//! A single fixed-size surface filled top to bottom in horizontal shelves.
//! Each shelf accumulates boxes left to right. A box goes onto the existing
//! shelf that wastes the least area; when no shelf can take it a new shelf is
//! opened below the last one, and when there is no vertical room left the
//! surface is full.
//!
//! Coordinates are top-down: `y = 0` is the top edge of the surface.

/// A box allocated on a shelf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone)]
struct Shelf {
    y: f64,
    h: f64,
    /// Fill cursor.
    x: f64,
    free: f64,
}

impl Shelf {
    fn new(y: f64, width: f64, h: f64) -> Self {
        Self {
            y,
            h,
            x: 0.0,
            free: width,
        }
    }

    fn alloc(&mut self, w: f64, h: f64) -> Option<Bin> {
        if w > self.free || h > self.h {
            return None;
        }
        let x = self.x;
        self.x += w;
        self.free -= w;
        Some(Bin { x, y: self.y, w, h })
    }
}

/// One packing surface.
#[derive(Debug, Clone)]
pub struct ShelfPack {
    width: f64,
    height: f64,
    shelves: Vec<Shelf>,
}

impl ShelfPack {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            shelves: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Try to place a `w` x `h` box. `None` means the surface has no room.
    pub fn pack_one(&mut self, w: f64, h: f64) -> Option<Bin> {
        let mut y = 0.0;
        let mut best: Option<(usize, f64)> = None;

        for (i, shelf) in self.shelves.iter().enumerate() {
            y += shelf.h;
            if w > shelf.free {
                continue;
            }
            if h == shelf.h {
                return self.shelves[i].alloc(w, h);
            }
            if h > shelf.h {
                continue;
            }
            let waste = (shelf.h - h) * w;
            if best.map_or(true, |(_, least)| waste < least) {
                best = Some((i, waste));
            }
        }

        if let Some((i, _)) = best {
            return self.shelves[i].alloc(w, h);
        }

        if h <= self.height - y && w <= self.width {
            self.shelves.push(Shelf::new(y, self.width, h));
            return self.shelves.last_mut().and_then(|shelf| shelf.alloc(w, h));
        }

        None
    }
}
