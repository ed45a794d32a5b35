//! # Multi-Page Packer
//!
//! Spreads boxes over as many [`ShelfPack`] surfaces as needed. Each box goes
//! to the first surface with room (first fit by page order). When none has
//! room a new surface is opened; a box that does not fit even an empty
//! surface is shrunk geometrically until it does.
//!
//! The first surface is reduced by the padding on both axes, surfaces opened
//! later are full page size. Packed boxes carry the padding on both axes.
//!
//! Placements are returned in the output document's coordinate system
//! (`y = 0` at the bottom of the page), ordered by page and then by input
//! order.

use tracing::{debug, warn};

use super::shelf::ShelfPack;
use crate::config::LayoutConfig;
use crate::error::{PrintDiffError, Result};

/// A box to pack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackItem {
    pub id: usize,
    pub width: f64,
    pub height: f64,
}

/// Where a box ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub id: usize,
    /// Left edge of the padded box.
    pub x: f64,
    /// Bottom edge of the padded box, measured from the bottom of the page.
    pub y: f64,
    /// Box size after shrinking, without padding.
    pub width: f64,
    pub height: f64,
    pub page: usize,
    /// How often the box was shrunk to fit an empty page.
    pub shrink_steps: u32,
}

impl Placement {
    /// Top edge of the padded box in shelf (top-down) coordinates.
    pub fn shelf_y(&self, page_height: f64, padding: f64) -> f64 {
        page_height - self.y - (self.height + padding)
    }
}

/// Multi-page shelf packer.
#[derive(Debug, Clone)]
pub struct Packer {
    page_width: f64,
    page_height: f64,
    padding: f64,
    shrink_factor: f64,
    min_dimension: f64,
    max_shrink_steps: u32,
}

impl Packer {
    pub fn new(page_width: f64, page_height: f64, padding: f64) -> Self {
        let defaults = LayoutConfig::default();
        Self {
            page_width,
            page_height,
            padding,
            shrink_factor: defaults.shrink_factor,
            min_dimension: defaults.min_dimension,
            max_shrink_steps: defaults.max_shrink_steps,
        }
    }

    pub fn from_config(config: &LayoutConfig) -> Self {
        let (page_width, page_height) = config.page_size.dimensions();
        Self {
            page_width,
            page_height,
            padding: config.padding,
            shrink_factor: config.shrink_factor,
            min_dimension: config.min_dimension,
            max_shrink_steps: config.max_shrink_steps,
        }
    }

    pub fn with_shrink_limits(mut self, min_dimension: f64, max_shrink_steps: u32) -> Self {
        self.min_dimension = min_dimension;
        self.max_shrink_steps = max_shrink_steps;
        self
    }

    /// Usable (width, height) of the packing surface for output page `page`.
    pub fn page_capacity(&self, page: usize) -> (f64, f64) {
        if page == 0 {
            (self.page_width - self.padding, self.page_height - self.padding)
        } else {
            (self.page_width, self.page_height)
        }
    }

    /// Place every item. Fails only on degenerate input or a box that cannot
    /// be shrunk into an empty page within the configured limits.
    pub fn pack(&self, items: &[PackItem]) -> Result<Vec<Placement>> {
        let (first_w, first_h) = self.page_capacity(0);
        let mut surfaces = vec![ShelfPack::new(first_w, first_h)];
        let mut placements = Vec::with_capacity(items.len());

        for item in items {
            let finite = item.width.is_finite() && item.height.is_finite();
            if !(finite && item.width > 0.0 && item.height > 0.0) {
                return Err(PrintDiffError::DegenerateBox {
                    id: item.id,
                    width: item.width,
                    height: item.height,
                });
            }

            let padded_w = item.width + self.padding;
            let padded_h = item.height + self.padding;
            let existing = surfaces
                .iter_mut()
                .enumerate()
                .find_map(|(page, surface)| {
                    surface.pack_one(padded_w, padded_h).map(|bin| (page, bin))
                });

            let placement = match existing {
                Some((page, bin)) => Placement {
                    id: item.id,
                    x: bin.x,
                    y: self.page_height - bin.y - bin.h,
                    width: item.width,
                    height: item.height,
                    page,
                    shrink_steps: 0,
                },
                None => {
                    surfaces.push(ShelfPack::new(self.page_width, self.page_height));
                    let page = surfaces.len() - 1;
                    let surface = &mut surfaces[page];
                    debug!(
                        id = item.id,
                        page,
                        width = surface.width(),
                        height = surface.height(),
                        "opened new page"
                    );
                    self.place_shrinking(item, page, surface)?
                }
            };

            debug!(
                id = placement.id,
                page = placement.page,
                x = placement.x,
                y = placement.y,
                "placed box"
            );
            placements.push(placement);
        }

        placements.sort_by_key(|placement| placement.page);
        Ok(placements)
    }

    fn place_shrinking(
        &self,
        item: &PackItem,
        page: usize,
        surface: &mut ShelfPack,
    ) -> Result<Placement> {
        let mut width = item.width;
        let mut height = item.height;
        let mut steps = 0u32;

        loop {
            if let Some(bin) = surface.pack_one(width + self.padding, height + self.padding) {
                if steps > 0 {
                    warn!(
                        id = item.id,
                        steps,
                        from_width = item.width,
                        from_height = item.height,
                        width,
                        height,
                        "box shrunk to fit an empty page"
                    );
                }
                return Ok(Placement {
                    id: item.id,
                    x: bin.x,
                    y: self.page_height - bin.y - bin.h,
                    width,
                    height,
                    page,
                    shrink_steps: steps,
                });
            }

            if steps >= self.max_shrink_steps {
                return Err(PrintDiffError::CannotPlace {
                    id: item.id,
                    width,
                    height,
                    steps,
                });
            }
            width *= self.shrink_factor;
            height *= self.shrink_factor;
            steps += 1;
            if width < self.min_dimension || height < self.min_dimension {
                return Err(PrintDiffError::CannotPlace {
                    id: item.id,
                    width,
                    height,
                    steps,
                });
            }
        }
    }
}
