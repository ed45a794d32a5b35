//! # Layout Configuration
//!
//! Geometry constants that the packer, flattener and composer share. They are
//! injected through [`LayoutConfig`] rather than hardcoded so alternate page
//! formats and raster scales can be exercised.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PrintDiffError, Result};

/// Configuration for one layout pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Output page format.
    pub page_size: PageSize,

    /// Padding added to both dimensions of every packed box.
    pub padding: f64,

    /// Raster pixels per PDF unit of the rendered source pages. Chunk
    /// rectangles are in raster pixels; clip boxes are raster / scale.
    pub raster_scale: f64,

    /// Factor applied to both dimensions of a box that fits no empty page.
    pub shrink_factor: f64,

    /// A box shrunk below this width or height is reported as unplaceable.
    pub min_dimension: f64,

    /// Upper bound on shrink iterations for a single box.
    pub max_shrink_steps: u32,

    /// Border and label tag styling.
    pub label: LabelStyle,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::Letter,
            padding: 20.0,
            raster_scale: 2.0,
            shrink_factor: 0.8,
            min_dimension: 1.0,
            max_shrink_steps: 64,
            label: LabelStyle::default(),
        }
    }
}

impl LayoutConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LayoutConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the packer cannot work with.
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.page_size.dimensions();
        if !(width > 0.0 && height > 0.0) {
            return Err(PrintDiffError::Config(format!(
                "page size must be positive, got {}x{}",
                width, height
            )));
        }
        if !(self.padding >= 0.0) {
            return Err(PrintDiffError::Config(format!(
                "padding must not be negative, got {}",
                self.padding
            )));
        }
        if !(self.raster_scale > 0.0) {
            return Err(PrintDiffError::Config(format!(
                "raster scale must be positive, got {}",
                self.raster_scale
            )));
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor < 1.0) {
            return Err(PrintDiffError::Config(format!(
                "shrink factor must lie in (0, 1), got {}",
                self.shrink_factor
            )));
        }
        if !(self.min_dimension > 0.0) {
            return Err(PrintDiffError::Config(format!(
                "minimum dimension must be positive, got {}",
                self.min_dimension
            )));
        }
        Ok(())
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    A4,
    A3,
    A5,
    #[default]
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    /// Accepts a format name (`letter`, `a4`, ...) or `<width>x<height>`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "a3" => Ok(PageSize::A3),
            "a5" => Ok(PageSize::A5),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            "tabloid" => Ok(PageSize::Tabloid),
            other => {
                let (w, h) = other
                    .split_once('x')
                    .ok_or_else(|| format!("unknown page size '{}'", s))?;
                let width: f64 = w
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page width in '{}'", s))?;
                let height: f64 = h
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page height in '{}'", s))?;
                Ok(PageSize::Custom { width, height })
            }
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Custom { width, height } => write!(f, "{}x{}", width, height),
            named => write!(f, "{:?}", named),
        }
    }
}

/// Styling of the border around each placed chunk and its name tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelStyle {
    pub font_size: f64,
    /// Tag width per character of the chunk name (Courier is monospaced).
    pub char_width: f64,
    pub tag_height: f64,
    /// Vertical offset of the tag above the bottom edge of the chunk.
    pub tag_rise: f64,
    pub border_width: f64,
    pub border_gray: f64,
    pub tag_gray: f64,
    pub text_gray: f64,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            char_width: 7.0,
            tag_height: 12.0,
            tag_rise: 5.0,
            border_width: 1.0,
            border_gray: 0.5,
            tag_gray: 0.95,
            text_gray: 0.4,
        }
    }
}

impl LabelStyle {
    /// Width of the tag that carries `name`.
    pub fn tag_width(&self, name: &str) -> f64 {
        self.char_width * name.chars().count() as f64
    }
}
