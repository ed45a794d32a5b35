//! # Application Session
//!
//! The page state a host UI moves through:
//!
//! ```text
//! Empty ──open──► Loading ──► Viewing ◄──back_to_selecting── Exporting
//!                    │           └────────────export──────────────┘
//!                    └── decode/render failure: back to the prior state
//! ```
//!
//! Exports run against a snapshot of the document taken when they start, so
//! a layout always reflects the chunk set at the moment of the request.

use std::fmt;

use tracing::{info, warn};

use crate::config::LayoutConfig;
use crate::error::{PrintDiffError, Result};
use crate::layout::{Layout, LayoutEngine};
use crate::model::Document;
use crate::raster::PageRasterizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageState {
    /// No document yet.
    #[default]
    Empty,
    Loading,
    /// A document is loaded and chunks can be edited.
    Viewing,
    /// A layout preview is shown.
    Exporting,
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageState::Empty => "no document is loaded",
            PageState::Loading => "a document is loading",
            PageState::Viewing => "viewing",
            PageState::Exporting => "exporting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
pub struct Session {
    state: PageState,
    document: Option<Document>,
    layout: Option<Layout>,
    engine: LayoutEngine,
}

impl Session {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            engine: LayoutEngine::new(config),
            ..Default::default()
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn document_mut(&mut self) -> Option<&mut Document> {
        self.document.as_mut()
    }

    /// The last successful export, while in [`PageState::Exporting`].
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    /// Load a new document. `None` is a cancelled file pick: nothing
    /// changes and `Ok(false)` is returned.
    pub fn open(&mut self, bytes: Option<&[u8]>, rasterizer: &dyn PageRasterizer) -> Result<bool> {
        let Some(bytes) = bytes else {
            return Ok(false);
        };
        let prior = self.state;
        self.state = PageState::Loading;

        match Document::load(bytes, rasterizer, self.engine.config()) {
            Ok(document) => {
                self.document = Some(document);
                self.layout = None;
                self.state = PageState::Viewing;
                Ok(true)
            }
            Err(e) => {
                warn!("failed to open document: {e}");
                self.state = prior;
                Err(e)
            }
        }
    }

    /// Lay out the current chunks and switch to the preview. On failure the
    /// session stays in [`PageState::Viewing`] and no layout is exposed.
    pub fn export(&mut self) -> Result<&Layout> {
        if self.state != PageState::Viewing {
            return Err(self.invalid("export"));
        }
        let snapshot = self
            .document
            .clone()
            .ok_or_else(|| self.invalid("export"))?;

        self.state = PageState::Exporting;
        match self.engine.generate(&snapshot) {
            Ok(layout) => {
                info!(pages = layout.page_count(), "export ready");
                Ok(self.layout.insert(layout))
            }
            Err(e) => {
                warn!("export failed: {e}");
                self.state = PageState::Viewing;
                self.layout = None;
                Err(e)
            }
        }
    }

    /// Leave the preview and return to editing.
    pub fn back_to_selecting(&mut self) -> Result<()> {
        if self.state != PageState::Exporting {
            return Err(self.invalid("return to selection"));
        }
        self.state = PageState::Viewing;
        self.layout = None;
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> PrintDiffError {
        PrintDiffError::InvalidState {
            action,
            state: self.state.to_string(),
        }
    }
}
