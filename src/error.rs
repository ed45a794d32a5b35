//! Structured error types for printdiff.
//!
//! Collaborator failures (decoding, rasterizing, writing) and precondition
//! violations (stale indices, degenerate boxes) share one enum so every public
//! entry point returns the same `Result`.

use thiserror::Error;

/// The unified error type returned by all public printdiff API functions.
#[derive(Debug, Error)]
pub enum PrintDiffError {
    /// The source bytes could not be decoded as a PDF.
    #[error("Failed to decode PDF: {0}")]
    Decode(#[source] lopdf::Error),

    /// The rasterizer could not produce an image for a source page.
    #[error("Failed to rasterize page {page}: {message}")]
    Render { page: usize, message: String },

    /// A raster could not be decoded or encoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// A page index that does not exist in the document.
    #[error("Page {0} does not exist")]
    PageOutOfRange(usize),

    /// A chunk index that does not exist on its page.
    #[error("Chunk {chunk} does not exist on page {page}")]
    ChunkOutOfRange { page: usize, chunk: usize },

    /// A box with zero or negative extent was handed to the packer.
    #[error("Box {id} has non-positive size {width}x{height}")]
    DegenerateBox { id: usize, width: f64, height: f64 },

    /// A box could not be shrunk into an empty page.
    #[error("Box {id} cannot be placed: still {width:.1}x{height:.1} after {steps} shrink steps")]
    CannotPlace {
        id: usize,
        width: f64,
        height: f64,
        steps: u32,
    },

    /// The operation is not available in the session's current state.
    #[error("Cannot {action} while {state}")]
    InvalidState { action: &'static str, state: String },

    /// The layout configuration is unusable.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Assembling or serializing the output PDF failed.
    #[error("Failed to write PDF: {0}")]
    Write(#[source] lopdf::Error),

    /// JSON input failed to parse.
    #[error("Failed to parse input: {source}{}", hint_suffix(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = PrintDiffError> = std::result::Result<T, E>;

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for PrintDiffError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        PrintDiffError::Parse { source: e, hint }
    }
}
