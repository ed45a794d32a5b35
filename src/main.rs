//! # printdiff CLI
//!
//! Usage:
//!   printdiff input.pdf --chunks chunks.json -o printing.pdf
//!   printdiff input.pdf --chunks chunks.json --page-size a4 --layout-json placements.json
//!   printdiff input.pdf --chunks chunks.json --page-images p1.png p2.png --thumbnails thumbs/
//!   printdiff --example > chunks.json

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{ArgAction, Parser};
use tracing::{info, Level};

use printdiff::raster::PrerenderedPages;
use printdiff::{ChunkSet, LayoutConfig, PageSize};

/// Pack marked regions of a PDF onto as few print pages as possible.
#[derive(Parser, Debug)]
#[command(name = "printdiff")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source PDF
    #[arg(required_unless_present = "example")]
    input: Option<PathBuf>,

    /// Chunk set JSON: per source page, rectangles in raster pixels (2x)
    #[arg(short, long, required_unless_present = "example")]
    chunks: Option<PathBuf>,

    /// Output PDF path
    #[arg(short, long, default_value = "printing.pdf")]
    output: PathBuf,

    /// Layout configuration JSON; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output page format: letter, a4, legal, ... or WIDTHxHEIGHT in points
    #[arg(long)]
    page_size: Option<PageSize>,

    /// Padding around every packed chunk, in points
    #[arg(long)]
    padding: Option<f64>,

    /// Also write the final placements as JSON
    #[arg(long)]
    layout_json: Option<PathBuf>,

    /// Rendered page images, one per source page in order, used to crop
    /// chunk thumbnails (PNG or JPEG files, data URIs or base64)
    #[arg(long, num_args = 1..)]
    page_images: Vec<String>,

    /// Write each chunk's thumbnail to DIR as <name>.png
    #[arg(long, value_name = "DIR", requires = "page_images")]
    thumbnails: Option<PathBuf>,

    /// Print an example chunk set and exit
    #[arg(long, action = ArgAction::SetTrue)]
    example: bool,

    /// Debug logging
    #[arg(short, long, action = ArgAction::SetTrue, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, action = ArgAction::SetTrue)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    if args.example {
        print!("{}", example_chunks_json());
        return Ok(());
    }

    let (Some(input), Some(chunks_path)) = (&args.input, &args.chunks) else {
        bail!("an input PDF and --chunks are required");
    };

    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            LayoutConfig::from_json(&json)?
        }
        None => LayoutConfig::default(),
    };
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if let Some(padding) = args.padding {
        config.padding = padding;
    }
    config.validate()?;

    let pdf_bytes =
        fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    let chunks_json = fs::read_to_string(chunks_path)
        .with_context(|| format!("failed to read {}", chunks_path.display()))?;
    let chunks = ChunkSet::from_json(&chunks_json)?;

    let layout = if args.page_images.is_empty() {
        printdiff::layout_chunks(&pdf_bytes, &chunks, &config)?
    } else {
        let pages = PrerenderedPages::from_sources(&args.page_images)?;
        let document = printdiff::open_chunks(&pdf_bytes, &chunks, &pages, &config)?;
        if let Some(dir) = &args.thumbnails {
            write_thumbnails(&document, dir)?;
        }
        printdiff::generate_layout(&document, &config)?
    };

    if let Some(path) = &args.layout_json {
        let json = serde_json::to_string_pretty(&layout.positioned_chunks)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    fs::write(&args.output, layout.bytes())
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(
        chunks = layout.positioned_chunks.len(),
        pages = layout.page_count(),
        bytes = layout.bytes().len(),
        "wrote {}",
        args.output.display()
    );
    Ok(())
}

fn write_thumbnails(document: &printdiff::Document, dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let thumbnails = printdiff::chunk_thumbnails(document)?;
    for thumbnail in &thumbnails {
        let path = dir.join(format!("{}.png", thumbnail.name));
        fs::write(&path, &thumbnail.png)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    info!(count = thumbnails.len(), "wrote thumbnails to {}", dir.display());
    Ok(())
}

fn example_chunks_json() -> &'static str {
    r##"{
  "pages": [
    {
      "page": 0,
      "chunks": [
        { "x": 80, "y": 120, "w": 1000, "h": 340 },
        { "x": 80, "y": 900, "w": 640, "h": 220 }
      ]
    },
    {
      "page": 2,
      "chunks": [
        { "x": 60, "y": 60, "w": 520, "h": 400 }
      ]
    }
  ]
}
"##
}
