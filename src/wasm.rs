use wasm_bindgen::prelude::*;

use serde::Serialize;

use crate::model::ChunkSet;
use crate::raster::{self, BlankRasterizer, PrerenderedPages};
use crate::{LayoutConfig, LayoutEngine, PrintDiffError};

fn to_js(e: PrintDiffError) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

fn load(pdf_bytes: &[u8], chunks_json: &str) -> Result<crate::Document, PrintDiffError> {
    let chunks = ChunkSet::from_json(chunks_json)?;
    let mut document = crate::process_file(pdf_bytes, &BlankRasterizer, &LayoutConfig::default())?;
    document.apply_chunk_set(&chunks)?;
    Ok(document)
}

/// Lay out the chunks over the source PDF and return the output PDF bytes.
#[wasm_bindgen]
pub fn layout_pdf(pdf_bytes: &[u8], chunks_json: &str) -> Result<Vec<u8>, JsValue> {
    crate::layout_json(pdf_bytes, chunks_json).map_err(to_js)
}

/// The gallery order: every chunk with its name and source reference.
#[wasm_bindgen]
pub fn flatten_chunks(pdf_bytes: &[u8], chunks_json: &str) -> Result<JsValue, JsValue> {
    let document = load(pdf_bytes, chunks_json).map_err(to_js)?;
    let flattened = crate::flatten(&document);
    serde_wasm_bindgen::to_value(&flattened).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Packed placements without rendering the output document.
#[wasm_bindgen]
pub fn arrange_chunks(pdf_bytes: &[u8], chunks_json: &str) -> Result<JsValue, JsValue> {
    let document = load(pdf_bytes, chunks_json).map_err(to_js)?;
    let arranged = LayoutEngine::default().arrange(&document).map_err(to_js)?;
    serde_wasm_bindgen::to_value(&arranged).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[derive(Serialize)]
struct ThumbnailUri {
    name: String,
    image: String,
}

/// Chunk thumbnails cropped from host-rendered page images.
///
/// `page_images_json` is a JSON array with one PNG or JPEG per source page,
/// as data URIs or bare base64. The result lists `{ name, image }` in gallery
/// order, each image a PNG data URI.
#[wasm_bindgen]
pub fn chunk_thumbnails(
    pdf_bytes: &[u8],
    chunks_json: &str,
    page_images_json: &str,
) -> Result<JsValue, JsValue> {
    let sources: Vec<String> =
        serde_json::from_str(page_images_json).map_err(|e| to_js(e.into()))?;
    let rasterizer = PrerenderedPages::from_sources(&sources).map_err(to_js)?;
    let chunks = ChunkSet::from_json(chunks_json).map_err(to_js)?;
    let document =
        crate::open_chunks(pdf_bytes, &chunks, &rasterizer, &LayoutConfig::default()).map_err(to_js)?;
    let thumbnails = crate::chunk_thumbnails(&document)
        .map_err(to_js)?
        .into_iter()
        .map(|thumbnail| ThumbnailUri {
            image: format!("data:image/png;base64,{}", raster::base64_encode(&thumbnail.png)),
            name: thumbnail.name,
        })
        .collect::<Vec<_>>();
    serde_wasm_bindgen::to_value(&thumbnails).map_err(|e| JsValue::from_str(&e.to_string()))
}
