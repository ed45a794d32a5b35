//! # PDF Input and Output
//!
//! [`SourcePdf`] decodes the user's document and answers the few questions
//! the layout needs: how many pages, how big each one is, and what the
//! document is called.
//!
//! [`PdfWriter`] serializes laid-out pages. The output is assembled inside a
//! copy of the source document so that source pages can be embedded without
//! re-encoding anything they reference:
//!
//! ```text
//! source page ──► Form XObject (page content + inherited resources, BBox = MediaBox)
//!                      │
//! output page ──► q  <frame> re W n  <scale+translate> cm  /P<n> Do  Q
//! ```
//!
//! Each used source page becomes one Form XObject, shared by every chunk cut
//! from it. The clip path on the output page selects the chunk's region.
//! Afterwards the catalog and page tree are replaced and everything only the
//! old page tree referenced is pruned.
//!
//! Label text uses the standard Courier-Bold font, so nothing is embedded
//! for it.

use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite; // for write! on String

use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream, StringFormat};
use miniz_oxide::deflate::compress_to_vec_zlib;
use tracing::debug;

use crate::error::{PrintDiffError, Result};
use crate::layout::{ClipBox, Color, DrawCommand, LayoutElement, LayoutPage};

/// Resource name of the label font on every output page.
const LABEL_FONT: &str = "F1";
const PRODUCER: &str = "printdiff";
/// MediaBox assumed for pages that do not declare one.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];
/// Guards against cyclic /Parent chains.
const MAX_TREE_DEPTH: usize = 64;

/// A decoded source document.
#[derive(Debug, Clone)]
pub struct SourcePdf {
    document: lopdf::Document,
    pages: Vec<SourcePage>,
}

/// A page of the source document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePage {
    pub id: ObjectId,
    /// Normalized `[x0, y0, x1, y1]` with `x0 <= x1`, `y0 <= y1`.
    pub media_box: [f64; 4],
}

impl SourcePage {
    pub fn width(&self) -> f64 {
        self.media_box[2] - self.media_box[0]
    }

    pub fn height(&self) -> f64 {
        self.media_box[3] - self.media_box[1]
    }
}

impl SourcePdf {
    /// Decode raw PDF bytes.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let document = lopdf::Document::load_mem(bytes).map_err(PrintDiffError::Decode)?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: lopdf::Document) -> Self {
        let pages = document
            .get_pages()
            .into_values()
            .map(|id| SourcePage {
                id,
                media_box: inherited(&document, id, b"MediaBox")
                    .and_then(|obj| rect_from(&document, obj))
                    .unwrap_or(DEFAULT_MEDIA_BOX),
            })
            .collect();
        Self { document, pages }
    }

    pub fn document(&self) -> &lopdf::Document {
        &self.document
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&SourcePage> {
        self.pages.get(index)
    }

    /// (width, height) of page `index` in PDF units.
    pub fn page_size(&self, index: usize) -> Option<(f64, f64)> {
        self.page(index).map(|page| (page.width(), page.height()))
    }

    pub fn page_height(&self, index: usize) -> Option<f64> {
        self.page(index).map(SourcePage::height)
    }

    /// The /Title from the document information dictionary, if non-empty.
    pub fn title(&self) -> Option<String> {
        let info = self.document.trailer.get(b"Info").ok()?;
        let info = resolve(&self.document, info).as_dict().ok()?;
        match resolve(&self.document, info.get(b"Title").ok()?) {
            Object::String(bytes, _) => Some(decode_text_string(bytes)),
            _ => None,
        }
        .filter(|title| !title.trim().is_empty())
    }
}

/// Document metadata written to the output's information dictionary.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub title: Option<String>,
}

impl Metadata {
    /// `Printing of <source title>`, or no title for an untitled source.
    pub fn for_source(source: &SourcePdf) -> Self {
        Self {
            title: source.title().map(|title| format!("Printing of {}", title)),
        }
    }
}

pub struct PdfWriter;

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write laid-out pages to a PDF byte vector. Source regions are taken
    /// from `source`.
    pub fn write(
        &self,
        pages: &[LayoutPage],
        source: &SourcePdf,
        metadata: &Metadata,
    ) -> Result<Vec<u8>> {
        let mut doc = source.document.clone();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier-Bold",
            "Encoding" => "WinAnsiEncoding"
        });
        let pages_id = doc.new_object_id();

        // Source page index -> Form XObject.
        let mut forms: BTreeMap<usize, ObjectId> = BTreeMap::new();
        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

        for page in pages {
            let mut xobjects = Dictionary::new();
            let mut stream = String::new();

            for element in &page.elements {
                match &element.draw {
                    DrawCommand::SourceRegion {
                        page: source_index,
                        clip,
                    } => {
                        let source_page = source
                            .page(*source_index)
                            .ok_or(PrintDiffError::PageOutOfRange(*source_index))?;
                        let form_id = match forms.get(source_index) {
                            Some(id) => *id,
                            None => {
                                let id = Self::embed_page(&mut doc, source_page)?;
                                forms.insert(*source_index, id);
                                id
                            }
                        };
                        let name = format!("P{}", source_index);
                        self.write_region(&mut stream, element, clip, source_page, &name);
                        xobjects.set(name, form_id);
                    }
                    DrawCommand::Rect { fill, stroke } => {
                        self.write_rect(&mut stream, element, *fill, *stroke);
                    }
                    DrawCommand::Text {
                        content,
                        font_size,
                        color,
                    } => {
                        self.write_text(&mut stream, element, content, *font_size, *color);
                    }
                }
            }

            let content_id = doc.add_object(compressed_stream(Dictionary::new(), stream.as_bytes()));
            let resources = dictionary! {
                "Font" => dictionary! { LABEL_FONT => font_id },
                "XObject" => xobjects
            };
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    real(page.width),
                    real(page.height)
                ],
                "Contents" => content_id,
                "Resources" => resources
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "ViewerPreferences" => dictionary! { "Duplex" => "Simplex" }
        });
        doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
            "Creator" => Object::string_literal(PRODUCER)
        };
        if let Some(ref title) = metadata.title {
            info.set("Title", text_string(title));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);
        doc.trailer.remove(b"Prev");
        doc.trailer.remove(b"XRefStm");

        let pruned = doc.prune_objects();
        debug!(
            pages = pages.len(),
            embedded_pages = forms.len(),
            pruned = pruned.len(),
            "assembled output document"
        );

        let mut output = Vec::new();
        doc.save_to(&mut output)?;
        Ok(output)
    }

    /// Wrap a source page as a Form XObject covering its MediaBox.
    fn embed_page(doc: &mut lopdf::Document, page: &SourcePage) -> Result<ObjectId> {
        let content = page_content(doc, page.id)?;
        let resources = inherited(doc, page.id, b"Resources").cloned();
        let [x0, y0, x1, y1] = page.media_box;

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![real(x0), real(y0), real(x1), real(y1)]
        };
        if let Some(resources) = resources {
            dict.set("Resources", resources);
        }
        Ok(doc.add_object(compressed_stream(dict, &content)))
    }

    /// Draw `clip` of a source page into the element frame: clip to the
    /// frame, then map the clip box onto it.
    fn write_region(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        clip: &ClipBox,
        page: &SourcePage,
        name: &str,
    ) {
        let sx = element.width / clip.width();
        let sy = element.height / clip.height();
        let tx = element.x - (page.media_box[0] + clip.left) * sx;
        let ty = element.y - (page.media_box[1] + clip.bottom) * sy;
        let _ = write!(
            stream,
            "q\n{:.2} {:.2} {:.2} {:.2} re W n\n{:.5} 0 0 {:.5} {:.3} {:.3} cm\n/{} Do\nQ\n",
            element.x, element.y, element.width, element.height, sx, sy, tx, ty, name
        );
    }

    fn write_rect(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        fill: Option<Color>,
        stroke: Option<(Color, f64)>,
    ) {
        let (x, y, w, h) = (element.x, element.y, element.width, element.height);

        if let Some(bg) = fill {
            let _ = write!(
                stream,
                "q\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                bg.r, bg.g, bg.b, x, y, w, h
            );
        }

        if let Some((bc, width)) = stroke {
            if width > 0.0 {
                let _ = write!(
                    stream,
                    "q\n{:.3} {:.3} {:.3} RG\n{:.2} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                    bc.r, bc.g, bc.b, width, x, y, w, h
                );
            }
        }
    }

    fn write_text(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        content: &str,
        font_size: f64,
        color: Color,
    ) {
        let _ = write!(
            stream,
            "BT\n{:.3} {:.3} {:.3} rg\n/{} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
            color.r,
            color.g,
            color.b,
            LABEL_FONT,
            font_size,
            element.x,
            element.y,
            Self::escape_pdf_string(content)
        );
    }

    /// Escape a string for a literal PDF string in WinAnsi encoding.
    /// Characters outside Latin-1 become `?`.
    fn escape_pdf_string(s: &str) -> String {
        let mut escaped = String::with_capacity(s.len());
        for ch in s.chars() {
            match ch {
                '\\' => escaped.push_str("\\\\"),
                '(' => escaped.push_str("\\("),
                ')' => escaped.push_str("\\)"),
                ' '..='~' => escaped.push(ch),
                _ if (ch as u32) <= 0xFF => {
                    let _ = write!(escaped, "\\{:03o}", ch as u32);
                }
                _ => escaped.push('?'),
            }
        }
        escaped
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// A page's content streams decoded and joined into one. Streams may split
/// anywhere between tokens, so each is followed by a newline.
fn page_content(doc: &lopdf::Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    for id in doc.get_page_contents(page_id) {
        let stream = doc
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(PrintDiffError::Write)?;
        if stream.dict.has(b"Filter") {
            let decoded = stream
                .decompressed_content()
                .map_err(PrintDiffError::Write)?;
            content.extend_from_slice(&decoded);
        } else {
            content.extend_from_slice(&stream.content);
        }
        content.push(b'\n');
    }
    Ok(content)
}

fn compressed_stream(mut dict: Dictionary, content: &[u8]) -> Stream {
    let compressed = compress_to_vec_zlib(content, 6);
    dict.set("Filter", "FlateDecode");
    Stream::new(dict, compressed)
}

/// Look `key` up on a page dictionary, walking up the /Parent chain for
/// inheritable attributes. References are resolved.
fn inherited<'a>(doc: &'a lopdf::Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a lopdf::Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn rect_from(doc: &lopdf::Document, object: &Object) -> Option<[f64; 4]> {
    let values = resolve(doc, object).as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let mut v = [0.0; 4];
    for (slot, value) in v.iter_mut().zip(values) {
        *slot = number(resolve(doc, value))?;
    }
    Some([v[0].min(v[2]), v[1].min(v[3]), v[0].max(v[2]), v[1].max(v[3])])
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, otherwise
/// single-byte (read as Latin-1).
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Encode a PDF text string, UTF-16BE when it is not plain ASCII.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::string_literal(text)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::LayoutElement;
    use crate::model::Document;
    use crate::raster::BlankRasterizer;

    /// Build a PDF with one page per `(width, height)`. Resources live on
    /// the page tree root so pages have to inherit them.
    pub(crate) fn source_bytes(sizes: &[(f64, f64)], title: Option<&str>) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica"
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id }
        });

        let mut kids = Vec::new();
        for (i, &(w, h)) in sizes.iter().enumerate() {
            let content = format!("BT /F1 24 Tf 20 {} Td (Page {}) Tj ET", h - 40.0, i + 1);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(w as f32),
                    Object::Real(h as f32)
                ]
            });
            kids.push(Object::Reference(page_id));
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id
        });
        doc.trailer.set("Root", catalog_id);
        if let Some(title) = title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title)
            });
            doc.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    pub(crate) fn single_page_source(width: f64, height: f64) -> SourcePdf {
        SourcePdf::load(&source_bytes(&[(width, height)], None)).unwrap()
    }

    /// A document of `count` half-letter pages (306 x 396), rasterized blank
    /// at 2x (612 x 792 px), with no chunks.
    pub(crate) fn document_with_pages(count: usize) -> Document {
        let bytes = source_bytes(&vec![(306.0, 396.0); count], None);
        Document::load(&bytes, &BlankRasterizer, &LayoutConfig::default()).unwrap()
    }

    fn page_contents(bytes: &[u8]) -> Vec<String> {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).unwrap()).into_owned())
            .collect()
    }

    fn region(page: usize, x: f64, y: f64, clip: ClipBox) -> LayoutElement {
        LayoutElement {
            x,
            y,
            width: clip.width() * 2.0,
            height: clip.height() * 2.0,
            draw: DrawCommand::SourceRegion { page, clip },
        }
    }

    fn blank_page(elements: Vec<LayoutElement>) -> LayoutPage {
        LayoutPage {
            width: 612.0,
            height: 792.0,
            elements,
        }
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(
            PdfWriter::escape_pdf_string("Hello (World)"),
            "Hello \\(World\\)"
        );
        assert_eq!(PdfWriter::escape_pdf_string("back\\slash"), "back\\\\slash");
        assert_eq!(PdfWriter::escape_pdf_string("café"), "caf\\351");
        assert_eq!(PdfWriter::escape_pdf_string("日"), "?");
    }

    #[test]
    fn test_source_page_sizes_and_title() {
        let bytes = source_bytes(&[(300.0, 400.0), (612.0, 792.0)], Some("Lecture Notes"));
        let source = SourcePdf::load(&bytes).unwrap();
        assert_eq!(source.page_count(), 2);
        assert_eq!(source.page_size(0), Some((300.0, 400.0)));
        assert_eq!(source.page_height(1), Some(792.0));
        assert_eq!(source.page_size(2), None);
        assert_eq!(source.title().as_deref(), Some("Lecture Notes"));
        assert_eq!(
            Metadata::for_source(&source).title.as_deref(),
            Some("Printing of Lecture Notes")
        );
    }

    #[test]
    fn test_untitled_source_has_no_title() {
        let source = single_page_source(100.0, 100.0);
        assert_eq!(source.title(), None);
        assert_eq!(Metadata::for_source(&source).title, None);
    }

    #[test]
    fn test_decode_error_on_garbage() {
        let err = SourcePdf::load(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, PrintDiffError::Decode(_)));
    }

    #[test]
    fn test_text_string_round_trip() {
        assert_eq!(decode_text_string(b"plain"), "plain");
        match text_string("Über") {
            Object::String(bytes, _) => assert_eq!(decode_text_string(&bytes), "Über"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_layout_produces_valid_pdf() {
        let source = single_page_source(100.0, 100.0);
        let bytes = PdfWriter::new()
            .write(&[blank_page(vec![])], &source, &Metadata::default())
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert!(bytes.windows(5).any(|w| w == b"%%EOF"));
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_source_pages_replaced_by_output_pages() {
        let source = SourcePdf::load(&source_bytes(&[(306.0, 396.0); 3], None)).unwrap();
        let clip = ClipBox {
            left: 10.0,
            bottom: 300.0,
            right: 110.0,
            top: 350.0,
        };
        let pages = vec![
            blank_page(vec![region(0, 20.0, 600.0, clip), region(2, 20.0, 400.0, clip)]),
            blank_page(vec![region(0, 20.0, 600.0, clip)]),
        ];
        let bytes = PdfWriter::new()
            .write(&pages, &source, &Metadata::default())
            .unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);

        let contents = page_contents(&bytes);
        assert!(contents[0].contains("/P0 Do"));
        assert!(contents[0].contains("/P2 Do"));
        assert!(contents[1].contains("/P0 Do"));
        assert!(contents[0].contains("20.00 600.00 200.00 100.00 re W n"));
        // Scale 2, translated so (10, 300) lands on (20, 600).
        assert!(contents[0].contains("2.00000 0 0 2.00000 0.000 0.000 cm"));

        // Source page 1 was never used: only two forms survive.
        let forms = doc
            .objects
            .values()
            .filter(|obj| {
                obj.as_stream()
                    .ok()
                    .and_then(|s| s.dict.get(b"Subtype").ok())
                    .and_then(|n| n.as_name().ok())
                    == Some(b"Form".as_slice())
            })
            .count();
        assert_eq!(forms, 2);
    }

    #[test]
    fn test_rect_and_label_operators() {
        let source = single_page_source(100.0, 100.0);
        let page = blank_page(vec![
            LayoutElement {
                x: 20.0,
                y: 682.0,
                width: 221.0,
                height: 100.0,
                draw: DrawCommand::Rect {
                    fill: None,
                    stroke: Some((Color::gray(0.5), 1.0)),
                },
            },
            LayoutElement {
                x: 220.0,
                y: 687.0,
                width: 21.0,
                height: 12.0,
                draw: DrawCommand::Rect {
                    fill: Some(Color::gray(0.95)),
                    stroke: None,
                },
            },
            LayoutElement {
                x: 220.0,
                y: 687.0,
                width: 21.0,
                height: 12.0,
                draw: DrawCommand::Text {
                    content: "0.0".to_string(),
                    font_size: 12.0,
                    color: Color::gray(0.4),
                },
            },
        ]);
        let bytes = PdfWriter::new()
            .write(&[page], &source, &Metadata::default())
            .unwrap();
        let content = &page_contents(&bytes)[0];
        assert!(content.contains("0.500 0.500 0.500 RG\n1.00 w\n20.00 682.00 221.00 100.00 re\nS"));
        assert!(content.contains("0.950 0.950 0.950 rg\n220.00 687.00 21.00 12.00 re\nf"));
        assert!(content.contains("/F1 12.0 Tf\n220.00 687.00 Td\n(0.0) Tj"));

        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Courier-Bold"));

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let duplex = doc
            .catalog()
            .unwrap()
            .get(b"ViewerPreferences")
            .and_then(Object::as_dict)
            .and_then(|prefs| prefs.get(b"Duplex"))
            .and_then(Object::as_name)
            .unwrap();
        assert_eq!(duplex, b"Simplex");
    }

    #[test]
    fn test_title_written_to_info() {
        let source = single_page_source(100.0, 100.0);
        let metadata = Metadata {
            title: Some("Printing of Notes".to_string()),
        };
        let bytes = PdfWriter::new()
            .write(&[blank_page(vec![])], &source, &metadata)
            .unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let reloaded = SourcePdf::from_document(doc);
        assert_eq!(reloaded.title().as_deref(), Some("Printing of Notes"));
    }

    #[test]
    fn test_media_box_origin_offsets_clip() {
        let mut doc = lopdf::Document::load_mem(&source_bytes(&[(200.0, 200.0)], None)).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set(
                "MediaBox",
                vec![
                    Object::Integer(50),
                    Object::Integer(100),
                    Object::Integer(250),
                    Object::Integer(300),
                ],
            );
        let source = SourcePdf::from_document(doc);
        assert_eq!(source.page_size(0), Some((200.0, 200.0)));

        let clip = ClipBox {
            left: 0.0,
            bottom: 0.0,
            right: 100.0,
            top: 100.0,
        };
        let bytes = PdfWriter::new()
            .write(&[blank_page(vec![region(0, 0.0, 0.0, clip)])], &source, &Metadata::default())
            .unwrap();
        // (50, 100) in form space maps to the frame origin.
        assert!(page_contents(&bytes)[0].contains("2.00000 0 0 2.00000 -100.000 -200.000 cm"));
    }

    /// A one-page source whose Contents is an array of the given streams.
    fn split_content_source(streams: Vec<Stream>) -> SourcePdf {
        let mut doc = lopdf::Document::load_mem(&source_bytes(&[(200.0, 200.0)], None)).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let ids: Vec<Object> = streams
            .into_iter()
            .map(|stream| Object::Reference(doc.add_object(stream)))
            .collect();
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set("Contents", ids);
        SourcePdf::from_document(doc)
    }

    fn form_contents(bytes: &[u8]) -> Vec<String> {
        let doc = lopdf::Document::load_mem(bytes).unwrap();
        doc.objects
            .values()
            .filter_map(|obj| obj.as_stream().ok())
            .filter(|s| {
                s.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Form".as_slice())
            })
            .map(|s| String::from_utf8_lossy(&s.decompressed_content().unwrap()).into_owned())
            .collect()
    }

    #[test]
    fn test_split_content_streams_keep_token_boundaries() {
        let first = Stream::new(Dictionary::new(), b"q 1 0 0 RG".to_vec());
        let second = compressed_stream(Dictionary::new(), b"10 10 100 100 re S Q");
        let source = split_content_source(vec![first, second]);
        let clip = ClipBox {
            left: 0.0,
            bottom: 0.0,
            right: 100.0,
            top: 100.0,
        };
        let bytes = PdfWriter::new()
            .write(&[blank_page(vec![region(0, 0.0, 0.0, clip)])], &source, &Metadata::default())
            .unwrap();

        let forms = form_contents(&bytes);
        assert_eq!(forms.len(), 1);
        assert!(!forms[0].contains("RG10"));
        assert!(forms[0].contains("q 1 0 0 RG\n10 10 100 100 re S Q"));
    }

    #[test]
    fn test_undecodable_content_stream_is_an_error() {
        let mut dict = Dictionary::new();
        dict.set("Filter", "JBIG2Decode");
        let source = split_content_source(vec![Stream::new(dict, vec![0xde, 0xad])]);
        let clip = ClipBox {
            left: 0.0,
            bottom: 0.0,
            right: 50.0,
            top: 50.0,
        };
        let result =
            PdfWriter::new().write(&[blank_page(vec![region(0, 0.0, 0.0, clip)])], &source, &Metadata::default());
        assert!(matches!(result, Err(PrintDiffError::Write(_))));
    }
}
