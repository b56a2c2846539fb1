//! PDF Renderer
//!
//! Builds the document directly on `lopdf`'s object model using the two
//! standard Helvetica faces, so no font files are embedded.

use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::error::{RenderError, Result};
use crate::fields::DocumentFields;
use crate::layout::{FontRole, PageLayout, PlacedLine};

/// Heading printed at the top of every document
pub const DEFAULT_HEADING: &str = "Business Information";

const HEADING_FONT: &str = "F1";
const BODY_FONT: &str = "F2";

/// Renderer strategy
///
/// Produces the complete file in memory.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, fields: &DocumentFields) -> Result<Vec<u8>>;
}

/// Renders a heading plus one `label: value` line per field
#[derive(Clone, Debug)]
pub struct PdfRenderer {
    layout: PageLayout,
    heading: String,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new(PageLayout::default(), DEFAULT_HEADING)
    }
}

impl PdfRenderer {
    pub fn new(layout: PageLayout, heading: impl Into<String>) -> Self {
        Self {
            layout,
            heading: heading.into(),
        }
    }

    pub const fn layout(&self) -> &PageLayout {
        &self.layout
    }

    fn page_content(&self, lines: &[PlacedLine]) -> Result<Vec<u8>> {
        let mut operations = Vec::with_capacity(lines.len() * 4);
        for line in lines {
            let font = match line.role {
                FontRole::Heading => HEADING_FONT,
                FontRole::Body => BODY_FONT,
            };
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![font.into(), Object::Real(self.layout.size_of(line.role))],
            ));
            operations.push(Operation::new(
                "Td",
                vec![Object::Real(line.x), Object::Real(line.y)],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(
                    encode_win_ansi(&line.text),
                    StringFormat::Literal,
                )],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        Content { operations }
            .encode()
            .map_err(|e| RenderError::Encode(e.to_string()))
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, fields: &DocumentFields) -> Result<Vec<u8>> {
        let pages = self.layout.paginate(&self.heading, &fields.lines());

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let fonts = Dictionary::from_iter(vec![
            (HEADING_FONT, Object::Reference(standard_font(&mut doc, "Helvetica-Bold"))),
            (BODY_FONT, Object::Reference(standard_font(&mut doc, "Helvetica"))),
        ]);
        let resources_id = doc.add_object(Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(fonts),
        )]));

        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(self.layout.width),
            Object::Real(self.layout.height),
        ];

        let mut kids = Vec::with_capacity(pages.len());
        for lines in &pages {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), self.page_content(lines)?));
            let page_id = doc.add_object(Dictionary::from_iter(vec![
                ("Type", "Page".into()),
                ("Parent", Object::Reference(pages_id)),
                ("MediaBox", Object::Array(media_box.clone())),
                ("Resources", Object::Reference(resources_id)),
                ("Contents", Object::Reference(content_id)),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let page_count = i64::try_from(kids.len()).map_err(|e| RenderError::Pdf(e.to_string()))?;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", "Pages".into()),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(page_count)),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", "Catalog".into()),
            ("Pages", Object::Reference(pages_id)),
        ]));
        let info_id = doc.add_object(Dictionary::from_iter(vec![
            ("Title", Object::string_literal(self.heading.as_str())),
            ("Producer", Object::string_literal(concat!("paydoc ", env!("CARGO_PKG_VERSION")))),
            (
                "CreationDate",
                Object::string_literal(Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
            ),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.trailer.set("Info", Object::Reference(info_id));

        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;

        tracing::debug!(
            pages = pages.len(),
            fields = fields.len(),
            bytes = bytes.len(),
            "Rendered document"
        );
        Ok(bytes)
    }
}

fn standard_font(doc: &mut Document, base_font: &str) -> ObjectId {
    doc.add_object(Dictionary::from_iter(vec![
        ("Type", "Font".into()),
        ("Subtype", "Type1".into()),
        ("BaseFont", base_font.into()),
        ("Encoding", "WinAnsiEncoding".into()),
    ]))
}

/// WinAnsiEncoding bytes 0x80..=0x9F. Unassigned slots are `None`.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

/// Map text onto WinAnsiEncoding; anything the standard fonts cannot show
/// becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match u32::from(c) {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => u8::try_from(code).unwrap_or(b'?'),
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|&slot| slot == Some(c))
            .and_then(|i| u8::try_from(0x80 + i).ok())
            .unwrap_or(b'?'),
    }
}

fn win_ansi_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => WIN_ANSI_HIGH[usize::from(byte - 0x80)].unwrap_or('?'),
        _ => char::from(byte),
    }
}

/// Read back the text of every page, one entry per `Tj` operation.
///
/// Only understands documents produced by [`PdfRenderer`].
pub fn read_text_lines(pdf: &[u8]) -> Result<Vec<Vec<String>>> {
    let doc = Document::load_mem(pdf).map_err(|e| RenderError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    for page_id in doc.get_pages().into_values() {
        let raw = doc
            .get_page_content(page_id)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let content = Content::decode(&raw).map_err(|e| RenderError::Encode(e.to_string()))?;

        let lines = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => {
                    Some(bytes.iter().map(|&b| win_ansi_char(b)).collect())
                }
                _ => None,
            })
            .collect();
        pages.push(lines);
    }

    Ok(pages)
}
