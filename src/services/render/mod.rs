//! PDF generation for the three input categories.
//!
//! Each renderer first computes a layout and then hands it to [`PdfBuilder`],
//! which writes a plain PDF with `lopdf`. Layouts are exposed so that page and
//! line placement can be checked without parsing PDF output.

pub mod doc;
pub mod image;
pub mod text;

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

/// A4 in PDF points
pub const A4_WIDTH: f32 = 595.2756;
pub const A4_HEIGHT: f32 = 841.8898;

pub const FONT_SIZE: f32 = 12.0;
const FONT_NAME: &str = "F1";

/// Helvetica advance widths for bytes 0x20..=0x7E, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];
const DEFAULT_WIDTH: u16 = 556;

/// One line of text at a fixed position (PDF coordinates, origin bottom-left)
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    pub y: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub lines: Vec<PlacedLine>,
}

/// Maps a character to its WinAnsiEncoding byte
fn win_ansi_byte(ch: char) -> Option<u8> {
    let code = ch as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => match ch {
            '€' => Some(0x80),
            '‚' => Some(0x82),
            'ƒ' => Some(0x83),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '†' => Some(0x86),
            '‡' => Some(0x87),
            'ˆ' => Some(0x88),
            '‰' => Some(0x89),
            'Š' => Some(0x8A),
            '‹' => Some(0x8B),
            'Œ' => Some(0x8C),
            'Ž' => Some(0x8E),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '˜' => Some(0x98),
            '™' => Some(0x99),
            'š' => Some(0x9A),
            '›' => Some(0x9B),
            'œ' => Some(0x9C),
            'ž' => Some(0x9E),
            'Ÿ' => Some(0x9F),
            _ => None,
        },
    }
}

/// Encodes text for the built-in Helvetica font. Unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| win_ansi_byte(ch).unwrap_or(b'?'))
        .collect()
}

fn byte_width(byte: u8) -> u16 {
    match byte {
        0x20..=0x7E => HELVETICA_WIDTHS[(byte - 0x20) as usize],
        0xA0 => 278,
        _ => DEFAULT_WIDTH,
    }
}

pub fn char_width(ch: char, font_size: f32) -> f32 {
    let byte = win_ansi_byte(ch).unwrap_or(b'?');
    byte_width(byte) as f32 * font_size / 1000.0
}

pub fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(|ch| char_width(ch, font_size)).sum()
}

fn text_operations(lines: &[PlacedLine]) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(lines.len() * 5);
    for line in lines {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(FONT_NAME.as_bytes().to_vec()), FONT_SIZE.into()],
        ));
        ops.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(
                encode_win_ansi(&line.text),
                lopdf::StringFormat::Literal,
            )],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

/// Minimal page-by-page PDF writer over `lopdf`
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: Option<ObjectId>,
    kids: Vec<Object>,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            font_id: None,
            kids: Vec::new(),
        }
    }

    fn font(&mut self) -> ObjectId {
        if let Some(id) = self.font_id {
            return id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.font_id = Some(id);
        id
    }

    fn add_page(
        &mut self,
        width: f32,
        height: f32,
        resources: Dictionary,
        operations: Vec<Operation>,
    ) -> Result<()> {
        let content = Content { operations };
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.encode()?));
        let resources_id = self.doc.add_object(resources);

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    /// Adds one page of Helvetica text lines
    pub fn add_text_page(&mut self, width: f32, height: f32, page: &PageLayout) -> Result<()> {
        let font_id = self.font();
        let resources = dictionary! {
            "Font" => dictionary! { FONT_NAME => font_id },
        };
        self.add_page(width, height, resources, text_operations(&page.lines))
    }

    /// Adds one page that is entirely covered by an image XObject
    pub fn add_image_page(&mut self, width: f32, height: f32, image: Stream) -> Result<()> {
        let image_id = self.doc.add_object(image);
        let resources = dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        };
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    height.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ];
        self.add_page(width, height, resources, operations)
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn finish(mut self) -> Result<Vec<u8>> {
        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => count,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

/// Writes laid-out text pages. An empty layout still yields one blank page.
pub fn write_text_pdf(pages: &[PageLayout], width: f32, height: f32) -> Result<Vec<u8>> {
    let mut builder = PdfBuilder::new();
    for page in pages {
        builder.add_text_page(width, height, page)?;
    }
    if builder.page_count() == 0 {
        builder.add_text_page(width, height, &PageLayout::default())?;
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Hello"), b"Hello".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(
            encode_win_ansi("“ok” – €"),
            vec![0x93, b'o', b'k', 0x94, b' ', 0x96, b' ', 0x80]
        );
        assert_eq!(encode_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn test_text_width() {
        // "Hi" = 722 + 222
        let width = text_width("Hi", 10.0);
        assert!((width - 9.44).abs() < 0.001);
        assert_eq!(text_width("", FONT_SIZE), 0.0);
    }

    #[test]
    fn test_write_text_pdf_page_count() {
        let pages = vec![
            PageLayout {
                lines: vec![PlacedLine {
                    x: 40.0,
                    y: 800.0,
                    text: "one".to_string(),
                }],
            },
            PageLayout::default(),
        ];
        let bytes = write_text_pdf(&pages, A4_WIDTH, A4_HEIGHT).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_write_text_pdf_never_empty() {
        let bytes = write_text_pdf(&[], A4_WIDTH, A4_HEIGHT).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
