//! PDF backend on `lopdf`.
//!
//! Uses the standard Type1 Helvetica family with WinAnsi encoding, so no
//! font program is embedded. All coordinates are whole points and the
//! object graph is built in a fixed order without dates or IDs, which makes
//! the output byte-identical for identical input.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

use super::wrap::wrap;
use super::{Block, DocumentBackend, DocumentModel, HeadingLevel, OutputFormat, RenderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    const ALL: [Self; 3] = [Self::Regular, Self::Bold, Self::Oblique];

    fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Oblique => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
            Self::Oblique => "Helvetica-Oblique",
        }
    }

    /// Advance width in 1/1000 em.
    fn glyph_width(self, c: char) -> u16 {
        let table = match self {
            Self::Regular | Self::Oblique => &HELVETICA_WIDTHS,
            Self::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match c {
            ' '..='~' => table[c as usize - 0x20],
            _ => 556,
        }
    }

    fn text_width(self, size: i64, text: &str) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.glyph_width(c))).sum();
        units as f32 * size as f32 / 1000.0
    }
}

/// Helvetica advance widths for U+0020..=U+007E.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for U+0020..=U+007E.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Map a char to its WinAnsiEncoding byte; unmappable chars become `?`.
fn win_ansi(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '•' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => b'?',
    }
}

pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi).collect()
}

/// Page geometry and type sizes, in points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfStyle {
    pub page_width: i64,
    pub page_height: i64,
    pub margin: i64,
    pub title_size: i64,
    pub subtitle_size: i64,
    pub section_size: i64,
    pub subsection_size: i64,
    pub body_size: i64,
    pub footer_size: i64,
    pub bullet_indent: i64,
}

impl Default for PdfStyle {
    /// A4 with 2 cm margins.
    fn default() -> Self {
        Self {
            page_width: 595,
            page_height: 842,
            margin: 57,
            title_size: 22,
            subtitle_size: 11,
            section_size: 15,
            subsection_size: 12,
            body_size: 11,
            footer_size: 9,
            bullet_indent: 18,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfBackend {
    style: PdfStyle,
}

impl PdfBackend {
    pub fn new(style: PdfStyle) -> Self {
        Self { style }
    }
}

impl DocumentBackend for PdfBackend {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn render(&self, document: &DocumentModel) -> Result<Vec<u8>, RenderError> {
        let pages = paginate(&self.style, document);
        encode(&self.style, &document.title, &pages).map_err(|e| RenderError::Encode {
            format: OutputFormat::Pdf,
            message: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// One line of text at a fixed baseline.
#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    font: Font,
    size: i64,
    x: i64,
    y: i64,
    text: String,
}

struct Cursor<'a> {
    style: &'a PdfStyle,
    pages: Vec<Vec<PlacedLine>>,
    y: i64,
}

impl<'a> Cursor<'a> {
    fn new(style: &'a PdfStyle) -> Self {
        Self {
            style,
            pages: vec![Vec::new()],
            y: style.page_height - style.margin,
        }
    }

    fn bottom(&self) -> i64 {
        // Leave room for the footer.
        self.style.margin + self.style.footer_size * 2
    }

    fn page_is_empty(&self) -> bool {
        self.pages.last().is_none_or(Vec::is_empty)
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = self.style.page_height - self.style.margin;
    }

    /// Vertical space; dropped at the top of a page.
    fn gap(&mut self, points: i64) {
        if !self.page_is_empty() {
            self.y -= points;
        }
    }

    fn line(&mut self, font: Font, size: i64, x: i64, text: String) {
        let leading = size * 14 / 10;
        if self.y - leading < self.bottom() {
            self.new_page();
        }
        self.y -= leading;
        let y = self.y;
        if let Some(page) = self.pages.last_mut() {
            page.push(PlacedLine {
                font,
                size,
                x,
                y,
                text,
            });
        }
    }

    /// Wrapped text starting at `x`; continuation lines indent to `hang`.
    fn text(&mut self, font: Font, size: i64, x: i64, hang: i64, text: &str) {
        let right = self.style.page_width - self.style.margin;
        let first_width = (right - x) as f32;
        let rest_width = (right - hang) as f32;
        let lines = wrap(text, first_width.min(rest_width), |s| font.text_width(size, s));
        for (i, line) in lines.into_iter().enumerate() {
            self.line(font, size, if i == 0 { x } else { hang }, line);
        }
    }

    /// Start a new page when fewer than `points` remain, so headings are not
    /// stranded at the bottom.
    fn keep_with_next(&mut self, points: i64) {
        if !self.page_is_empty() && self.y - points < self.bottom() {
            self.new_page();
        }
    }
}

fn paginate(style: &PdfStyle, document: &DocumentModel) -> Vec<Vec<PlacedLine>> {
    let mut cursor = Cursor::new(style);
    let left = style.margin;

    for block in &document.blocks {
        match block {
            Block::Title(text) => {
                cursor.text(Font::Bold, style.title_size, left, left, text);
                cursor.gap(4);
            }
            Block::Subtitle(text) => {
                cursor.text(Font::Oblique, style.subtitle_size, left, left, text);
                cursor.gap(style.body_size);
            }
            Block::Heading { level, text } => {
                let size = match level {
                    HeadingLevel::Section => style.section_size,
                    HeadingLevel::Subsection => style.subsection_size,
                };
                cursor.gap(size / 2);
                cursor.keep_with_next(size * 4);
                cursor.text(Font::Bold, size, left, left, text);
                cursor.gap(2);
            }
            Block::Paragraph(text) => {
                cursor.text(Font::Regular, style.body_size, left, left, text);
                cursor.gap(style.body_size / 2);
            }
            Block::Label(text) => {
                cursor.gap(2);
                cursor.text(Font::Bold, style.body_size, left, left, text);
            }
            Block::Bullet { depth, text } => {
                let x = left + style.bullet_indent * i64::from(*depth);
                let marker_width = Font::Regular.text_width(style.body_size, "\u{2022} ");
                let hang = x + marker_width.ceil() as i64;
                cursor.text(
                    Font::Regular,
                    style.body_size,
                    x,
                    hang,
                    &format!("\u{2022} {text}"),
                );
            }
            Block::Note(text) => {
                cursor.text(Font::Oblique, style.body_size, left, left, text);
            }
            Block::SectionBreak => {
                if !cursor.page_is_empty() {
                    cursor.new_page();
                }
            }
        }
    }

    cursor.pages
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn int(n: i64) -> Object {
    Object::Integer(n)
}

fn literal(text: &str) -> Object {
    Object::String(encode_win_ansi(text), StringFormat::Literal)
}

/// Metadata text string: plain bytes for ASCII, otherwise UTF-16BE with a
/// byte order mark so viewers show any script.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn page_content(style: &PdfStyle, lines: &[PlacedLine], page_no: usize, page_count: usize) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5 + 5);
    let mut show = |font: Font, size: i64, x: i64, y: i64, text: &str| {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(font.resource_name().as_bytes().to_vec()), int(size)],
        ));
        operations.push(Operation::new("Td", vec![int(x), int(y)]));
        operations.push(Operation::new("Tj", vec![literal(text)]));
        operations.push(Operation::new("ET", vec![]));
    };

    for line in lines {
        show(line.font, line.size, line.x, line.y, &line.text);
    }

    let footer = format!("Page {page_no} of {page_count}");
    let width = Font::Regular.text_width(style.footer_size, &footer).round() as i64;
    show(
        Font::Regular,
        style.footer_size,
        (style.page_width - width) / 2,
        style.margin / 2,
        &footer,
    );

    Content { operations }
}

fn encode(style: &PdfStyle, title: &str, pages: &[Vec<PlacedLine>]) -> lopdf::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), Object::Reference(font_id));
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let page_count = pages.len();
    let mut kids: Vec<Object> = Vec::with_capacity(page_count);
    for (i, lines) in pages.iter().enumerate() {
        let content = page_content(style, lines, i + 1, page_count);
        let content_id: ObjectId = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let page_tree = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => int(page_count as i64),
        "Resources" => Object::Reference(resources_id),
        "MediaBox" => vec![int(0), int(0), int(style.page_width), int(style.page_height)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(title),
        "Producer" => text_string("plandoc"),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.trailer.set("Info", Object::Reference(info_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}
