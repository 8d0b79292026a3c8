//! Tertiary PDF tier: draw text directly with lopdf.
//!
//! No external engine is involved, so this tier succeeds on any machine
//! that can write the output file. The trade-off is typography: the
//! standard Helvetica faces are used with WinAnsi encoding, so characters
//! outside Latin-1 are drawn as `?` and counted in the render report.
//! Semantic structure (headings and paragraph order) is kept.
//!
//! Layout: the Markdown is split into blocks on blank lines. A block that
//! starts with `#` is a heading whose level is the marker length capped at
//! 3, drawn at `24 - 4 * level` pt. Everything else is body text at 11 pt.
//! Lines are wrapped to a fixed-width box and placed with a running cursor;
//! a new page starts when the cursor passes the bottom margin.

use super::PdfRenderer;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;
use tracing::debug;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const BODY_SIZE: f32 = 11.0;
/// Average Helvetica glyph width as a fraction of the font size.
const CHAR_WIDTH_EM: f32 = 0.5;

/// One line of text at a fixed position (PDF user space, origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub heading: bool,
}

/// Lines of one page.
pub type PageLayout = Vec<PlacedLine>;

/// Heading level (1–3) and text of a block, or `None` for body text.
pub fn heading_of(block: &str) -> Option<(u8, &str)> {
    if !block.starts_with('#') {
        return None;
    }
    let marker_len = block.chars().take_while(|&c| c == '#').count();
    let level = marker_len.min(3) as u8;
    let text = block[marker_len..].trim();
    Some((level, text))
}

/// Font size for a heading level.
pub fn heading_size(level: u8) -> f32 {
    24.0 - 4.0 * f32::from(level)
}

/// Greedy word wrap to `max_chars` characters per line.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    for raw in text.lines() {
        let mut current = String::new();
        for word in raw.split_whitespace() {
            let mut word = word.to_string();
            while word.chars().count() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let head: String = word.chars().take(max_chars).collect();
                word = word.chars().skip(max_chars).collect();
                lines.push(head);
            }
            let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Place every block on pages.
pub fn layout(markdown: &str) -> Vec<PageLayout> {
    let text_width = PAGE_WIDTH - 2.0 * MARGIN;
    let mut pages: Vec<PageLayout> = vec![Vec::new()];
    // Distance from the top edge to the top of the next line.
    let mut cursor = MARGIN;

    for block in markdown.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        let (text, size, heading) = match heading_of(block) {
            Some((level, text)) => (text.to_string(), heading_size(level), true),
            None => (block.replace("**", ""), BODY_SIZE, false),
        };
        if text.is_empty() {
            continue;
        }

        let max_chars = (text_width / (size * CHAR_WIDTH_EM)) as usize;
        let leading = size + 2.0;
        for line in wrap(&text, max_chars) {
            if cursor + leading > PAGE_HEIGHT - MARGIN {
                pages.push(Vec::new());
                cursor = MARGIN;
            }
            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    text: line,
                    x: MARGIN,
                    y: PAGE_HEIGHT - cursor - size,
                    size,
                    heading,
                });
            }
            cursor += leading;
        }
        cursor += if heading { 8.0 } else { 5.0 };
    }

    pages
}

fn is_latin1_printable(c: char) -> bool {
    matches!(u32::from(c), 0x20..=0x7E | 0xA0..=0xFF)
}

/// Encode for a WinAnsi Type1 font; unsupported characters become `?`.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if is_latin1_printable(c) { c as u8 } else { b'?' })
        .collect()
}

/// Visible characters of `markdown` that would be drawn as `?`.
pub fn replaced_char_count(markdown: &str) -> usize {
    markdown
        .chars()
        .filter(|&c| !c.is_whitespace() && !is_latin1_printable(c))
        .count()
}

fn page_content(lines: &[PlacedLine]) -> Result<Vec<u8>, String> {
    let mut operations = Vec::with_capacity(lines.len() * 6);
    for line in lines {
        let (font, color) = if line.heading {
            ("F2", [0.0, 0.0, 0.8])
        } else {
            ("F1", [0.0, 0.0, 0.0])
        };
        operations.push(Operation::new(
            "rg",
            color.iter().map(|&c| Object::Real(c)).collect(),
        ));
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![font.into(), Object::Integer(line.size.round() as i64)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![
                Object::Integer(line.x.round() as i64),
                Object::Integer(line.y.round() as i64),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_latin1(&line.text))],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
        .encode()
        .map_err(|e| format!("content stream: {e}"))
}

/// Build the PDF document for a layout.
pub fn build_document(pages: &[PageLayout]) -> Result<Document, String> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let body_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let heading_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => body_font,
            "F2" => heading_font,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for lines in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(lines)?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH as i64),
            Object::Integer(PAGE_HEIGHT as i64),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

/// Draws text with lopdf; never needs an external program.
#[derive(Debug, Default)]
pub struct DirectRenderer;

impl PdfRenderer for DirectRenderer {
    fn name(&self) -> &str {
        "direct"
    }

    fn render(&self, markdown: &str, output: &Path) -> Result<(), String> {
        let pages = layout(markdown);
        debug!("direct: {} pages laid out", pages.len());
        let mut doc = build_document(&pages)?;
        doc.save(output)
            .map(|_| ())
            .map_err(|e| format!("save {}: {e}", output.display()))
    }

    fn replaced_chars(&self, markdown: &str) -> usize {
        replaced_char_count(markdown)
    }
}
