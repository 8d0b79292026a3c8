//! DOCX writer: Markdown element tree → native Word constructs.
//!
//! Headings use the built-in "Heading N" style names, lists use "List
//! Bullet" / "List Number" with real numbering definitions, and tables are
//! Word tables whose column count is the width of the widest row.

use crate::pipeline::markdown::{parse_blocks, Block, ListItem, Span};
use docx_rs::{
    AbstractNumbering, AlignmentType, BreakType, Docx, IndentLevel, Level, LevelJc, LevelText,
    NumberFormat, Numbering, NumberingId, Paragraph, Run, RunFonts, SpecialIndentType, Start,
    Style, StyleType, Table, TableCell, TableRow,
};
use std::path::Path;

const BULLET_ABSTRACT_ID: usize = 1;
const DECIMAL_ABSTRACT_ID: usize = 2;
/// Usable page width in twentieths of a point (A4 minus 2 cm margins).
const TABLE_WIDTH_TWIPS: usize = 9000;
const LIST_LEVELS: usize = 3;

fn heading_style_id(level: u8) -> String {
    format!("Heading{}", level.clamp(1, 6))
}

fn styles(docx: Docx) -> Docx {
    let mut docx = docx;
    for level in 1..=6u8 {
        // Half-points: 32, 28, 24, 22, 20, 20.
        let size = match level {
            1 => 32,
            2 => 28,
            3 => 24,
            4 => 22,
            _ => 20,
        };
        docx = docx.add_style(
            Style::new(heading_style_id(level), StyleType::Paragraph)
                .name(format!("Heading {level}"))
                .size(size)
                .bold(),
        );
    }
    docx.add_style(Style::new("ListBullet", StyleType::Paragraph).name("List Bullet"))
        .add_style(Style::new("ListNumber", StyleType::Paragraph).name("List Number"))
        .add_style(
            Style::new("Quote", StyleType::Paragraph)
                .name("Quote")
                .italic()
                .color("555555"),
        )
        .add_style(Style::new("Code", StyleType::Paragraph).name("Code").size(18))
}

fn numbering_definitions(docx: Docx) -> Docx {
    let mut bullet = AbstractNumbering::new(BULLET_ABSTRACT_ID);
    let mut decimal = AbstractNumbering::new(DECIMAL_ABSTRACT_ID);
    for level in 0..LIST_LEVELS {
        let indent = 720 * (level as i32 + 1);
        bullet = bullet.add_level(
            Level::new(
                level,
                Start::new(1),
                NumberFormat::new("bullet"),
                LevelText::new("•"),
                LevelJc::new("left"),
            )
            .indent(Some(indent), Some(SpecialIndentType::Hanging(360)), None, None),
        );
        decimal = decimal.add_level(
            Level::new(
                level,
                Start::new(1),
                NumberFormat::new("decimal"),
                LevelText::new(format!("%{}.", level + 1)),
                LevelJc::new("left"),
            )
            .indent(Some(indent), Some(SpecialIndentType::Hanging(360)), None, None),
        );
    }
    docx.add_abstract_numbering(bullet)
        .add_abstract_numbering(decimal)
}

fn run_for(span: &Span) -> Run {
    let mut run = Run::new();
    for (i, part) in span.text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(part);
    }
    if span.bold {
        run = run.bold();
    }
    if span.italic {
        run = run.italic();
    }
    if span.code {
        run = run.fonts(RunFonts::new().ascii("Courier New").hi_ansi("Courier New"));
    }
    run
}

fn paragraph_from(spans: &[Span]) -> Paragraph {
    spans
        .iter()
        .fold(Paragraph::new(), |p, span| p.add_run(run_for(span)))
}

/// Pad rows to the widest row's width.
pub fn table_grid(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(cols, String::new());
            row
        })
        .collect()
}

fn table_from(rows: &[Vec<String>]) -> Table {
    let grid = table_grid(rows);
    let cols = grid.first().map(Vec::len).unwrap_or(1).max(1);
    let table_rows = grid
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let cells = row
                .iter()
                .map(|text| {
                    let mut run = Run::new().add_text(text);
                    if r == 0 {
                        run = run.bold();
                    }
                    TableCell::new().add_paragraph(Paragraph::new().add_run(run))
                })
                .collect();
            TableRow::new(cells)
        })
        .collect();
    Table::new(table_rows).set_grid(vec![TABLE_WIDTH_TWIPS / cols; cols])
}

fn list_paragraphs(items: &[ListItem], ordered: bool, numbering_id: usize) -> Vec<Paragraph> {
    let style = if ordered { "ListNumber" } else { "ListBullet" };
    items
        .iter()
        .map(|item| {
            paragraph_from(&item.spans)
                .style(style)
                .numbering(
                    NumberingId::new(numbering_id),
                    IndentLevel::new(item.depth.min(LIST_LEVELS - 1)),
                )
        })
        .collect()
}

/// Build the document for a Markdown string.
pub fn build_docx(markdown: &str) -> Docx {
    let mut docx = numbering_definitions(styles(Docx::new()))
        .default_fonts(RunFonts::new().ascii("Arial").east_asia("Microsoft YaHei"))
        .add_numbering(Numbering::new(BULLET_ABSTRACT_ID, BULLET_ABSTRACT_ID));
    // Ordered lists get their own numbering instance so each restarts at 1.
    let mut next_numbering_id = 100;

    for block in parse_blocks(markdown) {
        docx = match block {
            Block::Heading { level, text } => docx.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(text))
                    .style(&heading_style_id(level)),
            ),
            Block::Paragraph(spans) => docx.add_paragraph(paragraph_from(&spans)),
            Block::List { ordered, items } => {
                let id = if ordered {
                    next_numbering_id += 1;
                    docx = docx.add_numbering(Numbering::new(next_numbering_id, DECIMAL_ABSTRACT_ID));
                    next_numbering_id
                } else {
                    BULLET_ABSTRACT_ID
                };
                list_paragraphs(&items, ordered, id)
                    .into_iter()
                    .fold(docx, |d, p| d.add_paragraph(p))
            }
            Block::Table { rows } => docx.add_table(table_from(&rows)),
            Block::CodeBlock(code) => {
                let span = Span {
                    text: code,
                    code: true,
                    ..Default::default()
                };
                docx.add_paragraph(Paragraph::new().add_run(run_for(&span)).style("Code"))
            }
            Block::Quote(spans) => docx.add_paragraph(paragraph_from(&spans).style("Quote")),
            Block::Rule => docx.add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("\u{2015}".repeat(12)))
                    .align(AlignmentType::Center),
            ),
        };
    }
    docx
}

/// Write Markdown as a `.docx` file.
pub fn write_docx(markdown: &str, output: &Path) -> Result<(), String> {
    let file = std::fs::File::create(output)
        .map_err(|e| format!("create {}: {e}", output.display()))?;
    build_docx(markdown)
        .build()
        .pack(file)
        .map_err(|e| format!("pack docx: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn ragged_rows_grow_to_widest() {
        let rows = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
            vec!["x".to_string(), "y".to_string()],
        ];
        let grid = table_grid(&rows);
        assert!(grid.iter().all(|r| r.len() == 3));
        assert_eq!(grid[0], vec!["a", "b", ""]);
        assert_eq!(grid[1], vec!["1", "2", "3"]);
        assert_eq!(grid[2], vec!["x", "y", ""]);
        assert!(table_grid(&[]).is_empty());
    }

    fn document_xml(path: &Path) -> String {
        let bytes = std::fs::read(path).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn writes_headings_lists_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.docx");
        let md = "# 标题\n\nIntro **bold**\n\n- one\n- two\n\n1. first\n\n| a | b |\n|---|---|\n| 1 | 2 | 3 |\n";
        write_docx(md, &out).unwrap();

        let xml = document_xml(&out);
        assert!(xml.contains("Heading1"));
        assert!(xml.contains("标题"));
        assert!(xml.contains("ListBullet"));
        assert!(xml.contains("ListNumber"));
        assert_eq!(xml.matches("<w:gridCol ").count(), 3);
    }
}
