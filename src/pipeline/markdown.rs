//! Markdown → element tree and HTML.
//!
//! Renderers do not walk pulldown-cmark events themselves. The DOCX writer
//! consumes the [`Block`] list built here and the HTML tiers use
//! [`to_html`].
//!
//! Tables are read from their source lines rather than from parser events:
//! GFM truncates body rows to the header width, but a translated table may
//! have rows wider than its header and no cell should be lost.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

/// Inline run of text with uniform styling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// Nesting depth, 0 for top-level items.
    pub depth: usize,
    pub spans: Vec<Span>,
}

/// Block-level element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(Vec<Span>),
    List { ordered: bool, items: Vec<ListItem> },
    /// Rows as written; the first row is the header. Rows may differ in width.
    Table { rows: Vec<Vec<String>> },
    CodeBlock(String),
    Quote(Vec<Span>),
    Rule,
}

/// Plain text of a span list.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// Render Markdown to an HTML fragment.
pub fn to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[derive(Default)]
struct TreeBuilder {
    blocks: Vec<Block>,
    spans: Vec<Span>,
    bold: usize,
    italic: usize,
    heading: Option<u8>,
    list_depth: usize,
    ordered: bool,
    items: Vec<ListItem>,
    quote_depth: usize,
    code: Option<String>,
    in_table: bool,
}

impl TreeBuilder {
    fn push_text(&mut self, text: &str, code: bool) {
        if text.is_empty() {
            return;
        }
        let (bold, italic) = (self.bold > 0, self.italic > 0);
        if let Some(last) = self.spans.last_mut() {
            if last.bold == bold && last.italic == italic && last.code == code {
                last.text.push_str(text);
                return;
            }
        }
        self.spans.push(Span {
            text: text.to_string(),
            bold,
            italic,
            code,
        });
    }

    fn take_spans(&mut self) -> Vec<Span> {
        let mut spans = std::mem::take(&mut self.spans);
        if let Some(first) = spans.first_mut() {
            first.text = first.text.trim_start().to_string();
        }
        if let Some(last) = spans.last_mut() {
            last.text = last.text.trim_end().to_string();
        }
        spans.retain(|s| !s.text.is_empty());
        spans
    }

    fn flush_item(&mut self) {
        let spans = self.take_spans();
        if !spans.is_empty() {
            self.items.push(ListItem {
                depth: self.list_depth.saturating_sub(1),
                spans,
            });
        }
    }
}

/// Parse Markdown into block elements.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut b = TreeBuilder::default();

    for (event, range) in Parser::new_ext(markdown, options()).into_offset_iter() {
        if b.in_table {
            if let Event::End(TagEnd::Table) = event {
                b.in_table = false;
            }
            continue;
        }
        if let Some(ref mut code) = b.code {
            match event {
                Event::Text(t) => code.push_str(&t),
                Event::End(TagEnd::CodeBlock) => {
                    let text = code.trim_end_matches('\n').to_string();
                    b.code = None;
                    b.blocks.push(Block::CodeBlock(text));
                }
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(Tag::Heading { level, .. }) => b.heading = Some(level as u8),
            Event::End(TagEnd::Heading { .. }) => {
                let text = plain_text(&b.take_spans());
                let level = b.heading.take().unwrap_or(1);
                b.blocks.push(Block::Heading { level, text });
            }
            Event::End(TagEnd::Paragraph) => {
                if b.list_depth == 0 && b.quote_depth == 0 {
                    let spans = b.take_spans();
                    if !spans.is_empty() {
                        b.blocks.push(Block::Paragraph(spans));
                    }
                } else {
                    b.push_text("\n", false);
                }
            }
            Event::Start(Tag::List(first)) => {
                if b.list_depth > 0 {
                    b.flush_item();
                } else {
                    b.ordered = first.is_some();
                    b.items.clear();
                }
                b.list_depth += 1;
            }
            Event::End(TagEnd::List { .. }) => {
                b.flush_item();
                b.list_depth = b.list_depth.saturating_sub(1);
                if b.list_depth == 0 {
                    let items = std::mem::take(&mut b.items);
                    b.blocks.push(Block::List {
                        ordered: b.ordered,
                        items,
                    });
                }
            }
            Event::End(TagEnd::Item) => b.flush_item(),
            Event::Start(Tag::BlockQuote { .. }) => b.quote_depth += 1,
            Event::End(TagEnd::BlockQuote { .. }) => {
                b.quote_depth = b.quote_depth.saturating_sub(1);
                if b.quote_depth == 0 {
                    let spans = b.take_spans();
                    if !spans.is_empty() {
                        b.blocks.push(Block::Quote(spans));
                    }
                }
            }
            Event::Start(Tag::CodeBlock(_)) => b.code = Some(String::new()),
            Event::Start(Tag::Table(_)) => {
                b.in_table = true;
                let rows = split_table_rows(&markdown[range]);
                if !rows.is_empty() {
                    b.blocks.push(Block::Table { rows });
                }
            }
            Event::Start(Tag::Strong) => b.bold += 1,
            Event::End(TagEnd::Strong) => b.bold = b.bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => b.italic += 1,
            Event::End(TagEnd::Emphasis) => b.italic = b.italic.saturating_sub(1),
            Event::Text(t) => b.push_text(&t, false),
            Event::Code(t) => b.push_text(&t, true),
            Event::Html(t) | Event::InlineHtml(t) => b.push_text(&t, false),
            Event::SoftBreak => b.push_text(" ", false),
            Event::HardBreak => b.push_text("\n", false),
            Event::Rule => b.blocks.push(Block::Rule),
            _ => {}
        }
    }

    b.blocks
}

static RE_SEPARATOR_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?$").unwrap());

static RE_INLINE_MARKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*|__|`").unwrap());

/// Split the source lines of a GFM table into cells, dropping the
/// separator row.
pub fn split_table_rows(source: &str) -> Vec<Vec<String>> {
    source
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !RE_SEPARATOR_ROW.is_match(l))
        .map(split_cells)
        .collect()
}

fn split_cells(line: &str) -> Vec<String> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);

    cells
        .into_iter()
        .map(|c| RE_INLINE_MARKS.replace_all(c.trim(), "").to_string())
        .collect()
}
