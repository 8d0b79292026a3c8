//! Segmentation and reassembly of structured Markdown.
//!
//! A [`StructuredDocument`] is a flat list of lines. [`segment`] walks it
//! once: markup lines become Structural segments on their own, runs of
//! plain lines merge into one Text segment. [`reassemble`] joins the
//! segment contents with `\n`, so `reassemble(&segment(&doc)) == doc.to_text()`
//! for every document.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Ordered lines of Markdown text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredDocument {
    lines: Vec<String>,
}

impl StructuredDocument {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Split on `\n`. A trailing newline yields a trailing empty line.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    /// Number of lines that carry markup.
    pub fn structural_line_count(&self) -> usize {
        self.lines.iter().filter(|l| is_structural(l)).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// Candidate for translation.
    Text,
    /// Markup line passed through unchanged.
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub content: String,
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Text,
            content: content.into(),
        }
    }

    pub fn structural(content: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Structural,
            content: content.into(),
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == SegmentKind::Text
    }
}

static RE_LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+[.)]|\+)(\s|$)").unwrap());

/// Whether a line starts with a heading, emphasis, code, quote, list or
/// table marker.
pub fn is_structural(line: &str) -> bool {
    matches!(
        line.chars().next(),
        Some('#' | '*' | '`' | '>' | '-' | '|')
    ) || RE_LIST_ITEM.is_match(line)
}

/// Split a document into ordered segments.
pub fn segment(doc: &StructuredDocument) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for line in doc.lines() {
        if is_structural(line) {
            if !pending.is_empty() {
                segments.push(Segment::text(pending.join("\n")));
                pending.clear();
            }
            segments.push(Segment::structural(line.as_str()));
        } else {
            pending.push(line);
        }
    }
    if !pending.is_empty() {
        segments.push(Segment::text(pending.join("\n")));
    }
    segments
}

/// Join segment contents with `\n`, in order.
pub fn reassemble(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(lines: &[&str]) -> StructuredDocument {
        StructuredDocument::new(lines.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn heading_text_list() {
        let d = doc(&["# Title", "Some plain text.", "- item one"]);
        let segs = segment(&d);
        assert_eq!(
            segs,
            vec![
                Segment::structural("# Title"),
                Segment::text("Some plain text."),
                Segment::structural("- item one"),
            ]
        );
        assert_eq!(reassemble(&segs), "# Title\nSome plain text.\n- item one");
    }

    #[test]
    fn consecutive_plain_lines_merge() {
        let d = doc(&["line a", "line b", "", "line c", "| x | y |", "tail"]);
        let segs = segment(&d);
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0], Segment::text("line a\nline b\n\nline c"));
        assert_eq!(segs[1], Segment::structural("| x | y |"));
        assert_eq!(segs[2], Segment::text("tail"));
    }

    #[test]
    fn structural_markers() {
        for line in [
            "# h",
            "**bold**",
            "*em*",
            "`code`",
            "```",
            "> quote",
            "- item",
            "---",
            "1. first",
            "12) twelfth",
            "3.",
            "| a |",
            "+ plus item",
            "+",
        ] {
            assert!(is_structural(line), "{line:?} should be structural");
        }
        for line in ["plain", " # indented", "2024 results", "3.5% yield", "", "Q1.", "+5% YoY"] {
            assert!(!is_structural(line), "{line:?} should be text");
        }
    }

    #[test]
    fn round_trip_is_lossless() {
        let texts = [
            "",
            "\n",
            "# A\n\nbody\n\n---\n\n## B\n- x\n- y\ntrailing\n",
            "only text\nmore text",
            "| a | b |\n|---|---|\n| 1 | 2 |",
        ];
        for text in texts {
            let d = StructuredDocument::from_text(text);
            assert_eq!(d.to_text(), text);
            assert_eq!(reassemble(&segment(&d)), text, "round trip of {text:?}");
        }
    }

    #[test]
    fn empty_document_has_one_empty_text_segment() {
        let d = StructuredDocument::from_text("");
        assert_eq!(segment(&d), vec![Segment::text("")]);
        assert!(segment(&StructuredDocument::default()).is_empty());
    }

    #[test]
    fn counts_structural_lines() {
        let d = doc(&["# a", "b", "- c", "d"]);
        assert_eq!(d.structural_line_count(), 2);
    }
}
