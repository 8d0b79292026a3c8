//! Post-processing: deterministic cleanup of raw backend responses.
//!
//! Even well-prompted models wrap answers in artefacts the prompt told them
//! not to produce: code fences, a leading "Translation:" label, quotes
//! around the whole answer, Windows line endings, zero-width characters.
//! Each rule here is a small pure function so it can be tested on its own.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the fence regex sees `\n`. Labels
//! are stripped before quotes because models write `Translation: "..."`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clean one raw response. `source` is the text that was sent, used to
/// decide whether wrapping quotes were added by the model.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip outer code fences
/// 3. Strip a leading "Translation:" style label
/// 4. Strip wrapping quotes the source did not have
/// 5. Remove invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 6. Trim surrounding whitespace
pub fn clean_translation(raw: &str, source: &str) -> String {
    let s = normalise_line_endings(raw);
    let s = strip_outer_fences(&s);
    let s = strip_label(&s);
    let s = strip_wrapping_quotes(&s, source);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer fences ───────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*)\n```$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 3: Strip label ──────────────────────────────────────────────────

static RE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:translation|translated text|翻译|译文)\s*[:：]\s*").unwrap()
});

fn strip_label(input: &str) -> String {
    RE_LABEL.replace(input.trim_start(), "").to_string()
}

// ── Rule 4: Strip wrapping quotes ────────────────────────────────────────

const QUOTE_PAIRS: &[(char, char)] = &[('"', '"'), ('“', '”'), ('「', '」'), ('\'', '\'')];

fn strip_wrapping_quotes(input: &str, source: &str) -> String {
    let trimmed = input.trim();
    let source = source.trim();
    for &(open, close) in QUOTE_PAIRS {
        if trimmed.chars().count() < 2
            || !trimmed.starts_with(open)
            || !trimmed.ends_with(close)
            || source.starts_with(open)
        {
            continue;
        }
        let inner = &trimmed[open.len_utf8()..trimmed.len() - close.len_utf8()];
        // `"Buy" or "Sell"` is two quoted terms, not one wrapped answer.
        if inner.contains(open) || inner.contains(close) {
            continue;
        }
        if open == '\'' && is_apostrophe(inner) {
            continue;
        }
        return inner.to_string();
    }
    input.to_string()
}

/// Whether ASCII `'` at either end of `inner` is an elision or possessive
/// (`'90s`, `investors'`) rather than a quote mark.
fn is_apostrophe(inner: &str) -> bool {
    let first = inner.chars().next();
    let last = inner.chars().last();
    matches!(first, Some(c) if c.is_ascii_digit() || c.is_whitespace())
        || matches!(last, Some('s' | 'S') | Some(' '))
}

// ── Rule 5: Remove invisible characters ──────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences() {
        assert_eq!(
            clean_translation("```markdown\n资产配置\n```", "Asset allocation"),
            "资产配置"
        );
        assert_eq!(clean_translation("```\nBonjour\n```\n", "Hello"), "Bonjour");
    }

    #[test]
    fn keeps_inner_fences() {
        let raw = "Voir:\n```\ncode\n```";
        assert_eq!(clean_translation(raw, "See:"), raw);
    }

    #[test]
    fn strips_labels() {
        assert_eq!(clean_translation("Translation: Bonjour", "Hello"), "Bonjour");
        assert_eq!(clean_translation("译文：你好", "Hello"), "你好");
    }

    #[test]
    fn strips_added_quotes_only() {
        assert_eq!(clean_translation("\"Bonjour\"", "Hello"), "Bonjour");
        assert_eq!(clean_translation("“你好”", "Hello"), "你好");
        assert_eq!(
            clean_translation("\"Bonjour\"", "\"Hello\""),
            "\"Bonjour\""
        );
        assert_eq!(clean_translation("\"", "x"), "\"");
    }

    #[test]
    fn keeps_separately_quoted_terms() {
        let raw = "\"Acheter\" ou \"Vendre\"";
        assert_eq!(clean_translation(raw, "Buy or Sell"), raw);
        let raw = "「买入」或「卖出」";
        assert_eq!(clean_translation(raw, "Buy or Sell"), raw);
    }

    #[test]
    fn single_quotes_need_a_real_pair() {
        assert_eq!(clean_translation("'Rendement'", "Yield"), "Rendement");
        assert_eq!(
            clean_translation("'90s bonds held by investors'", "Bonds"),
            "'90s bonds held by investors'"
        );
        assert_eq!(
            clean_translation("'Tis the investors'", "Investors"),
            "'Tis the investors'"
        );
    }

    #[test]
    fn normalises_crlf_and_invisible_chars() {
        assert_eq!(
            clean_translation("  a\r\nb\u{200B}c\u{FEFF}  ", "x"),
            "a\nbc"
        );
    }
}
