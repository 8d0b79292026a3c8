//! Standalone HTML document for the HTML-to-PDF tiers.

use crate::config::PdfRenderOptions;
use crate::pipeline::markdown::to_html;

/// Wrap the Markdown body in a complete UTF-8 HTML page with print CSS.
///
/// The font stack puts CJK-capable families first so both engines pick a
/// face that covers Han characters when one is installed.
pub fn html_document(markdown: &str, title: &str, options: &PdfRenderOptions) -> String {
    let body = to_html(markdown);
    let fonts = font_stack(&options.font_families);
    let base = options.base_font_pt;
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>
@page {{ size: {page}; margin: {margin}cm; }}
body {{ font-family: {fonts}; font-size: {base}pt; line-height: 1.6; }}
h1 {{ font-size: {h1}pt; margin-top: {h1}pt; margin-bottom: {h1_half}pt; }}
h2 {{ font-size: {h2}pt; margin-top: {h2}pt; margin-bottom: {h2_half}pt; }}
h3 {{ font-size: {h3}pt; margin-top: {h3}pt; margin-bottom: {h3_half}pt; }}
p {{ margin-bottom: {base}pt; }}
table {{ border-collapse: collapse; width: 100%; margin-bottom: 20px; page-break-inside: avoid; }}
th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
th {{ background-color: #f2f2f2; }}
blockquote {{ border-left: 3px solid #ccc; margin-left: 0; padding-left: 12px; color: #555; }}
pre, code {{ font-family: monospace; background-color: #f7f7f7; }}
</style>
</head>
<body>
{body}</body>
</html>
"#,
        title = escape(title),
        page = options.page_size,
        margin = options.margin_cm,
        h1 = base * 2,
        h1_half = base,
        h2 = base * 3 / 2,
        h2_half = base * 3 / 4,
        h3 = base + base / 6,
        h3_half = (base + base / 6) / 2,
    )
}

/// CSS `font-family` value; generic families stay unquoted.
fn font_stack(families: &[String]) -> String {
    const GENERIC: &[&str] = &["serif", "sans-serif", "monospace", "cursive", "fantasy"];
    if families.is_empty() {
        return "sans-serif".to_string();
    }
    families
        .iter()
        .map(|f| {
            if GENERIC.contains(&f.as_str()) {
                f.clone()
            } else {
                format!("'{}'", f.replace('\'', ""))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_carries_font_stack_and_page_setup() {
        let html = html_document("# 投资组合\n\nText", "Q3 <report>", &PdfRenderOptions::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<meta charset=\"UTF-8\">"));
        assert!(html.contains("'Noto Sans CJK SC', 'Microsoft YaHei'"));
        assert!(html.contains("sans-serif;"));
        assert!(html.contains("size: A4; margin: 2cm"));
        assert!(html.contains("<h1>投资组合</h1>"));
        assert!(html.contains("<title>Q3 &lt;report&gt;</title>"));
        assert!(html.contains("h1 { font-size: 24pt"));
    }

    #[test]
    fn empty_font_list_falls_back_to_generic() {
        assert_eq!(font_stack(&[]), "sans-serif");
    }
}
