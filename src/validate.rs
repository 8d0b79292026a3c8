//! Post-render validation.
//!
//! A [`Validator`] looks at the source structure, the translated structure
//! and what the renderer produced, and returns a 0–10 score with
//! human-readable issues. The score is advisory: validation never fails a
//! run.

use crate::language::Script;
use crate::output::{RenderReport, SegmentReport};
use crate::pipeline::segment::StructuredDocument;
use serde::{Deserialize, Serialize};

/// Score and issues for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// 0.0 (unusable) to 10.0 (no issues found).
    pub score: f32,
    pub issues: Vec<String>,
}

impl ValidationResult {
    pub const MAX_SCORE: f32 = 10.0;

    pub fn perfect() -> Self {
        Self {
            score: Self::MAX_SCORE,
            issues: Vec::new(),
        }
    }

    fn deduct(&mut self, points: f32, issue: String) {
        self.score = (self.score - points).clamp(0.0, Self::MAX_SCORE);
        self.issues.push(issue);
    }
}

/// Everything a validator may inspect.
pub struct ValidationInput<'a> {
    pub source: &'a StructuredDocument,
    pub translated: &'a StructuredDocument,
    pub segments: &'a SegmentReport,
    pub render: &'a RenderReport,
    /// Script the target language must be written in, if it is checked.
    pub expected_script: Option<Script>,
}

pub trait Validator: Send + Sync {
    fn validate(&self, input: &ValidationInput<'_>) -> ValidationResult;
}

/// Default validator: starts at 10 and deducts per problem found.
///
/// | Problem | Deduction |
/// |---|---|
/// | output missing or empty | score 0 |
/// | untranslated segments | up to 4, proportional |
/// | script-verification failures | 1 each, up to 2 |
/// | target script absent from the document | 3 |
/// | structural line count changed | 2 |
/// | PDF from a fallback tier | 1 |
/// | characters the renderer could not draw | 2 |
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl Validator for StructuralValidator {
    fn validate(&self, input: &ValidationInput<'_>) -> ValidationResult {
        let mut result = ValidationResult::perfect();

        let size = std::fs::metadata(&input.render.path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return ValidationResult {
                score: 0.0,
                issues: vec![format!(
                    "Output file {} is missing or empty",
                    input.render.path.display()
                )],
            };
        }

        let seg = input.segments;
        if seg.failed > 0 {
            let attempted = seg.text.saturating_sub(seg.passed_through);
            result.deduct(
                4.0 * seg.failure_ratio(),
                format!(
                    "{} of {} text segments were left untranslated",
                    seg.failed, attempted
                ),
            );
        }

        if seg.script_failures > 0 {
            result.deduct(
                seg.script_failures.min(2) as f32,
                format!(
                    "{} segments lack the expected script after retry",
                    seg.script_failures
                ),
            );
        }

        if let Some(script) = input.expected_script {
            let text = input.translated.to_text();
            if text.chars().any(char::is_alphabetic) && !script.appears_in(&text) {
                result.deduct(
                    3.0,
                    format!("No {script} characters found in the translated document"),
                );
            }
        }

        let before = input.source.structural_line_count();
        let after = input.translated.structural_line_count();
        if before != after {
            result.deduct(
                2.0,
                format!("Structural line count changed from {before} to {after}"),
            );
        }

        if input.render.used_fallback() {
            result.deduct(
                1.0,
                format!(
                    "PDF produced by fallback renderer '{}' after {} failed tiers",
                    input.render.renderer,
                    input.render.tier_failures.len()
                ),
            );
        }

        if input.render.replaced_chars > 0 {
            result.deduct(
                2.0,
                format!(
                    "Renderer '{}' could not draw {} characters and replaced them with '?'",
                    input.render.renderer, input.render.replaced_chars
                ),
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::error::RenderTierFailure;
    use std::path::Path;

    fn render_at(path: &Path, failures: usize) -> RenderReport {
        RenderReport {
            path: path.to_path_buf(),
            format: OutputFormat::Pdf,
            renderer: if failures == 0 { "weasyprint" } else { "direct" }.into(),
            tier_failures: (0..failures)
                .map(|i| RenderTierFailure::new(format!("tier{i}"), "down"))
                .collect(),
            bytes_written: 10,
            replaced_chars: 0,
        }
    }

    fn docs(src: &str, dst: &str) -> (StructuredDocument, StructuredDocument) {
        (
            StructuredDocument::from_text(src),
            StructuredDocument::from_text(dst),
        )
    }

    #[test]
    fn clean_run_scores_ten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        let (src, dst) = docs("# Title\nHello", "# 标题\n你好");
        let render = render_at(&path, 0);
        let segments = SegmentReport {
            text: 1,
            translated: 1,
            ..Default::default()
        };
        let r = StructuralValidator.validate(&ValidationInput {
            source: &src,
            translated: &dst,
            segments: &segments,
            render: &render,
            expected_script: Some(Script::Han),
        });
        assert_eq!(r.score, 10.0);
        assert!(r.issues.is_empty());
    }

    #[test]
    fn missing_output_scores_zero() {
        let (src, dst) = docs("a", "b");
        let render = render_at(Path::new("/nonexistent/out.pdf"), 0);
        let r = StructuralValidator.validate(&ValidationInput {
            source: &src,
            translated: &dst,
            segments: &SegmentReport::default(),
            render: &render,
            expected_script: None,
        });
        assert_eq!(r.score, 0.0);
        assert_eq!(r.issues.len(), 1);
    }

    #[test]
    fn deductions_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        // Untranslated half (−2), one script failure (−1), no Han (−3),
        // extra structural line (−2), fallback tier (−1).
        let (src, dst) = docs("# T\nOne\n- x\nTwo", "# T\nOne\n- x\n- Two");
        let render = render_at(&path, 2);
        let segments = SegmentReport {
            text: 2,
            translated: 1,
            failed: 1,
            script_failures: 1,
            ..Default::default()
        };
        let r = StructuralValidator.validate(&ValidationInput {
            source: &src,
            translated: &dst,
            segments: &segments,
            render: &render,
            expected_script: Some(Script::Han),
        });
        assert!((r.score - 1.0).abs() < 1e-6, "score {}", r.score);
        assert_eq!(r.issues.len(), 5);
    }

    #[test]
    fn replaced_characters_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        let (src, dst) = docs("Hello", "你好");
        let mut render = render_at(&path, 2);
        render.replaced_chars = 2;
        let segments = SegmentReport {
            text: 1,
            translated: 1,
            ..Default::default()
        };
        let r = StructuralValidator.validate(&ValidationInput {
            source: &src,
            translated: &dst,
            segments: &segments,
            render: &render,
            expected_script: Some(Script::Han),
        });
        assert_eq!(r.score, 7.0);
        assert!(r.issues[1].contains("could not draw 2 characters"));
    }

    #[test]
    fn score_never_goes_negative() {
        let mut r = ValidationResult::perfect();
        r.deduct(7.0, "a".into());
        r.deduct(7.0, "b".into());
        assert_eq!(r.score, 0.0);
    }
}
