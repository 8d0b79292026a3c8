//! Output types returned by the translation pipeline.
//!
//! Everything here is `Serialize` so the CLI can print a run as JSON.

use crate::config::OutputFormat;
use crate::error::{RenderTierFailure, SegmentError};
use crate::validate::ValidationResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The complete result of one translation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOutput {
    /// Where the rendered document was written.
    pub output_path: PathBuf,
    pub validation: ValidationResult,
    /// Translated Markdown, when `include_markdown` is set.
    pub markdown: Option<String>,
    /// Markdown extracted from the source, when `include_markdown` is set.
    pub source_markdown: Option<String>,
    pub metadata: DocumentMetadata,
    pub segments: SegmentReport,
    pub render: RenderReport,
    pub stats: TranslationStats,
}

/// Metadata read from the source PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Per-run tally of what happened to each segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    /// All segments, Text and Structural.
    pub total: usize,
    /// Text segments.
    pub text: usize,
    /// Structural segments (never sent to the backend).
    pub structural: usize,
    /// Text segments replaced by a translation.
    pub translated: usize,
    /// Whitespace-only Text segments kept without a backend call.
    pub passed_through: usize,
    /// Text segments whose backend call failed; original kept.
    pub failed: usize,
    /// Script-verification retries issued.
    pub script_retries: usize,
    /// Segments still missing the expected script after the retry.
    pub script_failures: usize,
    /// Logical backend requests (a retried request counts once).
    pub backend_calls: usize,
    /// Non-fatal per-segment errors, in segment order.
    pub errors: Vec<SegmentError>,
}

impl SegmentReport {
    /// Fraction of non-blank Text segments left untranslated, 0.0–1.0.
    pub fn failure_ratio(&self) -> f32 {
        let attempted = self.text.saturating_sub(self.passed_through);
        if attempted == 0 {
            0.0
        } else {
            self.failed as f32 / attempted as f32
        }
    }
}

/// How the output document was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderReport {
    pub path: PathBuf,
    pub format: OutputFormat,
    /// Name of the renderer that succeeded.
    pub renderer: String,
    /// Tiers that failed before it, in cascade order.
    pub tier_failures: Vec<RenderTierFailure>,
    pub bytes_written: u64,
    /// Characters the renderer could not draw and replaced with `?`.
    #[serde(default)]
    pub replaced_chars: usize,
}

impl RenderReport {
    /// Whether a PDF came from a tier other than the first.
    pub fn used_fallback(&self) -> bool {
        !self.tier_failures.is_empty()
    }
}

/// Timing and call counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationStats {
    pub total_duration_ms: u64,
    pub extract_duration_ms: u64,
    pub translate_duration_ms: u64,
    pub render_duration_ms: u64,
    pub backend_calls: usize,
}
