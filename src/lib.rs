//! # wealthdoc-translate
//!
//! Translate financial and wealth-management PDFs into another language and
//! re-render them as PDF or DOCX, keeping headings, lists and tables intact.
//!
//! ## Why Markdown in the middle?
//!
//! Translating a PDF page by page loses structure: headings become body
//! text, tables collapse into runs of numbers. This crate first recovers a
//! Markdown skeleton from font sizes and weights, translates only the prose
//! between structural lines, and renders the result through a real
//! typesetting engine. Structural lines never reach the model, so they
//! cannot be mangled by it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input      check the file is a readable PDF (or buffer bytes)
//!  ├─ 2. Extract    text objects → Markdown lines by font size (pdfium)
//!  ├─ 3. Segment    text runs vs. structural lines (#, -, |, 1. …)
//!  ├─ 4. Translate  one backend call per text segment, script-verified
//!  ├─ 5. Render     DOCX, or PDF via weasyprint → wkhtmltopdf → lopdf
//!  └─ 6. Validate   0–10 score with a list of issues
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wealthdoc_translate::{translate_to_file, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Backend auto-detected from EDGEQUAKE_LLM_PROVIDER / OPENAI_API_KEY / …
//!     let config = TranslationConfig::builder()
//!         .source_lang("en")
//!         .target_lang("zh")
//!         .build()?;
//!     let output = translate_to_file("statement.pdf", "statement_zh.docx", &config).await?;
//!     eprintln!(
//!         "{} segments translated, {} failed, score {:.1}",
//!         output.segments.translated, output.segments.failed, output.validation.score
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `wealthdoc` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## External programs
//!
//! PDF output tries `weasyprint` first and `wkhtmltopdf` second. Neither is
//! required: the last tier draws the text with lopdf, at the cost of
//! Latin-1-only glyphs. DOCX output needs no external program.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod language;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod translate;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{
    resolve_backend, LlmBackend, OpenAiBackend, RetryPolicy, TranslationBackend, TranslationRequest,
};
pub use config::{
    HeadingThresholds, OutputFormat, PdfRenderOptions, ProcessingMode, TranslationConfig,
    TranslationConfigBuilder,
};
pub use error::{BackendError, DocumentReadError, RenderTierFailure, SegmentError, TranslateError};
pub use language::{Script, ScriptTable};
pub use output::{DocumentMetadata, RenderReport, SegmentReport, TranslationOutput, TranslationStats};
pub use pipeline::segment::{reassemble, segment, Segment, SegmentKind, StructuredDocument};
pub use progress::{NoopProgressCallback, PipelineStage, ProgressCallback, TranslationProgressCallback};
pub use render::{render_document, render_with, PdfRenderer, RenderCascade};
pub use translate::{
    inspect, run, translate_bytes, translate_document, translate_markdown, translate_sync,
    translate_to_file,
};
pub use validate::{StructuralValidator, ValidationInput, ValidationResult, Validator};
