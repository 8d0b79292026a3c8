//! Document translation entry points.
//!
//! All file-based entry points funnel into one pipeline:
//!
//! ```text
//! resolve input → resolve backend → extract → segment → translate
//!               → reassemble → render → validate
//! ```
//!
//! Only errors that make a result impossible are returned: the source
//! cannot be read, the configuration or backend cannot be set up, or every
//! renderer failed. Segment failures and fallback renders are reported in
//! the [`TranslationOutput`] instead.

use crate::backend::{resolve_backend, TranslationBackend};
use crate::config::{OutputFormat, ProcessingMode, TranslationConfig};
use crate::error::TranslateError;
use crate::output::{DocumentMetadata, SegmentReport, TranslationOutput, TranslationStats};
use crate::pipeline::segment::{reassemble, segment, StructuredDocument};
use crate::pipeline::{extract, input, translate as segments};
use crate::progress::PipelineStage;
use crate::render::render_document;
use crate::validate::{StructuralValidator, ValidationInput, Validator};
use std::path::Path;
use tempfile::TempPath;
use std::time::Instant;
use tracing::{info, warn};

/// Translate a PDF with default settings.
///
/// The rendered document is written to the system temp directory as
/// `{stem}_{target}_{random}.pdf`.
///
/// # Example
/// ```rust,no_run
/// use wealthdoc_translate::{run, ProcessingMode};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let out = run("statement.pdf", "en", "zh", Some("gpt-4.1-mini"), ProcessingMode::Markdown).await?;
/// println!("{} (score {:.1})", out.output_path.display(), out.validation.score);
/// # Ok(())
/// # }
/// ```
pub async fn run(
    input_path: impl AsRef<Path>,
    source_lang: &str,
    target_lang: &str,
    model: Option<&str>,
    mode: ProcessingMode,
) -> Result<TranslationOutput, TranslateError> {
    let mut builder = TranslationConfig::builder()
        .source_lang(source_lang)
        .target_lang(target_lang)
        .mode(mode);
    if let Some(model) = model {
        builder = builder.model(model);
    }
    translate_document(input_path, &builder.build()?).await
}

/// Translate a PDF, writing the output to the system temp directory.
pub async fn translate_document(
    input_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let input_path = input_path.as_ref();
    let format = config.output_format.unwrap_or(OutputFormat::Pdf);
    let resolved = input::resolve_input(input_path)?;
    translate_to_temp(input_path, resolved.path(), format, config).await
}

/// Translate a PDF and write the result to `output_path`.
///
/// The format comes from `config.output_format`, else the output
/// extension, else PDF.
pub async fn translate_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let output_path = output_path.as_ref();
    let format = config
        .output_format
        .or_else(|| OutputFormat::from_path(output_path))
        .unwrap_or(OutputFormat::Pdf);
    let resolved = input::resolve_input(input_path.as_ref())?;
    translate_pdf(resolved.path(), output_path, format, config).await
}

/// Translate PDF bytes held in memory.
///
/// The bytes are written to a managed temp file that is removed on return.
/// Output goes to the system temp directory as for [`translate_document`].
pub async fn translate_bytes(
    bytes: &[u8],
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let resolved = input::resolve_bytes(bytes)?;
    let format = config.output_format.unwrap_or(OutputFormat::Pdf);
    translate_to_temp(Path::new("document.pdf"), resolved.path(), format, config).await
}

/// Synchronous wrapper around [`translate_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn translate_sync(
    input_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TranslateError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(translate_document(input_path, config))
}

/// Translate Markdown directly: segment, translate, reassemble.
///
/// Never fails; segments the backend could not translate keep their
/// original text and are listed in the report.
pub async fn translate_markdown(
    markdown: &str,
    backend: &dyn TranslationBackend,
    config: &TranslationConfig,
) -> (String, SegmentReport) {
    let doc = StructuredDocument::from_text(markdown);
    let (translated, report) = segments::translate_segments(backend, segment(&doc), config).await;
    (reassemble(&translated), report)
}

/// Read PDF metadata without translating.
///
/// Does not require a backend or API key.
pub async fn inspect(input_path: impl AsRef<Path>) -> Result<DocumentMetadata, TranslateError> {
    let resolved = input::resolve_input(input_path.as_ref())?;
    extract::extract_metadata(resolved.path(), None).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Reserve `{stem}_{target}_{random}.{ext}` in the temp directory.
///
/// The returned path deletes its file when dropped.
fn temp_output_path(
    input_path: &Path,
    target_lang: &str,
    format: OutputFormat,
) -> Result<TempPath, TranslateError> {
    let stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    tempfile::Builder::new()
        .prefix(&format!("{stem}_{target_lang}_"))
        .suffix(&format!(".{}", format.extension()))
        .rand_bytes(8)
        .tempfile()
        .map(|f| f.into_temp_path())
        .map_err(|e| TranslateError::OutputWriteFailed {
            path: std::env::temp_dir(),
            source: e,
        })
}

/// Run the pipeline into a reserved temp path, keeping it only on success.
async fn translate_to_temp(
    name_from: &Path,
    pdf_path: &Path,
    format: OutputFormat,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let temp = temp_output_path(name_from, &config.target_lang, format)?;
    let output = translate_pdf(pdf_path, &temp, format, config).await?;
    temp.keep().map_err(|e| TranslateError::OutputWriteFailed {
        path: output.output_path.clone(),
        source: e.error,
    })?;
    Ok(output)
}

async fn translate_pdf(
    pdf_path: &Path,
    output_path: &Path,
    format: OutputFormat,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    let total_start = Instant::now();
    info!(
        "Translating {} ({} → {}, {})",
        pdf_path.display(),
        config.source_lang,
        config.target_lang,
        format
    );
    let stage = |s: PipelineStage| {
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage(s);
        }
    };

    // ── Step 1: Backend ──────────────────────────────────────────────────
    let backend = resolve_backend(config)?;
    info!("Translation backend: {}", backend.name());

    // ── Step 2: Extract ──────────────────────────────────────────────────
    stage(PipelineStage::Extract);
    let extract_start = Instant::now();
    let (source_doc, metadata) = extract::extract_structure(
        pdf_path,
        &config.heading_thresholds,
        config.password.as_deref(),
    )
    .await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} lines from {} pages in {}ms",
        source_doc.lines().len(),
        metadata.page_count,
        extract_duration_ms
    );
    if source_doc.lines().iter().all(|l| l.trim().is_empty()) {
        warn!("No text found in {}; scanned documents need OCR first", pdf_path.display());
    }

    // ── Step 3: Segment + translate ──────────────────────────────────────
    stage(PipelineStage::Segment);
    let segs = segment(&source_doc);

    stage(PipelineStage::Translate);
    let translate_start = Instant::now();
    let (translated_segs, report) =
        segments::translate_segments(backend.as_ref(), segs, config).await;
    let translate_duration_ms = translate_start.elapsed().as_millis() as u64;

    let translated_md = reassemble(&translated_segs);
    let translated_doc = StructuredDocument::from_text(&translated_md);

    let expected_script = config.script_checks.lookup(&config.target_lang);
    if let Some(script) = expected_script {
        if script.appears_in(&translated_md) {
            info!("Translated document contains {} characters", script);
        } else {
            warn!("Translated document contains no {} characters", script);
        }
    }

    // ── Step 4: Render ───────────────────────────────────────────────────
    stage(PipelineStage::Render);
    let render_start = Instant::now();
    let render = render_document(&translated_md, format, output_path, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Step 5: Validate ─────────────────────────────────────────────────
    stage(PipelineStage::Validate);
    let checked = ValidationInput {
        source: &source_doc,
        translated: &translated_doc,
        segments: &report,
        render: &render,
        expected_script,
    };
    let validation = match config.validator {
        Some(ref v) => v.validate(&checked),
        None => StructuralValidator.validate(&checked),
    };
    for issue in &validation.issues {
        warn!("Validation: {}", issue);
    }
    info!("Validation score: {:.1}/10", validation.score);

    if let Some(ref cb) = config.progress_callback {
        cb.on_pipeline_complete(report.translated, report.failed, validation.score);
    }

    let stats = TranslationStats {
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        extract_duration_ms,
        translate_duration_ms,
        render_duration_ms,
        backend_calls: report.backend_calls,
    };

    let (markdown, source_markdown) = if config.include_markdown {
        (Some(translated_md), Some(source_doc.to_text()))
    } else {
        (None, None)
    };

    Ok(TranslationOutput {
        output_path: render.path.clone(),
        validation,
        markdown,
        source_markdown,
        metadata,
        segments: report,
        render,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_output_name_pattern() {
        let path = temp_output_path(Path::new("/data/Q3 report.pdf"), "zh", OutputFormat::Docx)
            .unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Q3 report_zh_"), "got {name}");
        assert!(name.ends_with(".docx"));
        assert_eq!(path.parent().unwrap(), std::env::temp_dir());
        let kept = path.to_path_buf();
        drop(path);
        assert!(!kept.exists());
    }

    /// Backend that echoes its input.
    struct Echo;

    #[async_trait::async_trait]
    impl crate::backend::TranslationBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn translate(
            &self,
            request: &crate::backend::TranslationRequest,
        ) -> Result<String, crate::error::BackendError> {
            Ok(request.text.clone())
        }
    }

    #[tokio::test]
    async fn failed_run_leaves_no_output_in_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let stem = format!("leakcheck_{}", std::process::id());
        let input = dir.path().join(format!("{stem}.pdf"));
        std::fs::write(&input, b"%PDF-1.4 garbage").unwrap();
        let config = TranslationConfig::builder()
            .target_lang("fr")
            .backend(std::sync::Arc::new(Echo))
            .build()
            .unwrap();

        assert!(translate_document(&input, &config).await.is_err());

        let prefix = format!("{stem}_fr_");
        let leftovers: Vec<_> = std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
            .collect();
        assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn missing_input_fails_before_backend_resolution() {
        let config = TranslationConfig::default();
        let err = translate_to_file("/no/such/file.pdf", "/tmp/out.pdf", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::DocumentRead(_)));
    }
}
