//! Rendering: translated Markdown → PDF or DOCX.
//!
//! ## PDF cascade
//!
//! ```text
//! weasyprint ──fail──▶ wkhtmltopdf ──fail──▶ direct (lopdf)
//! ```
//!
//! Each tier is a [`PdfRenderer`]. [`RenderCascade`] tries them in order and
//! stops at the first success; a failed tier is logged and recorded as a
//! [`RenderTierFailure`]. Only when every tier fails does rendering return
//! [`TranslateError::RenderExhausted`].
//!
//! Every tier writes to `<output>.tmp` and the file is renamed into place
//! only after the tier succeeds, so a crashed engine never leaves a partial
//! document at the output path.

pub mod direct;
pub mod docx;
pub mod html;
pub mod weasyprint;
pub mod wkhtmltopdf;

use crate::config::{OutputFormat, PdfRenderOptions, TranslationConfig};
use crate::error::{RenderTierFailure, TranslateError};
use crate::output::RenderReport;
use crate::progress::ProgressCallback;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{info, warn};

pub use direct::DirectRenderer;
pub use weasyprint::WeasyPrintRenderer;
pub use wkhtmltopdf::WkhtmltopdfRenderer;

/// One interchangeable PDF rendering strategy.
pub trait PdfRenderer: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Render `markdown` to a PDF at `output`.
    fn render(&self, markdown: &str, output: &Path) -> Result<(), String>;

    /// Characters of `markdown` this renderer cannot draw and replaces.
    fn replaced_chars(&self, _markdown: &str) -> usize {
        0
    }
}

/// Result of a successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutcome {
    pub renderer: String,
    pub tier_failures: Vec<RenderTierFailure>,
    pub replaced_chars: usize,
}

/// Prioritised list of PDF renderers.
pub struct RenderCascade {
    tiers: Vec<Box<dyn PdfRenderer>>,
}

impl RenderCascade {
    pub fn new(tiers: Vec<Box<dyn PdfRenderer>>) -> Self {
        Self { tiers }
    }

    /// WeasyPrint, then wkhtmltopdf, then direct drawing.
    pub fn standard(options: &PdfRenderOptions) -> Self {
        Self::new(vec![
            Box::new(WeasyPrintRenderer::new(options)),
            Box::new(WkhtmltopdfRenderer::new(options)),
            Box::new(DirectRenderer),
        ])
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Try each tier in order. Returns the winning tier and the failures
    /// that preceded it.
    pub fn render(
        &self,
        markdown: &str,
        output: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<RenderOutcome, TranslateError> {
        let tmp = tmp_path(output);
        let mut failures = Vec::new();

        for tier in &self.tiers {
            let attempt = tier
                .render(markdown, &tmp)
                .and_then(|()| check_written(&tmp))
                .and_then(|()| {
                    std::fs::rename(&tmp, output).map_err(|e| format!("rename into place: {e}"))
                });

            match attempt {
                Ok(()) => {
                    info!("PDF rendered by {} → {}", tier.name(), output.display());
                    let replaced_chars = tier.replaced_chars(markdown);
                    if replaced_chars > 0 {
                        warn!(
                            "{} could not draw {} characters; they were replaced",
                            tier.name(),
                            replaced_chars
                        );
                    }
                    return Ok(RenderOutcome {
                        renderer: tier.name().to_string(),
                        tier_failures: failures,
                        replaced_chars,
                    });
                }
                Err(detail) => {
                    warn!("PDF tier {} failed: {}", tier.name(), detail);
                    let _ = std::fs::remove_file(&tmp);
                    if let Some(cb) = progress {
                        cb.on_render_fallback(tier.name(), &detail);
                    }
                    failures.push(RenderTierFailure::new(tier.name(), detail));
                }
            }
        }

        Err(TranslateError::RenderExhausted {
            format: OutputFormat::Pdf.to_string(),
            failures,
        })
    }
}

/// Render `markdown` in `format` to `output`.
///
/// Runs on a blocking thread: the HTML tiers wait on child processes and
/// the direct tier and DOCX writer are CPU-bound.
pub async fn render_document(
    markdown: &str,
    format: OutputFormat,
    output: &Path,
    config: &TranslationConfig,
) -> Result<RenderReport, TranslateError> {
    let cascade = RenderCascade::standard(&config.pdf);
    render_with(cascade, markdown, format, output, config.progress_callback.clone()).await
}

/// [`render_document`] with a caller-supplied PDF cascade.
pub async fn render_with(
    cascade: RenderCascade,
    markdown: &str,
    format: OutputFormat,
    output: &Path,
    progress: Option<ProgressCallback>,
) -> Result<RenderReport, TranslateError> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TranslateError::OutputWriteFailed {
                path: output.to_path_buf(),
                source: e,
            })?;
    }

    let markdown = markdown.to_string();
    let path = output.to_path_buf();
    let outcome = tokio::task::spawn_blocking(move || match format {
        OutputFormat::Pdf => cascade.render(&markdown, &path, progress.as_ref()),
        OutputFormat::Docx => render_docx(&markdown, &path),
    })
    .await
    .map_err(|e| TranslateError::Internal(format!("Render task panicked: {e}")))??;

    let bytes_written = tokio::fs::metadata(output)
        .await
        .map(|m| m.len())
        .map_err(|e| TranslateError::OutputWriteFailed {
            path: output.to_path_buf(),
            source: e,
        })?;

    Ok(RenderReport {
        path: output.to_path_buf(),
        format,
        renderer: outcome.renderer,
        tier_failures: outcome.tier_failures,
        bytes_written,
        replaced_chars: outcome.replaced_chars,
    })
}

fn render_docx(markdown: &str, output: &Path) -> Result<RenderOutcome, TranslateError> {
    let tmp = tmp_path(output);
    let result = docx::write_docx(markdown, &tmp)
        .and_then(|()| std::fs::rename(&tmp, output).map_err(|e| format!("rename into place: {e}")));
    match result {
        Ok(()) => {
            info!("DOCX written → {}", output.display());
            Ok(RenderOutcome {
                renderer: "docx".to_string(),
                tier_failures: Vec::new(),
                replaced_chars: 0,
            })
        }
        Err(detail) => {
            let _ = std::fs::remove_file(&tmp);
            Err(TranslateError::RenderExhausted {
                format: OutputFormat::Docx.to_string(),
                failures: vec![RenderTierFailure::new("docx", detail)],
            })
        }
    }
}

fn tmp_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    output.with_file_name(name)
}

fn check_written(path: &Path) -> Result<(), String> {
    match std::fs::metadata(path) {
        Ok(m) if m.len() > 0 => Ok(()),
        Ok(_) => Err("engine produced an empty file".to_string()),
        Err(e) => Err(format!("engine produced no output: {e}")),
    }
}

/// Write the HTML page for `markdown` into a fresh temp directory.
///
/// The directory is removed when the returned guard drops.
pub(crate) fn write_html(
    markdown: &str,
    output: &Path,
    options: &PdfRenderOptions,
) -> Result<(TempDir, PathBuf), String> {
    let dir = TempDir::new().map_err(|e| format!("temp dir: {e}"))?;
    let title = output
        .file_stem()
        .map(|s| s.to_string_lossy().trim_end_matches(".pdf").to_string())
        .unwrap_or_default();
    let html_path = dir.path().join("document.html");
    std::fs::write(&html_path, html::html_document(markdown, &title, options))
        .map_err(|e| format!("write html: {e}"))?;
    Ok((dir, html_path))
}

/// Run an external engine, turning launch failures and non-zero exits into
/// a tier failure message.
pub(crate) fn run_engine(mut cmd: Command, binary: &Path) -> Result<(), String> {
    let output = cmd
        .output()
        .map_err(|e| format!("failed to launch {}: {e}", binary.display()))?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: String = stderr
        .trim()
        .chars()
        .rev()
        .take(400)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    Err(format!("{} exited with {}: {}", binary.display(), output.status, tail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct Fake {
        name: &'static str,
        ok: bool,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl PdfRenderer for Fake {
        fn name(&self) -> &str {
            self.name
        }

        fn render(&self, _markdown: &str, output: &Path) -> Result<(), String> {
            self.calls.lock().unwrap().push(self.name);
            if self.ok {
                std::fs::write(output, b"%PDF-fake").map_err(|e| e.to_string())
            } else {
                Err(format!("{} unavailable", self.name))
            }
        }
    }

    fn cascade(oks: &[bool], calls: &Arc<Mutex<Vec<&'static str>>>) -> RenderCascade {
        let names = ["first", "second", "third"];
        RenderCascade::new(
            oks.iter()
                .zip(names)
                .map(|(&ok, name)| {
                    Box::new(Fake {
                        name,
                        ok,
                        calls: Arc::clone(calls),
                    }) as Box<dyn PdfRenderer>
                })
                .collect(),
        )
    }

    #[test]
    fn first_success_stops_the_cascade() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o.pdf");
        let outcome = cascade(&[true, true, true], &calls)
            .render("x", &out, None)
            .unwrap();
        assert_eq!(outcome.renderer, "first");
        assert!(outcome.tier_failures.is_empty());
        assert_eq!(*calls.lock().unwrap(), vec!["first"]);
        assert!(out.exists());
        assert!(!tmp_path(&out).exists());
    }

    #[test]
    fn tiers_are_tried_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o.pdf");
        let outcome = cascade(&[false, false, true], &calls)
            .render("x", &out, None)
            .unwrap();
        assert_eq!(outcome.renderer, "third");
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(
            outcome.tier_failures.iter().map(|f| f.tier.as_str()).collect::<Vec<_>>(),
            vec!["first", "second"]
        );
    }

    #[test]
    fn exhaustion_is_fatal_and_lists_every_tier() {
        struct Counting(AtomicUsize);
        impl crate::progress::TranslationProgressCallback for Counting {
            fn on_render_fallback(&self, _tier: &str, _error: &str) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let calls = Arc::new(Mutex::new(Vec::new()));
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o.pdf");
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let cb: ProgressCallback = counter.clone();
        let err = cascade(&[false, false, false], &calls)
            .render("x", &out, Some(&cb))
            .unwrap_err();
        match err {
            TranslateError::RenderExhausted { format, failures } => {
                assert_eq!(format, "pdf");
                assert_eq!(failures.len(), 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);
        assert!(!out.exists());
    }

    #[test]
    fn direct_tier_reports_replaced_characters() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("o.pdf");
        let outcome = RenderCascade::new(vec![Box::new(DirectRenderer)])
            .render("# 资产\n\nCash 5%", &out, None)
            .unwrap();
        assert_eq!(outcome.renderer, "direct");
        assert_eq!(outcome.replaced_chars, 2);
    }

    #[test]
    fn standard_cascade_order() {
        let c = RenderCascade::standard(&PdfRenderOptions::default());
        assert_eq!(c.tier_names(), vec!["weasyprint", "wkhtmltopdf", "direct"]);
    }

    #[test]
    fn tmp_path_appends_suffix() {
        assert_eq!(
            tmp_path(Path::new("/out/report.pdf")),
            PathBuf::from("/out/report.pdf.tmp")
        );
    }

    #[test]
    fn engine_launch_failure_is_reported() {
        let bin = Path::new("/nonexistent/engine");
        let err = run_engine(Command::new(bin), bin).unwrap_err();
        assert!(err.starts_with("failed to launch /nonexistent/engine"));
    }

    #[tokio::test]
    async fn docx_rendering_reports_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out.docx");
        let report = render_with(
            RenderCascade::new(vec![]),
            "# Title\n\nBody",
            OutputFormat::Docx,
            &out,
            None,
        )
        .await
        .unwrap();
        assert_eq!(report.renderer, "docx");
        assert!(report.bytes_written > 0);
        assert!(out.exists());
    }
}
