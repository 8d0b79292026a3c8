//! Structure extraction: PDF text runs → Markdown lines via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to call from async contexts. The whole extraction
//! runs on a blocking pool thread so Tokio workers never stall.
//!
//! ## Heading inference
//!
//! Each pdfium text object is a run of uniformly styled text. Its scaled
//! font size is compared against [`HeadingThresholds`]; runs above a
//! threshold become `#`/`##` headings, bold-faced runs below every threshold
//! become `**bold**` lines, and everything else is plain text. This is a
//! heuristic: documents that use size rather than structure for emphasis
//! will produce spurious headings.

use crate::config::HeadingThresholds;
use crate::error::{DocumentReadError, TranslateError};
use crate::output::DocumentMetadata;
use crate::pipeline::segment::StructuredDocument;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Lines inserted between consecutive pages.
pub const PAGE_BREAK: [&str; 3] = ["", "---", ""];

/// Bind to a pdfium library: `PDFIUM_LIB_PATH`, then the working directory,
/// then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, TranslateError> {
    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(&env_path);
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| {
                TranslateError::PdfiumBindingFailed(format!("{}: {e}", path.display()))
            });
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| TranslateError::PdfiumBindingFailed(e.to_string()))
}

/// Extract the structured document and its metadata from a PDF.
pub async fn extract_structure(
    pdf_path: &Path,
    thresholds: &HeadingThresholds,
    password: Option<&str>,
) -> Result<(StructuredDocument, DocumentMetadata), TranslateError> {
    let path = pdf_path.to_path_buf();
    let thresholds = thresholds.clone();
    let password = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        extract_structure_blocking(&path, &thresholds, password.as_deref())
    })
    .await
    .map_err(|e| TranslateError::Internal(format!("Extraction task panicked: {e}")))?
}

/// Read only the document metadata.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, TranslateError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        let pdfium = bind_pdfium()?;
        let document = open_document(&pdfium, &path, password.as_deref())?;
        Ok(read_metadata(&document))
    })
    .await
    .map_err(|e| TranslateError::Internal(format!("Metadata task panicked: {e}")))?
}

fn extract_structure_blocking(
    pdf_path: &Path,
    thresholds: &HeadingThresholds,
    password: Option<&str>,
) -> Result<(StructuredDocument, DocumentMetadata), TranslateError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;
    let metadata = read_metadata(&document);
    info!("PDF loaded: {} pages", metadata.page_count);

    let mut pages = Vec::with_capacity(metadata.page_count);
    for (idx, page) in document.pages().iter().enumerate() {
        let mut lines = Vec::new();
        for object in page.objects().iter() {
            collect_runs(&object, thresholds, 0, &mut lines);
        }
        debug!("Page {}: {} text runs kept", idx + 1, lines.len());
        pages.push(lines);
    }

    Ok((assemble_pages(pages), metadata))
}

/// Form XObjects nested deeper than this are skipped.
const MAX_FORM_DEPTH: usize = 8;

/// Classify a text object, or descend into a form XObject's children.
fn collect_runs(
    object: &PdfPageObject,
    thresholds: &HeadingThresholds,
    depth: usize,
    lines: &mut Vec<String>,
) {
    if let Some(text_obj) = object.as_text_object() {
        let text = text_obj.text();
        let size = text_obj.scaled_font_size().value;
        let font_name = text_obj.font().name();
        if let Some(line) = classify_run(&text, size, &font_name, thresholds) {
            lines.push(line);
        }
    } else if let Some(form) = object.as_x_object_form_object() {
        if depth >= MAX_FORM_DEPTH {
            debug!("Skipping form XObject nested {} deep", depth);
            return;
        }
        for child in form.iter() {
            collect_runs(&child, thresholds, depth + 1, lines);
        }
    }
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, TranslateError> {
    pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| map_load_error(pdf_path, password.is_some(), format!("{e:?}")).into())
}

fn map_load_error(path: &Path, had_password: bool, detail: String) -> DocumentReadError {
    let path = path.to_path_buf();
    if detail.to_lowercase().contains("password") {
        if had_password {
            DocumentReadError::WrongPassword { path }
        } else {
            DocumentReadError::PasswordRequired { path }
        }
    } else {
        DocumentReadError::CorruptPdf { path, detail }
    }
}

fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().trim().to_string())
            .filter(|v| !v.is_empty())
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

/// Turn one text run into a Markdown line, or drop it if it is blank.
///
/// Interior newlines inside a run are folded to spaces so one run stays one
/// line.
pub fn classify_run(
    text: &str,
    font_size: f32,
    font_name: &str,
    thresholds: &HeadingThresholds,
) -> Option<String> {
    let text = text
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return None;
    }

    let line = match thresholds.heading_level(font_size) {
        Some(level) => format!("{} {text}", "#".repeat(level as usize)),
        None if thresholds.is_bold(font_name) => format!("**{text}**"),
        None => text,
    };
    Some(line)
}

/// Join per-page lines, with [`PAGE_BREAK`] between pages.
pub fn assemble_pages(pages: Vec<Vec<String>>) -> StructuredDocument {
    let mut lines = Vec::new();
    for (idx, page) in pages.into_iter().enumerate() {
        if idx > 0 {
            lines.extend(PAGE_BREAK.iter().map(|s| s.to_string()));
        }
        lines.extend(page);
    }
    StructuredDocument::new(lines)
}
