//! Error types for the wealthdoc-translate library.
//!
//! The pipeline distinguishes errors that end a run from errors that are
//! absorbed locally:
//!
//! * [`TranslateError`]: **Fatal**: the document cannot be read, every PDF
//!   render tier failed, or the run was misconfigured. Returned as
//!   `Err(TranslateError)` from the top-level `translate*` functions.
//!
//! * [`SegmentError`]: **Non-fatal**: one segment could not be translated
//!   (the original text is kept) or its output failed script verification
//!   (the output is kept). Stored in [`crate::output::SegmentReport`].
//!
//! * [`RenderTierFailure`]: **Non-fatal** until the last tier: one PDF
//!   renderer failed and the cascade moved on to the next one.
//!
//! * [`BackendError`]: raised by a [`crate::backend::TranslationBackend`];
//!   the orchestrator turns it into a [`SegmentError`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the wealthdoc-translate library.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The source document could not be opened or parsed.
    #[error(transparent)]
    DocumentRead(#[from] DocumentReadError),

    /// Every configured render strategy failed for the requested format.
    #[error("All {} render tiers failed for {format} output.\n{}", .failures.len(), summarise_failures(.failures))]
    RenderExhausted {
        format: String,
        failures: Vec<RenderTierFailure>,
    },

    /// The input exists but the Markdown pipeline cannot extract it.
    #[error("Unsupported input '{path}': {reason}")]
    UnsupportedInput { path: PathBuf, reason: String },

    /// No translation backend could be constructed.
    #[error("Translation provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library in the working\n\
directory, or install it on the system library path.\n"
    )]
    PdfiumBindingFailed(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The source document cannot be read. There is no partial-result fallback.
#[derive(Debug, Error)]
pub enum DocumentReadError {
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },
}

/// A non-fatal error for a single segment.
///
/// Stored in [`crate::output::SegmentReport`]; the pipeline always continues.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SegmentError {
    /// The backend failed; the untranslated original was kept.
    #[error("Segment {index}: translation failed, original text kept: {detail}")]
    Translation { index: usize, detail: String },

    /// Both attempts produced no character of the expected script; the
    /// second output was accepted anyway.
    #[error("Segment {index}: no {script} characters in output after retry")]
    ScriptVerification { index: usize, script: String },
}

impl SegmentError {
    /// Index of the segment this error belongs to.
    pub fn index(&self) -> usize {
        match self {
            SegmentError::Translation { index, .. } => *index,
            SegmentError::ScriptVerification { index, .. } => *index,
        }
    }
}

/// One PDF render strategy failed.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
#[error("{tier}: {detail}")]
pub struct RenderTierFailure {
    /// Name of the renderer that failed (e.g. `"weasyprint"`).
    pub tier: String,
    /// Human-readable reason.
    pub detail: String,
}

impl RenderTierFailure {
    pub fn new(tier: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            detail: detail.into(),
        }
    }
}

/// Errors raised by a translation backend for a single request.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The API returned an error response.
    #[error("API error: {0}")]
    Api(String),

    /// Authentication failed (401/403); retrying will not help.
    #[error("Authentication error from '{provider}': {detail}")]
    Auth { provider: String, detail: String },

    /// HTTP 429; the caller should back off.
    #[error("Rate limit exceeded for '{provider}'")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// The request did not complete in time.
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The API answered but carried no text.
    #[error("Empty response from '{provider}'")]
    EmptyResponse { provider: String },

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BackendError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BackendError::Auth { .. })
    }
}

fn summarise_failures(failures: &[RenderTierFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  • {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_exhausted_lists_every_tier() {
        let e = TranslateError::RenderExhausted {
            format: "pdf".into(),
            failures: vec![
                RenderTierFailure::new("weasyprint", "not installed"),
                RenderTierFailure::new("wkhtmltopdf", "exit status 1"),
                RenderTierFailure::new("direct", "disk full"),
            ],
        };
        let msg = e.to_string();
        assert!(msg.contains("All 3 render tiers"), "got: {msg}");
        assert!(msg.contains("weasyprint: not installed"));
        assert!(msg.contains("direct: disk full"));
    }

    #[test]
    fn document_read_error_converts_into_fatal_error() {
        let e: TranslateError = DocumentReadError::FileNotFound {
            path: PathBuf::from("/tmp/missing.pdf"),
        }
        .into();
        assert!(matches!(e, TranslateError::DocumentRead(_)));
        assert!(e.to_string().contains("missing.pdf"));
    }

    #[test]
    fn segment_error_display_and_index() {
        let e = SegmentError::Translation {
            index: 4,
            detail: "rate limited".into(),
        };
        assert_eq!(e.index(), 4);
        assert!(e.to_string().contains("original text kept"));

        let s = SegmentError::ScriptVerification {
            index: 7,
            script: "Han".into(),
        };
        assert_eq!(s.index(), 7);
        assert!(s.to_string().contains("Han"));
    }

    #[test]
    fn auth_errors_are_not_retryable() {
        let auth = BackendError::Auth {
            provider: "openai".into(),
            detail: "invalid key".into(),
        };
        assert!(!auth.is_retryable());
        assert!(BackendError::Timeout { secs: 60 }.is_retryable());
        assert!(BackendError::RateLimited {
            provider: "openai".into(),
            retry_after_secs: None
        }
        .is_retryable());
    }
}
