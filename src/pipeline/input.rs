//! Input resolution: validate a user-supplied path before extraction.
//!
//! pdfium crashes or returns opaque errors on files that are not PDFs, so
//! the magic bytes are checked up front. Word documents are recognised by
//! their ZIP signature or extension and rejected: the Markdown pipeline only
//! extracts structure from PDF.

use crate::error::{DocumentReadError, TranslateError};
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// A validated input document.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input came from memory; written to a temp directory that lives as
    /// long as this value.
    Buffered { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Path to the PDF regardless of where it came from.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Buffered { path, .. } => path,
        }
    }
}

/// Validate a local file: exists, readable, PDF magic bytes.
pub fn resolve_input(path: &Path) -> Result<ResolvedInput, TranslateError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(DocumentReadError::FileNotFound { path }.into());
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DocumentReadError::PermissionDenied { path }.into());
        }
        Err(_) => return Err(DocumentReadError::FileNotFound { path }.into()),
    };

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() {
        return Err(DocumentReadError::CorruptPdf {
            path,
            detail: "file is shorter than a PDF header".into(),
        }
        .into());
    }
    check_magic(&path, magic)?;

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Write an in-memory PDF to a temp file and validate it.
pub fn resolve_bytes(bytes: &[u8]) -> Result<ResolvedInput, TranslateError> {
    let temp_dir = TempDir::new().map_err(|e| TranslateError::Internal(e.to_string()))?;
    let path = temp_dir.path().join("input.pdf");

    if bytes.len() < 4 {
        return Err(DocumentReadError::CorruptPdf {
            path,
            detail: format!("only {} bytes supplied", bytes.len()),
        }
        .into());
    }
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&bytes[..4]);
    check_magic(&path, magic)?;

    std::fs::write(&path, bytes)
        .map_err(|e| TranslateError::Internal(format!("Failed to write temp file: {e}")))?;

    Ok(ResolvedInput::Buffered {
        path,
        _temp_dir: temp_dir,
    })
}

fn check_magic(path: &Path, magic: [u8; 4]) -> Result<(), TranslateError> {
    if &magic == b"%PDF" {
        return Ok(());
    }
    let is_docx = magic[..2] == *b"PK"
        || path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
    if is_docx {
        return Err(TranslateError::UnsupportedInput {
            path: path.to_path_buf(),
            reason: "Word documents cannot be translated through the Markdown pipeline; \
                     export to PDF first"
                .into(),
        });
    }
    Err(DocumentReadError::NotAPdf {
        path: path.to_path_buf(),
        magic,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_read_error() {
        let err = resolve_input(Path::new("/definitely/not/here.pdf")).err().unwrap();
        assert!(matches!(
            err,
            TranslateError::DocumentRead(DocumentReadError::FileNotFound { .. })
        ));
    }

    #[test]
    fn non_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.pdf");
        std::fs::write(&path, b"hello world").unwrap();
        let err = resolve_input(&path).err().unwrap();
        assert!(matches!(
            err,
            TranslateError::DocumentRead(DocumentReadError::NotAPdf { .. })
        ));
    }

    #[test]
    fn docx_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.docx");
        std::fs::write(&path, b"PK\x03\x04rest-of-zip").unwrap();
        let err = resolve_input(&path).err().unwrap();
        assert!(matches!(err, TranslateError::UnsupportedInput { .. }));
    }

    #[test]
    fn pdf_magic_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        let resolved = resolve_input(&path).unwrap();
        assert_eq!(resolved.path(), path.as_path());
    }

    #[test]
    fn bytes_are_buffered_to_a_temp_file() {
        let resolved = resolve_bytes(b"%PDF-1.4\n%%EOF").unwrap();
        assert!(resolved.path().exists());
        assert!(resolve_bytes(b"%P").is_err());
        assert!(resolve_bytes(b"GIF89a").is_err());
    }
}
