//! Primary PDF tier: WeasyPrint.

use super::{run_engine, write_html, PdfRenderer};
use crate::config::PdfRenderOptions;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Renders through the `weasyprint` command-line tool.
pub struct WeasyPrintRenderer {
    binary: PathBuf,
    options: PdfRenderOptions,
}

impl WeasyPrintRenderer {
    pub fn new(options: &PdfRenderOptions) -> Self {
        Self {
            binary: options.weasyprint_bin.clone(),
            options: options.clone(),
        }
    }
}

impl PdfRenderer for WeasyPrintRenderer {
    fn name(&self) -> &str {
        "weasyprint"
    }

    fn render(&self, markdown: &str, output: &Path) -> Result<(), String> {
        let (_dir, html_path) = write_html(markdown, output, &self.options)?;
        debug!("weasyprint {} → {}", html_path.display(), output.display());

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--encoding").arg("utf-8").arg(&html_path).arg(output);
        run_engine(cmd, &self.binary)
    }
}
