//! Secondary PDF tier: wkhtmltopdf.
//!
//! wkhtmltopdf ignores CSS `@page`, so page size and margins are passed on
//! the command line. Its font fallback is weak; a CJK family reported by
//! `fc-list` is put at the head of the font stack when one exists.

use super::{run_engine, write_html, PdfRenderer};
use crate::config::PdfRenderOptions;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

pub struct WkhtmltopdfRenderer {
    binary: Option<PathBuf>,
    options: PdfRenderOptions,
}

impl WkhtmltopdfRenderer {
    pub fn new(options: &PdfRenderOptions) -> Self {
        Self {
            binary: options.wkhtmltopdf_bin.clone(),
            options: options.clone(),
        }
    }

    fn binary(&self) -> Result<PathBuf, String> {
        match self.binary {
            Some(ref b) => Ok(b.clone()),
            None => which::which("wkhtmltopdf").map_err(|e| format!("not found on PATH: {e}")),
        }
    }
}

impl PdfRenderer for WkhtmltopdfRenderer {
    fn name(&self) -> &str {
        "wkhtmltopdf"
    }

    fn render(&self, markdown: &str, output: &Path) -> Result<(), String> {
        let binary = self.binary()?;

        let mut options = self.options.clone();
        if let Some(family) = detect_cjk_font() {
            info!("wkhtmltopdf: using system CJK font '{}'", family);
            options.font_families.retain(|f| f != &family);
            options.font_families.insert(0, family);
        }

        let (_dir, html_path) = write_html(markdown, output, &options)?;
        let margin = format!("{}mm", (options.margin_cm * 10.0).round() as u32);
        debug!("{} {} → {}", binary.display(), html_path.display(), output.display());

        let mut cmd = Command::new(&binary);
        cmd.args(["--quiet", "--encoding", "UTF-8", "--enable-local-file-access"])
            .arg("--page-size")
            .arg(&options.page_size);
        for side in ["--margin-top", "--margin-right", "--margin-bottom", "--margin-left"] {
            cmd.arg(side).arg(&margin);
        }
        cmd.arg(&html_path).arg(output);
        run_engine(cmd, &binary)
    }
}

/// Family name of an installed Chinese-capable font, via fontconfig.
pub fn detect_cjk_font() -> Option<String> {
    let output = Command::new("fc-list")
        .args([":lang=zh", "family"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    pick_cjk_family(&String::from_utf8_lossy(&output.stdout))
}

/// Choose a family from `fc-list` output, preferring Noto/Source Han.
fn pick_cjk_family(listing: &str) -> Option<String> {
    let families: Vec<&str> = listing
        .lines()
        .filter_map(|l| l.split(',').next())
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    families
        .iter()
        .find(|f| f.contains("Noto Sans CJK") || f.contains("Source Han Sans"))
        .or_else(|| families.first())
        .map(|f| f.to_string())
}
