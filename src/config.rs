//! Configuration types for document translation.
//!
//! All pipeline behaviour is controlled through [`TranslationConfig`], built
//! via its [`TranslationConfigBuilder`]. The heading thresholds, the
//! script-verification table and the PDF engine settings all live here so a
//! run can be tuned for a document corpus without code changes.

use crate::backend::TranslationBackend;
use crate::error::TranslateError;
use crate::language::ScriptTable;
use crate::progress::ProgressCallback;
use crate::validate::Validator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for one translation run.
///
/// # Example
/// ```rust
/// use wealthdoc_translate::TranslationConfig;
///
/// let config = TranslationConfig::builder()
///     .source_lang("en")
///     .target_lang("zh")
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct TranslationConfig {
    /// Source language code. Default: `"en"`.
    pub source_lang: String,

    /// Target language code. Default: `"zh"`.
    pub target_lang: String,

    /// Processing mode. Only [`ProcessingMode::Markdown`] is implemented.
    pub mode: ProcessingMode,

    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Explicit API credential for the OpenAI-compatible HTTP backend.
    ///
    /// When set, the key is handed to the backend at construction; it is
    /// never written to the process environment.
    pub api_key: Option<String>,

    /// Base URL for the OpenAI-compatible HTTP backend.
    /// Default: `https://api.openai.com/v1`.
    pub api_base_url: Option<String>,

    /// Pre-constructed backend. Takes precedence over everything else.
    pub backend: Option<Arc<dyn TranslationBackend>>,

    /// Sampling temperature for the default policy. Default: 0.3.
    ///
    /// A middle setting keeps phrasing fluent while financial terms stay
    /// literal.
    pub temperature: f32,

    /// Sampling temperature for the script-verification policy. Default: 0.0.
    pub script_temperature: f32,

    /// Maximum tokens the LLM may generate per segment. Default: 4096.
    pub max_tokens: usize,

    /// Custom system prompt template for LLM backends. `{source}` and
    /// `{target}` are replaced with language names. Default: built-in prompt.
    pub system_prompt: Option<String>,

    /// Retry attempts on a transient backend failure. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-request timeout for the HTTP backend in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Font-size thresholds used to infer heading levels.
    pub heading_thresholds: HeadingThresholds,

    /// Target languages whose output must contain a given script.
    pub script_checks: ScriptTable,

    /// Output format. None → inferred from the output path or the input.
    pub output_format: Option<OutputFormat>,

    /// PDF render cascade settings.
    pub pdf: PdfRenderOptions,

    /// Return the translated Markdown in the output. Default: true.
    pub include_markdown: bool,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,

    /// Scores the finished run. None → [`crate::validate::StructuralValidator`].
    pub validator: Option<Arc<dyn Validator>>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_lang: "en".to_string(),
            target_lang: "zh".to_string(),
            mode: ProcessingMode::default(),
            model: None,
            provider_name: None,
            api_key: None,
            api_base_url: None,
            backend: None,
            temperature: 0.3,
            script_temperature: 0.0,
            max_tokens: 4096,
            system_prompt: None,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            password: None,
            heading_thresholds: HeadingThresholds::default(),
            script_checks: ScriptTable::default(),
            output_format: None,
            pdf: PdfRenderOptions::default(),
            include_markdown: true,
            progress_callback: None,
            validator: None,
        }
    }
}

impl fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .field("mode", &self.mode)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("temperature", &self.temperature)
            .field("script_temperature", &self.script_temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("max_retries", &self.max_retries)
            .field("heading_thresholds", &self.heading_thresholds)
            .field("script_checks", &self.script_checks)
            .field("output_format", &self.output_format)
            .field("pdf", &self.pdf)
            .finish()
    }
}

impl TranslationConfig {
    /// Create a new builder for `TranslationConfig`.
    pub fn builder() -> TranslationConfigBuilder {
        TranslationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`TranslationConfig`].
#[derive(Debug)]
pub struct TranslationConfigBuilder {
    config: TranslationConfig,
}

impl TranslationConfigBuilder {
    pub fn source_lang(mut self, code: impl Into<String>) -> Self {
        self.config.source_lang = code.into().trim().to_ascii_lowercase();
        self
    }

    pub fn target_lang(mut self, code: impl Into<String>) -> Self {
        self.config.target_lang = code.into().trim().to_ascii_lowercase();
        self
    }

    pub fn mode(mut self, mode: ProcessingMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = Some(url.into());
        self
    }

    pub fn backend(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn script_temperature(mut self, t: f32) -> Self {
        self.config.script_temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, template: impl Into<String>) -> Self {
        self.config.system_prompt = Some(template.into());
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn heading_thresholds(mut self, thresholds: HeadingThresholds) -> Self {
        self.config.heading_thresholds = thresholds;
        self
    }

    pub fn script_checks(mut self, table: ScriptTable) -> Self {
        self.config.script_checks = table;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = Some(format);
        self
    }

    pub fn pdf(mut self, options: PdfRenderOptions) -> Self {
        self.config.pdf = options;
        self
    }

    pub fn include_markdown(mut self, v: bool) -> Self {
        self.config.include_markdown = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn validator(mut self, v: Arc<dyn Validator>) -> Self {
        self.config.validator = Some(v);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslationConfig, TranslateError> {
        let c = &self.config;
        if c.source_lang.is_empty() || c.target_lang.is_empty() {
            return Err(TranslateError::InvalidConfig(
                "Source and target language codes must not be empty".into(),
            ));
        }
        if c.source_lang == c.target_lang {
            return Err(TranslateError::InvalidConfig(format!(
                "Source and target language are both '{}'",
                c.source_lang
            )));
        }
        for (name, t) in [
            ("temperature", c.temperature),
            ("script temperature", c.script_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(TranslateError::InvalidConfig(format!(
                    "{name} must be 0.0–2.0, got {t}"
                )));
            }
        }
        if c.max_tokens == 0 {
            return Err(TranslateError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        c.heading_thresholds.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the document is processed.
///
/// Only the Markdown-mediated pipeline is implemented. The layout modes
/// `enhanced`, `precise` and `bilingual` parse to a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// Extract to Markdown, translate segments, re-render. (default)
    #[default]
    Markdown,
}

impl FromStr for ProcessingMode {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ProcessingMode::Markdown),
            other @ ("enhanced" | "precise" | "bilingual") => Err(TranslateError::InvalidConfig(
                format!("Processing mode '{other}' is not supported; use 'markdown'"),
            )),
            other => Err(TranslateError::InvalidConfig(format!(
                "Unknown processing mode '{other}'"
            ))),
        }
    }
}

/// Format of the rendered output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Docx,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl FromStr for OutputFormat {
    type Err = TranslateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(OutputFormat::Pdf),
            "docx" | "word" => Ok(OutputFormat::Docx),
            other => Err(TranslateError::InvalidConfig(format!(
                "Unknown output format '{other}' (expected pdf or docx)"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ── Heading thresholds ───────────────────────────────────────────────────

/// Font-size policy mapping text runs to Markdown heading levels.
///
/// A run whose size is strictly greater than a level's threshold becomes a
/// heading of that level; levels are checked from the largest threshold
/// down. Runs below every threshold whose font name contains
/// `bold_marker` (case-insensitive) become `**bold**` lines.
///
/// Loadable from JSON:
/// ```json
/// { "levels": [[14.0, 1], [12.0, 2]], "bold_marker": "bold" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingThresholds {
    /// `(minimum size, exclusive; heading level 1–6)` pairs.
    pub levels: Vec<(f32, u8)>,
    /// Substring of the font name marking bold runs.
    pub bold_marker: String,
}

impl Default for HeadingThresholds {
    fn default() -> Self {
        Self {
            levels: vec![(14.0, 1), (12.0, 2)],
            bold_marker: "bold".to_string(),
        }
    }
}

impl HeadingThresholds {
    /// Heading level for a run of `font_size` points, if any.
    pub fn heading_level(&self, font_size: f32) -> Option<u8> {
        let mut levels = self.levels.clone();
        levels.sort_by(|a, b| b.0.total_cmp(&a.0));
        levels
            .into_iter()
            .find(|(min, _)| font_size > *min)
            .map(|(_, level)| level)
    }

    /// Whether `font_name` denotes a bold face.
    pub fn is_bold(&self, font_name: &str) -> bool {
        !self.bold_marker.is_empty()
            && font_name
                .to_lowercase()
                .contains(&self.bold_marker.to_lowercase())
    }

    /// Load thresholds from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, TranslateError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TranslateError::InvalidConfig(format!(
                "Cannot read thresholds file {}: {e}",
                path.display()
            ))
        })?;
        let thresholds: Self = serde_json::from_str(&raw).map_err(|e| {
            TranslateError::InvalidConfig(format!(
                "Invalid thresholds file {}: {e}",
                path.display()
            ))
        })?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    fn validate(&self) -> Result<(), TranslateError> {
        if let Some((_, level)) = self.levels.iter().find(|(_, l)| !(1..=6).contains(l)) {
            return Err(TranslateError::InvalidConfig(format!(
                "Heading level must be 1–6, got {level}"
            )));
        }
        Ok(())
    }
}

// ── PDF render options ───────────────────────────────────────────────────

/// Settings shared by the PDF render tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfRenderOptions {
    /// WeasyPrint executable. Default: `weasyprint` on PATH.
    pub weasyprint_bin: PathBuf,
    /// wkhtmltopdf executable. None → searched on PATH.
    pub wkhtmltopdf_bin: Option<PathBuf>,
    /// Page size name understood by both engines. Default: `A4`.
    pub page_size: String,
    /// Page margin in centimetres. Default: 2.0.
    pub margin_cm: f32,
    /// CSS font-family preference list, CJK-capable fonts first.
    pub font_families: Vec<String>,
    /// Base font size in points for HTML output. Default: 12.
    pub base_font_pt: u32,
}

impl Default for PdfRenderOptions {
    fn default() -> Self {
        Self {
            weasyprint_bin: PathBuf::from("weasyprint"),
            wkhtmltopdf_bin: None,
            page_size: "A4".to_string(),
            margin_cm: 2.0,
            font_families: [
                "Noto Sans CJK SC",
                "Microsoft YaHei",
                "SimHei",
                "SimSun",
                "Arial",
                "sans-serif",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            base_font_pt: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = TranslationConfig::default();
        assert_eq!(c.source_lang, "en");
        assert_eq!(c.target_lang, "zh");
        assert_eq!(c.temperature, 0.3);
        assert_eq!(c.script_temperature, 0.0);
        assert_eq!(c.mode, ProcessingMode::Markdown);
        assert!(c.include_markdown);
    }

    #[test]
    fn builder_normalises_language_codes() {
        let c = TranslationConfig::builder()
            .source_lang(" EN ")
            .target_lang("Fr")
            .build()
            .unwrap();
        assert_eq!(c.source_lang, "en");
        assert_eq!(c.target_lang, "fr");
    }

    #[test]
    fn builder_rejects_same_language() {
        let err = TranslationConfig::builder()
            .source_lang("en")
            .target_lang("en")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("both 'en'"));
    }

    #[test]
    fn builder_rejects_out_of_range_temperature() {
        assert!(TranslationConfig::builder().temperature(2.5).build().is_err());
        assert!(TranslationConfig::builder()
            .script_temperature(-0.1)
            .build()
            .is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = TranslationConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn processing_mode_parsing() {
        assert_eq!(
            "markdown".parse::<ProcessingMode>().unwrap(),
            ProcessingMode::Markdown
        );
        let err = "precise".parse::<ProcessingMode>().unwrap_err();
        assert!(err.to_string().contains("not supported"));
        assert!("nonsense".parse::<ProcessingMode>().is_err());
    }

    #[test]
    fn output_format_from_path() {
        assert_eq!(
            OutputFormat::from_path(Path::new("/tmp/report.PDF")),
            Some(OutputFormat::Pdf)
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("out.docx")),
            Some(OutputFormat::Docx)
        );
        assert_eq!(OutputFormat::from_path(Path::new("out.txt")), None);
        assert_eq!(OutputFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn heading_thresholds_default_policy() {
        let t = HeadingThresholds::default();
        assert_eq!(t.heading_level(18.0), Some(1));
        assert_eq!(t.heading_level(14.5), Some(1));
        assert_eq!(t.heading_level(14.0), Some(2));
        assert_eq!(t.heading_level(12.5), Some(2));
        assert_eq!(t.heading_level(12.0), None);
        assert_eq!(t.heading_level(9.0), None);
    }

    #[test]
    fn heading_thresholds_order_independent() {
        let t = HeadingThresholds {
            levels: vec![(10.0, 3), (20.0, 1), (15.0, 2)],
            bold_marker: "bold".into(),
        };
        assert_eq!(t.heading_level(22.0), Some(1));
        assert_eq!(t.heading_level(16.0), Some(2));
        assert_eq!(t.heading_level(11.0), Some(3));
        assert_eq!(t.heading_level(10.0), None);
    }

    #[test]
    fn bold_marker_is_case_insensitive() {
        let t = HeadingThresholds::default();
        assert!(t.is_bold("Helvetica-Bold"));
        assert!(t.is_bold("ARIALBOLDMT"));
        assert!(!t.is_bold("TimesNewRoman"));
    }

    #[test]
    fn thresholds_load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        std::fs::write(
            &path,
            r#"{ "levels": [[16.0, 1], [13.0, 2], [11.5, 3]], "bold_marker": "heavy" }"#,
        )
        .unwrap();
        let t = HeadingThresholds::from_json_file(&path).unwrap();
        assert_eq!(t.heading_level(12.0), Some(3));
        assert!(t.is_bold("Font-Heavy"));
    }

    #[test]
    fn thresholds_reject_bad_level() {
        let c = TranslationConfig::builder()
            .heading_thresholds(HeadingThresholds {
                levels: vec![(14.0, 9)],
                bold_marker: "bold".into(),
            })
            .build();
        assert!(c.is_err());
    }
}
