//! CLI binary for wealthdoc-translate.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TranslationConfig` and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use wealthdoc_translate::language::{is_supported, language_name, SUPPORTED_LANGUAGES};
use wealthdoc_translate::{
    inspect, translate_document, translate_to_file, HeadingThresholds, OutputFormat,
    PipelineStage, ProcessingMode, ProgressCallback, TranslationConfig, TranslationOutput,
    TranslationProgressCallback,
};

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while extracting, then a segment bar while translating.
struct CliProgressCallback {
    bar: ProgressBar,
    segment_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            segment_started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.segment_started
            .lock()
            .ok()
            .and_then(|mut g| g.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: PipelineStage) {
        if stage != PipelineStage::Translate {
            self.bar.set_prefix(stage.to_string());
            self.bar.set_message("");
        }
    }

    fn on_translation_start(&self, total_segments: usize, to_translate: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} segments  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_segments as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Translating");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "{total_segments} segments, {to_translate} to translate"
            ))
        ));
    }

    fn on_segment_start(&self, index: usize, _total_segments: usize) {
        if let Ok(mut started) = self.segment_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("segment {}", index + 1));
    }

    fn on_segment_complete(&self, index: usize, total_segments: usize, translated_len: usize) {
        let secs = self.elapsed_secs();
        self.bar.println(format!(
            "  {} Segment {:>4}/{:<4}  {:<8}  {}",
            green("✓"),
            index + 1,
            total_segments,
            dim(&format!("{translated_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_segment_error(&self, index: usize, total_segments: usize, error: &str) {
        let secs = self.elapsed_secs();

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Segment {:>4}/{:<4}  {}  {}",
            red("✗"),
            index + 1,
            total_segments,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_render_fallback(&self, failed_tier: &str, error: &str) {
        self.bar.println(format!(
            "  {} {} unavailable: {}",
            yellow("↷"),
            bold(failed_tier),
            dim(error)
        ));
    }

    fn on_pipeline_complete(&self, translated: usize, failed: usize, score: f32) {
        self.bar.finish_and_clear();
        let mark = if failed == 0 {
            green("✔")
        } else if translated == 0 {
            red("✘")
        } else {
            yellow("⚠")
        };
        eprintln!(
            "{mark} {} segments translated, {} failed  (score {:.1}/10)",
            bold(&translated.to_string()),
            if failed == 0 {
                failed.to_string()
            } else {
                red(&failed.to_string())
            },
            score
        );
    }
}

fn after_help() -> String {
    let mut langs = String::new();
    for (code, name) in SUPPORTED_LANGUAGES {
        langs.push_str(&format!("  {code:<4} {name}\n"));
    }
    format!(
        r#"EXAMPLES:
  # English statement to Simplified Chinese PDF (written to the temp dir)
  wealthdoc statement.pdf --from en --to zh

  # Word output at a chosen path
  wealthdoc statement.pdf --to zh -o statement_zh.docx

  # Keep the intermediate Markdown for review
  wealthdoc report.pdf --to fr -o report_fr.pdf --markdown-out report_fr.md

  # Custom heading thresholds
  wealthdoc factsheet.pdf --to de --thresholds thresholds.json

  # Inspect PDF metadata (no API key needed)
  wealthdoc --inspect-only statement.pdf

  # JSON report
  wealthdoc statement.pdf --to zh --json > report.json

LANGUAGES:
{langs}
THRESHOLDS FILE (JSON):
  {{ "levels": [[14.0, 1], [12.0, 2]], "bold_marker": "bold" }}   (default)

PDF RENDERING:
  weasyprint → wkhtmltopdf → built-in (Latin-1 only). Install weasyprint
  or wkhtmltopdf with a CJK font for Chinese, Japanese or Korean output.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium
"#
    )
}

/// Translate financial PDF documents via Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "wealthdoc",
    version,
    about = "Translate financial PDF documents and re-render them as PDF or DOCX",
    long_about = "Extract a PDF to Markdown using font sizes, translate the prose with an LLM \
backend segment by segment, and render the result as PDF or DOCX. Headings, lists and tables \
are never sent to the model.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = after_help()
)]
struct Cli {
    /// Source PDF file.
    input: PathBuf,

    /// Output file. Defaults to `{stem}_{to}_{random}.{format}` in the temp dir.
    #[arg(short, long, env = "WEALTHDOC_OUTPUT")]
    output: Option<PathBuf>,

    /// Source language code.
    #[arg(long = "from", env = "WEALTHDOC_FROM", default_value = "en")]
    from: String,

    /// Target language code.
    #[arg(long = "to", env = "WEALTHDOC_TO", default_value = "zh")]
    to: String,

    /// Processing mode. Only `markdown` is available.
    #[arg(long, env = "WEALTHDOC_MODE", default_value = "markdown")]
    mode: String,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama."
    )]
    provider: Option<String>,

    /// API key for an OpenAI-compatible endpoint (takes precedence over --provider).
    #[arg(long, env = "WEALTHDOC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL for --api-key (default: https://api.openai.com/v1).
    #[arg(long, env = "WEALTHDOC_API_BASE")]
    api_base: Option<String>,

    /// Output format: pdf or docx. Defaults to the output extension, else pdf.
    #[arg(long, env = "WEALTHDOC_FORMAT")]
    format: Option<String>,

    /// Also write the translated Markdown to this file.
    #[arg(long)]
    markdown_out: Option<PathBuf>,

    /// JSON file with heading font-size thresholds.
    #[arg(long, env = "WEALTHDOC_THRESHOLDS")]
    thresholds: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "WEALTHDOC_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to a text file with a custom system prompt ({source}/{target}
    /// are replaced with language names).
    #[arg(long, env = "WEALTHDOC_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM temperature for ordinary segments (0.0–2.0).
    #[arg(long, env = "WEALTHDOC_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Retries per segment on transient backend errors.
    #[arg(long, env = "WEALTHDOC_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call backend timeout in seconds.
    #[arg(long, env = "WEALTHDOC_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Print the full result as JSON.
    #[arg(long)]
    json: bool,

    /// Print PDF metadata only, no translation.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "WEALTHDOC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "WEALTHDOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "WEALTHDOC_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn TranslationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run translation ──────────────────────────────────────────────────
    let output = match cli.output {
        Some(ref path) => translate_to_file(&cli.input, path, &config).await,
        None => translate_document(&cli.input, &config).await,
    }
    .context("Translation failed")?;

    if let Some(ref md_path) = cli.markdown_out {
        let markdown = output.markdown.as_deref().unwrap_or_default();
        tokio::fs::write(md_path, markdown)
            .await
            .with_context(|| format!("Failed to write Markdown to {}", md_path.display()))?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        println!("{}", output.output_path.display());
    }

    if !cli.quiet && !cli.json {
        print_summary(&output, &config, show_progress);
    }

    Ok(())
}

/// Map CLI args to `TranslationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranslationConfig> {
    for code in [&cli.from, &cli.to] {
        if !is_supported(code) {
            tracing::warn!("Language code '{code}' is not in the supported list");
        }
    }

    let mode: ProcessingMode = cli.mode.parse().context("Invalid --mode")?;

    let mut builder = TranslationConfig::builder()
        .source_lang(&cli.from)
        .target_lang(&cli.to)
        .mode(mode)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .include_markdown(cli.markdown_out.is_some() || cli.json);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref base) = cli.api_base {
        builder = builder.api_base_url(base);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref format) = cli.format {
        let format: OutputFormat = format.parse().context("Invalid --format")?;
        builder = builder.output_format(format);
    }
    if let Some(ref path) = cli.system_prompt {
        let template = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(template);
    }
    if let Some(ref path) = cli.thresholds {
        let thresholds =
            HeadingThresholds::from_json_file(path).context("Invalid --thresholds file")?;
        builder = builder.heading_thresholds(thresholds);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &TranslationOutput, config: &TranslationConfig, show_progress: bool) {
    let seg = &output.segments;
    if !show_progress {
        eprintln!(
            "Translated {}/{} text segments ({} → {}), {} failed",
            seg.translated,
            seg.text,
            language_name(&config.source_lang),
            language_name(&config.target_lang),
            seg.failed
        );
    }
    if output.render.used_fallback() {
        eprintln!(
            "   {} rendered by '{}' after {} failed tier(s)",
            yellow("⚠"),
            output.render.renderer,
            output.render.tier_failures.len()
        );
    }
    for issue in &output.validation.issues {
        eprintln!("   {} {}", yellow("•"), issue);
    }
    eprintln!(
        "{}  {}  {}ms  →  {}",
        if output.validation.issues.is_empty() {
            green("✔")
        } else {
            cyan("⚠")
        },
        dim(&format!("{} backend calls", output.stats.backend_calls)),
        output.stats.total_duration_ms,
        bold(&output.output_path.display().to_string()),
    );
}
