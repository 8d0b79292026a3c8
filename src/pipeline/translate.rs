//! Segment translation: drive the backend over Text segments, in order.
//!
//! Structural segments are copied through. Each non-blank Text segment gets
//! exactly one logical backend request (two under the script-verification
//! policy when the first answer lacks the expected script). A failure never
//! leaves this module: the original text is kept and a [`SegmentError`] is
//! recorded in the [`SegmentReport`].
//!
//! ## Policies
//!
//! * **Default**: send the segment as-is at `config.temperature`.
//! * **Script verification**: chosen when the target language has an entry
//!   in `config.script_checks`. The segment is wrapped in an explicit
//!   instruction and sent at `config.script_temperature`; the answer must
//!   contain at least one character of the expected script. Otherwise one
//!   retry with a shorter instruction; the second answer is accepted either
//!   way. A failed retry request fails the segment.

use crate::backend::{RetryPolicy, TranslationBackend, TranslationRequest};
use crate::config::TranslationConfig;
use crate::error::SegmentError;
use crate::language::Script;
use crate::output::SegmentReport;
use crate::pipeline::postprocess::clean_translation;
use crate::pipeline::segment::{Segment, SegmentKind};
use crate::prompts::{script_instruction, script_retry_instruction};
use tracing::{debug, info, warn};

/// How text for the current target language is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Default,
    ScriptVerified(Script),
}

impl Policy {
    pub fn for_config(config: &TranslationConfig) -> Self {
        match config.script_checks.lookup(&config.target_lang) {
            Some(script) => Policy::ScriptVerified(script),
            None => Policy::Default,
        }
    }
}

/// Translate every Text segment, returning the new segment list and a report.
///
/// The returned list has the same length and kind sequence as the input.
pub async fn translate_segments(
    backend: &dyn TranslationBackend,
    segments: Vec<Segment>,
    config: &TranslationConfig,
) -> (Vec<Segment>, SegmentReport) {
    let policy = Policy::for_config(config);
    let retry = RetryPolicy::from_config(config);
    let total = segments.len();

    let mut report = SegmentReport {
        total,
        text: segments.iter().filter(|s| s.is_text()).count(),
        ..Default::default()
    };
    report.structural = total - report.text;

    let to_translate = segments
        .iter()
        .filter(|s| s.is_text() && !s.content.trim().is_empty())
        .count();
    info!(
        "Translating {} of {} segments ({} → {}, {:?})",
        to_translate, total, config.source_lang, config.target_lang, policy
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_translation_start(total, to_translate);
    }

    let mut out = Vec::with_capacity(total);
    for (index, seg) in segments.into_iter().enumerate() {
        if seg.kind == SegmentKind::Structural {
            out.push(seg);
            continue;
        }
        if seg.content.trim().is_empty() {
            report.passed_through += 1;
            out.push(seg);
            continue;
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_segment_start(index, total);
        }

        let (leading, core, trailing) = split_whitespace(&seg.content);
        debug!("Segment {}: {}", index, preview(core));

        report.backend_calls += 1;
        let outcome = match policy {
            Policy::Default => translate_default(backend, &retry, core, config).await,
            Policy::ScriptVerified(script) => {
                translate_verified(backend, &retry, core, script, config, index, &mut report).await
            }
        };

        match outcome {
            Ok(translated) => {
                debug!("Segment {} → {}", index, preview(&translated));
                report.translated += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_segment_complete(index, total, translated.len());
                }
                out.push(Segment::text(format!("{leading}{translated}{trailing}")));
            }
            Err(detail) => {
                warn!("Segment {}: keeping original text ({})", index, detail);
                report.failed += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_segment_error(index, total, &detail);
                }
                report
                    .errors
                    .push(SegmentError::Translation { index, detail });
                out.push(seg);
            }
        }
    }

    info!(
        "Segments: {} translated, {} failed, {} script retries",
        report.translated, report.failed, report.script_retries
    );
    (out, report)
}

async fn translate_default(
    backend: &dyn TranslationBackend,
    retry: &RetryPolicy,
    core: &str,
    config: &TranslationConfig,
) -> Result<String, String> {
    let request = TranslationRequest {
        text: core.to_string(),
        source_lang: config.source_lang.clone(),
        target_lang: config.target_lang.clone(),
        temperature: config.temperature,
    };
    request_clean(backend, retry, &request, core).await
}

async fn translate_verified(
    backend: &dyn TranslationBackend,
    retry: &RetryPolicy,
    core: &str,
    script: Script,
    config: &TranslationConfig,
    index: usize,
    report: &mut SegmentReport,
) -> Result<String, String> {
    let mut request = TranslationRequest {
        text: script_instruction(&config.source_lang, &config.target_lang, script, core),
        source_lang: config.source_lang.clone(),
        target_lang: config.target_lang.clone(),
        temperature: config.script_temperature,
    };
    let first = request_clean(backend, retry, &request, core).await?;
    if script.appears_in(&first) {
        return Ok(first);
    }

    warn!(
        "Segment {}: no {} characters in output, retrying with direct instruction",
        index, script
    );
    report.script_retries += 1;
    request.text = script_retry_instruction(&config.target_lang, script, core);

    let accepted = request_clean(backend, retry, &request, core).await?;
    if script.appears_in(&accepted) {
        return Ok(accepted);
    }

    warn!(
        "Segment {}: accepted output without {} characters: {}",
        index,
        script,
        preview(&accepted)
    );
    report.script_failures += 1;
    report.errors.push(SegmentError::ScriptVerification {
        index,
        script: script.to_string(),
    });
    Ok(accepted)
}

async fn request_clean(
    backend: &dyn TranslationBackend,
    retry: &RetryPolicy,
    request: &TranslationRequest,
    source: &str,
) -> Result<String, String> {
    let raw = retry
        .call(backend, request)
        .await
        .map_err(|e| e.to_string())?;
    let cleaned = clean_translation(&raw, source);
    if cleaned.is_empty() {
        return Err(format!("{} returned only whitespace", backend.name()));
    }
    Ok(cleaned)
}

/// Split into (leading whitespace, core, trailing whitespace).
fn split_whitespace(s: &str) -> (&str, &str, &str) {
    let start = s.len() - s.trim_start().len();
    let end = s.trim_end().len();
    if start >= end {
        return (s, "", "");
    }
    (&s[..start], &s[start..end], &s[end..])
}

/// First 100 characters of `s` on one line, for logs.
pub(crate) fn preview(s: &str) -> String {
    let flat: String = s.chars().take(100).map(|c| if c == '\n' { ' ' } else { c }).collect();
    if s.chars().count() > 100 {
        format!("{flat}…")
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::language::ScriptTable;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies from a script; records every request.
    struct Scripted {
        replies: Mutex<Vec<Result<String, BackendError>>>,
        seen: Mutex<Vec<TranslationRequest>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .rev()
                        .map(|r| r.map(str::to_string).map_err(|e| BackendError::Api(e.into())))
                        .collect(),
                ),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TranslationBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn translate(&self, request: &TranslationRequest) -> Result<String, BackendError> {
            self.seen.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(BackendError::Api("script exhausted".into())))
        }
    }

    fn config(target: &str) -> TranslationConfig {
        TranslationConfig::builder()
            .source_lang("en")
            .target_lang(target)
            .max_retries(0)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn structural_and_blank_segments_skip_the_backend() {
        let backend = Scripted::new(vec![Ok("Bonjour")]);
        let segs = vec![
            Segment::structural("# Title"),
            Segment::text("  \n "),
            Segment::text("Hello"),
        ];
        let (out, report) = translate_segments(&backend, segs, &config("fr")).await;
        assert_eq!(out[0], Segment::structural("# Title"));
        assert_eq!(out[1], Segment::text("  \n "));
        assert_eq!(out[2], Segment::text("Bonjour"));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
        assert_eq!(report.passed_through, 1);
        assert_eq!(report.translated, 1);
        assert_eq!(report.structural, 1);
    }

    #[tokio::test]
    async fn default_policy_sends_text_verbatim() {
        let backend = Scripted::new(vec![Ok("Rendement")]);
        let (_, _) =
            translate_segments(&backend, vec![Segment::text("Yield")], &config("fr")).await;
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].text, "Yield");
        assert_eq!(seen[0].temperature, 0.3);
    }

    #[tokio::test]
    async fn surrounding_whitespace_is_preserved() {
        let backend = Scripted::new(vec![Ok("  Bonjour \n")]);
        let (out, _) =
            translate_segments(&backend, vec![Segment::text("\nHello\n\n")], &config("fr")).await;
        assert_eq!(out[0].content, "\nBonjour\n\n");
        assert_eq!(backend.seen.lock().unwrap()[0].text, "Hello");
    }

    #[tokio::test]
    async fn backend_error_keeps_original() {
        let backend = Scripted::new(vec![Err("boom"), Ok("Deux")]);
        let segs = vec![
            Segment::text("One"),
            Segment::structural("- x"),
            Segment::text("Two"),
        ];
        let (out, report) = translate_segments(&backend, segs, &config("fr")).await;
        assert_eq!(out[0].content, "One");
        assert_eq!(out[2].content, "Deux");
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index(), 0);
    }

    #[tokio::test]
    async fn script_policy_accepts_first_verified_answer() {
        let backend = Scripted::new(vec![Ok("资产配置")]);
        let (out, report) =
            translate_segments(&backend, vec![Segment::text("Asset allocation")], &config("zh"))
                .await;
        assert_eq!(out[0].content, "资产配置");
        assert_eq!(report.script_retries, 0);
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].temperature, 0.0);
        assert!(seen[0].text.contains("Rules:"));
    }

    #[tokio::test]
    async fn script_policy_retries_exactly_once() {
        let backend = Scripted::new(vec![Ok("Asset allocation"), Ok("资产配置")]);
        let (out, report) =
            translate_segments(&backend, vec![Segment::text("Asset allocation")], &config("zh"))
                .await;
        assert_eq!(out[0].content, "资产配置");
        assert_eq!(report.script_retries, 1);
        assert_eq!(report.script_failures, 0);
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].text.starts_with("将以下文本翻译成中文"));
    }

    #[tokio::test]
    async fn script_failure_is_non_fatal() {
        let backend = Scripted::new(vec![Ok("still english"), Ok("still english 2")]);
        let (out, report) =
            translate_segments(&backend, vec![Segment::text("Bonds")], &config("zh")).await;
        assert_eq!(out[0].content, "still english 2");
        assert_eq!(report.script_failures, 1);
        assert_eq!(report.translated, 1);
        assert!(matches!(
            report.errors[0],
            SegmentError::ScriptVerification { index: 0, .. }
        ));
        assert_eq!(backend.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_script_retry_keeps_source_text() {
        let backend = Scripted::new(vec![Ok("Gesamtvermögen"), Err("HTTP 500")]);
        let (out, report) =
            translate_segments(&backend, vec![Segment::text("Total assets")], &config("zh"))
                .await;
        assert_eq!(out[0].content, "Total assets");
        assert_eq!(report.failed, 1);
        assert_eq!(report.translated, 0);
        assert_eq!(report.script_retries, 1);
        assert_eq!(report.script_failures, 0);
        assert!(matches!(
            report.errors[0],
            SegmentError::Translation { index: 0, .. }
        ));
    }

    #[tokio::test]
    async fn script_table_can_disable_verification() {
        let backend = Scripted::new(vec![Ok("english")]);
        let cfg = TranslationConfig::builder()
            .target_lang("zh")
            .script_checks(ScriptTable::empty())
            .build()
            .unwrap();
        let (_, report) = translate_segments(&backend, vec![Segment::text("x")], &cfg).await;
        assert_eq!(report.script_retries, 0);
        assert_eq!(backend.seen.lock().unwrap()[0].text, "x");
    }

    #[test]
    fn whitespace_split() {
        assert_eq!(split_whitespace(" a b\n"), (" ", "a b", "\n"));
        assert_eq!(split_whitespace("abc"), ("", "abc", ""));
        assert_eq!(split_whitespace("  "), ("  ", "", ""));
    }

    #[test]
    fn preview_truncates() {
        let long = "x".repeat(150);
        assert_eq!(preview(&long).chars().count(), 101);
        assert_eq!(preview("a\nb"), "a b");
    }
}
