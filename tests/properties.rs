//! Property-based tests for segmentation and segment translation.
//!
//! - Reassembling the segments of any document gives back its text
//! - Translation preserves the segment count and kind sequence
//! - Structural segments come back unchanged and never reach the backend

use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::Mutex;
use wealthdoc_translate::pipeline::translate::translate_segments;
use wealthdoc_translate::{
    reassemble, segment, BackendError, SegmentKind, StructuredDocument, TranslationBackend,
    TranslationConfig, TranslationRequest,
};

/// Backend that upper-cases its input and records what it saw.
#[derive(Default)]
struct Shouting {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl TranslationBackend for Shouting {
    fn name(&self) -> &str {
        "shouting"
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String, BackendError> {
        self.seen.lock().unwrap().push(request.text.clone());
        Ok(request.text.to_uppercase())
    }
}

fn config() -> TranslationConfig {
    TranslationConfig::builder()
        .source_lang("en")
        .target_lang("fr")
        .max_retries(0)
        .retry_backoff_ms(0)
        .build()
        .unwrap()
}

/// Lines that look like statement Markdown: headings, bullets, tables,
/// numbered items, prose, blanks.
fn markdown_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "#{1,4} [A-Za-z ]{0,12}",
        "[-*+] [a-z ]{0,10}",
        "\\| [a-z]{1,6} \\| [0-9.%]{1,6} \\|",
        "[0-9]{1,2}[.)] [a-z ]{0,8}",
        "[A-Za-z0-9 ,.%$]{0,30}",
        " {1,3}[#>a-z ]{0,10}",
        Just(String::new()),
    ]
}

fn document() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(markdown_line(), 0..40)
}

// ============================================================================
// Segmentation
// ============================================================================

#[test]
fn proptest_reassemble_inverts_segment() {
    proptest!(|(lines in document())| {
        let doc = StructuredDocument::new(lines);
        prop_assert_eq!(reassemble(&segment(&doc)), doc.to_text());
    });
}

#[test]
fn proptest_reassemble_inverts_segment_for_any_text() {
    proptest!(|(text in "\\PC{0,300}")| {
        let doc = StructuredDocument::from_text(&text);
        prop_assert_eq!(reassemble(&segment(&doc)), text);
    });
}

#[test]
fn proptest_text_segments_never_touch() {
    proptest!(|(lines in document())| {
        let segs = segment(&StructuredDocument::new(lines));
        for pair in segs.windows(2) {
            prop_assert!(
                !(pair[0].kind == SegmentKind::Text && pair[1].kind == SegmentKind::Text),
                "adjacent text segments: {:?}",
                pair
            );
        }
    });
}

// ============================================================================
// Translation
// ============================================================================

#[test]
fn proptest_translation_preserves_structure() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    proptest!(|(lines in document())| {
        let segs = segment(&StructuredDocument::new(lines));
        let backend = Shouting::default();
        let (out, report) = rt.block_on(translate_segments(&backend, segs.clone(), &config()));

        prop_assert_eq!(out.len(), segs.len());
        for (before, after) in segs.iter().zip(&out) {
            prop_assert_eq!(before.kind, after.kind);
            if before.kind == SegmentKind::Structural {
                prop_assert_eq!(&before.content, &after.content);
            }
        }

        let translatable = segs
            .iter()
            .filter(|s| s.is_text() && !s.content.trim().is_empty())
            .count();
        let seen = backend.seen.lock().unwrap();
        prop_assert_eq!(seen.len(), translatable);
        prop_assert_eq!(report.backend_calls, translatable);
        for text in seen.iter() {
            prop_assert!(
                segs.iter().any(|s| s.is_text() && s.content.contains(text.as_str())),
                "backend saw text outside any text segment: {:?}",
                text
            );
        }
    });
}
