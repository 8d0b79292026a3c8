//! Progress-callback trait for pipeline and per-segment events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::TranslationConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages and translates each
//! segment. The CLI drives its progress bar from these events; library
//! callers can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use wealthdoc_translate::{TranslationProgressCallback, TranslationConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     translated: AtomicUsize,
//! }
//!
//! impl TranslationProgressCallback for CountingCallback {
//!     fn on_segment_complete(&self, index: usize, total: usize, translated_len: usize) {
//!         self.translated.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("segment {}/{} ({} bytes)", index + 1, total, translated_len);
//!     }
//! }
//!
//! let config = TranslationConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { translated: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// Coarse pipeline stages reported through [`TranslationProgressCallback::on_stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extract,
    Segment,
    Translate,
    Render,
    Validate,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::Extract => "Extracting",
            PipelineStage::Segment => "Segmenting",
            PipelineStage::Translate => "Translating",
            PipelineStage::Render => "Rendering",
            PipelineStage::Validate => "Validating",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as it runs.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Segment events arrive strictly in segment order.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called when the pipeline enters a new stage.
    fn on_stage(&self, stage: PipelineStage) {
        let _ = stage;
    }

    /// Called once segmentation is done, before any backend call.
    ///
    /// `to_translate` counts the Text segments that will reach the backend.
    fn on_translation_start(&self, total_segments: usize, to_translate: usize) {
        let _ = (total_segments, to_translate);
    }

    /// Called just before the backend request for a segment (0-indexed).
    fn on_segment_start(&self, index: usize, total_segments: usize) {
        let _ = (index, total_segments);
    }

    /// Called when a segment was translated.
    fn on_segment_complete(&self, index: usize, total_segments: usize, translated_len: usize) {
        let _ = (index, total_segments, translated_len);
    }

    /// Called when a segment failed and its original text was kept.
    fn on_segment_error(&self, index: usize, total_segments: usize, error: &str) {
        let _ = (index, total_segments, error);
    }

    /// Called when a PDF render tier failed and the cascade moves on.
    fn on_render_fallback(&self, failed_tier: &str, error: &str) {
        let _ = (failed_tier, error);
    }

    /// Called once after validation.
    fn on_pipeline_complete(&self, translated: usize, failed: usize, score: f32) {
        let _ = (translated, failed, score);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslationConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        stages: Mutex<Vec<PipelineStage>>,
    }

    impl TranslationProgressCallback for TrackingCallback {
        fn on_stage(&self, stage: PipelineStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_segment_start(&self, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_segment_complete(&self, _index: usize, _total: usize, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_segment_error(&self, _index: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage(PipelineStage::Extract);
        cb.on_translation_start(5, 3);
        cb.on_segment_start(0, 5);
        cb.on_segment_complete(0, 5, 42);
        cb.on_segment_error(1, 5, "some error");
        cb.on_render_fallback("weasyprint", "not installed");
        cb.on_pipeline_complete(2, 1, 8.5);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_stage(PipelineStage::Translate);
        tracker.on_segment_start(0, 3);
        tracker.on_segment_complete(0, 3, 100);
        tracker.on_segment_start(2, 3);
        tracker.on_segment_error(2, 3, "timeout");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![PipelineStage::Translate]
        );
    }

    #[test]
    fn stage_display() {
        assert_eq!(PipelineStage::Render.to_string(), "Rendering");
    }
}
