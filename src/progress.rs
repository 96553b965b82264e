//! Progress-callback trait for conversion stage events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages. OCR on a long scan can
//! take minutes, so a UI wants to say "running OCR…" rather than sit silent.
//!
//! # Example
//!
//! ```rust
//! use doc2md::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! struct StageLog(Mutex<Vec<Stage>>);
//!
//! impl ConversionProgressCallback for StageLog {
//!     fn on_stage(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let log = Arc::new(StageLog(Mutex::new(Vec::new())));
//! let config = ConversionConfig::builder()
//!     .progress_callback(log as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{ConversionStats, DocumentFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A step of the conversion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extracting,
    Ocr,
    Cleaning,
    Rendering,
    PostProcessing,
    DocxToHtml,
    HtmlToMarkdown,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Extracting => "extracting text layer",
            Stage::Ocr => "running OCR",
            Stage::Cleaning => "removing headers, footers and annotations",
            Stage::Rendering => "rendering Markdown",
            Stage::PostProcessing => "reflowing paragraphs",
            Stage::DocxToHtml => "reading DOCX",
            Stage::HtmlToMarkdown => "converting HTML to Markdown",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as a conversion advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Conversions run one at a time, but the callback is
/// invoked from a blocking worker thread, hence `Send + Sync`.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, after the input format is known.
    fn on_conversion_start(&self, input: &str, format: DocumentFormat) {
        let _ = (input, format);
    }

    /// Called when a stage begins.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after scan detection with the pages that already carry text.
    fn on_ocr_decision(&self, text_pages: usize, total_pages: usize, required: bool) {
        let _ = (text_pages, total_pages, required);
    }

    /// Called once when the Markdown is ready.
    fn on_conversion_complete(&self, stats: &ConversionStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Fires `on_stage` when a callback is configured.
pub(crate) fn report_stage(cb: Option<&ProgressCallback>, stage: Stage) {
    if let Some(cb) = cb {
        cb.on_stage(stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TrackingCallback {
        stages: Mutex<Vec<Stage>>,
        decisions: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_ocr_decision(&self, _text_pages: usize, _total_pages: usize, _required: bool) {
            self.decisions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start("a.pdf", DocumentFormat::Pdf);
        cb.on_stage(Stage::Ocr);
        cb.on_ocr_decision(0, 2, true);
        cb.on_conversion_complete(&ConversionStats::default());
    }

    #[test]
    fn report_stage_forwards_to_callback() {
        let tracker = Arc::new(TrackingCallback {
            stages: Mutex::new(Vec::new()),
            decisions: AtomicUsize::new(0),
        });
        let cb: ProgressCallback = tracker.clone();
        report_stage(Some(&cb), Stage::Extracting);
        report_stage(Some(&cb), Stage::Cleaning);
        report_stage(None, Stage::Rendering);
        cb.on_ocr_decision(1, 1, false);

        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![Stage::Extracting, Stage::Cleaning]
        );
        assert_eq!(tracker.decisions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stage_display_is_human_readable() {
        assert_eq!(Stage::Ocr.to_string(), "running OCR");
    }
}
