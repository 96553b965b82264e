//! Conversion results.

use crate::model::{AnnotationVerdict, FragmentKey, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => f.write_str("PDF"),
            DocumentFormat::Docx => f.write_str("DOCX"),
        }
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub markdown: String,
    pub format: DocumentFormat,
    pub stats: ConversionStats,
    /// Present when [`crate::ConversionConfig::include_report`] is set (PDF only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<CleaningReport>,
}

/// Counters describing what a conversion did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    /// Pages holding more than the OCR character threshold before OCR.
    pub text_pages: usize,
    pub ocr_applied: bool,
    pub recurring_fragments: usize,
    pub removed_fragment_spans: usize,
    pub removed_annotation_spans: usize,
    pub removed_page_number_lines: usize,
    pub total_duration_ms: u64,
    pub engine_duration_ms: u64,
}

/// What the cleaning stages decided, for debugging rule tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub total_pages: usize,
    pub text_pages: usize,
    pub ocr_required: bool,
    pub recurring_fragments: Vec<FragmentReport>,
    /// Verdicts for every non-blank span lying in a margin zone.
    pub margin_spans: Vec<SpanReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentReport {
    pub text: FragmentKey,
    /// 1-based pages where the fragment sits in a header/footer band.
    pub pages: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanReport {
    /// 1-based page number.
    pub page: usize,
    pub text: String,
    pub font: String,
    pub bbox: Rect,
    pub verdict: AnnotationVerdict,
}
