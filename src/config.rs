//! Configuration types for document-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across conversions, log them, and diff two
//! runs to understand why their outputs differ.
//!
//! The locale-dependent tables (handwriting keywords, content patterns,
//! page-number patterns) live in [`CleaningRules`] and are injected here
//! rather than hard-wired into the stages that use them.

use crate::error::Doc2MdError;
use crate::model::MarginOffsets;
use crate::pipeline::engine::{MarkdownEngine, Pymupdf4llmEngine};
use crate::pipeline::ocr::{OcrEngine, OcrMyPdf};
use crate::progress::ProgressCallback;
use crate::rules::{CleaningRules, RuleTables};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use doc2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .ocr_languages("deu+eng")
///     .remove_page_numbers(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Margin strips searched for handwritten annotations. Default: 60/60/50/50 pt.
    pub margins: MarginOffsets,

    /// Fraction of the page height forming the header and footer bands. Default: 0.10.
    pub band_ratio: f32,

    /// Minimum number of distinct pages a band fragment must appear on to be
    /// removed. Default: 2.
    pub recurrence_threshold: usize,

    /// Compiled locale tables.
    pub rules: CleaningRules,

    /// Remove recurring header/footer fragments. Default: true.
    pub remove_headers_footers: bool,

    /// Remove spans classified as handwriting. Default: true.
    pub remove_annotations: bool,

    /// Strip page-number lines from the Markdown. Default: true.
    pub remove_page_numbers: bool,

    /// Reflow broken lines into paragraphs. Default: true.
    pub merge_lines: bool,

    /// OCR detection and invocation settings.
    pub ocr: OcrSettings,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Engine rendering the cleaned PDF to raw Markdown.
    pub markdown_engine: Arc<dyn MarkdownEngine>,

    /// Engine adding a text layer to scanned PDFs.
    pub ocr_engine: Arc<dyn OcrEngine>,

    /// Text used for empty Markdown table header cells; `{n}` is replaced by
    /// the 1-based column number. Default: `"Column {n}"`.
    pub empty_header_placeholder: String,

    /// Attach a [`crate::output::CleaningReport`] to the output. Default: false.
    pub include_report: bool,

    /// Optional progress events sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            margins: MarginOffsets::default(),
            band_ratio: 0.10,
            recurrence_threshold: 2,
            rules: CleaningRules::default(),
            remove_headers_footers: true,
            remove_annotations: true,
            remove_page_numbers: true,
            merge_lines: true,
            ocr: OcrSettings::default(),
            password: None,
            markdown_engine: Arc::new(Pymupdf4llmEngine::default()),
            ocr_engine: Arc::new(OcrMyPdf::default()),
            empty_header_placeholder: "Column {n}".to_string(),
            include_report: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("margins", &self.margins)
            .field("band_ratio", &self.band_ratio)
            .field("recurrence_threshold", &self.recurrence_threshold)
            .field("remove_headers_footers", &self.remove_headers_footers)
            .field("remove_annotations", &self.remove_annotations)
            .field("remove_page_numbers", &self.remove_page_numbers)
            .field("merge_lines", &self.merge_lines)
            .field("ocr", &self.ocr)
            .field("markdown_engine", &self.markdown_engine.name())
            .field("ocr_engine", &self.ocr_engine.name())
            .field("include_report", &self.include_report)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
            tables: None,
        }
    }
}

/// When and how OCR runs on PDFs without a usable text layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSettings {
    /// Run OCR when the document looks scanned. Default: true.
    pub enabled: bool,

    /// Tesseract language string. Default: `"pol+eng"`.
    pub languages: String,

    /// A page "has text" when it holds more than this many characters. Default: 50.
    pub min_chars: usize,

    /// OCR is needed when the share of pages with text is below this. Default: 0.10.
    pub min_text_page_ratio: f32,

    /// Leave pages that already carry text untouched. Default: true.
    pub skip_text: bool,

    /// Straighten skewed scans before recognition. Default: true.
    pub deskew: bool,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            languages: "pol+eng".to_string(),
            min_chars: 50,
            min_text_page_ratio: 0.10,
            skip_text: true,
            deskew: true,
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
    tables: Option<RuleTables>,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .field("tables", &self.tables)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn margins(mut self, margins: MarginOffsets) -> Self {
        self.config.margins = margins;
        self
    }

    pub fn band_ratio(mut self, ratio: f32) -> Self {
        self.config.band_ratio = ratio;
        self
    }

    /// Values below 2 are raised to 2: a fragment seen on one page is content.
    pub fn recurrence_threshold(mut self, pages: usize) -> Self {
        self.config.recurrence_threshold = pages.max(2);
        self
    }

    /// Replace the locale tables; compiled in [`Self::build`].
    pub fn rule_tables(mut self, tables: RuleTables) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn rules(mut self, rules: CleaningRules) -> Self {
        self.config.rules = rules;
        self.tables = None;
        self
    }

    pub fn remove_headers_footers(mut self, v: bool) -> Self {
        self.config.remove_headers_footers = v;
        self
    }

    pub fn remove_annotations(mut self, v: bool) -> Self {
        self.config.remove_annotations = v;
        self
    }

    pub fn remove_page_numbers(mut self, v: bool) -> Self {
        self.config.remove_page_numbers = v;
        self
    }

    pub fn merge_lines(mut self, v: bool) -> Self {
        self.config.merge_lines = v;
        self
    }

    pub fn ocr(mut self, settings: OcrSettings) -> Self {
        self.config.ocr = settings;
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr.enabled = v;
        self
    }

    pub fn ocr_languages(mut self, languages: impl Into<String>) -> Self {
        self.config.ocr.languages = languages.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn markdown_engine(mut self, engine: Arc<dyn MarkdownEngine>) -> Self {
        self.config.markdown_engine = engine;
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = engine;
        self
    }

    pub fn empty_header_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.config.empty_header_placeholder = placeholder.into();
        self
    }

    pub fn include_report(mut self, v: bool) -> Self {
        self.config.include_report = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ConversionConfig, Doc2MdError> {
        if let Some(tables) = self.tables.take() {
            self.config.rules = tables.compile()?;
        }
        let c = &self.config;
        if !(c.band_ratio > 0.0 && c.band_ratio < 0.5) {
            return Err(Doc2MdError::InvalidConfig(format!(
                "band ratio must be in (0, 0.5), got {}",
                c.band_ratio
            )));
        }
        let m = &c.margins;
        if [m.left, m.right, m.top, m.bottom].iter().any(|v| *v < 0.0 || !v.is_finite()) {
            return Err(Doc2MdError::InvalidConfig(format!(
                "margin offsets must be finite and ≥ 0, got {m:?}"
            )));
        }
        if c.ocr.languages.trim().is_empty() {
            return Err(Doc2MdError::InvalidConfig(
                "OCR languages must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&c.ocr.min_text_page_ratio) {
            return Err(Doc2MdError::InvalidConfig(format!(
                "OCR text-page ratio must be in [0, 1], got {}",
                c.ocr.min_text_page_ratio
            )));
        }
        Ok(self.config)
    }
}
