//! # doc2md
//!
//! Convert PDF and DOCX documents to faithful Markdown.
//!
//! ## Why this crate?
//!
//! Office documents carry noise that generic converters copy straight into
//! the Markdown: the same header and footer on every page, page numbers,
//! handwritten notes scribbled in the margins of a scanned contract, and
//! line breaks wherever the PDF happened to wrap. This crate removes that
//! noise *before* conversion, in the PDF itself, so the external Markdown
//! engine never sees it, then reflows what remains into real paragraphs.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract   text spans, fonts and boxes via pdfium (spawn_blocking)
//!  ├─ 2. OCR       scans get a text layer from ocrmypdf (pol+eng)
//!  ├─ 3. Detect    recurring header/footer lines, handwritten margin notes
//!  ├─ 4. Redact    delete those text objects and re-save the PDF
//!  ├─ 5. Render    external PDF → Markdown engine (pymupdf4llm)
//!  └─ 6. Polish    page numbers, bold headings, paragraph reflow
//!
//! DOCX ── WordprocessingML → HTML → Markdown (html2md) ── table repair
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2md::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("umowa.pdf", &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!(
//!         "removed {} footer spans, {} margin notes",
//!         output.stats.removed_fragment_spans,
//!         output.stats.removed_annotation_spans
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## External tools
//!
//! | Tool | Used for | Override |
//! |------|----------|----------|
//! | pdfium | text extraction, redaction | `PDFIUM_LIB_PATH` (auto-downloaded otherwise) |
//! | `ocrmypdf` | scanned PDFs | [`OcrMyPdf::with_program`] or a custom [`OcrEngine`] |
//! | `python3` + `pymupdf4llm` | PDF → Markdown | [`Pymupdf4llmEngine::command`] or a custom [`MarkdownEngine`] |
//!
//! DOCX conversion needs none of them.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2md` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! doc2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod rules;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, OcrSettings};
pub use convert::{
    convert, convert_bytes, convert_docx, convert_docx_bytes, convert_pdf, convert_pdf_bytes,
    convert_pdf_with, convert_sync, convert_to_file, inspect, inspect_with, write_markdown,
};
pub use error::Doc2MdError;
pub use model::{AnnotationVerdict, ContentRule, FragmentKey, HandwritingRule, MarginOffsets, Page, Rect, TextSpan};
pub use output::{
    CleaningReport, ConversionOutput, ConversionStats, DocumentFormat, FragmentReport, SpanReport,
};
pub use pipeline::engine::{MarkdownEngine, Pymupdf4llmEngine};
pub use pipeline::ocr::{OcrEngine, OcrMyPdf};
pub use pipeline::pdf::{PdfBackend, PdfiumBackend};
pub use pipeline::redact::{RedactionPlan, RedactionReason};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use rules::{CleaningRules, RuleTables};
