//! Error types for the doc2md library.
//!
//! A conversion either produces the whole Markdown document or fails with a
//! single [`Doc2MdError`]. There is no partial output: a document that cannot
//! be cleaned faithfully is reported, never half-converted.
//!
//! The four pipeline failure kinds map onto the stages that can fail:
//!
//! * [`Doc2MdError::UnsupportedFormat`] — input is neither PDF nor DOCX
//! * [`Doc2MdError::ParseFailure`] — the document cannot be opened, parsed,
//!   or rewritten during redaction
//! * [`Doc2MdError::OcrFailure`] — the OCR subprocess fails or yields no text
//! * [`Doc2MdError::ConversionFailure`] — an external Markdown/HTML engine fails
//!
//! The remaining variants cover I/O and setup problems around the pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the doc2md library.
#[derive(Debug, Error)]
pub enum Doc2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input is not a recognised PDF or DOCX document.
    #[error("Unsupported format for '{input}': {detail}")]
    UnsupportedFormat { input: String, detail: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The document could not be opened, parsed, or modified.
    #[error("Failed to parse document: {detail}")]
    ParseFailure { detail: String },

    /// OCR could not run or did not produce a text layer.
    #[error("OCR failed ({engine}): {detail}")]
    OcrFailure { engine: String, detail: String },

    /// An external conversion engine returned an error.
    #[error("Conversion engine '{engine}' failed: {detail}")]
    ConversionFailure { engine: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation or rule-table compilation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task join failure, temp file I/O).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Doc2MdError {
    pub(crate) fn parse(detail: impl Into<String>) -> Self {
        Doc2MdError::ParseFailure {
            detail: detail.into(),
        }
    }

    pub(crate) fn ocr(engine: &str, detail: impl Into<String>) -> Self {
        Doc2MdError::OcrFailure {
            engine: engine.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn conversion(engine: &str, detail: impl Into<String>) -> Self {
        Doc2MdError::ConversionFailure {
            engine: engine.to_string(),
            detail: detail.into(),
        }
    }
}
