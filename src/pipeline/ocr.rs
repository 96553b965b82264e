//! Scan detection and OCR.
//!
//! A PDF whose pages carry (almost) no extractable text is treated as a scan
//! and sent through an [`OcrEngine`] before any cleaning happens. The
//! default engine shells out to `ocrmypdf`, which adds an invisible text
//! layer while keeping the page images untouched.

use crate::config::OcrSettings;
use crate::error::Doc2MdError;
use crate::model::Page;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// Outcome of scan detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrDecision {
    /// Pages holding more than `min_chars` characters.
    pub text_pages: usize,
    pub total_pages: usize,
    pub required: bool,
}

/// Decide whether the document needs OCR.
///
/// OCR is required when the share of text pages is below
/// `min_text_page_ratio`. An empty document never requires OCR.
pub fn needs_ocr(pages: &[Page], settings: &OcrSettings) -> OcrDecision {
    let total_pages = pages.len();
    let text_pages = count_text_pages(pages, settings.min_chars);
    let required = total_pages > 0
        && (text_pages as f32 / total_pages as f32) < settings.min_text_page_ratio;
    OcrDecision {
        text_pages,
        total_pages,
        required,
    }
}

pub fn count_text_pages(pages: &[Page], min_chars: usize) -> usize {
    pages.iter().filter(|p| p.char_count > min_chars).count()
}

/// Adds a text layer to a scanned PDF.
pub trait OcrEngine: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Read the PDF at `input` and write the OCR'd PDF to `output`.
    fn ocr(&self, input: &Path, output: &Path, settings: &OcrSettings) -> Result<(), Doc2MdError>;
}

/// Runs the `ocrmypdf` command line tool.
#[derive(Debug, Clone)]
pub struct OcrMyPdf {
    /// Executable to run. Default: `ocrmypdf`.
    pub program: String,
    /// Extra arguments placed before the file arguments.
    pub extra_args: Vec<String>,
}

impl Default for OcrMyPdf {
    fn default() -> Self {
        Self {
            program: "ocrmypdf".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl OcrMyPdf {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    fn args(&self, input: &Path, output: &Path, settings: &OcrSettings) -> Vec<String> {
        let mut args = Vec::new();
        if settings.skip_text {
            args.push("--skip-text".to_string());
        }
        if settings.deskew {
            args.push("--deskew".to_string());
        }
        args.push("-l".to_string());
        args.push(settings.languages.clone());
        args.extend(self.extra_args.iter().cloned());
        args.push(input.display().to_string());
        args.push(output.display().to_string());
        args
    }
}

impl OcrEngine for OcrMyPdf {
    fn name(&self) -> &str {
        "ocrmypdf"
    }

    fn ocr(&self, input: &Path, output: &Path, settings: &OcrSettings) -> Result<(), Doc2MdError> {
        let args = self.args(input, output, settings);
        debug!("Running {} {}", self.program, args.join(" "));

        let out = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| Doc2MdError::ocr(self.name(), format!("cannot start '{}': {e}", self.program)))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(Doc2MdError::ocr(
                self.name(),
                format!("{}: {}", out.status, last_lines(&stderr, 5)),
            ));
        }
        Ok(())
    }
}

/// Run `engine` over `bytes` and return the OCR'd document.
///
/// Both temporary files are removed when this returns, on success or error.
pub fn run_ocr(
    engine: &dyn OcrEngine,
    bytes: &[u8],
    settings: &OcrSettings,
) -> Result<Vec<u8>, Doc2MdError> {
    let mut input = tempfile::Builder::new()
        .prefix("doc2md-ocr-in-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Doc2MdError::Internal(format!("Failed to create temp file: {e}")))?;
    input
        .write_all(bytes)
        .and_then(|_| input.flush())
        .map_err(|e| Doc2MdError::Internal(format!("Failed to write temp file: {e}")))?;

    let output = tempfile::Builder::new()
        .prefix("doc2md-ocr-out-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Doc2MdError::Internal(format!("Failed to create temp file: {e}")))?;

    info!("Running OCR with {} (languages: {})", engine.name(), settings.languages);
    engine.ocr(input.path(), output.path(), settings)?;

    let result = std::fs::read(output.path())
        .map_err(|e| Doc2MdError::ocr(engine.name(), format!("cannot read OCR output: {e}")))?;
    if result.is_empty() {
        return Err(Doc2MdError::ocr(engine.name(), "OCR produced an empty file"));
    }
    Ok(result)
}

fn last_lines(s: &str, n: usize) -> String {
    let lines: Vec<&str> = s.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(n)..].join(" | ")
}
