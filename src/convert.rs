//! Conversion entry points.
//!
//! The public API is async, but each conversion body runs start to finish
//! inside a single `spawn_blocking` call: pdfium is not async-safe and the
//! OCR tool and Markdown engine are blocking subprocesses anyway.
//!
//! [`convert_pdf_with`] is the synchronous PDF core. It takes the
//! [`PdfBackend`] explicitly so the whole pipeline can run against an
//! in-memory fake.

use crate::config::ConversionConfig;
use crate::error::Doc2MdError;
use crate::model::Page;
use crate::output::{
    CleaningReport, ConversionOutput, ConversionStats, DocumentFormat, FragmentReport, SpanReport,
};
use crate::pipeline::annotations::{classify_page, ClassifiedSpan};
use crate::pipeline::fragments::{detect_recurring, RecurringFragments};
use crate::pipeline::ocr::{self, OcrDecision};
use crate::pipeline::pdf::{PdfBackend, PdfiumBackend};
use crate::pipeline::postprocess::{self, PostProcessOptions};
use crate::pipeline::redact::{build_plan, RedactionPlan, RedactionReason};
use crate::pipeline::{docx, engine, input};
use crate::progress::{report_stage, Stage};
use std::borrow::Cow;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Name used for in-memory inputs in progress events and errors.
const MEMORY_INPUT: &str = "<memory>";

/// Convert a PDF or DOCX file to Markdown.
///
/// The format is detected from the file's content, not its extension.
///
/// # Errors
/// * [`Doc2MdError::FileNotFound`] / [`Doc2MdError::PermissionDenied`] when
///   the file cannot be read
/// * [`Doc2MdError::UnsupportedFormat`] when it is neither PDF nor DOCX
/// * any pipeline failure; there is never partial output
pub async fn convert(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    let path = path.as_ref();
    info!("Starting conversion: {}", path.display());

    // ── Step 1: Read input ───────────────────────────────────────────────
    let bytes = input::read_input(path).await?;
    let name = path.display().to_string();

    // ── Step 2: Detect format ────────────────────────────────────────────
    let format = input::detect_format(&bytes, &name)?;
    debug!("{} detected as {}", name, format);

    run_blocking(bytes, name, format, config).await
}

/// Convert a PDF file. Fails with `UnsupportedFormat` for anything else.
pub async fn convert_pdf(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    let path = path.as_ref();
    let bytes = input::read_input(path).await?;
    let name = path.display().to_string();
    expect_format(&bytes, &name, DocumentFormat::Pdf)?;
    run_blocking(bytes, name, DocumentFormat::Pdf, config).await
}

/// Convert PDF bytes held in memory.
pub async fn convert_pdf_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    expect_format(bytes, MEMORY_INPUT, DocumentFormat::Pdf)?;
    run_blocking(bytes.to_vec(), MEMORY_INPUT.into(), DocumentFormat::Pdf, config).await
}

/// Convert a DOCX file. Fails with `UnsupportedFormat` for anything else.
pub async fn convert_docx(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    let path = path.as_ref();
    let bytes = input::read_input(path).await?;
    let name = path.display().to_string();
    expect_format(&bytes, &name, DocumentFormat::Docx)?;
    run_blocking(bytes, name, DocumentFormat::Docx, config).await
}

/// Convert DOCX bytes held in memory.
pub async fn convert_docx_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    expect_format(bytes, MEMORY_INPUT, DocumentFormat::Docx)?;
    run_blocking(bytes.to_vec(), MEMORY_INPUT.into(), DocumentFormat::Docx, config).await
}

/// Convert in-memory bytes, detecting the format from their magic bytes.
///
/// # Example
/// ```rust,no_run
/// use doc2md::{convert_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("contract.docx")?;
/// let output = convert_bytes(&bytes, &ConversionConfig::default()).await?;
/// println!("{}", output.markdown);
/// # Ok(())
/// # }
/// ```
pub async fn convert_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    let format = input::detect_format(bytes, MEMORY_INPUT)?;
    run_blocking(bytes.to_vec(), MEMORY_INPUT.into(), format, config).await
}

/// Convert a document and write the Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Doc2MdError> {
    let output = convert(path, config).await?;
    write_markdown(output_path.as_ref(), &output.markdown).await?;
    Ok(output.stats)
}

/// Atomically write Markdown to `path`, ending it with a single newline.
///
/// Parent directories are created as needed.
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), Doc2MdError> {
    let fail = |source| Doc2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    let content = postprocess::ensure_final_newline(markdown);
    tokio::fs::write(&tmp_path, content).await.map_err(fail)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(fail(e));
    }
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Doc2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(path, config))
}

/// Run header/footer detection and margin classification on a PDF without
/// changing anything.
///
/// Neither OCR nor the Markdown engine is invoked, and both detectors run
/// regardless of the removal toggles in `config`.
pub async fn inspect(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<CleaningReport, Doc2MdError> {
    let path = path.as_ref();
    let bytes = input::read_input(path).await?;
    expect_format(&bytes, &path.display().to_string(), DocumentFormat::Pdf)?;

    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        let backend = PdfiumBackend::new(config.password.clone());
        inspect_with(&backend, &bytes, &config)
    })
    .await
    .map_err(|e| Doc2MdError::Internal(format!("Inspection task failed: {e}")))?
}

/// Synchronous core of [`inspect`].
pub fn inspect_with(
    backend: &dyn PdfBackend,
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<CleaningReport, Doc2MdError> {
    let pages = backend.load(bytes)?;
    let decision = ocr::needs_ocr(&pages, &config.ocr);
    let analysis = analyse(&pages, config, true, true);
    Ok(analysis.report(&decision))
}

/// Convert PDF bytes synchronously through `backend`.
///
/// This is the whole PDF pipeline: OCR-need detection, optional OCR,
/// header/footer and annotation removal, the external Markdown engine and
/// post-processing. It blocks; async callers use [`convert_pdf_bytes`].
pub fn convert_pdf_with(
    backend: &dyn PdfBackend,
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    pdf_pipeline(backend, bytes, MEMORY_INPUT, config)
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn expect_format(bytes: &[u8], name: &str, expected: DocumentFormat) -> Result<(), Doc2MdError> {
    let found = input::detect_format(bytes, name)?;
    if found != expected {
        return Err(Doc2MdError::UnsupportedFormat {
            input: name.to_string(),
            detail: format!("expected a {expected} document, found {found}"),
        });
    }
    Ok(())
}

async fn run_blocking(
    bytes: Vec<u8>,
    name: String,
    format: DocumentFormat,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || match format {
        DocumentFormat::Pdf => {
            let backend = PdfiumBackend::new(config.password.clone());
            pdf_pipeline(&backend, &bytes, &name, &config)
        }
        DocumentFormat::Docx => docx_pipeline(&bytes, &name, &config),
    })
    .await
    .map_err(|e| Doc2MdError::Internal(format!("Conversion task failed: {e}")))?
}

fn pdf_pipeline(
    backend: &dyn PdfBackend,
    bytes: &[u8],
    name: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    let total_start = Instant::now();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_conversion_start(name, DocumentFormat::Pdf);
    }

    // ── Step 1: Extract text layer ───────────────────────────────────────
    report_stage(cb, Stage::Extracting);
    let mut pages = backend.load(bytes)?;
    let decision = ocr::needs_ocr(&pages, &config.ocr);
    info!(
        "{}: {}/{} pages carry text, OCR {}",
        name,
        decision.text_pages,
        decision.total_pages,
        if decision.required { "needed" } else { "not needed" }
    );
    if let Some(cb) = cb {
        cb.on_ocr_decision(decision.text_pages, decision.total_pages, decision.required);
    }

    // ── Step 2: OCR scanned documents ────────────────────────────────────
    let mut ocr_output: Option<Vec<u8>> = None;
    if decision.required {
        if config.ocr.enabled {
            report_stage(cb, Stage::Ocr);
            let engine = config.ocr_engine.as_ref();
            let ocred = ocr::run_ocr(engine, bytes, &config.ocr)?;
            pages = backend.load(&ocred)?;
            let text_pages = ocr::count_text_pages(&pages, config.ocr.min_chars);
            if text_pages == 0 {
                return Err(Doc2MdError::ocr(
                    engine.name(),
                    format!("no page has more than {} characters after OCR", config.ocr.min_chars),
                ));
            }
            info!("OCR added text to {}/{} pages", text_pages, pages.len());
            ocr_output = Some(ocred);
        } else {
            warn!("{}: looks scanned but OCR is disabled; using the existing text layer", name);
        }
    }
    let working: &[u8] = ocr_output.as_deref().unwrap_or(bytes);

    // ── Step 3: Find headers, footers and annotations ────────────────────
    report_stage(cb, Stage::Cleaning);
    let analysis = analyse(
        &pages,
        config,
        config.remove_headers_footers,
        config.remove_annotations,
    );
    let plan = analysis.plan();
    let removed_fragment_spans = plan.count(RedactionReason::RecurringFragment);
    let removed_annotation_spans = plan.count(RedactionReason::Handwriting);
    info!(
        "Redacting {} recurring-fragment spans and {} annotation spans",
        removed_fragment_spans, removed_annotation_spans
    );

    // ── Step 4: Redact ───────────────────────────────────────────────────
    let cleaned: Cow<'_, [u8]> = if plan.is_empty() {
        Cow::Borrowed(working)
    } else {
        Cow::Owned(backend.redact(working, &plan)?)
    };

    // ── Step 5: Render Markdown ──────────────────────────────────────────
    report_stage(cb, Stage::Rendering);
    let (raw, engine_duration_ms) = engine::render_markdown(config.markdown_engine.as_ref(), &cleaned)?;

    // ── Step 6: Post-process ─────────────────────────────────────────────
    report_stage(cb, Stage::PostProcessing);
    let processed = postprocess::clean_pdf_markdown(
        &raw,
        &config.rules,
        PostProcessOptions {
            remove_page_numbers: config.remove_page_numbers,
            merge_lines: config.merge_lines,
        },
    );

    // ── Step 7: Compute stats ────────────────────────────────────────────
    let report = config.include_report.then(|| analysis.report(&decision));
    let stats = ConversionStats {
        total_pages: decision.total_pages,
        text_pages: decision.text_pages,
        ocr_applied: ocr_output.is_some(),
        recurring_fragments: analysis.fragments.as_ref().map_or(0, RecurringFragments::len),
        removed_fragment_spans,
        removed_annotation_spans,
        removed_page_number_lines: processed.removed_page_number_lines,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        engine_duration_ms,
    };

    info!(
        "Conversion complete: {} pages, {} bytes of Markdown, {}ms total",
        stats.total_pages,
        processed.markdown.len(),
        stats.total_duration_ms
    );
    if let Some(cb) = cb {
        cb.on_conversion_complete(&stats);
    }

    Ok(ConversionOutput {
        markdown: processed.markdown,
        format: DocumentFormat::Pdf,
        stats,
        report,
    })
}

fn docx_pipeline(
    bytes: &[u8],
    name: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Doc2MdError> {
    let total_start = Instant::now();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_conversion_start(name, DocumentFormat::Docx);
    }

    report_stage(cb, Stage::DocxToHtml);
    let html = docx::docx_to_html(bytes)?;

    report_stage(cb, Stage::HtmlToMarkdown);
    let engine_start = Instant::now();
    let raw = docx::html_to_markdown(&html)?;
    let engine_duration_ms = engine_start.elapsed().as_millis() as u64;

    report_stage(cb, Stage::PostProcessing);
    let markdown = postprocess::clean_docx_markdown(&raw, &config.empty_header_placeholder);

    let stats = ConversionStats {
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        engine_duration_ms,
        ..ConversionStats::default()
    };
    info!(
        "Conversion complete: {} bytes of Markdown, {}ms total",
        markdown.len(),
        stats.total_duration_ms
    );
    if let Some(cb) = cb {
        cb.on_conversion_complete(&stats);
    }

    Ok(ConversionOutput {
        markdown,
        format: DocumentFormat::Docx,
        stats,
        report: None,
    })
}

/// Detector output for one document.
struct Analysis<'a> {
    pages: &'a [Page],
    fragments: Option<RecurringFragments>,
    classified: Vec<ClassifiedSpan<'a>>,
}

fn analyse<'a>(
    pages: &'a [Page],
    config: &ConversionConfig,
    fragments: bool,
    annotations: bool,
) -> Analysis<'a> {
    let fragments = fragments
        .then(|| detect_recurring(pages, config.band_ratio, config.recurrence_threshold));
    let classified = if annotations {
        pages
            .iter()
            .flat_map(|page| classify_page(page, &config.margins, &config.rules))
            .collect()
    } else {
        Vec::new()
    };
    Analysis {
        pages,
        fragments,
        classified,
    }
}

impl Analysis<'_> {
    fn plan(&self) -> RedactionPlan {
        build_plan(
            self.fragments.as_ref(),
            self.classified
                .iter()
                .map(|c| (c.span.page, c.span.index, &c.verdict)),
        )
    }

    fn report(&self, decision: &OcrDecision) -> CleaningReport {
        let recurring_fragments = self
            .fragments
            .iter()
            .flat_map(|f| f.iter())
            .map(|(key, pages)| FragmentReport {
                text: key.clone(),
                pages: pages.iter().map(|p| p + 1).collect(),
            })
            .collect();
        let margin_spans = self
            .classified
            .iter()
            .filter(|c| c.in_margin && !c.span.is_blank())
            .map(|c| SpanReport {
                page: c.span.page + 1,
                text: c.span.text.clone(),
                font: c.span.font.clone(),
                bbox: c.span.bbox,
                verdict: c.verdict.clone(),
            })
            .collect();
        CleaningReport {
            total_pages: self.pages.len(),
            text_pages: decision.text_pages,
            ocr_required: decision.required,
            recurring_fragments,
            margin_spans,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn footer_pages() -> Vec<Page> {
        (0..3)
            .map(|i| {
                let mut p = Page::new(i, 600.0, 800.0);
                p.push_span("Body text on this page", "Times", Rect::new(100.0, 300.0, 400.0, 312.0));
                p.push_span("ACME Corp", "Times", Rect::new(250.0, 770.0, 330.0, 780.0));
                p.push_span("note", "ComicMarker", Rect::new(5.0, 400.0, 40.0, 410.0));
                p
            })
            .collect()
    }

    #[test]
    fn analysis_honours_toggles() {
        let pages = footer_pages();
        let config = ConversionConfig::default();

        let none = analyse(&pages, &config, false, false);
        assert!(none.plan().is_empty());

        let only_fragments = analyse(&pages, &config, true, false);
        let plan = only_fragments.plan();
        assert_eq!(plan.count(RedactionReason::RecurringFragment), 3);
        assert_eq!(plan.count(RedactionReason::Handwriting), 0);

        let both = analyse(&pages, &config, true, true);
        assert_eq!(both.plan().count(RedactionReason::Handwriting), 3);
    }

    #[test]
    fn report_uses_one_based_pages() {
        let pages = footer_pages();
        let config = ConversionConfig::default();
        let analysis = analyse(&pages, &config, true, true);
        let decision = ocr::needs_ocr(&pages, &config.ocr);
        let report = analysis.report(&decision);

        assert_eq!(report.total_pages, 3);
        assert_eq!(report.recurring_fragments.len(), 1);
        assert_eq!(report.recurring_fragments[0].pages, vec![1, 2, 3]);
        assert!(report.margin_spans.iter().all(|s| s.page >= 1));
        assert!(report
            .margin_spans
            .iter()
            .any(|s| s.text == "note" && s.verdict.is_handwriting()));
    }

    #[test]
    fn expect_format_rejects_mismatch() {
        let err = expect_format(b"%PDF-1.4", "a.pdf", DocumentFormat::Docx).unwrap_err();
        assert!(matches!(err, Doc2MdError::UnsupportedFormat { .. }));
        assert!(err.to_string().contains("expected a DOCX"));
    }

    #[test]
    fn convert_sync_reports_missing_file() {
        let err = convert_sync("/nonexistent/umowa.pdf", &ConversionConfig::default()).unwrap_err();
        assert!(matches!(err, Doc2MdError::FileNotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn write_markdown_adds_final_newline() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("doc.md");
        write_markdown(&out, "# Title").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "# Title\n");
        assert!(!out.with_extension("md.tmp").exists());
    }
}
