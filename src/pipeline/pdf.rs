//! PDF access: text-layer extraction and destructive span removal.
//!
//! The pipeline talks to PDFs only through [`PdfBackend`]. The production
//! implementation, [`PdfiumBackend`], drives pdfium via `pdfium-render`;
//! tests substitute an in-memory fake.
//!
//! ## Span addressing
//!
//! Every text object on a page becomes one [`TextSpan`](crate::model::TextSpan),
//! blank ones included, in page-object order. A span's `index` is therefore
//! its ordinal among the page's text objects, and [`PdfiumBackend::redact`]
//! walks the objects in the same order to find it again.
//!
//! ## Threading
//!
//! pdfium keeps thread-local state and must not be driven from an async
//! worker. All methods here are blocking; callers run them inside
//! `tokio::task::spawn_blocking`.

use crate::error::Doc2MdError;
use crate::model::{Page, Rect};
use crate::pipeline::redact::RedactionPlan;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Reads and rewrites PDF documents.
pub trait PdfBackend: Send + Sync {
    /// Extract every page with its text spans and character count.
    fn load(&self, bytes: &[u8]) -> Result<Vec<Page>, Doc2MdError>;

    /// Return a copy of the document with the planned spans deleted.
    fn redact(&self, bytes: &[u8], plan: &RedactionPlan) -> Result<Vec<u8>, Doc2MdError>;
}

/// [`PdfBackend`] backed by the pdfium library.
///
/// The library is located (and downloaded on first use) by `pdfium-auto`;
/// set `PDFIUM_LIB_PATH` to use an existing copy.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    password: Option<String>,
}

impl PdfiumBackend {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }

    fn bind() -> Result<Pdfium, Doc2MdError> {
        pdfium_auto::bind_pdfium_silent()
            .map_err(|e| Doc2MdError::PdfiumBindingFailed(e.to_string()))
    }

    fn open<'a>(&'a self, pdfium: &'a Pdfium, bytes: &'a [u8]) -> Result<PdfDocument<'a>, Doc2MdError> {
        pdfium
            .load_pdf_from_byte_slice(bytes, self.password.as_deref())
            .map_err(|e| {
                let detail = format!("{:?}", e);
                if detail.to_lowercase().contains("password") {
                    if self.password.is_some() {
                        Doc2MdError::parse("incorrect password for encrypted PDF")
                    } else {
                        Doc2MdError::parse("PDF is password-protected; supply a password")
                    }
                } else {
                    Doc2MdError::parse(format!("cannot open PDF: {detail}"))
                }
            })
    }
}

impl PdfBackend for PdfiumBackend {
    fn load(&self, bytes: &[u8]) -> Result<Vec<Page>, Doc2MdError> {
        let pdfium = Self::bind()?;
        let document = self.open(&pdfium, bytes)?;

        let mut pages = Vec::new();
        for (idx, pdf_page) in document.pages().iter().enumerate() {
            let width = pdf_page.width().value;
            let height = pdf_page.height().value;
            let mut page = Page::new(idx, width, height);

            for object in pdf_page.objects().iter() {
                let Some(text_obj) = object.as_text_object() else {
                    continue;
                };
                let bbox = match object.bounds() {
                    // Flip from PDF bottom-left origin.
                    Ok(b) => Rect::new(
                        b.left().value,
                        height - b.top().value,
                        b.right().value,
                        height - b.bottom().value,
                    ),
                    Err(e) => {
                        debug!("Page {}: text object without bounds ({:?})", idx + 1, e);
                        page.bounds()
                    }
                };
                page.push_span(text_obj.text(), text_obj.font().name(), bbox);
            }

            // The text layer is the authority for OCR detection: it also
            // sees text drawn inside form objects.
            page.char_count = pdf_page
                .text()
                .map(|t| t.all().chars().filter(|c| !c.is_whitespace()).count())
                .unwrap_or(page.char_count);

            debug!(
                "Page {}: {} spans, {} chars",
                idx + 1,
                page.spans.len(),
                page.char_count
            );
            pages.push(page);
        }

        info!("PDF loaded: {} pages", pages.len());
        Ok(pages)
    }

    fn redact(&self, bytes: &[u8], plan: &RedactionPlan) -> Result<Vec<u8>, Doc2MdError> {
        if plan.is_empty() {
            return Ok(bytes.to_vec());
        }

        let pdfium = Self::bind()?;
        let document = self.open(&pdfium, bytes)?;

        for (idx, mut pdf_page) in document.pages().iter().enumerate() {
            let spans = plan.indices(idx);
            if spans.is_empty() {
                continue;
            }

            // Map span ordinals to object indices before touching anything.
            let object_indices: Vec<usize> = pdf_page
                .objects()
                .iter()
                .enumerate()
                .filter(|(_, o)| o.as_text_object().is_some())
                .map(|(i, _)| i)
                .enumerate()
                .filter(|(ordinal, _)| spans.binary_search(ordinal).is_ok())
                .map(|(_, i)| i)
                .collect();

            if object_indices.len() != spans.len() {
                return Err(Doc2MdError::parse(format!(
                    "page {}: redaction plan names {} spans but {} text objects matched",
                    idx + 1,
                    spans.len(),
                    object_indices.len()
                )));
            }

            // Highest index first so earlier indices stay valid.
            for i in object_indices.into_iter().rev() {
                pdf_page
                    .objects_mut()
                    .remove_object_at_index(i)
                    .map_err(|e| {
                        Doc2MdError::parse(format!("page {}: cannot remove object {i}: {e:?}", idx + 1))
                    })?;
            }
            pdf_page.regenerate_content().map_err(|e| {
                Doc2MdError::parse(format!("page {}: cannot rewrite content: {e:?}", idx + 1))
            })?;
            debug!("Page {}: removed {} spans", idx + 1, spans.len());
        }

        document
            .save_to_bytes()
            .map_err(|e| Doc2MdError::parse(format!("cannot save redacted PDF: {e:?}")))
    }
}
