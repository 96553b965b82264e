//! Pipeline stages for document-to-Markdown conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different PDF backend or OCR tool) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! PDF:   input ──▶ pdf ──▶ ocr? ──▶ fragments ─┬─▶ redact ──▶ engine ──▶ postprocess
//!                                  annotations ┘
//! DOCX:  input ──▶ docx (→ HTML → Markdown) ──▶ postprocess (tables)
//! ```
//!
//! 1. [`input`] — read the file, detect PDF vs. DOCX from magic bytes
//! 2. [`pdf`] — extract spans, fonts and boxes; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`ocr`] — detect scans and add a text layer via `ocrmypdf`
//! 4. [`fragments`] — find headers/footers recurring across pages
//! 5. [`annotations`] — classify margin spans as handwriting or content
//! 6. [`redact`] — plan span removal; the backend rewrites the PDF
//! 7. [`engine`] — external PDF → Markdown conversion
//! 8. [`postprocess`] — page numbers, bold headings, paragraph reflow
//! 9. [`docx`] — WordprocessingML → HTML → Markdown

pub mod annotations;
pub mod docx;
pub mod engine;
pub mod fragments;
pub mod input;
pub mod ocr;
pub mod pdf;
pub mod postprocess;
pub mod redact;
