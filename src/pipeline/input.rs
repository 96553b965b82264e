//! Input resolution: read a local document and identify its format.
//!
//! The format is decided by content, never by file extension: a PDF starts
//! with `%PDF`, a DOCX is a zip package holding `word/document.xml`.
//! Anything else is rejected before any parser sees it.

use crate::error::Doc2MdError;
use crate::output::DocumentFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Read a local file, mapping I/O failures onto input errors.
pub async fn read_input(path: &Path) -> Result<Vec<u8>, Doc2MdError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) => Err(map_read_error(path.to_path_buf(), e)),
    }
}

fn map_read_error(path: PathBuf, e: std::io::Error) -> Doc2MdError {
    match e.kind() {
        std::io::ErrorKind::NotFound => Doc2MdError::FileNotFound { path },
        std::io::ErrorKind::PermissionDenied => Doc2MdError::PermissionDenied { path },
        _ => Doc2MdError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    }
}

/// Identify the document format from its bytes.
///
/// `input` names the document in error messages.
pub fn detect_format(bytes: &[u8], input: &str) -> Result<DocumentFormat, Doc2MdError> {
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(DocumentFormat::Pdf);
    }
    if bytes.starts_with(ZIP_MAGIC) {
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
            Doc2MdError::UnsupportedFormat {
                input: input.to_string(),
                detail: format!("unreadable zip package: {e}"),
            }
        })?;
        if archive.file_names().any(|n| n == "word/document.xml") {
            return Ok(DocumentFormat::Docx);
        }
        return Err(Doc2MdError::UnsupportedFormat {
            input: input.to_string(),
            detail: "zip package without word/document.xml (not a DOCX)".into(),
        });
    }
    let head: String = bytes
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ");
    Err(Doc2MdError::UnsupportedFormat {
        input: input.to_string(),
        detail: if bytes.is_empty() {
            "file is empty".into()
        } else {
            format!("not a PDF or DOCX (starts with {head})")
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(name: &str) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            zip.start_file(name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_pdf_magic() {
        assert_eq!(
            detect_format(b"%PDF-1.7\n...", "a.pdf").unwrap(),
            DocumentFormat::Pdf
        );
    }

    #[test]
    fn test_docx_package() {
        let bytes = zip_with("word/document.xml");
        assert_eq!(detect_format(&bytes, "a.docx").unwrap(), DocumentFormat::Docx);
    }

    #[test]
    fn test_other_zip_rejected() {
        let bytes = zip_with("xl/workbook.xml");
        let err = detect_format(&bytes, "a.xlsx").unwrap_err();
        assert!(matches!(err, Doc2MdError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_text_rejected() {
        let err = detect_format(b"hello world", "notes.txt").unwrap_err();
        assert!(err.to_string().contains("notes.txt"));
        assert!(matches!(err, Doc2MdError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_empty_rejected() {
        let err = detect_format(b"", "empty.pdf").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = read_input(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2MdError::FileNotFound { .. }));
    }
}
