//! External PDF → Markdown engine.
//!
//! The cleaned PDF is handed to an engine that knows about reading order,
//! tables and headings. Its output follows a known convention: every source
//! line becomes its own paragraph (`\n\n`) and a real paragraph break is a
//! triple newline. The post-processor relies on that convention.

use crate::error::Doc2MdError;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Instant;
use tracing::{debug, info};

/// Converts a PDF file to raw Markdown.
pub trait MarkdownEngine: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    fn pdf_to_markdown(&self, pdf: &Path) -> Result<String, Doc2MdError>;
}

const PYMUPDF4LLM_SCRIPT: &str =
    "import sys, pymupdf4llm; sys.stdout.write(pymupdf4llm.to_markdown(sys.argv[1]))";

/// Runs `pymupdf4llm` through a Python interpreter.
///
/// The command is `<program> <args…> <pdf path>` and must print the Markdown
/// on stdout as UTF-8.
#[derive(Debug, Clone)]
pub struct Pymupdf4llmEngine {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for Pymupdf4llmEngine {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["-c".to_string(), PYMUPDF4LLM_SCRIPT.to_string()],
        }
    }
}

impl Pymupdf4llmEngine {
    /// Use a custom command; the PDF path is appended as the last argument.
    pub fn command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl MarkdownEngine for Pymupdf4llmEngine {
    fn name(&self) -> &str {
        "pymupdf4llm"
    }

    fn pdf_to_markdown(&self, pdf: &Path) -> Result<String, Doc2MdError> {
        debug!("Running {} on {}", self.program, pdf.display());
        let out = Command::new(&self.program)
            .args(&self.args)
            .arg(pdf)
            .output()
            .map_err(|e| {
                Doc2MdError::conversion(self.name(), format!("cannot start '{}': {e}", self.program))
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let tail = stderr.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(Doc2MdError::conversion(
                self.name(),
                format!("{}: {}", out.status, tail.trim()),
            ));
        }

        String::from_utf8(out.stdout)
            .map_err(|e| Doc2MdError::conversion(self.name(), format!("output is not UTF-8: {e}")))
    }
}

/// Write `bytes` to a temporary PDF and run `engine` on it.
///
/// Returns the Markdown and the engine wall time in milliseconds. The
/// temporary file is removed on every path.
pub fn render_markdown(
    engine: &dyn MarkdownEngine,
    bytes: &[u8],
) -> Result<(String, u64), Doc2MdError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("doc2md-clean-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|e| Doc2MdError::Internal(format!("Failed to create temp file: {e}")))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| Doc2MdError::Internal(format!("Failed to write temp file: {e}")))?;

    let start = Instant::now();
    let markdown = engine.pdf_to_markdown(tmp.path())?;
    let elapsed = start.elapsed().as_millis() as u64;
    info!(
        "{} produced {} bytes of Markdown in {}ms",
        engine.name(),
        markdown.len(),
        elapsed
    );
    Ok((markdown, elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Option<Vec<u8>>>,
    }

    impl MarkdownEngine for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn pdf_to_markdown(&self, pdf: &Path) -> Result<String, Doc2MdError> {
            *self.seen.lock().unwrap() = Some(std::fs::read(pdf).unwrap());
            Ok("# Title".to_string())
        }
    }

    #[test]
    fn engine_sees_exact_bytes() {
        let engine = Recording {
            seen: Mutex::new(None),
        };
        let (md, _) = render_markdown(&engine, b"%PDF-1.7 cleaned").unwrap();
        assert_eq!(md, "# Title");
        assert_eq!(
            engine.seen.lock().unwrap().as_deref(),
            Some(&b"%PDF-1.7 cleaned"[..])
        );
    }

    #[test]
    fn missing_interpreter_is_conversion_failure() {
        let engine = Pymupdf4llmEngine::command("doc2md-no-such-python", Vec::new());
        let err = render_markdown(&engine, b"%PDF").unwrap_err();
        assert!(
            matches!(err, Doc2MdError::ConversionFailure { ref engine, .. } if engine == "pymupdf4llm"),
            "got {err:?}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn command_stdout_is_the_markdown() {
        let engine = Pymupdf4llmEngine::command(
            "sh",
            vec!["-c".into(), "printf 'line one\\n\\nline two'".into(), "sh".into()],
        );
        let (md, _) = render_markdown(&engine, b"%PDF").unwrap();
        assert_eq!(md, "line one\n\nline two");
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_reports_stderr() {
        let engine = Pymupdf4llmEngine::command(
            "sh",
            vec!["-c".into(), "echo 'ModuleNotFoundError: pymupdf4llm' >&2; exit 1".into(), "sh".into()],
        );
        let err = render_markdown(&engine, b"%PDF").unwrap_err();
        assert!(err.to_string().contains("ModuleNotFoundError"), "got {err}");
    }
}
