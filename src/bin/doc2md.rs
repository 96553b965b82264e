//! CLI binary for doc2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use doc2md::{
    convert, inspect, write_markdown, CleaningReport, ConversionConfig,
    ConversionProgressCallback, ConversionStats, DocumentFormat, OcrMyPdf, ProgressCallback,
    Pymupdf4llmEngine, RuleTables, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one spinner per document whose message
/// follows the pipeline stage. The OCR stage can take minutes on a long
/// scan, so the spinner shows elapsed time.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn spinner(prefix: String) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix(prefix);
        bar.set_message("opening…");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, input: &str, format: DocumentFormat) {
        let name = Path::new(input)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.to_string());
        let bar = Self::spinner(name.clone());
        bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {name} ({format})"))
        ));
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_stage(&self, stage: Stage) {
        self.with_bar(|bar| bar.set_message(format!("{stage}…")));
    }

    fn on_ocr_decision(&self, text_pages: usize, total_pages: usize, required: bool) {
        self.with_bar(|bar| {
            let verdict = if required {
                cyan("scanned, OCR needed")
            } else {
                green("text layer present")
            };
            bar.println(format!(
                "  {} {}/{} pages carry text  {}",
                dim("•"),
                text_pages,
                total_pages,
                verdict
            ));
        });
    }

    fn on_conversion_complete(&self, stats: &ConversionStats) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
        eprintln!(
            "  {} {}",
            green("✓"),
            dim(&format!(
                "{} footer spans, {} margin notes, {} page numbers removed  {:.1}s",
                stats.removed_fragment_spans,
                stats.removed_annotation_spans,
                stats.removed_page_number_lines,
                stats.total_duration_ms as f64 / 1000.0
            ))
        );
    }
}

impl CliProgressCallback {
    /// Drop a spinner left behind by a failed conversion.
    fn abandon(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout)
  doc2md umowa.pdf

  # Convert to file
  doc2md umowa.pdf -o umowa.md

  # Batch conversion into a directory (one <stem>.md per input)
  doc2md scans/*.pdf reports/*.docx --output-dir markdown/

  # German scans, keep page numbers
  doc2md --ocr-languages deu+eng --keep-page-numbers scan.pdf

  # See what would be removed, without converting
  doc2md --inspect-only --json umowa.pdf

  # Custom locale tables
  doc2md --rules rules-de.json vertrag.pdf -o vertrag.md

EXTERNAL TOOLS:
  pdfium       text extraction and redaction (downloaded automatically)
  ocrmypdf     OCR for scanned PDFs        (override: --ocr-command)
  pymupdf4llm  PDF → Markdown via python3  (override: --engine-command)
  DOCX files need none of these.

ENVIRONMENT VARIABLES:
  DOC2MD_*                Every flag has one, e.g. DOC2MD_OCR_LANGUAGES
  RUST_LOG                Override log filtering (e.g. doc2md=debug)
  PDFIUM_LIB_PATH         Path to an existing libpdfium — skips auto-download
  PDFIUM_AUTO_CACHE_DIR   Override the default pdfium cache directory

RULES FILE (JSON, missing keys keep the built-in Polish/English tables):
  {
    "handwriting_keywords": ["hand", "script", "comic"],
    "content_patterns": ["\\b\\d{1,2}\\.\\d{1,2}\\.\\d{4}\\b"],
    "page_number_patterns": ["^(?i)seite\\s*\\d+$"]
  }
"#;

/// Convert PDF and DOCX documents to clean Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "doc2md",
    version,
    about = "Convert PDF and DOCX documents to clean Markdown",
    long_about = "Convert PDF and DOCX documents to Markdown. Recurring headers and footers, \
page numbers and handwritten margin notes are removed from PDFs before conversion; scanned \
PDFs are OCR'd first; broken lines are reflowed into paragraphs.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or DOCX files to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write Markdown to this file instead of stdout (single input only).
    #[arg(short, long, env = "DOC2MD_OUTPUT", conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Write `<stem>.md` for every input into this directory.
    #[arg(long, env = "DOC2MD_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Never run OCR, even on scanned PDFs.
    #[arg(long, env = "DOC2MD_NO_OCR")]
    no_ocr: bool,

    /// Tesseract languages for OCR.
    #[arg(long, env = "DOC2MD_OCR_LANGUAGES", default_value = "pol+eng")]
    ocr_languages: String,

    /// ocrmypdf executable.
    #[arg(long, env = "DOC2MD_OCR_COMMAND")]
    ocr_command: Option<String>,

    /// Command converting a PDF to Markdown on stdout; the PDF path is appended.
    #[arg(
        long,
        env = "DOC2MD_ENGINE_COMMAND",
        long_help = "Command converting a PDF to Markdown on stdout. Split on whitespace; \
the PDF path is appended as the last argument. Default: python3 running pymupdf4llm."
    )]
    engine_command: Option<String>,

    /// Keep recurring headers and footers.
    #[arg(long, env = "DOC2MD_KEEP_HEADERS")]
    keep_headers: bool,

    /// Keep handwritten margin annotations.
    #[arg(long, env = "DOC2MD_KEEP_ANNOTATIONS")]
    keep_annotations: bool,

    /// Keep page-number lines.
    #[arg(long, env = "DOC2MD_KEEP_PAGE_NUMBERS")]
    keep_page_numbers: bool,

    /// Do not reflow broken lines into paragraphs.
    #[arg(long, env = "DOC2MD_NO_MERGE")]
    no_merge: bool,

    /// JSON file replacing the handwriting/content/page-number tables.
    #[arg(long, env = "DOC2MD_RULES")]
    rules: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOC2MD_PASSWORD")]
    password: Option<String>,

    /// Output structured JSON (ConversionOutput) on stdout instead of Markdown.
    #[arg(long, env = "DOC2MD_JSON", conflicts_with_all = ["output", "output_dir"])]
    json: bool,

    /// Report detected headers, footers and margin notes; do not convert.
    #[arg(long, env = "DOC2MD_INSPECT_ONLY")]
    inspect_only: bool,

    /// Disable progress spinner.
    #[arg(long, env = "DOC2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active;
    // the spinner provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.output.is_some() && cli.inputs.len() > 1 {
        anyhow::bail!("--output takes a single input; use --output-dir for several files");
    }
    let to_stdout = cli.output.is_none() && cli.output_dir.is_none();
    if to_stdout && !cli.json && !cli.inspect_only && cli.inputs.len() > 1 {
        anyhow::bail!("several inputs need --output-dir (stdout takes a single document)");
    }

    // ── Ensure PDFium engine is available ───────────────────────────────────
    // On the very first run doc2md downloads the library (~30 MB) from
    // bblanchon/pdfium-binaries into the pdfium-auto cache. Subsequent
    // startups skip this block entirely (instant path check only).
    // DOCX-only runs never need it.
    let needs_pdfium = cli.inputs.iter().any(|p| !has_extension(p, "docx"));
    if needs_pdfium && !pdfium_auto::is_pdfium_cached() {
        ensure_pdfium(cli.quiet)?;
    }

    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(&cli, progress.clone())?;

    // ── Convert every input ──────────────────────────────────────────────
    let mut failed = 0usize;
    for input in &cli.inputs {
        let result = if cli.inspect_only {
            run_inspect(&cli, input, &config).await
        } else {
            run_convert(&cli, input, &config).await
        };
        if let Err(e) = result {
            if let Some(ref cb) = progress {
                cb.abandon();
            }
            failed += 1;
            eprintln!("{} {}: {:#}", red("✘"), bold(&input.display().to_string()), e);
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} inputs failed", failed, cli.inputs.len());
    }
    if !cli.quiet && cli.inputs.len() > 1 {
        eprintln!("{} {} documents converted", green("✔"), bold(&cli.inputs.len().to_string()));
    }
    Ok(())
}

async fn run_convert(cli: &Cli, input: &Path, config: &ConversionConfig) -> Result<()> {
    let output = convert(input, config).await.context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let target = match (&cli.output, &cli.output_dir) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) => Some(dir.join(markdown_name(input))),
        (None, None) => None,
    };

    match target {
        Some(path) => {
            write_markdown(&path, &output.markdown).await?;
            if !cli.quiet {
                eprintln!(
                    "{}  {}  {}ms  →  {}",
                    green("✔"),
                    input.display(),
                    output.stats.total_duration_ms,
                    bold(&path.display().to_string()),
                );
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.markdown.as_bytes())
                .context("Failed to write to stdout")?;
            // Ensure a trailing newline on stdout.
            if !output.markdown.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
    }
    Ok(())
}

async fn run_inspect(cli: &Cli, input: &Path, config: &ConversionConfig) -> Result<()> {
    let report = inspect(input, config).await.context("Failed to inspect PDF")?;
    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else {
        print_report(input, &report);
    }
    Ok(())
}

fn print_report(input: &Path, report: &CleaningReport) {
    println!("File:         {}", input.display());
    println!("Pages:        {}", report.total_pages);
    println!("Text pages:   {}", report.text_pages);
    println!("OCR required: {}", report.ocr_required);
    println!("Recurring header/footer fragments: {}", report.recurring_fragments.len());
    for fragment in &report.recurring_fragments {
        let pages: Vec<String> = fragment.pages.iter().map(|p| p.to_string()).collect();
        println!("  {:?}  pages {}", fragment.text.as_str(), pages.join(","));
    }
    println!("Margin spans: {}", report.margin_spans.len());
    for span in &report.margin_spans {
        let verdict = serde_json::to_string(&span.verdict).unwrap_or_default();
        println!(
            "  p{:<3} {:<24} {:?}  {}",
            span.page,
            span.font,
            span.text,
            dim(&verdict)
        );
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .ocr_enabled(!cli.no_ocr)
        .ocr_languages(cli.ocr_languages.clone())
        .remove_headers_footers(!cli.keep_headers)
        .remove_annotations(!cli.keep_annotations)
        .remove_page_numbers(!cli.keep_page_numbers)
        .merge_lines(!cli.no_merge);

    if let Some(ref path) = cli.rules {
        let tables = RuleTables::from_json_file(path)
            .with_context(|| format!("Failed to load rules from {:?}", path))?;
        builder = builder.rule_tables(tables);
    }
    if let Some(ref program) = cli.ocr_command {
        builder = builder.ocr_engine(Arc::new(OcrMyPdf::with_program(program.clone())));
    }
    if let Some(ref command) = cli.engine_command {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .context("--engine-command must name a program")?;
        builder = builder.markdown_engine(Arc::new(Pymupdf4llmEngine::command(
            program,
            parts.collect(),
        )));
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb as ProgressCallback);
    }

    builder.build().context("Invalid configuration")
}

fn ensure_pdfium(quiet: bool) -> Result<()> {
    if quiet {
        // Quiet mode — download silently; errors still propagate.
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.set_message("Connecting…");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    // block_in_place keeps the reference lifetime valid (no 'static
    // requirement) while still offloading the blocking download from
    // the async executor's hot path.
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

/// `scans/umowa.pdf` → `umowa.md`.
fn markdown_name(input: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "document".into());
    name.push(".md");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_name_replaces_extension() {
        assert_eq!(markdown_name(Path::new("scans/umowa.pdf")), PathBuf::from("umowa.md"));
        assert_eq!(markdown_name(Path::new("report.v2.docx")), PathBuf::from("report.v2.md"));
    }

    #[test]
    fn dotted_stems_get_distinct_outputs() {
        let v1 = markdown_name(Path::new("in/report.v1.pdf"));
        let v2 = markdown_name(Path::new("in/report.v2.pdf"));
        assert_ne!(v1, v2);
        assert_eq!(markdown_name(Path::new("README")), PathBuf::from("README.md"));
    }

    #[test]
    fn docx_inputs_skip_pdfium() {
        assert!(has_extension(Path::new("a.DOCX"), "docx"));
        assert!(!has_extension(Path::new("a.pdf"), "docx"));
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "doc2md",
            "--no-ocr",
            "--keep-headers",
            "--no-merge",
            "--ocr-languages",
            "deu+eng",
            "--engine-command",
            "python3 /opt/to_md.py",
            "a.pdf",
        ]);
        let config = build_config(&cli, None).unwrap();
        assert!(!config.ocr.enabled);
        assert_eq!(config.ocr.languages, "deu+eng");
        assert!(!config.remove_headers_footers);
        assert!(config.remove_annotations);
        assert!(!config.merge_lines);
        assert!(config.remove_page_numbers);
    }

    #[test]
    fn json_conflicts_with_output() {
        let res = Cli::try_parse_from(["doc2md", "--json", "-o", "x.md", "a.pdf"]);
        assert!(res.is_err());
    }
}
