//! Post-processing: deterministic cleanup of engine-generated Markdown.
//!
//! ## The engine convention
//!
//! The PDF → Markdown engine emits one paragraph per *source line*
//! (`\n\n` between lines) and a triple newline where the source had a real
//! paragraph break. Read literally, every wrapped line of a PDF paragraph
//! becomes its own paragraph. The merge pass undoes that: lines inside a
//! block are joined with a space unless they are Markdown structure.
//!
//! ## Rule order
//!
//! 0. Normalise line endings, trim trailing whitespace, drop invisible chars
//! 1. Strip page-number lines (with one following blank line)
//! 2. Unwrap fully-bold headings: `# **Title**` → `# Title`
//! 3. Merge broken lines into paragraphs
//!
//! Page numbers go first so a stray `7` is never glued onto a paragraph.
//! Every rule is idempotent, and so is the whole pass.
//!
//! DOCX output takes a separate, shorter route ([`clean_docx_markdown`]):
//! its paragraphs are already whole, only its headings and tables need
//! repair.

use crate::rules::CleaningRules;
use once_cell::sync::Lazy;
use regex::Regex;

/// Switches for the PDF post-processing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcessOptions {
    pub remove_page_numbers: bool,
    pub merge_lines: bool,
}

impl Default for PostProcessOptions {
    fn default() -> Self {
        Self {
            remove_page_numbers: true,
            merge_lines: true,
        }
    }
}

/// Result of [`clean_pdf_markdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessed {
    pub markdown: String,
    pub removed_page_number_lines: usize,
}

/// Apply all PDF post-processing rules to raw engine output.
///
/// The result is trimmed and carries no trailing newline.
pub fn clean_pdf_markdown(
    input: &str,
    rules: &CleaningRules,
    options: PostProcessOptions,
) -> PostProcessed {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = remove_invisible_chars(&s);

    let (s, removed) = if options.remove_page_numbers {
        strip_page_numbers(&s, rules)
    } else {
        (s, 0)
    };

    let s = normalise_bold_headings(&s);
    let (s, removed) = match (options.merge_lines, options.remove_page_numbers) {
        (true, true) => {
            // A label wrapped over two lines is only a whole line once merged.
            let (s, late) = strip_page_numbers(&merge_lines(&s), rules);
            (merge_lines(&s), removed + late)
        }
        (true, false) => (merge_lines(&s), removed),
        (false, _) => (s, removed),
    };

    PostProcessed {
        markdown: trim_document(&s),
        removed_page_number_lines: removed,
    }
}

/// Clean html2md output for a DOCX document.
///
/// `placeholder` names empty header cells; `{n}` becomes the 1-based column.
pub fn clean_docx_markdown(input: &str, placeholder: &str) -> String {
    let s = normalise_line_endings(input);
    let s = trim_trailing_whitespace(&s);
    let s = remove_invisible_chars(&s);
    let s = collapse_blank_lines(&s);
    let s = setext_to_atx(&s);
    let s = fix_broken_tables(&s);
    let s = fix_empty_table_headers(&s, placeholder);
    trim_document(&s)
}

// ── Rule 0: Normalisation ────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

/// Trim the document, keeping leading indentation of the first line.
fn trim_document(input: &str) -> String {
    input.trim_start_matches('\n').trim_end().to_string()
}

/// Ensure a file ends with exactly one newline.
pub fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Rule 1: Strip page numbers ───────────────────────────────────────────────

/// Drop lines that are nothing but a page number. A blank line directly
/// after a dropped line goes too, so no paragraph break is created.
///
/// Returns the text and the number of lines dropped.
pub fn strip_page_numbers(input: &str, rules: &CleaningRules) -> (String, usize) {
    let mut out: Vec<&str> = Vec::new();
    let mut fence = FenceTracker::default();
    let mut removed = 0;
    let mut skip_blank = false;

    for line in input.lines() {
        if fence.update(line) {
            skip_blank = false;
            out.push(line);
            continue;
        }
        if skip_blank && line.trim().is_empty() {
            skip_blank = false;
            continue;
        }
        skip_blank = false;
        if rules.is_page_number(line) {
            removed += 1;
            skip_blank = true;
            continue;
        }
        out.push(line);
    }
    (out.join("\n"), removed)
}

// ── Rule 2: Fully-bold headings ──────────────────────────────────────────────

static RE_BOLD_HEADING_STARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})[ \t]+\*\*(.+)\*\*$").unwrap());
static RE_BOLD_HEADING_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})[ \t]+__(.+)__$").unwrap());

/// `# **Title**` → `# Title` when the bold covers the whole heading.
///
/// `# **Part** one` and `# **a** and **b**` are left alone.
pub fn normalise_bold_headings(input: &str) -> String {
    let mut fence = FenceTracker::default();
    input
        .lines()
        .map(|line| {
            if fence.update(line) {
                return line.to_string();
            }
            unwrap_bold_heading(line).unwrap_or_else(|| line.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn unwrap_bold_heading(line: &str) -> Option<String> {
    for (re, marker) in [
        (&*RE_BOLD_HEADING_STARS, "**"),
        (&*RE_BOLD_HEADING_UNDERSCORES, "__"),
    ] {
        if let Some(caps) = re.captures(line) {
            let inner = caps[2].trim();
            if inner.is_empty() || inner.contains(marker) {
                return None;
            }
            return Some(format!("{} {}", &caps[1], inner));
        }
    }
    None
}

// ── Rule 3: Line merge ───────────────────────────────────────────────────────

/// Reflow wrapped lines into paragraphs.
///
/// Blocks are separated by two or more blank lines. Inside a block, prose
/// lines are joined with a space; structural lines (headings, table rows,
/// code, list items, thematic breaks, images) stay on their own. Wrapped
/// text after a list item is joined onto that item.
///
/// Units of a block are rejoined with one blank line (consecutive table
/// rows with a single newline), blocks with two.
pub fn merge_lines(input: &str) -> String {
    split_blocks(input)
        .iter()
        .map(|block| render_units(&block_units(block)))
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n\n")
}

/// Tracks fenced code so rules can leave its contents alone.
#[derive(Debug, Default)]
struct FenceTracker {
    open: Option<String>,
}

impl FenceTracker {
    /// Feed one line; `true` when the line is a fence or inside one.
    fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();
        match &self.open {
            Some(marker) => {
                // Closing fence: same character, at least as long, no info string.
                let closes = fence_marker(line)
                    .is_some_and(|run| run.starts_with(marker.as_str()) && trimmed.trim_end() == run);
                if closes {
                    self.open = None;
                }
                true
            }
            None => match fence_marker(line) {
                Some(marker) => {
                    self.open = Some(marker);
                    true
                }
                None => false,
            },
        }
    }

    fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

/// The opening fence marker (```` ``` ```` or `~~~`, possibly longer).
fn fence_marker(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    for ch in ['`', '~'] {
        let run = trimmed.chars().take_while(|c| *c == ch).count();
        if run < 3 {
            continue;
        }
        // A backtick info string may not contain backticks (inline code).
        if ch == '`' && trimmed[run..].contains('`') {
            return None;
        }
        return Some(ch.to_string().repeat(run));
    }
    None
}

fn split_blocks(input: &str) -> Vec<Vec<&str>> {
    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    let mut fence = FenceTracker::default();
    let mut blank_run = 0usize;

    for line in input.lines() {
        if !fence.is_open() && line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        let current = blocks.len() - 1;
        if blank_run >= 2 && !blocks[current].is_empty() {
            blocks.push(Vec::new());
        } else if blank_run == 1 && !blocks[current].is_empty() {
            blocks[current].push("");
        }
        blank_run = 0;
        fence.update(line);
        if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }
    blocks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitKind {
    Prose,
    ListItem,
    Table,
    Code,
    /// Heading, indented code, thematic break or image: one line, verbatim.
    Line,
}

#[derive(Debug, Clone)]
struct Unit {
    kind: UnitKind,
    text: String,
}

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}#{1,6}(?:[ \t]|$)").unwrap());
static RE_LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(?:[-*+]|\d{1,9}\.)[ \t]+\S").unwrap());
static RE_THEMATIC_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap());

fn is_indented_code(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}

fn block_units(lines: &[&str]) -> Vec<Unit> {
    let mut units: Vec<Unit> = Vec::new();
    let mut fence = FenceTracker::default();
    // A table row continues the previous unit only when no blank line
    // separates them.
    let mut prev_blank = true;

    for line in lines {
        if fence.is_open() {
            fence.update(line);
            if let Some(unit) = units.last_mut() {
                unit.text.push('\n');
                unit.text.push_str(line);
            }
            continue;
        }
        if line.trim().is_empty() {
            prev_blank = true;
            continue;
        }
        let was_blank = std::mem::replace(&mut prev_blank, false);

        if fence.update(line) {
            units.push(Unit {
                kind: UnitKind::Code,
                text: line.to_string(),
            });
            continue;
        }
        if is_indented_code(line) {
            units.push(Unit {
                kind: UnitKind::Line,
                text: line.to_string(),
            });
            continue;
        }
        let trimmed = line.trim();
        if trimmed.starts_with('|') {
            match units.last_mut() {
                Some(unit) if unit.kind == UnitKind::Table && !was_blank => {
                    unit.text.push('\n');
                    unit.text.push_str(trimmed);
                }
                _ => units.push(Unit {
                    kind: UnitKind::Table,
                    text: trimmed.to_string(),
                }),
            }
            continue;
        }
        if RE_HEADING.is_match(line) || RE_THEMATIC_BREAK.is_match(line) || trimmed.starts_with("![") {
            units.push(Unit {
                kind: UnitKind::Line,
                text: trimmed.to_string(),
            });
            continue;
        }
        if RE_LIST_ITEM.is_match(line) {
            units.push(Unit {
                kind: UnitKind::ListItem,
                text: trimmed.to_string(),
            });
            continue;
        }
        match units.last_mut() {
            Some(unit) if matches!(unit.kind, UnitKind::Prose | UnitKind::ListItem) => {
                unit.text.push(' ');
                unit.text.push_str(trimmed);
            }
            _ => units.push(Unit {
                kind: UnitKind::Prose,
                text: trimmed.to_string(),
            }),
        }
    }
    // An unclosed fence swallows the block's trailing blank lines.
    for unit in units.iter_mut().filter(|u| u.kind == UnitKind::Code) {
        let kept = unit.text.trim_end().len();
        unit.text.truncate(kept);
    }
    units
}

fn render_units(units: &[Unit]) -> String {
    units
        .iter()
        .map(|u| u.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── DOCX headings ────────────────────────────────────────────────────────────

/// `Title\n=====` → `# Title`, `Title\n-----` → `## Title`.
///
/// html2md underlines the top two heading levels; everything else in this
/// crate writes ATX headings.
fn setext_to_atx(input: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in input.lines() {
        let t = line.trim();
        let underline = t.len() >= 3 && (t.chars().all(|c| c == '=') || t.chars().all(|c| c == '-'));
        if underline {
            if let Some(prev) = out.last_mut() {
                let heading_text = !prev.trim().is_empty()
                    && !is_table_row(prev)
                    && !prev.trim_start().starts_with('#');
                if heading_text {
                    let marker = if t.starts_with('=') { "#" } else { "##" };
                    *prev = format!("{marker} {}", prev.trim());
                    continue;
                }
            }
        }
        out.push(line.to_string());
    }
    out.join("\n")
}

// ── DOCX tables ──────────────────────────────────────────────────────────────

/// Insert a separator row after the first row of any table lacking one.
fn fix_broken_tables(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut result = Vec::with_capacity(lines.len() + 4);

    for (i, line) in lines.iter().enumerate() {
        result.push(line.to_string());

        let starts_table = is_table_row(line)
            && !is_separator_row(line)
            && !i.checked_sub(1).is_some_and(|p| is_table_row(lines[p]));
        if !starts_table {
            continue;
        }
        let next = lines.get(i + 1).copied().unwrap_or("");
        if !is_separator_row(next) {
            let cols = split_cells(line).len().max(1);
            let sep: String = std::iter::once("|")
                .chain(std::iter::repeat_n(" --- |", cols))
                .collect();
            result.push(sep);
        }
    }

    result.join("\n")
}

/// Fill empty cells of every table header row with `placeholder`.
fn fix_empty_table_headers(input: &str, placeholder: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut result = Vec::with_capacity(lines.len());

    for (i, line) in lines.iter().enumerate() {
        let is_header = is_table_row(line)
            && !is_separator_row(line)
            && !i.checked_sub(1).is_some_and(|p| is_table_row(lines[p]))
            && lines.get(i + 1).is_some_and(|n| is_separator_row(n));

        let cells = split_cells(line);
        if !is_header || cells.iter().all(|c| !c.is_empty()) {
            result.push(line.to_string());
            continue;
        }
        let filled: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(col, cell)| {
                if cell.is_empty() {
                    placeholder.replace("{n}", &(col + 1).to_string())
                } else {
                    cell.to_string()
                }
            })
            .collect();
        result.push(format!("| {} |", filled.join(" | ")));
    }

    result.join("\n")
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() > 1
}

fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') || !trimmed.contains('-') {
        return false;
    }
    trimmed
        .chars()
        .all(|c| c == '|' || c == '-' || c == ':' || c == ' ')
}

/// Split a table row into trimmed cells, honouring `\|` escapes.
fn split_cells(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in inner.chars() {
        match ch {
            '|' if !escaped => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
        escaped = ch == '\\' && !escaped;
    }
    cells.push(current.trim().to_string());
    cells
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> CleaningRules {
        CleaningRules::default()
    }

    fn clean(input: &str) -> String {
        clean_pdf_markdown(input, &rules(), PostProcessOptions::default()).markdown
    }

    #[test]
    fn test_bold_heading_example() {
        assert_eq!(clean("# **Important Notice**\n\n"), "# Important Notice");
    }

    #[test]
    fn test_bold_heading_underscores() {
        assert_eq!(normalise_bold_headings("## __Scope__"), "## Scope");
    }

    #[test]
    fn test_partial_bold_heading_untouched() {
        for line in ["# **Part** one", "# **a** and **b**", "# Plain"] {
            assert_eq!(normalise_bold_headings(line), line);
        }
    }

    #[test]
    fn test_bold_heading_inside_fence_untouched() {
        let input = "```\n# **x**\n```";
        assert_eq!(normalise_bold_headings(input), input);
    }

    #[test]
    fn test_strip_page_numbers() {
        let input = "First line\n\n7\n\nsecond line\n\nStrona 3 z 10\n\nthird";
        let (out, removed) = strip_page_numbers(input, &rules());
        assert_eq!(out, "First line\n\nsecond line\n\nthird");
        assert_eq!(removed, 2);
    }

    #[test]
    fn test_page_number_removal_keeps_paragraphs_joined() {
        let input = "a sentence that wraps\n\n12\n\nonto the next page.";
        assert_eq!(clean(input), "a sentence that wraps onto the next page.");
    }

    #[test]
    fn test_page_number_inside_code_kept() {
        let input = "```\n42\n```";
        let (out, removed) = strip_page_numbers(input, &rules());
        assert_eq!(out, input);
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_body_line_mentioning_page_kept() {
        let input = "Strona 3 osób podpisała umowę.";
        assert_eq!(clean(input), input);
    }

    #[test]
    fn test_merge_joins_wrapped_lines() {
        let input = "The quick brown\n\nfox jumps over\n\nthe lazy dog.\n\n\nNext paragraph\n\ncontinues here.";
        assert_eq!(
            merge_lines(input),
            "The quick brown fox jumps over the lazy dog.\n\n\nNext paragraph continues here."
        );
    }

    #[test]
    fn test_merge_keeps_heading_separate() {
        let input = "# Title\n\nfirst line\n\nsecond line";
        assert_eq!(merge_lines(input), "# Title\n\nfirst line second line");
    }

    #[test]
    fn test_merge_keeps_table_rows() {
        let input = "Intro text\n\n| A | B |\n| --- | --- |\n| 1 | 2 |\n\nafter table";
        assert_eq!(
            merge_lines(input),
            "Intro text\n\n| A | B |\n| --- | --- |\n| 1 | 2 |\n\nafter table"
        );
    }

    #[test]
    fn test_merge_list_continuation() {
        let input = "- first item that\n\nwraps here\n\n- second item\n\n1. numbered\n\ncontinued";
        assert_eq!(
            merge_lines(input),
            "- first item that wraps here\n\n- second item\n\n1. numbered continued"
        );
    }

    #[test]
    fn test_merge_fenced_code_verbatim() {
        let input = "Before\n\n```rust\nfn main() {\n\n\n    println!();\n}\n```\n\nafter";
        let out = merge_lines(input);
        assert!(out.contains("```rust\nfn main() {\n\n\n    println!();\n}\n```"), "{out}");
        assert!(out.starts_with("Before\n\n```rust"));
        assert!(out.ends_with("```\n\nafter"));
    }

    #[test]
    fn test_merge_indented_code_and_breaks() {
        let input = "text\n\n    let x = 1;\n\n---\n\n![logo](logo.png)\n\nmore";
        assert_eq!(
            merge_lines(input),
            "text\n\n    let x = 1;\n\n---\n\n![logo](logo.png)\n\nmore"
        );
    }

    #[test]
    fn test_thematic_break_not_a_list() {
        assert_eq!(merge_lines("a\n\n* * *\n\nb"), "a\n\n* * *\n\nb");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let inputs = [
            "The quick brown\n\nfox jumps\n\n\n\n# Head\n\nline a\n\nline b\n\n- item\n\nwrap\n\n| a |\n| - |\n\n| b |",
            "```\ncode\n\n\nmore\n```\n\n\ntext\n\n    indented\n\nprose",
            "1. one\n\n2. two\n\n\nplain\n\n![img](x.png)\n\n***\n\nend",
            "```rust\n\n",
            "```\nunclosed\n\n\n\n",
            "* * *\nplain prose\nwraps\n```inline``` code\n\nafter\n\n",
            "",
        ];
        for input in inputs {
            let once = merge_lines(input);
            assert_eq!(merge_lines(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_backticks_in_info_string_are_not_a_fence() {
        assert_eq!(fence_marker("```inline``` code"), None);
        assert_eq!(fence_marker("```rust"), Some("```".to_string()));
        assert_eq!(fence_marker("~~~ a`b"), Some("~~~".to_string()));
        assert_eq!(
            merge_lines("```inline``` code\n\nwraps here\n\n\nnext\n\npara"),
            "```inline``` code wraps here\n\n\nnext para"
        );
    }

    #[test]
    fn test_unclosed_fence_drops_trailing_blanks() {
        assert_eq!(merge_lines("```rust\n\n"), "```rust");
        assert_eq!(merge_lines("text\n\n```\ncode\n\n\n"), "text\n\n```\ncode");
    }

    #[test]
    fn test_wrapped_page_label_removed_after_merge() {
        let out = clean_pdf_markdown("Strona\n\n3 z 10", &rules(), PostProcessOptions::default());
        assert_eq!(out.markdown, "");
        assert_eq!(out.removed_page_number_lines, 1);

        let input = "# Umowa\n\nPage\n\n4 of 9\n\n\nbody line\n\nwraps";
        let once = clean(input);
        assert_eq!(once, "# Umowa\n\n\nbody line wraps");
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn test_full_pass_is_idempotent() {
        let input = "# **Title**\r\n\r\nbody line one  \r\n\r\nbody line two\r\n\r\n- 3 -\r\n\r\n\r\n\r\nnext para\u{200B}\n\nStrona 2";
        let once = clean(input);
        assert_eq!(clean(&once), once);
        assert_eq!(once, "# Title\n\nbody line one body line two\n\n\nnext para");
    }

    #[test]
    fn test_options_disable_rules() {
        let options = PostProcessOptions {
            remove_page_numbers: false,
            merge_lines: false,
        };
        let out = clean_pdf_markdown("line\n\n7\n\nline", &rules(), options);
        assert_eq!(out.markdown, "line\n\n7\n\nline");
        assert_eq!(out.removed_page_number_lines, 0);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("hello"), "hello\n");
        assert_eq!(ensure_final_newline("hello\n\n\n"), "hello\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn test_fix_broken_table() {
        let input = "| A | B |\n| 1 | 2 |\n| 3 | 4 |";
        let result = fix_broken_tables(input);
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(is_separator_row(lines[1]));
        assert!(!is_separator_row(lines[3]));
    }

    #[test]
    fn test_table_with_separator_unchanged() {
        let input = "| A | B |\n| --- | --- |\n| 1 | 2 |";
        assert_eq!(fix_broken_tables(input), input);
    }

    #[test]
    fn test_empty_headers_get_placeholder() {
        let input = "|  | Name |  |\n|---|---|---|\n| 1 | Jan | x |";
        let out = fix_empty_table_headers(input, "Column {n}");
        assert_eq!(
            out.lines().next(),
            Some("| Column 1 | Name | Column 3 |")
        );
        assert!(out.ends_with("| 1 | Jan | x |"));
    }

    #[test]
    fn test_body_rows_with_empty_cells_untouched() {
        let input = "| A | B |\n|---|---|\n|  | 2 |";
        assert_eq!(fix_empty_table_headers(input, "Column {n}"), input);
    }

    #[test]
    fn test_split_cells_respects_escapes() {
        assert_eq!(split_cells(r"| a \| b | c |"), vec![r"a \| b", "c"]);
    }

    #[test]
    fn test_setext_headings_become_atx() {
        let input = "Umowa\n==========\n\nStrony\n----------\n\nTreść\n\n---";
        assert_eq!(
            setext_to_atx(input),
            "# Umowa\n\n## Strony\n\nTreść\n\n---"
        );
    }

    #[test]
    fn test_clean_docx_markdown() {
        let input = "# Tytuł\r\n\r\n\r\n\r\n\r\n|  |  |\r\n| a | b |\r\n";
        let out = clean_docx_markdown(input, "Column {n}");
        assert_eq!(
            out,
            "# Tytuł\n\n\n| Column 1 | Column 2 |\n| --- | --- |\n| a | b |"
        );
    }
}
