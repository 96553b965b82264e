//! DOCX → HTML → Markdown.
//!
//! A DOCX file is a zip package of WordprocessingML parts. This module reads
//! `word/document.xml` with help from `styles.xml` (heading levels) and
//! `numbering.xml` (bullet vs. numbered lists) and emits plain semantic
//! HTML: headings, paragraphs with bold/italic runs, nested lists and
//! tables. Images, drawings and text boxes are skipped. The HTML is then
//! handed to `html2md`.

use crate::error::Doc2MdError;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

/// Convert DOCX bytes to an HTML fragment.
pub fn docx_to_html(bytes: &[u8]) -> Result<String, Doc2MdError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Doc2MdError::parse(format!("invalid DOCX package: {e}")))?;

    let document = read_part(&mut archive, "word/document.xml")?
        .ok_or_else(|| Doc2MdError::parse("DOCX package has no word/document.xml"))?;
    let styles = match read_part(&mut archive, "word/styles.xml")? {
        Some(xml) => parse_styles(&xml)?,
        None => Styles::default(),
    };
    let numbering = match read_part(&mut archive, "word/numbering.xml")? {
        Some(xml) => parse_numbering(&xml)?,
        None => Numbering::default(),
    };

    let blocks = walk_body(&document, &styles, &numbering)?;
    debug!("DOCX body: {} blocks", blocks.len());
    Ok(render_html(&blocks))
}

/// Convert HTML to Markdown with `html2md`.
pub fn html_to_markdown(html: &str) -> Result<String, Doc2MdError> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| html2md::parse_html(html)))
        .map_err(|_| Doc2MdError::conversion("html2md", "HTML to Markdown conversion panicked"))
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<String>, Doc2MdError> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(Doc2MdError::parse(format!("cannot open {name}: {e}"))),
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| Doc2MdError::parse(format!("cannot read {name}: {e}")))?;
    Ok(Some(xml))
}

// ── XML helpers ──────────────────────────────────────────────────────────────

/// Attribute value by local name (`w:val` → `val`).
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// `true` unless `w:val` switches the property off (`0`, `false`, `none`).
fn toggle_on(e: &BytesStart<'_>) -> bool {
    !matches!(attr(e, b"val").as_deref(), Some("0" | "false" | "none"))
}

fn xml_error(part: &str, e: quick_xml::Error) -> Doc2MdError {
    Doc2MdError::parse(format!("malformed {part}: {e}"))
}

// ── styles.xml ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Styles {
    /// styleId → heading level (1–6).
    headings: HashMap<String, usize>,
}

static RE_HEADING_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^heading\s*(\d)$").unwrap());
static RE_HEADING_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:heading|nagwek|naglowek)(\d)$").unwrap());

impl Styles {
    fn heading_level(&self, style_id: &str) -> Option<usize> {
        if let Some(level) = self.headings.get(style_id) {
            return Some(*level);
        }
        RE_HEADING_ID
            .captures(style_id)
            .and_then(|c| c[1].parse::<usize>().ok())
            .filter(|l| *l >= 1)
            .map(|l| l.min(6))
    }
}

fn heading_from_name(name: &str) -> Option<usize> {
    let name = name.trim().to_lowercase();
    if name == "title" {
        return Some(1);
    }
    RE_HEADING_NAME
        .captures(&name)
        .and_then(|c| c[1].parse::<usize>().ok())
        .filter(|l| *l >= 1)
        .map(|l| l.min(6))
}

fn parse_styles(xml: &str) -> Result<Styles, Doc2MdError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut styles = Styles::default();
    let mut current: Option<(String, Option<usize>)> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"style" => {
                current = attr(&e, b"styleId").map(|id| (id, None));
            }
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"name" => {
                    if let (Some((_, level)), Some(name)) = (current.as_mut(), attr(&e, b"val")) {
                        *level = level.or(heading_from_name(&name));
                    }
                }
                b"outlineLvl" => {
                    let lvl = attr(&e, b"val").and_then(|v| v.parse::<usize>().ok());
                    if let (Some((_, level)), Some(lvl)) = (current.as_mut(), lvl) {
                        if lvl < 6 {
                            *level = level.or(Some(lvl + 1));
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"style" => {
                if let Some((id, Some(level))) = current.take() {
                    styles.headings.insert(id, level);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("styles.xml", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(styles)
}

// ── numbering.xml ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Numbering {
    /// numId → abstractNumId
    nums: HashMap<String, String>,
    /// (abstractNumId, ilvl) → numFmt
    formats: HashMap<(String, usize), String>,
}

impl Numbering {
    fn is_ordered(&self, num_id: &str, ilvl: usize) -> bool {
        self.nums
            .get(num_id)
            .and_then(|abs| self.formats.get(&(abs.clone(), ilvl)))
            .is_some_and(|fmt| fmt != "bullet" && fmt != "none")
    }
}

fn parse_numbering(xml: &str) -> Result<Numbering, Doc2MdError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut numbering = Numbering::default();
    let mut abstract_id: Option<String> = None;
    let mut level: Option<usize> = None;
    let mut num_id: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"abstractNum" => abstract_id = attr(&e, b"abstractNumId"),
                b"lvl" => level = attr(&e, b"ilvl").and_then(|v| v.parse().ok()),
                b"num" => num_id = attr(&e, b"numId"),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"numFmt" => {
                    if let (Some(abs), Some(lvl), Some(fmt)) =
                        (abstract_id.as_ref(), level, attr(&e, b"val"))
                    {
                        numbering.formats.insert((abs.clone(), lvl), fmt);
                    }
                }
                b"abstractNumId" => {
                    if let (Some(num), Some(abs)) = (num_id.as_ref(), attr(&e, b"val")) {
                        numbering.nums.insert(num.clone(), abs);
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"abstractNum" => abstract_id = None,
                b"lvl" => level = None,
                b"num" => num_id = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("numbering.xml", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(numbering)
}

// ── document.xml ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text {
        text: String,
        bold: bool,
        italic: bool,
    },
    Break,
}

#[derive(Debug, Default)]
struct Paragraph {
    style_id: Option<String>,
    outline_level: Option<usize>,
    num_id: Option<String>,
    ilvl: usize,
    segments: Vec<Segment>,
}

impl Paragraph {
    fn push_text(&mut self, text: &str, bold: bool, italic: bool) {
        if let Some(Segment::Text {
            text: last,
            bold: b,
            italic: i,
        }) = self.segments.last_mut()
        {
            if *b == bold && *i == italic {
                last.push_str(text);
                return;
            }
        }
        self.segments.push(Segment::Text {
            text: text.to_string(),
            bold,
            italic,
        });
    }

    fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Text { text, .. } => text.as_str(),
                Segment::Break => " ",
            })
            .collect::<String>()
            .trim()
            .to_string()
    }

    fn is_empty(&self) -> bool {
        self.plain_text().is_empty()
    }

    fn inline_html(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Break => out.push_str("<br>"),
                Segment::Text { text, bold, italic } => {
                    let core = text.trim();
                    if core.is_empty() {
                        out.push_str(&escape(text));
                        continue;
                    }
                    let lead = &text[..text.len() - text.trim_start().len()];
                    let trail = &text[text.trim_end().len()..];
                    out.push_str(&escape(lead));
                    let mut inner = escape(core);
                    if *italic {
                        inner = format!("<em>{inner}</em>");
                    }
                    if *bold {
                        inner = format!("<strong>{inner}</strong>");
                    }
                    out.push_str(&inner);
                    out.push_str(&escape(trail));
                }
            }
        }
        out.trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Heading(usize, String),
    Paragraph(String),
    ListItem {
        level: usize,
        ordered: bool,
        html: String,
    },
    Table(Vec<Row>),
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Row {
    header: bool,
    cells: Vec<String>,
}

/// Elements whose whole subtree is ignored.
const SKIPPED: &[&[u8]] = &[b"drawing", b"pict", b"object", b"Fallback", b"delText"];

#[derive(Debug, Default)]
struct BodyWalker {
    blocks: Vec<Block>,
    tables: Vec<Vec<Row>>,
    paragraph: Option<Paragraph>,
    in_run: bool,
    in_text: bool,
    bold: bool,
    italic: bool,
    skip_depth: usize,
}

impl BodyWalker {
    fn start(&mut self, e: &BytesStart<'_>) {
        let name = e.local_name();
        let name = name.as_ref();
        if SKIPPED.contains(&name) {
            self.skip_depth += 1;
            return;
        }
        match name {
            b"p" => self.paragraph = Some(Paragraph::default()),
            b"r" => {
                self.in_run = true;
                self.bold = false;
                self.italic = false;
            }
            b"t" if self.in_run => self.in_text = true,
            b"tbl" => self.tables.push(Vec::new()),
            b"tr" => {
                if let Some(table) = self.tables.last_mut() {
                    table.push(Row::default());
                }
            }
            b"tc" => {
                if let Some(row) = self.tables.last_mut().and_then(|t| t.last_mut()) {
                    row.cells.push(String::new());
                }
            }
            _ => self.property(e),
        }
    }

    /// Self-closing property elements (and the rare start-tag form).
    fn property(&mut self, e: &BytesStart<'_>) {
        let name = e.local_name();
        match name.as_ref() {
            b"b" if self.in_run => self.bold = toggle_on(e),
            b"i" if self.in_run => self.italic = toggle_on(e),
            b"br" | b"cr" if self.in_run => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.segments.push(Segment::Break);
                }
            }
            b"tab" if self.in_run => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.push_text(" ", self.bold, self.italic);
                }
            }
            b"pStyle" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.style_id = attr(e, b"val");
                }
            }
            b"outlineLvl" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.outline_level = attr(e, b"val")
                        .and_then(|v| v.parse::<usize>().ok())
                        .filter(|l| *l < 6)
                        .map(|l| l + 1);
                }
            }
            b"numId" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.num_id = attr(e, b"val").filter(|v| v != "0");
                }
            }
            b"ilvl" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.ilvl = attr(e, b"val")
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0)
                        .min(MAX_LIST_LEVEL);
                }
            }
            b"tblHeader" => {
                if let Some(row) = self.tables.last_mut().and_then(|t| t.last_mut()) {
                    row.header = toggle_on(e);
                }
            }
            _ => {}
        }
    }

    fn empty(&mut self, e: &BytesStart<'_>) {
        if self.skip_depth > 0 {
            return;
        }
        if e.local_name().as_ref() == b"p" {
            return;
        }
        self.property(e);
    }

    fn text(&mut self, text: &str) {
        if self.skip_depth > 0 || !self.in_text {
            return;
        }
        if let Some(p) = self.paragraph.as_mut() {
            p.push_text(text, self.bold, self.italic);
        }
    }

    fn end(&mut self, name: &[u8], styles: &Styles, numbering: &Numbering) {
        if SKIPPED.contains(&name) {
            self.skip_depth = self.skip_depth.saturating_sub(1);
            return;
        }
        if self.skip_depth > 0 {
            return;
        }
        match name {
            b"t" => self.in_text = false,
            b"r" => self.in_run = false,
            b"p" => {
                if let Some(p) = self.paragraph.take() {
                    self.finish_paragraph(p, styles, numbering);
                }
            }
            b"tbl" => {
                if let Some(rows) = self.tables.pop() {
                    self.finish_table(rows);
                }
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self, p: Paragraph, styles: &Styles, numbering: &Numbering) {
        if p.is_empty() {
            return;
        }
        // Inside a table: the paragraph belongs to the current cell.
        if let Some(cell) = self
            .tables
            .last_mut()
            .and_then(|t| t.last_mut())
            .and_then(|r| r.cells.last_mut())
        {
            if !cell.is_empty() {
                cell.push_str("<br>");
            }
            cell.push_str(&p.inline_html());
            return;
        }

        let level = p
            .style_id
            .as_deref()
            .and_then(|id| styles.heading_level(id))
            .or(p.outline_level);
        let block = if let Some(level) = level {
            Block::Heading(level, escape(&p.plain_text()))
        } else if let Some(num_id) = p.num_id.as_deref() {
            Block::ListItem {
                level: p.ilvl,
                ordered: numbering.is_ordered(num_id, p.ilvl),
                html: p.inline_html(),
            }
        } else {
            Block::Paragraph(p.inline_html())
        };
        self.blocks.push(block);
    }

    fn finish_table(&mut self, rows: Vec<Row>) {
        let rows: Vec<Row> = rows.into_iter().filter(|r| !r.cells.is_empty()).collect();
        if rows.is_empty() {
            return;
        }
        // A nested table collapses into its parent cell.
        if let Some(cell) = self
            .tables
            .last_mut()
            .and_then(|t| t.last_mut())
            .and_then(|r| r.cells.last_mut())
        {
            let text = rows
                .iter()
                .map(|r| r.cells.join(" "))
                .collect::<Vec<_>>()
                .join("<br>");
            if !cell.is_empty() {
                cell.push_str("<br>");
            }
            cell.push_str(&text);
            return;
        }
        self.blocks.push(Block::Table(rows));
    }
}

fn walk_body(xml: &str, styles: &Styles, numbering: &Numbering) -> Result<Vec<Block>, Doc2MdError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut walker = BodyWalker::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if walker.skip_depth > 0 {
                    if SKIPPED.contains(&e.local_name().as_ref()) {
                        walker.skip_depth += 1;
                    }
                } else {
                    walker.start(&e);
                }
            }
            Ok(Event::Empty(e)) => walker.empty(&e),
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| xml_error("document.xml", e))?;
                walker.text(&text);
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                walker.end(name.as_ref(), styles, numbering);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("document.xml", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(walker.blocks)
}

// ── HTML rendering ───────────────────────────────────────────────────────────

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Word numbers list levels 0 through 8.
const MAX_LIST_LEVEL: usize = 8;

fn render_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    // Open list tags, one per nesting level.
    let mut lists: Vec<&'static str> = Vec::new();

    for block in blocks {
        if let Block::ListItem {
            level,
            ordered,
            html,
        } = block
        {
            let tag = if *ordered { "ol" } else { "ul" };
            let depth = level + 1;
            while lists.len() > depth {
                if let Some(t) = lists.pop() {
                    out.push_str(&format!("</li></{t}>"));
                }
            }
            if lists.len() == depth {
                if lists[depth - 1] == tag {
                    out.push_str("</li>");
                } else {
                    if let Some(t) = lists.pop() {
                        out.push_str(&format!("</li></{t}>"));
                    }
                    out.push_str(&format!("<{tag}>"));
                    lists.push(tag);
                }
            }
            while lists.len() < depth {
                out.push_str(&format!("<{tag}>"));
                lists.push(tag);
            }
            out.push_str("<li>");
            out.push_str(html);
            continue;
        }

        while let Some(t) = lists.pop() {
            out.push_str(&format!("</li></{t}>\n"));
        }
        match block {
            Block::Heading(level, text) => {
                out.push_str(&format!("<h{level}>{text}</h{level}>\n"));
            }
            Block::Paragraph(html) => {
                out.push_str(&format!("<p>{html}</p>\n"));
            }
            Block::Table(rows) => {
                out.push_str("<table>\n");
                for row in rows {
                    let tag = if row.header { "th" } else { "td" };
                    out.push_str("<tr>");
                    for cell in &row.cells {
                        out.push_str(&format!("<{tag}>{cell}</{tag}>"));
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</table>\n");
            }
            Block::ListItem { .. } => {}
        }
    }
    while let Some(t) = lists.pop() {
        out.push_str(&format!("</li></{t}>\n"));
    }
    out
}
