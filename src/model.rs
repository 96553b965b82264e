//! Page-level types shared by the cleaning stages.
//!
//! Everything here is derived from the source document for one conversion
//! and dropped when it finishes. Coordinates use a top-left origin with `y`
//! growing downward, in page units (PDF points); the pdfium backend converts
//! from the PDF bottom-left convention on extraction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An axis-aligned rectangle in page coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// `true` when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.y0 >= self.y0 && other.y1 <= self.y1
    }
}

/// A contiguous run of text drawn with a single font.
///
/// `index` is the position of the source text object in its page's object
/// list; redaction addresses spans by `(page, index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub page: usize,
    pub index: usize,
    pub text: String,
    pub font: String,
    pub bbox: Rect,
}

impl TextSpan {
    /// Number of non-whitespace characters; the weight used for dominant-font
    /// and OCR-need computations.
    pub fn weight(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One page of an extracted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 0-based position in the document.
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub spans: Vec<TextSpan>,
    /// Non-whitespace characters in the page's text layer.
    pub char_count: usize,
}

impl Page {
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            spans: Vec::new(),
            char_count: 0,
        }
    }

    /// Append a span, keeping `char_count` in step with the spans.
    pub fn push_span(&mut self, text: impl Into<String>, font: impl Into<String>, bbox: Rect) {
        let span = TextSpan {
            page: self.index,
            index: self.spans.len(),
            text: text.into(),
            font: font.into(),
            bbox,
        };
        self.char_count += span.weight();
        self.spans.push(span);
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// The font carrying the most non-whitespace characters on this page.
    ///
    /// Ties go to the font that appears first. `None` for pages without text.
    pub fn dominant_font(&self) -> Option<&str> {
        let mut weights: Vec<(&str, usize)> = Vec::new();
        for span in &self.spans {
            let w = span.weight();
            if w == 0 {
                continue;
            }
            match weights.iter_mut().find(|(font, _)| *font == span.font) {
                Some(entry) => entry.1 += w,
                None => weights.push((span.font.as_str(), w)),
            }
        }
        let mut best: Option<(&str, usize)> = None;
        for (font, w) in weights {
            if best.map_or(true, |(_, bw)| w > bw) {
                best = Some((font, w));
            }
        }
        best.map(|(font, _)| font)
    }
}

// ── Zones ────────────────────────────────────────────────────────────────

/// Which derived region a [`Zone`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    MarginLeft,
    MarginRight,
    MarginTop,
    MarginBottom,
    HeaderBand,
    FooterBand,
}

/// A geometric region of a page used for membership tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    pub kind: ZoneKind,
    pub rect: Rect,
}

impl Zone {
    /// The four margin strips of `page` for the given offsets.
    pub fn margins(page: &Page, offsets: &MarginOffsets) -> [Zone; 4] {
        let (w, h) = (page.width, page.height);
        [
            Zone {
                kind: ZoneKind::MarginLeft,
                rect: Rect::new(0.0, 0.0, offsets.left.min(w), h),
            },
            Zone {
                kind: ZoneKind::MarginRight,
                rect: Rect::new((w - offsets.right).max(0.0), 0.0, w, h),
            },
            Zone {
                kind: ZoneKind::MarginTop,
                rect: Rect::new(0.0, 0.0, w, offsets.top.min(h)),
            },
            Zone {
                kind: ZoneKind::MarginBottom,
                rect: Rect::new(0.0, (h - offsets.bottom).max(0.0), w, h),
            },
        ]
    }

    /// The top and bottom bands covering `ratio` of the page height each.
    pub fn bands(page: &Page, ratio: f32) -> [Zone; 2] {
        let band = page.height * ratio;
        [
            Zone {
                kind: ZoneKind::HeaderBand,
                rect: Rect::new(0.0, 0.0, page.width, band),
            },
            Zone {
                kind: ZoneKind::FooterBand,
                rect: Rect::new(0.0, page.height - band, page.width, page.height),
            },
        ]
    }

    /// Full containment of `bbox`.
    pub fn contains(&self, bbox: &Rect) -> bool {
        self.rect.contains(bbox)
    }

    /// Containment of the vertical centre of `bbox`.
    pub fn contains_center(&self, bbox: &Rect) -> bool {
        let cy = bbox.center_y();
        cy >= self.rect.y0 && cy <= self.rect.y1
    }
}

/// Distances from each page edge that bound the annotation search region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginOffsets {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for MarginOffsets {
    fn default() -> Self {
        Self {
            left: 60.0,
            right: 60.0,
            top: 50.0,
            bottom: 50.0,
        }
    }
}

// ── Fragments ────────────────────────────────────────────────────────────

/// Normalised header/footer text: trimmed, inner whitespace collapsed to one
/// space, case preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentKey(String);

impl FragmentKey {
    pub fn normalize(text: &str) -> Option<Self> {
        let key = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Verdicts ─────────────────────────────────────────────────────────────

/// Outcome of classifying one span, tagged with the rule that decided it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "rule", rename_all = "snake_case")]
pub enum AnnotationVerdict {
    Content(ContentRule),
    Handwriting(HandwritingRule),
}

impl AnnotationVerdict {
    pub fn is_handwriting(&self) -> bool {
        matches!(self, AnnotationVerdict::Handwriting(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentRule {
    /// Text matched a date or currency pattern.
    MeaningfulContent,
    /// Span is not fully inside a margin zone.
    OutsideMargin,
    /// Span is in a margin but uses the page's dominant font.
    BodyFont,
    /// Span carries no visible text.
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandwritingRule {
    /// Font name contains a handwriting keyword.
    KeywordFont { keyword: String },
    /// Font differs from the page's dominant font.
    FontDeviation { dominant: String },
}
