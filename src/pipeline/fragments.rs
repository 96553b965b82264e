//! Recurring header/footer detection.
//!
//! Only text whose vertical centre lies in the top or bottom band of a page
//! is considered. Band spans are grouped into visual lines, each line is
//! normalised into a [`FragmentKey`], and keys found on at least
//! `threshold` distinct pages are reported with the spans that carry them.
//!
//! Matching is exact on the normalised line: a footer that embeds a changing
//! page number ("Strona 3", "Strona 4") differs on every page and is left to
//! the page-number pass over the Markdown.

use crate::model::{FragmentKey, Page, TextSpan, Zone};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Header/footer fragments that recur across pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecurringFragments {
    /// Recurring keys and the 0-based pages carrying them in a band.
    pages_by_key: BTreeMap<FragmentKey, BTreeSet<usize>>,
    /// `(page, span index)` of every band span composing a recurring line.
    spans: BTreeSet<(usize, usize)>,
}

impl RecurringFragments {
    pub fn is_empty(&self) -> bool {
        self.pages_by_key.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pages_by_key.len()
    }

    pub fn contains_key(&self, key: &FragmentKey) -> bool {
        self.pages_by_key.contains_key(key)
    }

    /// Recurring keys with the 0-based pages they occur on.
    pub fn iter(&self) -> impl Iterator<Item = (&FragmentKey, &BTreeSet<usize>)> {
        self.pages_by_key.iter()
    }

    /// `true` when the span at `(page, index)` belongs to a recurring line.
    pub fn covers(&self, page: usize, index: usize) -> bool {
        self.spans.contains(&(page, index))
    }

    pub fn spans(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.spans.iter().copied()
    }
}

/// A line on a single page is never a header or footer.
const MIN_RECURRENCE: usize = 2;

/// A visual line of band text on one page.
#[derive(Debug, Clone, PartialEq)]
struct BandLine {
    key: FragmentKey,
    spans: Vec<usize>,
}

/// Find fragments repeated in the header/footer bands of `threshold` or
/// more distinct pages. Thresholds below 2 are treated as 2.
pub fn detect_recurring(pages: &[Page], band_ratio: f32, threshold: usize) -> RecurringFragments {
    let threshold = threshold.max(MIN_RECURRENCE);
    let mut occurrences: BTreeMap<FragmentKey, BTreeMap<usize, Vec<usize>>> = BTreeMap::new();

    for page in pages {
        for band in Zone::bands(page, band_ratio) {
            let in_band: Vec<&TextSpan> = page
                .spans
                .iter()
                .filter(|s| !s.is_blank() && band.contains_center(&s.bbox))
                .collect();
            for line in group_lines(in_band) {
                occurrences
                    .entry(line.key)
                    .or_default()
                    .entry(page.index)
                    .or_default()
                    .extend(line.spans);
            }
        }
    }

    let mut found = RecurringFragments::default();
    for (key, by_page) in occurrences {
        if by_page.len() < threshold {
            continue;
        }
        debug!("Recurring fragment {:?} on {} pages", key.as_str(), by_page.len());
        for (page, spans) in &by_page {
            found.spans.extend(spans.iter().map(|i| (*page, *i)));
        }
        found
            .pages_by_key
            .insert(key, by_page.into_keys().collect());
    }
    found
}

/// Group spans into lines by vertical centre, left-to-right within a line.
fn group_lines(mut spans: Vec<&TextSpan>) -> Vec<BandLine> {
    spans.sort_by(|a, b| {
        a.bbox
            .center_y()
            .total_cmp(&b.bbox.center_y())
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut lines: Vec<Vec<&TextSpan>> = Vec::new();
    for span in spans {
        let joins = lines.last().and_then(|line| line.first()).is_some_and(|anchor| {
            let tolerance = (anchor.bbox.height().min(span.bbox.height()) * 0.5).max(1.0);
            (span.bbox.center_y() - anchor.bbox.center_y()).abs() <= tolerance
        });
        match lines.last_mut() {
            Some(line) if joins => line.push(span),
            _ => lines.push(vec![span]),
        }
    }

    lines
        .into_iter()
        .filter_map(|mut line| {
            line.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
            let text = line
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            FragmentKey::normalize(&text).map(|key| BandLine {
                key,
                spans: line.iter().map(|s| s.index).collect(),
            })
        })
        .collect()
}
