//! Redaction planning.
//!
//! A [`RedactionPlan`] lists, per page, the text objects to delete from the
//! source PDF. Planning is pure; applying the plan is the job of a
//! [`crate::pipeline::pdf::PdfBackend`], which removes exactly the listed
//! objects and nothing else.

use crate::model::AnnotationVerdict;
use crate::pipeline::fragments::RecurringFragments;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why a span is scheduled for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionReason {
    RecurringFragment,
    Handwriting,
}

/// Span indices to remove, grouped by 0-based page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedactionPlan {
    pages: BTreeMap<usize, BTreeMap<usize, RedactionReason>>,
}

impl RedactionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a span. A span already scheduled keeps its first reason.
    pub fn add(&mut self, page: usize, index: usize, reason: RedactionReason) {
        self.pages
            .entry(page)
            .or_default()
            .entry(index)
            .or_insert(reason);
    }

    pub fn is_empty(&self) -> bool {
        self.pages.values().all(|p| p.is_empty())
    }

    /// Total scheduled spans.
    pub fn len(&self) -> usize {
        self.pages.values().map(|p| p.len()).sum()
    }

    pub fn count(&self, reason: RedactionReason) -> usize {
        self.pages
            .values()
            .flat_map(|p| p.values())
            .filter(|r| **r == reason)
            .count()
    }

    pub fn contains(&self, page: usize, index: usize) -> bool {
        self.pages.get(&page).is_some_and(|p| p.contains_key(&index))
    }

    /// Scheduled span indices of `page`, ascending.
    pub fn indices(&self, page: usize) -> Vec<usize> {
        self.pages
            .get(&page)
            .map(|p| p.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Pages with at least one scheduled span, ascending.
    pub fn pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages
            .iter()
            .filter(|(_, spans)| !spans.is_empty())
            .map(|(page, _)| *page)
    }
}

/// Build the plan from recurring fragments and per-span verdicts.
///
/// `verdicts` yields `(page, span index, verdict)`; only handwriting
/// verdicts are scheduled. Recurring fragments are scheduled first, so a
/// band span that is both keeps the fragment reason.
pub fn build_plan<'a>(
    fragments: Option<&RecurringFragments>,
    verdicts: impl IntoIterator<Item = (usize, usize, &'a AnnotationVerdict)>,
) -> RedactionPlan {
    let mut plan = RedactionPlan::new();
    if let Some(fragments) = fragments {
        for (page, index) in fragments.spans() {
            plan.add(page, index, RedactionReason::RecurringFragment);
        }
    }
    for (page, index, verdict) in verdicts {
        if verdict.is_handwriting() {
            plan.add(page, index, RedactionReason::Handwriting);
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentRule, HandwritingRule, Page, Rect};
    use crate::pipeline::fragments::detect_recurring;

    fn pages_with_footer() -> Vec<Page> {
        (0..2)
            .map(|i| {
                let mut p = Page::new(i, 595.0, 842.0);
                p.push_span("Body", "Times", Rect::new(72.0, 200.0, 500.0, 212.0));
                p.push_span("Footer", "Arial", Rect::new(260.0, 810.0, 340.0, 822.0));
                p
            })
            .collect()
    }

    #[test]
    fn empty_inputs_give_empty_plan() {
        let plan = build_plan(None, std::iter::empty());
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }

    #[test]
    fn fragments_and_handwriting_are_scheduled() {
        let pages = pages_with_footer();
        let fragments = detect_recurring(&pages, 0.10, 2);
        let hand = AnnotationVerdict::Handwriting(HandwritingRule::KeywordFont {
            keyword: "comic".into(),
        });
        let body = AnnotationVerdict::Content(ContentRule::OutsideMargin);
        let verdicts = vec![(0, 0, &body), (1, 0, &hand)];

        let plan = build_plan(Some(&fragments), verdicts);
        assert_eq!(plan.indices(0), vec![1]);
        assert_eq!(plan.indices(1), vec![0, 1]);
        assert_eq!(plan.count(RedactionReason::RecurringFragment), 2);
        assert_eq!(plan.count(RedactionReason::Handwriting), 1);
        assert!(!plan.contains(0, 0));
    }

    #[test]
    fn first_reason_wins() {
        let mut plan = RedactionPlan::new();
        plan.add(0, 3, RedactionReason::RecurringFragment);
        plan.add(0, 3, RedactionReason::Handwriting);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.count(RedactionReason::Handwriting), 0);
    }

    #[test]
    fn pages_are_listed_in_order() {
        let mut plan = RedactionPlan::new();
        plan.add(4, 0, RedactionReason::Handwriting);
        plan.add(1, 2, RedactionReason::Handwriting);
        assert_eq!(plan.pages().collect::<Vec<_>>(), vec![1, 4]);
    }
}
