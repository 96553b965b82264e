//! Handwritten margin annotation classification.
//!
//! A span is handwriting only when it sits entirely inside one of the four
//! margin strips and its font either names a handwriting face or departs
//! from the page's dominant font. Dates and amounts are always kept, even
//! when scribbled in a margin: they are the notes that carry meaning.

use crate::model::{
    AnnotationVerdict, ContentRule, HandwritingRule, MarginOffsets, Page, TextSpan, Zone,
};
use crate::rules::CleaningRules;

/// A span together with its verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSpan<'a> {
    pub span: &'a TextSpan,
    pub in_margin: bool,
    pub verdict: AnnotationVerdict,
}

/// Classify a single span against its page context.
///
/// `dominant` is the page's dominant font (see [`Page::dominant_font`]).
pub fn classify_span(
    span: &TextSpan,
    margins: &[Zone; 4],
    dominant: Option<&str>,
    rules: &CleaningRules,
) -> AnnotationVerdict {
    if span.is_blank() {
        return AnnotationVerdict::Content(ContentRule::Blank);
    }
    if rules.is_meaningful_content(&span.text) {
        return AnnotationVerdict::Content(ContentRule::MeaningfulContent);
    }
    if !in_margin(span, margins) {
        return AnnotationVerdict::Content(ContentRule::OutsideMargin);
    }
    if let Some(keyword) = rules.handwriting_keyword(&span.font) {
        return AnnotationVerdict::Handwriting(HandwritingRule::KeywordFont {
            keyword: keyword.to_string(),
        });
    }
    match dominant {
        Some(dominant) if dominant != span.font => {
            AnnotationVerdict::Handwriting(HandwritingRule::FontDeviation {
                dominant: dominant.to_string(),
            })
        }
        _ => AnnotationVerdict::Content(ContentRule::BodyFont),
    }
}

/// Classify every span of `page`.
pub fn classify_page<'a>(
    page: &'a Page,
    offsets: &MarginOffsets,
    rules: &CleaningRules,
) -> Vec<ClassifiedSpan<'a>> {
    let margins = Zone::margins(page, offsets);
    let dominant = page.dominant_font();
    page.spans
        .iter()
        .map(|span| ClassifiedSpan {
            span,
            in_margin: in_margin(span, &margins),
            verdict: classify_span(span, &margins, dominant, rules),
        })
        .collect()
}

fn in_margin(span: &TextSpan, margins: &[Zone; 4]) -> bool {
    margins.iter().any(|z| z.contains(&span.bbox))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn page() -> Page {
        let mut p = Page::new(0, 595.0, 842.0);
        for i in 0..10 {
            let y = 100.0 + i as f32 * 14.0;
            p.push_span(
                "Regular body paragraph text set in the main typeface.",
                "TimesNewRomanPSMT",
                Rect::new(72.0, y, 520.0, y + 12.0),
            );
        }
        p
    }

    fn left_margin() -> Rect {
        Rect::new(8.0, 400.0, 55.0, 412.0)
    }

    fn verdict_of(page: &Page, index: usize) -> AnnotationVerdict {
        classify_page(page, &MarginOffsets::default(), &CleaningRules::default())[index]
            .verdict
            .clone()
    }

    #[test]
    fn keyword_font_in_margin_is_handwriting() {
        let mut p = page();
        p.push_span("sprawdzić!", "ComicMarker", left_margin());
        assert_eq!(
            verdict_of(&p, 10),
            AnnotationVerdict::Handwriting(HandwritingRule::KeywordFont {
                keyword: "comic".into()
            })
        );
    }

    #[test]
    fn date_in_handwriting_font_is_content() {
        let mut p = page();
        p.push_span("15.03.2024", "ComicMarker", left_margin());
        assert_eq!(
            verdict_of(&p, 10),
            AnnotationVerdict::Content(ContentRule::MeaningfulContent)
        );
    }

    #[test]
    fn amount_in_margin_is_content() {
        let mut p = page();
        p.push_span("150,00 zł", "Caveat-Regular", left_margin());
        assert!(!verdict_of(&p, 10).is_handwriting());
    }

    #[test]
    fn font_deviation_in_margin_is_handwriting() {
        let mut p = page();
        p.push_span("ok", "Helvetica-Oblique", Rect::new(550.0, 300.0, 590.0, 312.0));
        assert_eq!(
            verdict_of(&p, 10),
            AnnotationVerdict::Handwriting(HandwritingRule::FontDeviation {
                dominant: "TimesNewRomanPSMT".into()
            })
        );
    }

    #[test]
    fn keyword_font_in_body_is_content() {
        let mut p = page();
        p.push_span("Signature block", "Autograph", Rect::new(200.0, 600.0, 400.0, 612.0));
        assert_eq!(
            verdict_of(&p, 10),
            AnnotationVerdict::Content(ContentRule::OutsideMargin)
        );
    }

    #[test]
    fn straddling_span_is_not_in_margin() {
        let mut p = page();
        p.push_span("note", "ComicMarker", Rect::new(40.0, 400.0, 90.0, 412.0));
        assert_eq!(
            verdict_of(&p, 10),
            AnnotationVerdict::Content(ContentRule::OutsideMargin)
        );
    }

    #[test]
    fn dominant_font_in_margin_is_body() {
        let mut p = page();
        p.push_span("12", "TimesNewRomanPSMT", Rect::new(280.0, 810.0, 300.0, 822.0));
        let classified = classify_page(&p, &MarginOffsets::default(), &CleaningRules::default());
        assert!(classified[10].in_margin);
        assert_eq!(
            classified[10].verdict,
            AnnotationVerdict::Content(ContentRule::BodyFont)
        );
    }

    #[test]
    fn blank_span_is_blank() {
        let mut p = page();
        p.push_span("   ", "ComicMarker", left_margin());
        assert_eq!(verdict_of(&p, 10), AnnotationVerdict::Content(ContentRule::Blank));
    }

    #[test]
    fn dominant_font_is_per_page() {
        // A page written entirely in a marker font: nothing deviates.
        let mut p = Page::new(3, 595.0, 842.0);
        p.push_span("all of this page", "Marker Felt", Rect::new(72.0, 100.0, 500.0, 112.0));
        p.push_span("x", "Marker Felt", left_margin());
        let rules = CleaningRules::default();
        let margins = Zone::margins(&p, &MarginOffsets::default());
        let v = classify_span(&p.spans[1], &margins, p.dominant_font(), &rules);
        // Keyword rule still fires: "marker".
        assert!(v.is_handwriting());
        let v = classify_span(&p.spans[1], &margins, Some("Marker Felt"), &no_keyword_rules());
        assert_eq!(v, AnnotationVerdict::Content(ContentRule::BodyFont));
    }

    fn no_keyword_rules() -> CleaningRules {
        crate::rules::RuleTables {
            handwriting_keywords: Vec::new(),
            ..crate::rules::RuleTables::default()
        }
        .compile()
        .unwrap()
    }
}
