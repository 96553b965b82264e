//! Locale tables driving the cleaning heuristics.
//!
//! [`RuleTables`] is the plain, serialisable form (keyword list and pattern
//! strings); [`CleaningRules`] is the compiled, immutable form handed to the
//! classifier and the post-processor through
//! [`crate::config::ConversionConfig`]. The defaults target Polish and
//! English documents; other locales load their own tables from JSON.

use crate::error::Doc2MdError;
use regex::{Regex, RegexSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serialisable rule tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTables {
    /// Substrings matched case-insensitively against font names.
    pub handwriting_keywords: Vec<String>,
    /// Patterns whose match anywhere in a span forces it to be kept.
    pub content_patterns: Vec<String>,
    /// Patterns a whole trimmed Markdown line must match to be stripped.
    pub page_number_patterns: Vec<String>,
}

impl Default for RuleTables {
    fn default() -> Self {
        Self::polish_english()
    }
}

impl RuleTables {
    pub fn polish_english() -> Self {
        let keywords = [
            "hand",
            "script",
            "comic",
            "marker",
            "brush",
            "caveat",
            "kalam",
            "indie",
            "gochi",
            "shadows",
            "architects",
            "dancing",
            "satisfy",
            "pacifico",
            "segoeprint",
            "inkfree",
            "bradley",
            "cursive",
            "autograph",
            "signature",
        ];
        let content = [
            // 15.03.2024, 15/03/24, 1-3-2024
            r"\b\d{1,2}[./-]\d{1,2}[./-](?:\d{4}|\d{2})\b",
            // 2024-03-15
            r"\b\d{4}-\d{2}-\d{2}\b",
            // 15 marca 2024
            r"(?i)\b\d{1,2}\s+(?:stycznia|lutego|marca|kwietnia|maja|czerwca|lipca|sierpnia|września|października|listopada|grudnia)\s+\d{4}",
            // 150,00 zł / 1 200 PLN / 12.50 EUR
            r"(?i)\d[\d\s.]*(?:,\d{1,2})?\s?(?:(?:zł|pln|eur|usd|gbp)\b|€|\$)",
            // € 30 / $12.50 / PLN 40
            r"(?i)(?:€|\$|£|\bpln|\beur|\busd)\s?\d",
        ];
        let page_numbers = [
            // 7
            r"^\d{1,4}$",
            // - 7 -
            r"^[-–—]\s*\d{1,4}\s*[-–—]$",
            // Page 7, Strona 7, Str. 7, Page 7 of 10, Strona 7 z 10
            r"(?i)^(?:page|strona|str\.|s\.)\s*\d{1,4}(?:\s*(?:/|z|of)\s*\d{1,4})?$",
            // 7/10, 7 / 10
            r"^\d{1,4}\s*/\s*\d{1,4}$",
        ];
        Self {
            handwriting_keywords: keywords.iter().map(|s| s.to_string()).collect(),
            content_patterns: content.iter().map(|s| s.to_string()).collect(),
            page_number_patterns: page_numbers.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load tables from a JSON file; missing fields take the default tables.
    pub fn from_json_file(path: &Path) -> Result<Self, Doc2MdError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Doc2MdError::InvalidConfig(format!("cannot read rules file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            Doc2MdError::InvalidConfig(format!("invalid rules file {}: {e}", path.display()))
        })
    }

    /// Compile into immutable [`CleaningRules`].
    pub fn compile(&self) -> Result<CleaningRules, Doc2MdError> {
        let content = RegexSet::new(&self.content_patterns)
            .map_err(|e| Doc2MdError::InvalidConfig(format!("content pattern: {e}")))?;
        let page_numbers = RegexSet::new(&self.page_number_patterns)
            .map_err(|e| Doc2MdError::InvalidConfig(format!("page-number pattern: {e}")))?;
        let keywords = self
            .handwriting_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Ok(CleaningRules {
            keywords,
            content,
            page_numbers,
        })
    }
}

/// Compiled rule tables.
#[derive(Debug, Clone)]
pub struct CleaningRules {
    keywords: Vec<String>,
    content: RegexSet,
    page_numbers: RegexSet,
}

impl Default for CleaningRules {
    fn default() -> Self {
        // The built-in patterns are constants covered by tests.
        RuleTables::polish_english()
            .compile()
            .expect("built-in rule tables compile")
    }
}

/// Emphasis markers an engine may wrap around a bare page number.
static EMPHASIS: once_cell::sync::Lazy<Regex> =
    once_cell::sync::Lazy::new(|| Regex::new(r"^[*_]+(.*?)[*_]+$").unwrap());

impl CleaningRules {
    /// First handwriting keyword contained in `font`, if any.
    pub fn handwriting_keyword(&self, font: &str) -> Option<&str> {
        let font = font.to_lowercase();
        self.keywords
            .iter()
            .find(|k| font.contains(k.as_str()))
            .map(String::as_str)
    }

    /// `true` when `text` contains a date or currency amount.
    pub fn is_meaningful_content(&self, text: &str) -> bool {
        self.content.is_match(text)
    }

    /// `true` when the whole trimmed `line` is a page number.
    pub fn is_page_number(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return false;
        }
        if self.page_numbers.is_match(trimmed) {
            return true;
        }
        EMPHASIS
            .captures(trimmed)
            .map(|caps| self.page_numbers.is_match(caps[1].trim()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> CleaningRules {
        CleaningRules::default()
    }

    #[test]
    fn dates_are_meaningful() {
        let r = rules();
        assert!(r.is_meaningful_content("12.03.2024"));
        assert!(r.is_meaningful_content("podpisano 15.03.2024 r."));
        assert!(r.is_meaningful_content("15/03/24"));
        assert!(r.is_meaningful_content("2024-03-15"));
        assert!(r.is_meaningful_content("15 marca 2024"));
    }

    #[test]
    fn currency_is_meaningful() {
        let r = rules();
        assert!(r.is_meaningful_content("150,00 zł"));
        assert!(r.is_meaningful_content("1 200 PLN"));
        assert!(r.is_meaningful_content("$12.50"));
        assert!(r.is_meaningful_content("€ 30"));
    }

    #[test]
    fn plain_notes_are_not_meaningful() {
        let r = rules();
        assert!(!r.is_meaningful_content("sprawdzić!"));
        assert!(!r.is_meaningful_content("OK"));
        assert!(!r.is_meaningful_content("see p. 4"));
    }

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        let r = rules();
        assert_eq!(r.handwriting_keyword("ComicMarker"), Some("comic"));
        assert_eq!(r.handwriting_keyword("ABCDEF+Caveat-Regular"), Some("caveat"));
        assert_eq!(r.handwriting_keyword("TimesNewRomanPSMT"), None);
        assert_eq!(r.handwriting_keyword("OpenSans-Regular"), None);
    }

    #[test]
    fn page_number_lines() {
        let r = rules();
        for line in [
            "7",
            "  12 ",
            "- 7 -",
            "Page 7",
            "Strona 3",
            "Str. 3",
            "Strona 3 z 10",
            "Page 3 of 10",
            "3/10",
            "3 / 10",
            "**7**",
            "_Strona 2_",
        ] {
            assert!(r.is_page_number(line), "{line:?} should be a page number");
        }
    }

    #[test]
    fn prose_is_not_page_number() {
        let r = rules();
        for line in ["Strona 3 osób", "2024 was a good year for us", "1. Item", "", "Page"] {
            assert!(!r.is_page_number(line), "{line:?} is not a page number");
        }
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let tables = RuleTables {
            content_patterns: vec!["(".into()],
            ..RuleTables::default()
        };
        assert!(matches!(
            tables.compile(),
            Err(Doc2MdError::InvalidConfig(_))
        ));
    }

    #[test]
    fn tables_roundtrip_through_partial_json() {
        let tables: RuleTables =
            serde_json::from_str(r#"{"handwriting_keywords": ["feder"]}"#).unwrap();
        assert_eq!(tables.handwriting_keywords, vec!["feder".to_string()]);
        assert_eq!(
            tables.page_number_patterns,
            RuleTables::default().page_number_patterns
        );
        let compiled = tables.compile().unwrap();
        assert_eq!(compiled.handwriting_keyword("Federleicht"), Some("feder"));
    }
}
