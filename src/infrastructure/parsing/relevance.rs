//! Relevance filter for listing titles
//!
//! A candidate matches when any lower-cased query token occurs in the title,
//! directly or through a brand transliteration (e.g. "lenovo" -> "لينوفو").
//! A single token is enough. Negative keywords (accessories, peripherals)
//! are checked first and reject the title outright.

use std::collections::BTreeMap;

use tracing::trace;

use crate::infrastructure::config::{defaults, ScraperConfig};

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    negative_keywords: Vec<String>,
    transliterations: BTreeMap<String, Vec<String>>,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self::new(&defaults::negative_keywords(), &defaults::brand_transliterations())
    }
}

impl RelevanceFilter {
    pub fn new(negative_keywords: &[String], transliterations: &BTreeMap<String, Vec<String>>) -> Self {
        let negative_keywords = negative_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let transliterations = transliterations
            .iter()
            .map(|(token, renderings)| {
                let renderings = renderings
                    .iter()
                    .map(|r| r.trim().to_lowercase())
                    .filter(|r| !r.is_empty())
                    .collect();
                (token.trim().to_lowercase(), renderings)
            })
            .collect();

        Self {
            negative_keywords,
            transliterations,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(&config.negative_keywords, &config.brand_transliterations)
    }

    /// Never fails; an empty title or query is a non-match
    pub fn is_relevant(&self, query: &str, title: &str) -> bool {
        let title = title.trim().to_lowercase();
        if title.is_empty() {
            return false;
        }

        if let Some(keyword) = self.negative_match(&title) {
            trace!("Rejected '{}' on negative keyword '{}'", title, keyword);
            return false;
        }

        query
            .split_whitespace()
            .map(str::to_lowercase)
            .any(|token| title.contains(&token) || self.transliteration_match(&token, &title))
    }

    /// First negative keyword contained in an already lower-cased title
    pub fn negative_match(&self, title_lower: &str) -> Option<&str> {
        self.negative_keywords
            .iter()
            .find(|keyword| title_lower.contains(keyword.as_str()))
            .map(String::as_str)
    }

    fn transliteration_match(&self, token: &str, title_lower: &str) -> bool {
        self.transliterations
            .get(token)
            .is_some_and(|renderings| renderings.iter().any(|r| title_lower.contains(r.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Lenovo IdeaPad", "Lenovo IdeaPad Slim 3 15IRU8 Laptop", true)]
    #[case("Lenovo IdeaPad", "لينوفو ايديا باد 15 inch", true)]
    #[case("Lenovo IdeaPad", "Lenovo IdeaPad Slim 3 Laptop Case", false)]
    #[case("Lenovo IdeaPad", "جراب لابتوب لينوفو", false)]
    #[case("Lenovo IdeaPad", "HP Victus Gaming Laptop", false)]
    #[case("samsung galaxy", "سامسونج جالاكسي A55", true)]
    #[case("iPhone 15", "Apple iPhone 15 128GB", true)]
    #[case("Lenovo IdeaPad", "", false)]
    #[case("", "Lenovo IdeaPad Slim 3", false)]
    fn test_default_tables(#[case] query: &str, #[case] title: &str, #[case] expected: bool) {
        let filter = RelevanceFilter::default();
        assert_eq!(filter.is_relevant(query, title), expected, "query={query:?} title={title:?}");
    }

    #[test]
    fn test_single_token_match_is_sufficient() {
        // "ideapad" alone carries the match.
        let filter = RelevanceFilter::default();
        assert!(filter.is_relevant("Lenovo IdeaPad Pro 5", "IdeaPad bundle offer"));
    }

    #[test]
    fn test_negative_keyword_wins_over_transliteration() {
        let filter = RelevanceFilter::default();
        assert!(!filter.is_relevant("lenovo", "ماوس لاسلكي لينوفو"));
    }

    #[test]
    fn test_custom_tables_are_normalized() {
        let translits = BTreeMap::from([("Xiaomi".to_string(), vec![" شاومي ".to_string()])]);
        let filter = RelevanceFilter::new(&["  Charger ".to_string(), String::new()], &translits);

        assert!(filter.is_relevant("xiaomi redmi", "هاتف شاومي نوت 13"));
        assert!(!filter.is_relevant("xiaomi", "Xiaomi 67W CHARGER"));
        assert_eq!(filter.negative_match("usb charger"), Some("charger"));
    }
}
