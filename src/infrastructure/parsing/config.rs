//! Per-site extraction profiles
//!
//! Each storefront is described by data: where to search, which nodes form
//! a listing card, and the ordered specification strategies for its detail
//! pages. Every selector field is a fallback list; the first entry that
//! matches wins.

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::{ParsingError, ParsingResult};
use crate::domain::product::SiteId;

/// Placeholder replaced by the encoded query in [`SiteProfile::search_url_pattern`]
pub const QUERY_PLACEHOLDER: &str = "{query}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub site: SiteId,
    /// Persisted as `source_website`
    pub label: String,
    /// Origin that relative listing links resolve against
    pub base_url: String,
    pub search_url_pattern: String,
    pub listing: ListingSelectors,
    /// Tried in order, stopping at the first non-empty result
    pub specifications: Vec<SpecStrategy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSelectors {
    pub card: Vec<String>,
    pub link: Vec<String>,
    /// Looked up inside the link first, then inside the card
    pub title: Vec<String>,
    /// Link attribute used when no title node is found
    #[serde(default)]
    pub title_attribute: Option<String>,
    pub price: PriceSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSource {
    /// First matching element's text through the price normalizer
    Element { selectors: Vec<String> },
    /// Currency-marker scan over the whole card text
    CardText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecStrategy {
    /// Rows with a header cell and a value cell
    HeaderValueTable { rows: Vec<String> },
    /// Rows with exactly two plain cells and no header cell
    TwoCellTable { rows: Vec<String> },
    /// Parallel term/description sequences of equal, non-zero length
    DefinitionList { terms: String, descriptions: String },
    /// Descriptive bullets joined into one synthetic entry
    FeatureBullets {
        items: Vec<String>,
        key: String,
        separator: String,
    },
}

impl SpecStrategy {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::HeaderValueTable { .. } => "header_value_table",
            Self::TwoCellTable { .. } => "two_cell_table",
            Self::DefinitionList { .. } => "definition_list",
            Self::FeatureBullets { .. } => "feature_bullets",
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl SiteProfile {
    pub fn amazon() -> Self {
        Self {
            site: SiteId::Amazon,
            label: SiteId::Amazon.label().to_string(),
            base_url: "https://www.amazon.eg".to_string(),
            search_url_pattern: "https://www.amazon.eg/-/en/s?k={query}".to_string(),
            listing: ListingSelectors {
                card: strings(&[r#"div[data-component-type="s-search-result"]"#]),
                link: strings(&["h2 a", "a.a-link-normal.s-line-clamp-2"]),
                title: strings(&["span", "h2 span"]),
                title_attribute: None,
                price: PriceSource::Element {
                    selectors: strings(&["span.a-price-whole"]),
                },
            },
            specifications: vec![
                SpecStrategy::HeaderValueTable {
                    rows: strings(&["#productDetails_techSpec_section_1 tr"]),
                },
                SpecStrategy::TwoCellTable {
                    rows: strings(&[".a-normal.a-spacing-micro tr"]),
                },
                SpecStrategy::FeatureBullets {
                    items: strings(&["#feature-bullets li span.a-list-item"]),
                    key: "About".to_string(),
                    separator: " | ".to_string(),
                },
            ],
        }
    }

    pub fn btech() -> Self {
        Self {
            site: SiteId::Btech,
            label: SiteId::Btech.label().to_string(),
            base_url: "https://btech.com".to_string(),
            search_url_pattern: "https://btech.com/en/s?q={query}".to_string(),
            listing: ListingSelectors {
                card: strings(&["article"]),
                link: strings(&["a"]),
                title: strings(&["h2"]),
                title_attribute: Some("title".to_string()),
                price: PriceSource::CardText,
            },
            specifications: vec![
                SpecStrategy::HeaderValueTable {
                    rows: strings(&["table tr"]),
                },
                SpecStrategy::TwoCellTable {
                    rows: strings(&["table tr"]),
                },
                SpecStrategy::DefinitionList {
                    terms: "dt".to_string(),
                    descriptions: "dd".to_string(),
                },
            ],
        }
    }

    pub fn for_site(site: SiteId) -> Self {
        match site {
            SiteId::Amazon => Self::amazon(),
            SiteId::Btech => Self::btech(),
        }
    }

    /// Search page URL with the query form-encoded into the pattern
    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        self.search_url_pattern.replace(QUERY_PLACEHOLDER, &encoded)
    }

    pub fn base(&self) -> ParsingResult<Url> {
        Url::parse(&self.base_url).map_err(|e| ParsingError::UrlResolutionFailed {
            url: self.base_url.clone(),
            reason: e.to_string(),
            base_url: None,
        })
    }

    pub fn validate(&self) -> ParsingResult<()> {
        self.base()?;

        if !self.search_url_pattern.contains(QUERY_PLACEHOLDER) {
            return Err(ParsingError::configuration(
                "search_url_pattern",
                format!("{} pattern is missing {QUERY_PLACEHOLDER}", self.label),
            ));
        }
        if self.listing.card.is_empty() {
            return Err(ParsingError::configuration("listing.card", format!("{} has no card selectors", self.label)));
        }
        if self.listing.link.is_empty() {
            return Err(ParsingError::configuration("listing.link", format!("{} has no link selectors", self.label)));
        }
        if let PriceSource::Element { selectors } = &self.listing.price {
            if selectors.is_empty() {
                return Err(ParsingError::configuration("listing.price", format!("{} has no price selectors", self.label)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_query() {
        let amazon = SiteProfile::amazon();
        assert_eq!(amazon.search_url("Lenovo IdeaPad"), "https://www.amazon.eg/-/en/s?k=Lenovo+IdeaPad");

        let btech = SiteProfile::btech();
        assert_eq!(btech.search_url(" a&b "), "https://btech.com/en/s?q=a%26b");
    }

    #[test]
    fn test_builtin_profiles_validate() {
        for site in SiteId::ALL {
            let profile = SiteProfile::for_site(site);
            assert_eq!(profile.site, site);
            profile.validate().unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_missing_placeholder() {
        let mut profile = SiteProfile::btech();
        profile.search_url_pattern = "https://btech.com/en/s".to_string();
        assert!(matches!(profile.validate(), Err(ParsingError::ConfigurationError { .. })));
    }

    #[test]
    fn test_profile_serde_shape() {
        let json = serde_json::to_value(SiteProfile::btech()).unwrap();
        assert_eq!(json["site"], "btech");
        assert_eq!(json["listing"]["price"]["kind"], "card_text");
        assert_eq!(json["specifications"][2]["kind"], "definition_list");

        let back: SiteProfile = serde_json::from_value(json).unwrap();
        assert_eq!(back, SiteProfile::btech());
    }
}
