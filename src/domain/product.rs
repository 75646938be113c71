use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Attribute name -> attribute value pairs extracted from a product page.
///
/// Partial by nature: a missing key means "unknown", not "false".
pub type Specifications = BTreeMap<String, String>;

/// Currency assumed when a price carries no recognizable marker
pub const DEFAULT_CURRENCY: &str = "EGP";

/// Records returned by one search on one site unless configured otherwise
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Storefronts with a built-in adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteId {
    Amazon,
    Btech,
}

impl SiteId {
    pub const ALL: [Self; 2] = [Self::Amazon, Self::Btech];

    /// Human-readable label stored as `source_website`
    pub const fn label(self) -> &'static str {
        match self {
            Self::Amazon => "Amazon Egypt",
            Self::Btech => "B.TECH",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amazon => "amazon",
            Self::Btech => "btech",
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "amazon" | "amazon.eg" | "amazon egypt" => Ok(Self::Amazon),
            "btech" | "b.tech" | "btech.com" => Ok(Self::Btech),
            other => Err(format!("unknown site '{other}'")),
        }
    }
}

/// Canonical product observation, keyed by `url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Absolute product URL; the identity key
    pub url: String,
    /// Site label, fixed for a given url
    pub source_website: String,
    pub product_name: String,
    /// Positive price magnitude in `currency`
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub specifications: Specifications,
    #[serde(default = "default_available")]
    pub is_available: bool,
    pub scraped_at: DateTime<Utc>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

const fn default_available() -> bool {
    true
}

impl ProductRecord {
    /// Fresh observation with no specifications, available, stamped now
    pub fn new(
        url: impl Into<String>,
        source_website: impl Into<String>,
        product_name: impl Into<String>,
        price: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            source_website: source_website.into(),
            product_name: product_name.into(),
            price,
            currency: currency.into(),
            specifications: Specifications::new(),
            is_available: true,
            scraped_at: Utc::now(),
        }
    }

    pub fn with_specifications(mut self, specifications: Specifications) -> Self {
        self.specifications = specifications;
        self
    }

    pub fn with_scraped_at(mut self, scraped_at: DateTime<Utc>) -> Self {
        self.scraped_at = scraped_at;
        self
    }

    /// Fold detail-page attributes into this observation; incoming values win
    pub fn absorb_specifications(&mut self, specifications: Specifications) {
        self.specifications.extend(specifications);
    }

    /// Minimum bar for a record to leave the listing extractor or enter the store
    pub fn is_valid(&self) -> bool {
        !self.url.is_empty()
            && !self.product_name.trim().is_empty()
            && self.price.is_finite()
            && self.price > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_id_round_trips_through_str() {
        for site in SiteId::ALL {
            assert_eq!(site.as_str().parse::<SiteId>().unwrap(), site);
        }
        assert_eq!("B.TECH".parse::<SiteId>().unwrap(), SiteId::Btech);
        assert!("noon".parse::<SiteId>().is_err());
    }

    #[test]
    fn test_new_record_defaults() {
        let record = ProductRecord::new("https://btech.com/en/p/x", "B.TECH", "Laptop", 100.0, "EGP");
        assert!(record.is_available);
        assert!(record.specifications.is_empty());
        assert!(record.is_valid());
    }

    #[test]
    fn test_non_positive_price_is_invalid() {
        let zero = ProductRecord::new("https://a.b/c", "B.TECH", "Laptop", 0.0, "EGP");
        let nan = ProductRecord::new("https://a.b/c", "B.TECH", "Laptop", f64::NAN, "EGP");
        assert!(!zero.is_valid());
        assert!(!nan.is_valid());
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let json = r#"{
            "url": "https://www.amazon.eg/dp/B0D3J7ZX58",
            "source_website": "Amazon Egypt",
            "product_name": "Lenovo IdeaPad Slim 3",
            "price": 18999.0,
            "scraped_at": "2026-10-14T09:30:00Z"
        }"#;
        let record: ProductRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.currency, "EGP");
        assert!(record.is_available);
        assert!(record.specifications.is_empty());
    }

    #[test]
    fn test_absorb_specifications_overwrites_collisions() {
        let mut record = ProductRecord::new("https://a.b/c", "B.TECH", "Laptop", 10.0, "EGP");
        record.specifications.insert("RAM".into(), "8GB".into());
        record.absorb_specifications(Specifications::from([
            ("RAM".to_string(), "16GB".to_string()),
            ("Storage".to_string(), "512GB".to_string()),
        ]));
        assert_eq!(record.specifications["RAM"], "16GB");
        assert_eq!(record.specifications["Storage"], "512GB");
    }
}
