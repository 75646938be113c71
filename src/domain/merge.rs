//! Product record merge policy
//!
//! Specifications accumulate across observations (fresh values win on key
//! collision); price, availability, currency, name and timestamp are
//! point-in-time facts and always come from the fresh observation. `url`
//! and `source_website` are identity fields and keep their stored values.

use tracing::warn;

use super::product::ProductRecord;

/// Combine a stored record (if any) with a fresh observation of the same URL
pub fn merge(existing: Option<&ProductRecord>, fresh: ProductRecord) -> ProductRecord {
    let Some(existing) = existing else {
        return fresh;
    };

    if existing.url != fresh.url {
        warn!(
            "Refusing to merge records with different urls: stored={} fresh={}",
            existing.url, fresh.url
        );
        return fresh;
    }

    let mut specifications = existing.specifications.clone();
    specifications.extend(fresh.specifications);

    ProductRecord {
        url: existing.url.clone(),
        source_website: existing.source_website.clone(),
        product_name: fresh.product_name,
        price: fresh.price,
        currency: fresh.currency,
        specifications,
        is_available: fresh.is_available,
        scraped_at: fresh.scraped_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::Specifications;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    const URL: &str = "https://btech.com/en/p/lenovo-ideapad-slim-3";

    fn record(specs: &[(&str, &str)]) -> ProductRecord {
        ProductRecord::new(URL, "B.TECH", "Lenovo IdeaPad Slim 3", 18_999.0, "EGP").with_specifications(
            specs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_merge_without_existing_returns_fresh() {
        let fresh = record(&[("RAM", "8GB")]);
        assert_eq!(merge(None, fresh.clone()), fresh);
    }

    #[test]
    fn test_merge_accumulates_specifications() {
        let merged = merge(Some(&record(&[("RAM", "8GB")])), record(&[("Storage", "256GB")]));
        let expected = Specifications::from([
            ("RAM".to_string(), "8GB".to_string()),
            ("Storage".to_string(), "256GB".to_string()),
        ]);
        assert_eq!(merged.specifications, expected);
    }

    #[test]
    fn test_merge_fresh_value_wins_on_collision() {
        let merged = merge(Some(&record(&[("RAM", "8GB")])), record(&[("RAM", "16GB")]));
        assert_eq!(merged.specifications["RAM"], "16GB");
    }

    #[test]
    fn test_merge_overwrites_point_in_time_fields() {
        let mut existing = record(&[]);
        existing.scraped_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let mut fresh = record(&[]);
        fresh.price = 17_499.0;
        fresh.is_available = false;
        fresh.currency = "USD".into();
        fresh.product_name = "Lenovo IdeaPad Slim 3 (2026)".into();
        fresh.scraped_at = Utc.with_ymd_and_hms(2026, 10, 14, 12, 0, 0).unwrap();

        let merged = merge(Some(&existing), fresh.clone());
        assert_eq!(merged.price, 17_499.0);
        assert!(!merged.is_available);
        assert_eq!(merged.currency, "USD");
        assert_eq!(merged.product_name, fresh.product_name);
        assert_eq!(merged.scraped_at, fresh.scraped_at);
    }

    #[test]
    fn test_merge_keeps_identity_fields() {
        let existing = record(&[]);
        let mut fresh = record(&[]);
        fresh.source_website = "Somewhere else".into();

        let merged = merge(Some(&existing), fresh);
        assert_eq!(merged.url, URL);
        assert_eq!(merged.source_website, "B.TECH");
    }

    #[test]
    fn test_merge_with_mismatched_url_keeps_fresh() {
        let existing = record(&[("RAM", "8GB")]);
        let mut fresh = record(&[]);
        fresh.url = "https://btech.com/en/p/other".into();

        let merged = merge(Some(&existing), fresh.clone());
        assert_eq!(merged, fresh);
    }

    fn spec_map() -> impl Strategy<Value = Specifications> {
        prop::collection::btree_map("[A-Za-z ]{1,12}", "[A-Za-z0-9 ]{1,12}", 0..6)
    }

    proptest! {
        #[test]
        fn prop_merge_is_idempotent_for_repeated_observation(
            a_specs in spec_map(),
            b_specs in spec_map(),
            price in 1.0f64..1_000_000.0,
            available in any::<bool>(),
        ) {
            let a = record(&[]).with_specifications(a_specs);
            let mut b = record(&[]).with_specifications(b_specs);
            b.price = price;
            b.is_available = available;

            let once = merge(Some(&a), b.clone());
            let twice = merge(Some(&once), b);
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn prop_merge_keeps_every_key_from_both_sides(
            a_specs in spec_map(),
            b_specs in spec_map(),
        ) {
            let a = record(&[]).with_specifications(a_specs.clone());
            let b = record(&[]).with_specifications(b_specs.clone());
            let merged = merge(Some(&a), b);

            for key in a_specs.keys().chain(b_specs.keys()) {
                prop_assert!(merged.specifications.contains_key(key));
            }
            for (key, value) in &b_specs {
                prop_assert_eq!(&merged.specifications[key], value);
            }
        }
    }
}
