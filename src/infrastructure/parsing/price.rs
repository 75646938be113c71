//! Price normalization
//!
//! [`parse_price`] turns a raw price fragment into a positive magnitude, `0.0`
//! meaning "unusable". [`PriceScanner`] finds a price embedded in a larger
//! text blob by looking for a currency marker followed by a digit run.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{ParsingError, ParsingResult};

/// Maps Arabic-Indic and Extended Arabic-Indic digits to ASCII and the
/// Arabic decimal separator to '.'
fn fold_char(c: char) -> char {
    match c {
        '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
        '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
        '\u{066B}' => '.',
        other => other,
    }
}

/// Normalize raw price text into a number; `0.0` signals "unusable".
///
/// Grouping separators and any character that is neither a digit nor a
/// decimal point are dropped. Parsing stops before a second decimal point
/// so a whole span followed by a fraction span ("12,499." + "99") still
/// yields the whole value.
pub fn parse_price(raw: &str) -> f64 {
    let kept: String = raw
        .chars()
        .map(fold_char)
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    // Markers such as "ج.م" leave a stray leading point behind
    let kept = kept.trim_start_matches('.');

    let prefix = match kept.match_indices('.').nth(1) {
        Some((second_dot, _)) => &kept[..second_dot],
        None => kept,
    };
    let prefix = prefix.trim_end_matches('.');

    if prefix.is_empty() {
        return 0.0;
    }

    match prefix.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

/// A currency marker as it appears in page text, with the code it stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyMarker {
    pub marker: String,
    pub currency: String,
}

impl CurrencyMarker {
    pub fn new(marker: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            currency: currency.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScannedPrice {
    pub amount: f64,
    pub currency: String,
}

/// Scans free text for `<marker> <digits>` and reports the first hit
#[derive(Debug, Clone)]
pub struct PriceScanner {
    pattern: Regex,
    markers: Vec<CurrencyMarker>,
}

impl PriceScanner {
    pub fn new(markers: &[CurrencyMarker]) -> ParsingResult<Self> {
        let mut markers: Vec<CurrencyMarker> = markers
            .iter()
            .filter(|m| !m.marker.trim().is_empty())
            .cloned()
            .collect();

        if markers.is_empty() {
            return Err(ParsingError::configuration(
                "currency_markers",
                "at least one currency marker is required",
            ));
        }

        // Longest first so "ج.م" is not shadowed by a shorter overlapping marker
        markers.sort_by_key(|m| std::cmp::Reverse(m.marker.chars().count()));

        let alternatives = markers
            .iter()
            .map(|m| regex::escape(m.marker.trim()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?i)\b({alternatives})\s*(\d[\d,٬]*(?:[.٫]\d+)?)");

        let pattern = Regex::new(&pattern)
            .map_err(|e| ParsingError::configuration("currency_markers", &e.to_string()))?;

        Ok(Self { pattern, markers })
    }

    /// First marker + digit-run match in text order
    pub fn scan(&self, text: &str) -> Option<ScannedPrice> {
        let captures = self.pattern.captures(text)?;
        let marker = captures.get(1)?.as_str();
        let amount = parse_price(captures.get(2)?.as_str());

        let currency = self
            .markers
            .iter()
            .find(|m| m.marker.trim().to_lowercase() == marker.to_lowercase())
            .map(|m| m.currency.clone())?;

        Some(ScannedPrice { amount, currency })
    }

    pub fn markers(&self) -> &[CurrencyMarker] {
        &self.markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::defaults;
    use rstest::rstest;

    #[rstest]
    #[case("1,250.50", 1250.50)]
    #[case("EGP 12,499 only", 12499.0)]
    #[case("1,250.50 EGP", 1250.50)]
    #[case("12,499.", 12499.0)]
    #[case("12,499.99.00", 12499.99)]
    #[case("\u{00A0}3\u{202F}999", 3999.0)]
    #[case("١٢٬٤٩٩٫٥٠ جنيه", 12499.50)]
    #[case("ج.م 8,750", 8750.0)]
    fn test_parse_price_values(#[case] raw: &str, #[case] expected: f64) {
        assert!((parse_price(raw) - expected).abs() < f64::EPSILON, "{raw:?} -> {}", parse_price(raw));
    }

    #[rstest]
    #[case("")]
    #[case("Currently unavailable")]
    #[case("...")]
    #[case("0.00")]
    #[case("EGP 0")]
    fn test_parse_price_unusable(#[case] raw: &str) {
        assert_eq!(parse_price(raw), 0.0);
    }

    fn scanner() -> PriceScanner {
        PriceScanner::new(&defaults::currency_markers()).unwrap()
    }

    #[test]
    fn test_scan_takes_first_mention() {
        let found = scanner()
            .scan("Lenovo IdeaPad Slim 3 Save 10% EGP 21,999 EGP 24,999")
            .unwrap();
        assert_eq!(found.amount, 21999.0);
        assert_eq!(found.currency, "EGP");
    }

    #[test]
    fn test_scan_is_case_insensitive_and_maps_currency() {
        let found = scanner().scan("price: le 4,500").unwrap();
        assert_eq!(found.amount, 4500.0);
        assert_eq!(found.currency, "EGP");

        let arabic = scanner().scan("السعر ١٥٬٠٠٠ جنيه أو جنيه ١٥٬٠٠٠").unwrap();
        assert_eq!(arabic.amount, 15000.0);
    }

    #[test]
    fn test_scan_without_marker_is_none() {
        assert!(scanner().scan("Lenovo IdeaPad 15,999").is_none());
    }

    #[test]
    fn test_scanner_requires_markers() {
        assert!(PriceScanner::new(&[]).is_err());
        assert!(PriceScanner::new(&[CurrencyMarker::new("  ", "EGP")]).is_err());
    }
}
