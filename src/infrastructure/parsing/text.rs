//! Text cleanup for extracted fragments

use scraper::ElementRef;

/// Bidirectional formatting characters storefronts sprinkle into RTL/LTR text
pub const fn is_bidi_control(c: char) -> bool {
    matches!(
        c,
        '\u{200E}' | '\u{200F}' | '\u{061C}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{FEFF}'
    )
}

pub fn strip_bidi(s: &str) -> String {
    s.chars().filter(|c| !is_bidi_control(*c)).collect()
}

/// Collapse whitespace runs to a single space and trim
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Value cleanup: bidi controls removed, whitespace collapsed
pub fn clean_text(s: &str) -> String {
    normalize_ws(&strip_bidi(s))
}

/// Key cleanup: as [`clean_text`], plus trailing label colons.
///
/// Normalization covers whitespace, bidi marks and the trailing colon only.
/// Case is kept as the page shows it, so `"RAM"` and the synthetic `"About"`
/// key stay readable in stored records.
pub fn clean_key(s: &str) -> String {
    clean_text(s).trim_end_matches([':', '：']).trim_end().to_string()
}

/// Concatenated, cleaned text content of an element
pub fn element_text(element: &ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_strip_bidi_removes_direction_marks() {
        assert_eq!(strip_bidi("\u{200E}Lenovo\u{200F}"), "Lenovo");
        assert_eq!(strip_bidi("\u{202B}8 GB\u{202C}"), "8 GB");
    }

    #[test]
    fn test_normalize_ws_collapses_runs() {
        assert_eq!(normalize_ws("  Intel \n\t Core   i5  "), "Intel Core i5");
        assert_eq!(normalize_ws("\u{00A0}15.6\u{00A0}inch"), "15.6 inch");
        assert_eq!(normalize_ws("   "), "");
    }

    #[test]
    fn test_clean_key_drops_trailing_colon() {
        assert_eq!(clean_key(" \u{200F}Brand : "), "Brand");
        assert_eq!(clean_key("Operating System:"), "Operating System");
    }

    #[test]
    fn test_clean_key_keeps_source_case() {
        assert_eq!(clean_key("  About\u{200E} "), "About");
        assert_eq!(clean_key("RAM Memory Installed Size :"), "RAM Memory Installed Size");
        assert_ne!(clean_key("Brand"), clean_key("brand"));
    }

    #[test]
    fn test_element_text_concatenates_descendants() {
        let html = Html::parse_document(
            "<table><tr><td>\n  <span>\u{200E}Intel</span> <b>Core i3</b>\n</td></tr></table>",
        );
        let selector = Selector::parse("td").unwrap();
        let td = html.select(&selector).next().unwrap();
        assert_eq!(element_text(&td), "Intel Core i3");
    }
}
