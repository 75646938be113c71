//! Parsing error types for storefront extraction
//!
//! Fragment-level gaps (missing node, irrelevant card, unusable price) are
//! recoverable: the affected candidate or attribute is skipped. Selector and
//! configuration errors surface when a parser is built.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParsingError {
    #[error("Required field '{field}' not found in HTML")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },

    #[error("Candidate '{title}' is not relevant to query '{query}'")]
    IrrelevantCandidate { title: String, query: String },

    #[error("No usable price in '{raw}'")]
    UnusablePrice { raw: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String, field: String },
}

impl ParsingError {
    /// Create a required field missing error with context
    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(ToString::to_string),
        }
    }

    pub fn invalid_selector(selector: &str, reason: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unusable_price(raw: &str) -> Self {
        Self::UnusablePrice {
            raw: raw.chars().take(80).collect(),
        }
    }

    pub fn configuration(field: &str, message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            field: field.to_string(),
        }
    }

    /// Check if this error only affects a single candidate or attribute
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::RequiredFieldMissing { .. }
            | Self::UrlResolutionFailed { .. }
            | Self::IrrelevantCandidate { .. }
            | Self::UnusablePrice { .. } => true,
            Self::InvalidSelector { .. } | Self::ConfigurationError { .. } => false,
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_errors_are_recoverable() {
        assert!(ParsingError::required_field_missing("title", Some("article")).is_recoverable());
        assert!(ParsingError::unusable_price("call for price").is_recoverable());
        assert!(!ParsingError::invalid_selector("h2 >>", "bad combinator").is_recoverable());
        assert!(!ParsingError::configuration("max_results", "must be positive").is_recoverable());
    }

    #[test]
    fn test_unusable_price_truncates_long_blobs() {
        let blob = "x".repeat(500);
        match ParsingError::unusable_price(&blob) {
            ParsingError::UnusablePrice { raw } => assert_eq!(raw.len(), 80),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
