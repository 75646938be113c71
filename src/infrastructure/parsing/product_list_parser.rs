//! Listing extraction for search result pages
//!
//! Walks listing cards in document order. Each card must yield an absolute
//! URL, a title that passes the relevance filter and a positive price;
//! cards that fall short are skipped with a debug log and never abort the
//! page.

#![allow(clippy::uninlined_format_args)]

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::config::{ListingSelectors, PriceSource};
use super::context::SearchContext;
use super::price::{parse_price, PriceScanner};
use super::relevance::RelevanceFilter;
use super::text::{clean_text, element_text};
use super::{compile_selectors, select_first, ContextualParser, ParsingError, ParsingResult};
use crate::domain::product::ProductRecord;

enum CompiledPrice {
    Element(Vec<Selector>),
    CardText,
}

/// Parser for extracting product candidates from search result pages
pub struct ProductListParser {
    card_selectors: Vec<Selector>,
    link_selectors: Vec<Selector>,
    title_selectors: Vec<Selector>,
    title_attribute: Option<String>,
    price: CompiledPrice,
    relevance: RelevanceFilter,
    scanner: PriceScanner,
}

impl ProductListParser {
    pub fn new(
        selectors: &ListingSelectors,
        relevance: RelevanceFilter,
        scanner: PriceScanner,
    ) -> ParsingResult<Self> {
        if selectors.title.is_empty() && selectors.title_attribute.is_none() {
            return Err(ParsingError::configuration(
                "listing.title",
                "either title selectors or a title attribute is required",
            ));
        }

        let price = match &selectors.price {
            PriceSource::Element { selectors } => CompiledPrice::Element(compile_selectors("price", selectors)?),
            PriceSource::CardText => CompiledPrice::CardText,
        };

        Ok(Self {
            card_selectors: compile_selectors("card", &selectors.card)?,
            link_selectors: compile_selectors("link", &selectors.link)?,
            title_selectors: compile_selectors("title", &selectors.title)?,
            title_attribute: selectors.title_attribute.clone(),
            price,
            relevance,
            scanner,
        })
    }

    /// Cards matched by the first card selector that matches anything
    fn candidate_cards<'a>(&self, html: &'a Html) -> Option<(usize, Vec<ElementRef<'a>>)> {
        self.card_selectors
            .iter()
            .enumerate()
            .map(|(index, selector)| (index, html.select(selector).collect::<Vec<_>>()))
            .find(|(_, cards)| !cards.is_empty())
    }

    fn extract_candidate(&self, card: &ElementRef<'_>, context: &SearchContext) -> ParsingResult<ProductRecord> {
        let link = select_first(card, &self.link_selectors)
            .ok_or_else(|| ParsingError::required_field_missing("link", Some("listing card")))?;

        let href = link
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or_else(|| ParsingError::required_field_missing("href", Some("listing link")))?;
        let url = resolve_url(&context.base_url, href)?;

        let title = self
            .extract_title(card, &link)
            .ok_or_else(|| ParsingError::required_field_missing("title", Some(url.as_str())))?;

        if !self.relevance.is_relevant(&context.query, &title) {
            return Err(ParsingError::IrrelevantCandidate {
                title,
                query: context.query.clone(),
            });
        }

        let (price, currency) = self.extract_price(card, context)?;

        Ok(ProductRecord::new(url, context.source_website.clone(), title, price, currency))
    }

    /// Title node inside the link, then the link attribute, then inside the card
    fn extract_title(&self, card: &ElementRef<'_>, link: &ElementRef<'_>) -> Option<String> {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };

        select_first(link, &self.title_selectors)
            .map(|node| element_text(&node))
            .and_then(non_empty)
            .or_else(|| {
                self.title_attribute
                    .as_deref()
                    .and_then(|attr| link.value().attr(attr))
                    .map(clean_text)
                    .and_then(non_empty)
            })
            .or_else(|| {
                select_first(card, &self.title_selectors)
                    .map(|node| element_text(&node))
                    .and_then(non_empty)
            })
    }

    fn extract_price(&self, card: &ElementRef<'_>, context: &SearchContext) -> ParsingResult<(f64, String)> {
        match &self.price {
            CompiledPrice::Element(selectors) => {
                let raw = select_first(card, selectors)
                    .map(|node| element_text(&node))
                    .ok_or_else(|| ParsingError::required_field_missing("price", Some("listing card")))?;
                let amount = parse_price(&raw);
                if amount > 0.0 {
                    Ok((amount, context.default_currency.clone()))
                } else {
                    Err(ParsingError::unusable_price(&raw))
                }
            }
            CompiledPrice::CardText => {
                let text = card_text(card);
                match self.scanner.scan(&text) {
                    Some(found) if found.amount > 0.0 => Ok((found.amount, found.currency)),
                    _ => Err(ParsingError::unusable_price(&text)),
                }
            }
        }
    }
}

impl ContextualParser for ProductListParser {
    type Output = Vec<ProductRecord>;
    type Context = SearchContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        let mut records = Vec::new();
        if context.max_results == 0 {
            return Ok(records);
        }

        let Some((selector_index, cards)) = self.candidate_cards(html) else {
            warn!(
                "No listing cards found for '{}' on {} ({} card selectors tried)",
                context.query,
                context.site,
                self.card_selectors.len()
            );
            return Ok(records);
        };

        debug!(
            "Found {} listing cards on {} using card selector {}",
            cards.len(),
            context.site,
            selector_index
        );

        for (index, card) in cards.iter().enumerate() {
            match self.extract_candidate(card, context) {
                Ok(record) => {
                    records.push(record);
                    if records.len() >= context.max_results {
                        break;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    debug!("Skipping card {} on {}: {}", index, context.site, e);
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "Extracted {} of {} cards for '{}' on {}",
            records.len(),
            cards.len(),
            context.query,
            context.site
        );

        Ok(records)
    }
}

/// Resolve a listing href against the site origin; only web URLs are kept
fn resolve_url(base: &Url, href: &str) -> ParsingResult<String> {
    let resolved = base.join(href).map_err(|e| ParsingError::UrlResolutionFailed {
        url: href.to_string(),
        reason: e.to_string(),
        base_url: Some(base.to_string()),
    })?;

    match resolved.scheme() {
        "http" | "https" => Ok(resolved.into()),
        scheme => Err(ParsingError::UrlResolutionFailed {
            url: href.to_string(),
            reason: format!("unsupported scheme '{}'", scheme),
            base_url: Some(base.to_string()),
        }),
    }
}

/// Card text with text nodes separated, so adjacent spans don't fuse
fn card_text(card: &ElementRef<'_>) -> String {
    clean_text(&card.text().collect::<Vec<_>>().join(" "))
}
