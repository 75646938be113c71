//! Specification extraction for product detail pages
//!
//! Strategies run in their configured order and the first one that yields a
//! non-empty map wins. Results are never merged across strategies: a page
//! template exposes one of these structures, and mixing them would pair
//! labels and values from unrelated regions.

#![allow(clippy::uninlined_format_args)]

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::config::SpecStrategy;
use super::context::DetailParseContext;
use super::text::{clean_key, element_text};
use super::{compile_selector, compile_selectors, ContextualParser, ParsingResult};
use crate::domain::product::Specifications;

enum CompiledStrategy {
    HeaderValueTable { rows: Vec<Selector> },
    TwoCellTable { rows: Vec<Selector> },
    DefinitionList { terms: Selector, descriptions: Selector },
    FeatureBullets {
        items: Vec<Selector>,
        key: String,
        separator: String,
    },
}

impl CompiledStrategy {
    fn compile(strategy: &SpecStrategy) -> ParsingResult<Self> {
        Ok(match strategy {
            SpecStrategy::HeaderValueTable { rows } => Self::HeaderValueTable {
                rows: compile_selectors("header_value_table.rows", rows)?,
            },
            SpecStrategy::TwoCellTable { rows } => Self::TwoCellTable {
                rows: compile_selectors("two_cell_table.rows", rows)?,
            },
            SpecStrategy::DefinitionList { terms, descriptions } => Self::DefinitionList {
                terms: compile_selector("definition_list.terms", terms)?,
                descriptions: compile_selector("definition_list.descriptions", descriptions)?,
            },
            SpecStrategy::FeatureBullets { items, key, separator } => Self::FeatureBullets {
                items: compile_selectors("feature_bullets.items", items)?,
                key: key.clone(),
                separator: separator.clone(),
            },
        })
    }

    fn extract(&self, html: &Html) -> Specifications {
        match self {
            Self::HeaderValueTable { rows } => collect_rows(html, rows, header_value_pair),
            Self::TwoCellTable { rows } => collect_rows(html, rows, two_cell_pair),
            Self::DefinitionList { terms, descriptions } => definition_pairs(html, terms, descriptions),
            Self::FeatureBullets { items, key, separator } => feature_bullets(html, items, key, separator),
        }
    }
}

/// Parser for extracting specifications from product detail pages
pub struct ProductDetailParser {
    strategies: Vec<(&'static str, CompiledStrategy)>,
}

impl ProductDetailParser {
    pub fn new(strategies: &[SpecStrategy]) -> ParsingResult<Self> {
        let strategies = strategies
            .iter()
            .map(|strategy| Ok((strategy.name(), CompiledStrategy::compile(strategy)?)))
            .collect::<ParsingResult<Vec<_>>>()?;
        Ok(Self { strategies })
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }
}

impl ContextualParser for ProductDetailParser {
    type Output = Specifications;
    type Context = DetailParseContext;

    fn parse_with_context(&self, html: &Html, context: &Self::Context) -> ParsingResult<Self::Output> {
        for (name, strategy) in &self.strategies {
            let specs = strategy.extract(html);
            if !specs.is_empty() {
                debug!(
                    "Extracted {} specifications from {} via {}",
                    specs.len(),
                    context.url,
                    name
                );
                return Ok(specs);
            }
        }

        debug!("No specification structure recognized on {} ({})", context.url, context.site);
        Ok(Specifications::new())
    }
}

fn insert_pair(specs: &mut Specifications, key: &ElementRef<'_>, value: &ElementRef<'_>) {
    let key = clean_key(&key.text().collect::<String>());
    let value = element_text(value);
    if !key.is_empty() && !value.is_empty() {
        specs.insert(key, value);
    }
}

/// Direct child cells of a row with the given tag name
fn cells<'a>(row: ElementRef<'a>, tag: &'static str) -> impl Iterator<Item = ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(move |cell| cell.value().name() == tag)
}

/// Rows come from the first selector that matches anything
fn collect_rows(
    html: &Html,
    row_selectors: &[Selector],
    pair: for<'a> fn(&ElementRef<'a>) -> Option<(ElementRef<'a>, ElementRef<'a>)>,
) -> Specifications {
    let mut specs = Specifications::new();
    let rows = row_selectors
        .iter()
        .map(|selector| html.select(selector).collect::<Vec<_>>())
        .find(|rows| !rows.is_empty())
        .unwrap_or_default();

    for row in &rows {
        if let Some((key, value)) = pair(row) {
            insert_pair(&mut specs, &key, &value);
        }
    }
    specs
}

fn header_value_pair<'a>(row: &ElementRef<'a>) -> Option<(ElementRef<'a>, ElementRef<'a>)> {
    let header = cells(*row, "th").next()?;
    let value = cells(*row, "td").next()?;
    Some((header, value))
}

fn two_cell_pair<'a>(row: &ElementRef<'a>) -> Option<(ElementRef<'a>, ElementRef<'a>)> {
    if cells(*row, "th").next().is_some() {
        return None;
    }
    let mut tds = cells(*row, "td");
    match (tds.next(), tds.next(), tds.next()) {
        (Some(key), Some(value), None) => Some((key, value)),
        _ => None,
    }
}

fn definition_pairs(html: &Html, terms: &Selector, descriptions: &Selector) -> Specifications {
    let terms: Vec<_> = html.select(terms).collect();
    let descriptions: Vec<_> = html.select(descriptions).collect();

    let mut specs = Specifications::new();
    if terms.is_empty() || terms.len() != descriptions.len() {
        return specs;
    }
    for (term, description) in terms.iter().zip(&descriptions) {
        insert_pair(&mut specs, term, description);
    }
    specs
}

fn feature_bullets(html: &Html, items: &[Selector], key: &str, separator: &str) -> Specifications {
    let bullets: Vec<String> = items
        .iter()
        .map(|selector| {
            html.select(selector)
                .map(|item| element_text(&item))
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
        })
        .find(|bullets| !bullets.is_empty())
        .unwrap_or_default();

    let mut specs = Specifications::new();
    if !bullets.is_empty() && !key.is_empty() {
        specs.insert(key.to_string(), bullets.join(separator));
    }
    specs
}
