//! Extraction throughput over saved search and product pages

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use price_scout::infrastructure::parsing::{SiteAdapter, SiteProfile};
use price_scout::infrastructure::ScraperConfig;

const AMAZON_SEARCH: &str = include_str!("../tests/fixtures/amazon_search.html");
const BTECH_SEARCH: &str = include_str!("../tests/fixtures/btech_search.html");
const BTECH_PRODUCT_DL: &str = include_str!("../tests/fixtures/btech_product_dl.html");

/// Search page with `copies` repetitions of the fixture's card grid
fn inflate(markup: &str, copies: usize) -> String {
    let (head, rest) = markup.split_once("<body>").unwrap_or(("", markup));
    let (body, tail) = rest.split_once("</body>").unwrap_or((rest, ""));
    format!("{head}<body>{}</body>{tail}", body.repeat(copies))
}

fn listing_extraction(c: &mut Criterion) {
    let config = ScraperConfig {
        max_results: 50,
        ..ScraperConfig::default()
    };
    let amazon = SiteAdapter::new(SiteProfile::amazon(), &config).unwrap();
    let btech = SiteAdapter::new(SiteProfile::btech(), &config).unwrap();

    c.bench_function("amazon search page", |b| {
        b.iter(|| amazon.extract_listings(black_box(AMAZON_SEARCH), "lenovo ideapad"))
    });

    c.bench_function("btech search page", |b| {
        b.iter(|| btech.extract_listings(black_box(BTECH_SEARCH), "lenovo ideapad"))
    });

    let large = inflate(BTECH_SEARCH, 20);
    c.bench_function("btech search page x20", |b| {
        b.iter(|| btech.extract_listings(black_box(&large), "lenovo ideapad"))
    });
}

fn spec_extraction(c: &mut Criterion) {
    let btech = SiteAdapter::new(SiteProfile::btech(), &ScraperConfig::default()).unwrap();
    let url = "https://btech.com/en/p/lenovo-ideapad-slim-3-15iru8-82xb";

    // Table strategies miss before the definition list hits
    c.bench_function("btech detail page (definition list)", |b| {
        b.iter(|| btech.extract_specs(black_box(BTECH_PRODUCT_DL), url))
    });
}

criterion_group!(benches, listing_extraction, spec_extraction);
criterion_main!(benches);
