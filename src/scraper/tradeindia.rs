//! TradeIndia supplier listings: keyword search and category pages.

use anyhow::{Result, bail};
use chrono::Local;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use url::Url;

use super::PageSource;
use super::cleaner::{absolutize, truncate_chars};
use super::dom::{self, class_matches, find_by_class};

pub const SOURCE: &str = "tradeindia";

/// Category key → TradeIndia category slug.
pub const CATEGORIES: &[(&str, &str)] = &[
    ("fashion", "apparel-garments"),
    ("beauty", "cosmetics-toiletries"),
    ("food", "food-beverages"),
    ("packaging", "packaging-supplies"),
    ("textiles", "textiles-yarn"),
    ("furniture", "furniture-furnishings"),
    ("electronics", "consumer-electronics"),
    ("jewelry", "fashion-jewelry"),
];

macro_rules! re {
    ($name:ident, $pat:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($pat).unwrap());
    };
}

re!(SEARCH_CARD_RE, r"(?i)company|seller|supplier");
re!(CATEGORY_CARD_RE, r"(?i)company|listing");
re!(NAME_CLASS_RE, r"(?i)company.*name|title");
re!(COMPANY_CLASS_RE, r"(?i)company");
re!(DESC_CLASS_RE, r"(?i)desc|about|detail");
re!(LOCATION_CLASS_RE, r"(?i)location|city|address");
re!(PHONE_CLASS_RE, r"(?i)phone|mobile|contact");
re!(TYPE_CLASS_RE, r"(?i)type|category");
re!(PHONE_RE, r"[\d\s\-\+\(\)]{10,}");

static DATA_TYPE_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[data-type="company"]"#).unwrap());
static SEARCH_CARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.search-card").unwrap());
static DIVS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static HEADINGS: LazyLock<Vec<Selector>> = LazyLock::new(|| dom::selectors(&["h2", "h3"]));
static LOCALITY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span[itemprop="addressLocality"]"#).unwrap());
static TEL_LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"a[href^="tel:"]"#).unwrap());
static COMPANY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/company/"]"#).unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradeIndiaCompany {
    pub name: String,
    pub description: String,
    pub location: String,
    pub phone: String,
    pub tradeindia_url: String,
    pub company_type: String,
    pub category: String,
    pub source: String,
    pub collected_at: String,
}

pub fn category_slug(key: &str) -> Option<&'static str> {
    CATEGORIES.iter().find(|(k, _)| *k == key).map(|(_, slug)| *slug)
}

fn divs_with_class<'a>(doc: &'a Html, re: &Regex) -> Vec<ElementRef<'a>> {
    doc.select(&DIVS).filter(|d| class_matches(*d, re)).collect()
}

/// Listing cards on a search results page, first non-empty strategy wins.
pub fn search_cards(doc: &Html) -> Vec<ElementRef<'_>> {
    let cards = divs_with_class(doc, &SEARCH_CARD_RE);
    if !cards.is_empty() {
        return cards;
    }
    let cards: Vec<_> = doc.select(&DATA_TYPE_CARD).collect();
    if !cards.is_empty() {
        return cards;
    }
    doc.select(&SEARCH_CARD).collect()
}

pub fn category_cards(doc: &Html) -> Vec<ElementRef<'_>> {
    divs_with_class(doc, &CATEGORY_CARD_RE)
}

fn text_in(card: ElementRef<'_>, re: &Regex) -> String {
    find_by_class(card, &[], re).map(dom::text_of).unwrap_or_default()
}

pub fn parse_card(card: ElementRef<'_>, base: &str) -> TradeIndiaCompany {
    let name = HEADINGS
        .iter()
        .find_map(|sel| card.select(sel).next())
        .or_else(|| find_by_class(card, &[], &NAME_CLASS_RE))
        .or_else(|| find_by_class(card, &["a"], &COMPANY_CLASS_RE))
        .map(dom::text_of)
        .unwrap_or_default();

    let location = find_by_class(card, &[], &LOCATION_CLASS_RE)
        .or_else(|| card.select(&LOCALITY).next())
        .map(dom::text_of)
        .unwrap_or_default();

    let phone = find_by_class(card, &[], &PHONE_CLASS_RE)
        .or_else(|| card.select(&TEL_LINK).next())
        .map(dom::text_of)
        .and_then(|t| PHONE_RE.find(&t).map(|m| m.as_str().trim().to_string()))
        .unwrap_or_default();

    let tradeindia_url = card
        .select(&COMPANY_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| absolutize(base, href))
        .unwrap_or_default();

    TradeIndiaCompany {
        name,
        description: truncate_chars(&text_in(card, &DESC_CLASS_RE), 300),
        location,
        phone,
        tradeindia_url,
        company_type: text_in(card, &TYPE_CLASS_RE),
        ..Default::default()
    }
}

pub struct TradeIndiaScraper<S: PageSource> {
    source: S,
    base: String,
}

impl<S: PageSource> TradeIndiaScraper<S> {
    pub fn new(source: S, base: &str) -> Self {
        Self {
            source,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn search_url(&self, query: &str, city: Option<&str>, page: usize) -> Result<String> {
        let mut params = vec![("q", query.to_string()), ("page", page.to_string())];
        if let Some(city) = city.filter(|c| !c.is_empty()) {
            params.push(("city", city.to_string()));
        }
        Ok(Url::parse_with_params(&format!("{}/search.html", self.base), &params)?.to_string())
    }

    pub fn category_url(&self, slug: &str, page: usize) -> String {
        format!("{}/category/{}/?page={}", self.base, slug, page)
    }

    /// Keyword search across result pages until `max_results` companies.
    pub async fn search(&self, query: &str, city: Option<&str>, max_results: usize) -> Result<Vec<TradeIndiaCompany>> {
        info!("TradeIndia search {:?} (city {:?})", query, city);
        let urls = (1..=max_results.max(1))
            .map(|p| self.search_url(query, city, p))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.paginate(urls, max_results, search_cards, "").await)
    }

    /// One category from [`CATEGORIES`], tagged with its key.
    pub async fn category(&self, key: &str, max_results: usize) -> Result<Vec<TradeIndiaCompany>> {
        let Some(slug) = category_slug(key) else {
            let known: Vec<&str> = CATEGORIES.iter().map(|(k, _)| *k).collect();
            bail!("Unknown category {:?}; available: {}", key, known.join(", "));
        };
        info!("TradeIndia category {} ({})", key, slug);
        let urls = (1..=max_results.max(1)).map(|p| self.category_url(slug, p)).collect();
        Ok(self.paginate(urls, max_results, category_cards, key).await)
    }

    /// Walk pages in order. Stops at the target, on a fetch failure, on a
    /// page without cards, or on a page that adds no named company.
    async fn paginate(
        &self,
        urls: Vec<String>,
        max_results: usize,
        cards: fn(&Html) -> Vec<ElementRef<'_>>,
        category: &str,
    ) -> Vec<TradeIndiaCompany> {
        let collected_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut seen = HashSet::new();
        let mut companies = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            if companies.len() >= max_results {
                break;
            }
            let html = match self.source.fetch(url).await {
                Ok(h) => h,
                Err(e) => {
                    warn!("Page {} failed: {:#}", i + 1, e);
                    break;
                }
            };
            let doc = Html::parse_document(&html);
            let found = cards(&doc);
            debug!("Page {}: {} listings", i + 1, found.len());
            if found.is_empty() {
                break;
            }

            let before = companies.len();
            for card in found {
                if companies.len() >= max_results {
                    break;
                }
                let company = parse_card(card, &self.base);
                if company.name.is_empty() || !seen.insert(company.name.clone()) {
                    continue;
                }
                companies.push(TradeIndiaCompany {
                    category: category.to_string(),
                    source: SOURCE.to_string(),
                    collected_at: collected_at.clone(),
                    ..company
                });
            }
            if companies.len() == before {
                break;
            }
        }
        info!("TradeIndia: {} companies", companies.len());
        companies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::CannedPages;

    const BASE: &str = "https://www.tradeindia.com";

    fn page(names: &[&str]) -> String {
        let cards: String = names
            .iter()
            .map(|n| {
                format!(
                    r#"<div class="seller-card">
                        <h3>{n}</h3>
                        <p class="prod-desc">Cotton kurtis and co-ord sets</p>
                        <span class="city-name">Jaipur, Rajasthan</span>
                        <div class="contact-info">Call +91 98290 12345</div>
                        <a href="/company/{n}/">Profile</a>
                        <span class="biz-type">Manufacturer</span>
                    </div>"#
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", cards)
    }

    #[test]
    fn test_parse_card() {
        let html = page(&["Rangsutra"]);
        let doc = Html::parse_document(&html);
        let cards = search_cards(&doc);
        assert_eq!(cards.len(), 1);
        let c = parse_card(cards[0], BASE);
        assert_eq!(c.name, "Rangsutra");
        assert_eq!(c.description, "Cotton kurtis and co-ord sets");
        assert_eq!(c.location, "Jaipur, Rajasthan");
        assert_eq!(c.phone, "+91 98290 12345");
        assert_eq!(c.tradeindia_url, "https://www.tradeindia.com/company/Rangsutra/");
        assert_eq!(c.company_type, "Manufacturer");
    }

    #[test]
    fn test_category_lookup() {
        assert_eq!(category_slug("beauty"), Some("cosmetics-toiletries"));
        assert_eq!(category_slug("cars"), None);
    }

    #[tokio::test]
    async fn test_search_paginates_until_empty() {
        let scraper_base = TradeIndiaScraper::new(CannedPages::default(), BASE);
        let p1 = scraper_base.search_url("kurti", None, 1).unwrap();
        let p2 = scraper_base.search_url("kurti", None, 2).unwrap();
        let p3 = scraper_base.search_url("kurti", None, 3).unwrap();

        let pages = CannedPages::default()
            .with(&p1, &page(&["Alpha Textiles", "Beta Prints"]))
            .with(&p2, &page(&["Beta Prints", "Gamma Looms"]))
            .with(&p3, "<html><body><p>No results</p></body></html>");
        let scraper = TradeIndiaScraper::new(&pages, BASE);
        let companies = scraper.search("kurti", None, 10).await.unwrap();

        let names: Vec<_> = companies.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Alpha Textiles", "Beta Prints", "Gamma Looms"]);
        assert!(companies.iter().all(|c| c.source == SOURCE));
        assert_eq!(pages.requested.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_category_is_error() {
        let scraper = TradeIndiaScraper::new(CannedPages::default(), BASE);
        assert!(scraper.category("cars", 5).await.is_err());
    }
}
