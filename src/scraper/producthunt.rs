//! Product Hunt daily launch pages.

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use super::PageSource;
use super::cleaner::{absolutize, truncate_chars};
use super::dom::{self, class_matches, find_by_class};

pub const SOURCE: &str = "producthunt";

static POST_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)post").unwrap());
static NAME_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)name|title").unwrap());
static TAGLINE_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)tagline|subtitle").unwrap());
static VOTE_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)vote|upvote").unwrap());
static MAKER_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)maker|creator|hunter").unwrap());
static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").unwrap());

static DIVS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static ARTICLES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article").unwrap());
static POST_LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"a[href*="/posts/"]"#).unwrap());
static HEADINGS: LazyLock<Vec<Selector>> = LazyLock::new(|| dom::selectors(&["h3", "h2"]));
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProductHuntProduct {
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub website: String,
    pub product_hunt_url: String,
    pub upvotes: u32,
    pub maker: String,
    pub launch_date: String,
    pub source: String,
    pub collected_at: String,
}

/// Product cards, first non-empty strategy wins.
pub fn product_cards(doc: &Html, max: usize) -> Vec<ElementRef<'_>> {
    let posts: Vec<_> = doc.select(&DIVS).filter(|d| class_matches(*d, &POST_CLASS_RE)).take(max).collect();
    if !posts.is_empty() {
        return posts;
    }
    let articles: Vec<_> = doc.select(&ARTICLES).take(max).collect();
    if !articles.is_empty() {
        return articles;
    }
    doc.select(&POST_LINKS).take(max).collect()
}

pub fn parse_card(card: ElementRef<'_>, base: &str) -> ProductHuntProduct {
    let name = HEADINGS
        .iter()
        .find_map(|sel| card.select(sel).next())
        .or_else(|| find_by_class(card, &[], &NAME_CLASS_RE))
        .map(dom::text_of)
        .unwrap_or_default();

    let own_href = (card.value().name() == "a").then(|| card.value().attr("href")).flatten();
    let product_hunt_url = card
        .select(&POST_LINKS)
        .next()
        .and_then(|a| a.value().attr("href"))
        .or(own_href.filter(|h| h.contains("/posts/")))
        .and_then(|href| absolutize(base, href))
        .unwrap_or_default();

    let upvotes = find_by_class(card, &[], &VOTE_CLASS_RE)
        .map(dom::text_of)
        .and_then(|t| NUMBER_RE.captures(&t).and_then(|c| c[1].parse().ok()))
        .unwrap_or(0);

    ProductHuntProduct {
        name,
        tagline: truncate_chars(
            &find_by_class(card, &[], &TAGLINE_CLASS_RE).map(dom::text_of).unwrap_or_default(),
            200,
        ),
        product_hunt_url,
        upvotes,
        ..Default::default()
    }
}

/// Website, maker and description from a product page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductDetail {
    pub website: String,
    pub maker: String,
    pub description: String,
}

pub fn parse_detail(html: &str) -> ProductDetail {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    ProductDetail {
        website: doc
            .select(&ANCHORS)
            .filter_map(|a| a.value().attr("href"))
            .find(|h| (h.starts_with("http://") || h.starts_with("https://")) && !h.contains("producthunt"))
            .unwrap_or_default()
            .to_string(),
        maker: find_by_class(root, &[], &MAKER_CLASS_RE).map(dom::text_of).unwrap_or_default(),
        description: truncate_chars(&dom::meta_content(&doc, "description").unwrap_or_default(), 500),
    }
}

pub struct ProductHuntScraper<S: PageSource> {
    source: S,
    base: String,
}

impl<S: PageSource> ProductHuntScraper<S> {
    pub fn new(source: S, base: &str) -> Self {
        Self {
            source,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn day_url(&self, date: NaiveDate) -> String {
        format!("{}/posts/{}", self.base, date.format("%Y-%m-%d"))
    }

    /// Named products launched on one day. A failed page yields none.
    pub async fn daily_products(&self, date: NaiveDate, max: usize) -> Vec<ProductHuntProduct> {
        let url = self.day_url(date);
        let html = match self.source.fetch(&url).await {
            Ok(h) => h,
            Err(e) => {
                warn!("{}: {:#}", date, e);
                return vec![];
            }
        };
        let doc = Html::parse_document(&html);
        let cards = product_cards(&doc, max);
        debug!("{}: {} product cards", date, cards.len());
        cards
            .into_iter()
            .map(|c| parse_card(c, &self.base))
            .filter(|p| !p.name.is_empty())
            .map(|p| ProductHuntProduct {
                launch_date: date.to_string(),
                ..p
            })
            .collect()
    }

    /// The `days` days ending at `today`, deduplicated by name. With
    /// `details`, each product page is fetched for website and maker.
    pub async fn scrape_days(
        &self,
        today: NaiveDate,
        days: u32,
        max_per_day: usize,
        details: bool,
    ) -> Result<Vec<ProductHuntProduct>> {
        let collected_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut seen = HashSet::new();
        let mut products = Vec::new();

        for offset in 0..days {
            let date = today - Duration::days(i64::from(offset));
            for p in self.daily_products(date, max_per_day).await {
                if seen.insert(p.name.clone()) {
                    products.push(p);
                }
            }
        }

        if details {
            for p in products.iter_mut().filter(|p| !p.product_hunt_url.is_empty()) {
                match self.source.fetch(&p.product_hunt_url).await {
                    Ok(html) => {
                        let d = parse_detail(&html);
                        p.website = d.website;
                        p.maker = d.maker;
                        p.description = d.description;
                    }
                    Err(e) => warn!("{}: {:#}", p.name, e),
                }
            }
        }

        for p in &mut products {
            p.source = SOURCE.to_string();
            p.collected_at = collected_at.clone();
        }
        info!("Product Hunt: {} unique products over {} days", products.len(), days);
        Ok(products)
    }
}

/// Highest-voted first, for the run summary.
pub fn top_by_upvotes(products: &[ProductHuntProduct], n: usize) -> Vec<&ProductHuntProduct> {
    let mut sorted: Vec<&ProductHuntProduct> = products.iter().collect();
    sorted.sort_by(|a, b| b.upvotes.cmp(&a.upvotes));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::CannedPages;

    const BASE: &str = "https://www.producthunt.com";

    fn day_page(items: &[(&str, u32)]) -> String {
        let cards: String = items
            .iter()
            .map(|(name, votes)| {
                format!(
                    r#"<div class="styles_post__x1">
                        <a href="/posts/{slug}"><h3>{name}</h3></a>
                        <p class="styles_tagline__y">Ship changelogs your users read</p>
                        <button class="vote-button">▲ {votes}</button>
                    </div>"#,
                    slug = name.to_lowercase(),
                )
            })
            .collect();
        format!("<html><body>{}</body></html>", cards)
    }

    #[test]
    fn test_parse_card() {
        let html = day_page(&[("Loglane", 412)]);
        let doc = Html::parse_document(&html);
        let cards = product_cards(&doc, 20);
        assert_eq!(cards.len(), 1);
        let p = parse_card(cards[0], BASE);
        assert_eq!(p.name, "Loglane");
        assert_eq!(p.tagline, "Ship changelogs your users read");
        assert_eq!(p.product_hunt_url, "https://www.producthunt.com/posts/loglane");
        assert_eq!(p.upvotes, 412);
    }

    #[test]
    fn test_anchor_cards() {
        let doc = Html::parse_document(r#"<html><body><a href="/posts/kiteboard"><h2>Kiteboard</h2></a></body></html>"#);
        let cards = product_cards(&doc, 5);
        let p = parse_card(cards[0], BASE);
        assert_eq!(p.name, "Kiteboard");
        assert_eq!(p.product_hunt_url, "https://www.producthunt.com/posts/kiteboard");
    }

    #[test]
    fn test_parse_detail() {
        let d = parse_detail(
            r#"<html><head><meta name="description" content="Changelogs, done."></head><body>
               <a href="https://www.producthunt.com/topics/saas">SaaS</a>
               <a href="https://loglane.io/?ref=producthunt">Visit</a>
               <a href="https://loglane.io">Visit</a>
               <div class="maker-list">Priya N</div></body></html>"#,
        );
        assert_eq!(d.website, "https://loglane.io");
        assert_eq!(d.maker, "Priya N");
        assert_eq!(d.description, "Changelogs, done.");
    }

    #[tokio::test]
    async fn test_scrape_days_dedups() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let pages = CannedPages::default()
            .with(&format!("{}/posts/2025-03-10", BASE), &day_page(&[("Loglane", 412), ("Fernbox", 90)]))
            .with(&format!("{}/posts/2025-03-09", BASE), &day_page(&[("Loglane", 300), ("Tidy", 12)]));
        let scraper = ProductHuntScraper::new(&pages, BASE);
        let products = scraper.scrape_days(today, 3, 20, false).await.unwrap();

        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Loglane", "Fernbox", "Tidy"]);
        assert_eq!(products[0].launch_date, "2025-03-10");
        assert!(products.iter().all(|p| p.source == SOURCE));
        assert_eq!(top_by_upvotes(&products, 1)[0].name, "Loglane");
    }
}
