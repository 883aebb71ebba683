//! IndiaMART B2B category listings.

use anyhow::Result;
use chrono::Local;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use super::PageSource;
use super::cleaner::extract_email;
use super::dom::{self, find_by_class, find_text_node};

pub const SOURCE: &str = "indiamart";
const PROFILE_BASE: &str = "https://www.indiamart.com";

static NAME_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"company|name|title").unwrap());
static PHONE_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"phone|mobile|call").unwrap());
static ADDRESS_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"address|location").unwrap());
static CONTACT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Contact Person|Mr\.|Mrs\.|Ms\.").unwrap());
static WEBSITE_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Visit Website|Website").unwrap());
static GST_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"GST|GSTIN").unwrap());
static GST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}[A-Z]{5}\d{4}[A-Z]{1}\d{1}[A-Z]{1}\d{1}").unwrap());
static YEAR_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Year|Since|Established").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(19|20)\d{2}").unwrap());

static CARDS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.bg-white, div.company-card").unwrap());
static LIST_ITEMS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li.lst").unwrap());
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static TEL_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href^="tel:"], span[href^="tel:"]"#).unwrap());
static MAILTO: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"a[href^="mailto:"]"#).unwrap());

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndiaMartBusiness {
    pub business_name: String,
    pub contact_person: String,
    pub phone: String,
    pub mobile: String,
    pub email: String,
    pub website: String,
    pub address: String,
    pub city: String,
    pub gst_number: String,
    pub year_established: String,
    pub company_url: String,
    pub source: String,
    pub collected_at: String,
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

fn last_ten(d: &str) -> &str {
    &d[d.len().saturating_sub(10)..]
}

pub fn page_url(category_url: &str, page: usize) -> String {
    if page > 1 {
        format!("{}?page={}", category_url, page)
    } else {
        category_url.to_string()
    }
}

pub fn listing_cards(doc: &Html) -> Vec<ElementRef<'_>> {
    let cards: Vec<_> = doc.select(&CARDS).collect();
    if cards.is_empty() {
        doc.select(&LIST_ITEMS).collect()
    } else {
        cards
    }
}

pub fn parse_card(card: ElementRef<'_>) -> IndiaMartBusiness {
    let mut b = IndiaMartBusiness {
        business_name: find_by_class(card, &["h2", "h3", "a"], &NAME_CLASS_RE)
            .map(dom::text_of)
            .unwrap_or_default(),
        contact_person: find_text_node(card, &CONTACT_RE).unwrap_or_default(),
        ..Default::default()
    };

    if let Some(href) = card.select(&ANCHORS).next().and_then(|a| a.value().attr("href")) {
        b.company_url = if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", PROFILE_BASE, href)
        };
    }

    // Numbers from tagged call links; the second one is the mobile.
    for el in card.select(&TEL_LINKS).filter(|el| dom::class_matches(*el, &PHONE_CLASS_RE)) {
        let d = digits(&dom::text_of(el));
        if d.len() < 10 {
            continue;
        }
        if b.phone.is_empty() {
            b.phone = last_ten(&d).to_string();
        } else {
            b.mobile = last_ten(&d).to_string();
        }
    }
    let text = dom::spaced_text(card);
    if b.phone.is_empty() {
        let all = digits(&text);
        if all.len() >= 10 {
            b.phone = all[..10].to_string();
        }
    }

    b.email = card
        .select(&MAILTO)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(|h| h.trim_start_matches("mailto:").to_string())
        .or_else(|| extract_email(&text))
        .unwrap_or_default();

    b.website = card
        .select(&ANCHORS)
        .find(|a| WEBSITE_TEXT_RE.is_match(&dom::text_of(*a)))
        .and_then(|a| a.value().attr("href"))
        .unwrap_or_default()
        .to_string();

    b.address = find_by_class(card, &["span", "div", "p"], &ADDRESS_CLASS_RE)
        .map(dom::text_of)
        .unwrap_or_default();
    b.city = b
        .address
        .rsplit(',')
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.chars().all(|c| c.is_ascii_digit() || c == '-' || c == ' '))
        .unwrap_or_default()
        .to_string();

    b.gst_number = find_text_node(card, &GST_LABEL_RE)
        .and_then(|t| GST_RE.find(&t).map(|m| m.as_str().to_string()))
        .unwrap_or_default();
    b.year_established = find_text_node(card, &YEAR_LABEL_RE)
        .and_then(|t| YEAR_RE.find(&t).map(|m| m.as_str().to_string()))
        .unwrap_or_default();
    b
}

/// Coverage counts printed after a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndiaMartStats {
    pub total: usize,
    pub with_email: usize,
    pub with_phone: usize,
    pub with_website: usize,
    pub with_gst: usize,
}

pub fn statistics(businesses: &[IndiaMartBusiness]) -> IndiaMartStats {
    let mut stats = IndiaMartStats {
        total: businesses.len(),
        ..Default::default()
    };
    for b in businesses {
        stats.with_email += usize::from(!b.email.is_empty());
        stats.with_phone += usize::from(!b.phone.is_empty());
        stats.with_website += usize::from(!b.website.is_empty());
        stats.with_gst += usize::from(!b.gst_number.is_empty());
    }
    stats
}

pub struct IndiaMartScraper<S: PageSource> {
    source: S,
}

impl<S: PageSource> IndiaMartScraper<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Pages 1..=max_pages of a category listing. A failed page ends the walk
    /// and keeps what was already collected.
    pub async fn scrape_category(&self, category_url: &str, max_pages: usize) -> Result<Vec<IndiaMartBusiness>> {
        info!("Scraping IndiaMART: {}", category_url);
        let collected_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut businesses = Vec::new();

        for page in 1..=max_pages.max(1) {
            let url = page_url(category_url, page);
            let html = match self.source.fetch(&url).await {
                Ok(h) => h,
                Err(e) => {
                    warn!("Page {} failed: {:#}", page, e);
                    break;
                }
            };
            let doc = Html::parse_document(&html);
            let cards = listing_cards(&doc);
            debug!("Found {} companies on page {}", cards.len(), page);

            businesses.extend(
                cards
                    .into_iter()
                    .map(parse_card)
                    .filter(|b| !b.business_name.is_empty())
                    .map(|b| IndiaMartBusiness {
                        source: SOURCE.to_string(),
                        collected_at: collected_at.clone(),
                        ..b
                    }),
            );
            info!("Page {} complete: {} total businesses", page, businesses.len());
        }
        Ok(businesses)
    }
}
