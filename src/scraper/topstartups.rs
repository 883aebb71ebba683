//! topstartups.io company directory, Indian HQs by default.

use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use url::Url;

use super::PageSource;
use super::cleaner::truncate_chars;
use super::dom::{self, find_by_class, find_text_node, text_node_parent};

pub const SOURCE: &str = "topstartups";
const DEFAULT_LOCATION: &str = "India";
/// A selector only counts as the card selector once it matches more than this.
const MIN_BLOCKS: usize = 5;
const DESCRIPTION_MAX: usize = 200;

const BLOCK_SELECTORS: [&str; 5] = [
    r#"div[class*="company"]"#,
    r#"div[class*="card"]"#,
    r#"div[class*="startup"]"#,
    "article",
    r#"li[class*="company"]"#,
];

static BLOCKS: LazyLock<Vec<Selector>> = LazyLock::new(|| dom::selectors(&BLOCK_SELECTORS));
static DIVS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static HEADINGS: LazyLock<Vec<Selector>> = LazyLock::new(|| dom::selectors(&["h1", "h2", "h3", "h4"]));
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static COMPANY_LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"a[href*="/company/"]"#).unwrap());

static DOT_COM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:https?://)?(?:www\.)?([a-zA-Z0-9-]+)\.com").unwrap());
static LOCATION_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)location|headquarters").unwrap());
static LOCATION_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)location").unwrap());
static SITE_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)check company site|visit|website").unwrap());
static SITE_HREF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"http|www").unwrap());
static PHONE_NODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\+?\d{10,}").unwrap());
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\+?[\d\s\-()]{10,}").unwrap());
static EMPLOYEES_NODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+[-–]\d+|\d+\+").unwrap());
static EMPLOYEES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+[-–]\d+").unwrap());
static FUNDING_NODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\$[\d.]+\s*[KMB]").unwrap());
static FUNDING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\$[\d.]+\s*[KMB]?").unwrap());
static FUNDING_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^([\d.]+)\s*([KMB]?)").unwrap());
static JOBS_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)view jobs?|careers?|hiring").unwrap());
static JOBS_HREF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)jobs|careers").unwrap());
static DESCRIPTION_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)description|about").unwrap());
static INDUSTRY_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)category|industry|tag").unwrap());
static FOUNDED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)founded|est\.?\s*\d{4}").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}").unwrap());

/// One company card. Field names are the columns the merger reads back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TopStartup {
    pub company_name: String,
    pub hq_location: String,
    pub website_available: bool,
    pub website_url: String,
    pub phone: String,
    pub employees: String,
    pub funding_amount: Option<u64>,
    pub funding_raw: String,
    pub jobs_available: bool,
    pub jobs_link: String,
    pub description: String,
    pub industry: String,
    pub founded_year: Option<u16>,
    pub source: String,
    pub collected_at: String,
}

/// "$700M" → 700_000_000, "$1.2B" → 1_200_000_000, "$50K" → 50_000.
pub fn parse_funding(text: &str) -> Option<u64> {
    let cleaned = text.replace(['$', ','], "");
    let caps = FUNDING_AMOUNT_RE.captures(cleaned.trim())?;
    let number: f64 = caps[1].parse().ok()?;
    let multiplier = match caps[2].to_ascii_uppercase().as_str() {
        "K" => 1e3,
        "M" => 1e6,
        "B" => 1e9,
        _ => 1.0,
    };
    Some((number * multiplier).round() as u64)
}

/// Employee ranges with en/em dashes folded to `-`: "51–100" → "51-100".
pub fn parse_employees(text: &str) -> String {
    text.replace(['–', '—'], "-").trim().to_string()
}

fn anchor_matching(block: ElementRef<'_>, text_re: &Regex, href_re: &Regex) -> Option<String> {
    let anchors: Vec<ElementRef<'_>> = block.select(&ANCHORS).collect();
    anchors
        .iter()
        .find(|a| text_re.is_match(&dom::text_of(**a)))
        .or_else(|| {
            anchors
                .iter()
                .find(|a| a.value().attr("href").is_some_and(|h| href_re.is_match(h)))
        })
        .and_then(|a| a.value().attr("href"))
        .map(|h| h.trim().to_string())
}

fn is_placeholder_name(text: &str) -> bool {
    text.to_lowercase().contains("see who works")
}

fn company_name(block: ElementRef<'_>) -> String {
    let from_heading = HEADINGS.iter().find_map(|sel| {
        let heading = block.select(sel).next()?;
        let text = dom::text_of(heading);
        (text.chars().count() > 2 && !is_placeholder_name(&text)).then_some(text)
    });
    if let Some(name) = from_heading {
        return name;
    }

    // Fall back to the .com domain of the first external link: "innoviti.com" → "Innoviti"
    let from_domain = block
        .select(&ANCHORS)
        .filter_map(|a| a.value().attr("href"))
        .find(|h| h.contains("http"))
        .and_then(|h| DOT_COM_RE.captures(h))
        .map(|c| {
            let mut chars = c[1].chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        });
    if let Some(name) = from_domain.filter(|n| !n.is_empty()) {
        return name;
    }

    block
        .select(&COMPANY_LINKS)
        .next()
        .map(dom::text_of)
        .filter(|t| !t.is_empty() && !is_placeholder_name(t))
        .unwrap_or_default()
}

/// Every field the card exposes; a card without a name yields an empty name.
pub fn extract_company(block: ElementRef<'_>) -> TopStartup {
    let hq_location = text_node_parent(block, &LOCATION_TEXT_RE)
        .or_else(|| find_by_class(block, &["span", "div"], &LOCATION_CLASS_RE).map(dom::text_of))
        .unwrap_or_default();

    let website_url = anchor_matching(block, &SITE_TEXT_RE, &SITE_HREF_RE);
    let jobs_link = anchor_matching(block, &JOBS_TEXT_RE, &JOBS_HREF_RE);

    let phone = find_text_node(block, &PHONE_NODE_RE)
        .and_then(|t| PHONE_RE.find(&t).map(|m| m.as_str().trim().to_string()))
        .unwrap_or_default();
    let employees = find_text_node(block, &EMPLOYEES_NODE_RE)
        .and_then(|t| EMPLOYEES_RE.find(&t).map(|m| parse_employees(m.as_str())))
        .unwrap_or_default();
    let funding_raw = find_text_node(block, &FUNDING_NODE_RE)
        .and_then(|t| FUNDING_RE.find(&t).map(|m| m.as_str().to_string()))
        .unwrap_or_default();
    let founded_year = find_text_node(block, &FOUNDED_RE)
        .and_then(|t| YEAR_RE.find(&t).and_then(|m| m.as_str().parse().ok()));

    TopStartup {
        company_name: company_name(block),
        hq_location,
        website_available: website_url.is_some(),
        website_url: website_url.unwrap_or_default(),
        phone,
        employees,
        funding_amount: parse_funding(&funding_raw),
        funding_raw,
        jobs_available: jobs_link.is_some(),
        jobs_link: jobs_link.unwrap_or_default(),
        description: find_by_class(block, &["p", "div"], &DESCRIPTION_CLASS_RE)
            .map(|el| truncate_chars(&dom::text_of(el), DESCRIPTION_MAX))
            .unwrap_or_default(),
        industry: find_by_class(block, &["span", "div"], &INDUSTRY_CLASS_RE)
            .map(dom::text_of)
            .unwrap_or_default(),
        founded_year,
        ..Default::default()
    }
}

/// Company cards: the first selector matching more than a handful of
/// blocks, else every div that links to a company page.
pub fn company_blocks(doc: &Html) -> Vec<ElementRef<'_>> {
    for (sel, css) in BLOCKS.iter().zip(BLOCK_SELECTORS) {
        let blocks: Vec<_> = doc.select(sel).collect();
        if blocks.len() > MIN_BLOCKS {
            debug!("{} company blocks via {}", blocks.len(), css);
            return blocks;
        }
    }
    warn!("No company blocks with the standard selectors; falling back to company links");
    doc.select(&DIVS)
        .filter(|d| d.select(&COMPANY_LINKS).next().is_some())
        .collect()
}

/// Named companies on a listing page, first card per name.
pub fn parse_listing(html: &str) -> Vec<TopStartup> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    company_blocks(&doc)
        .into_iter()
        .map(extract_company)
        .filter(|c| !c.company_name.is_empty() && seen.insert(c.company_name.to_lowercase()))
        .collect()
}

pub struct TopStartupsScraper<S: PageSource> {
    source: S,
    base: String,
}

impl<S: PageSource> TopStartupsScraper<S> {
    pub fn new(source: S, base: &str) -> Self {
        Self {
            source,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// `?hq_location=India` unless a location is given, plus `industry` when set.
    pub fn listing_url(&self, industry: Option<&str>, location: Option<&str>) -> Result<String> {
        let mut url = Url::parse(&format!("{}/", self.base)).with_context(|| format!("Bad base URL {:?}", self.base))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(industry) = industry.filter(|i| !i.trim().is_empty()) {
                query.append_pair("industry", industry.trim());
            }
            query.append_pair(
                "hq_location",
                location.map(str::trim).filter(|l| !l.is_empty()).unwrap_or(DEFAULT_LOCATION),
            );
        }
        Ok(url.to_string())
    }

    /// Companies from one listing page, at most `max`.
    pub async fn scrape(&self, industry: Option<&str>, location: Option<&str>, max: usize) -> Result<Vec<TopStartup>> {
        let url = self.listing_url(industry, location)?;
        info!("Loading {}", url);
        let html = self
            .source
            .fetch(&url)
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        let collected_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut companies = parse_listing(&html);
        companies.truncate(max);
        for c in &mut companies {
            c.source = SOURCE.to_string();
            c.collected_at = collected_at.clone();
        }
        info!("Scraped {} companies", companies.len());
        Ok(companies)
    }
}

/// Coverage figures printed after a run.
#[derive(Debug, Default, PartialEq)]
pub struct TopStartupStats {
    pub total: usize,
    pub with_website: usize,
    pub with_phone: usize,
    pub with_funding: usize,
    pub with_jobs: usize,
    pub with_employees: usize,
    pub total_funding: u64,
    /// Funding above $1M.
    pub well_funded: usize,
}

pub fn statistics(companies: &[TopStartup]) -> TopStartupStats {
    let funded = || companies.iter().filter_map(|c| c.funding_amount);
    TopStartupStats {
        total: companies.len(),
        with_website: companies.iter().filter(|c| c.website_available).count(),
        with_phone: companies.iter().filter(|c| !c.phone.is_empty()).count(),
        with_funding: funded().count(),
        with_jobs: companies.iter().filter(|c| c.jobs_available).count(),
        with_employees: companies.iter().filter(|c| !c.employees.is_empty()).count(),
        total_funding: funded().sum(),
        well_funded: funded().filter(|f| *f > 1_000_000).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::CannedPages;

    const BASE: &str = "https://topstartups.io";

    fn card(name: &str, site: &str, extra: &str) -> String {
        format!(
            r#"<div class="card company-card">
                 <h3>{name}</h3>
                 <p class="hq">HQ Location: Bengaluru</p>
                 <a href="{site}">Check company site</a>
                 <span class="industry-tag">Fintech</span>
                 <p class="company-description">Payments infrastructure for Indian businesses and marketplaces</p>
                 <span>Employees: 1001–5000</span>
                 <span>Raised $741.5M</span>
                 {extra}
               </div>"#
        )
    }

    fn listing(cards: &[String]) -> String {
        format!("<html><body>{}</body></html>", cards.concat())
    }

    #[test]
    fn test_parse_funding() {
        assert_eq!(parse_funding("$700M"), Some(700_000_000));
        assert_eq!(parse_funding("$1.2B"), Some(1_200_000_000));
        assert_eq!(parse_funding("$50 K"), Some(50_000));
        assert_eq!(parse_funding("$1,500"), Some(1_500));
        assert_eq!(parse_funding(""), None);
        assert_eq!(parse_funding("undisclosed"), None);
    }

    #[test]
    fn test_parse_employees() {
        assert_eq!(parse_employees("51–100"), "51-100");
        assert_eq!(parse_employees(" 11—50 "), "11-50");
    }

    #[test]
    fn test_extract_company() {
        let html = listing(&[card(
            "Razorpay",
            "https://razorpay.com",
            r#"<a href="https://razorpay.com/jobs">View Jobs</a><small>Founded 2014</small>"#,
        )]);
        let doc = Html::parse_document(&html);
        let block = doc.select(&BLOCKS[0]).next().unwrap();
        let c = extract_company(block);

        assert_eq!(c.company_name, "Razorpay");
        assert_eq!(c.hq_location, "HQ Location: Bengaluru");
        assert!(c.website_available);
        assert_eq!(c.website_url, "https://razorpay.com");
        assert_eq!(c.industry, "Fintech");
        assert_eq!(c.employees, "1001-5000");
        assert_eq!(c.funding_raw, "$741.5M");
        assert_eq!(c.funding_amount, Some(741_500_000));
        assert!(c.jobs_available);
        assert_eq!(c.jobs_link, "https://razorpay.com/jobs");
        assert_eq!(c.founded_year, Some(2014));
        assert!(c.description.starts_with("Payments infrastructure"));
    }

    #[test]
    fn test_name_falls_back_to_domain() {
        let doc = Html::parse_fragment(
            r#"<div class="company"><h4>See who works here</h4><a href="https://www.innoviti.com/">Visit</a></div>"#,
        );
        let block = doc.select(&DIVS).next().unwrap();
        let c = extract_company(block);
        assert_eq!(c.company_name, "Innoviti");
        assert!(!c.jobs_available);
    }

    #[test]
    fn test_few_cards_use_company_link_fallback() {
        let html = r#"<html><body>
            <div><a href="/company/zerodha">Zerodha</a></div>
            <div><p>Newsletter</p></div>
        </body></html>"#;
        let companies = parse_listing(html);
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].company_name, "Zerodha");
    }

    #[test]
    fn test_listing_url() {
        let scraper = TopStartupsScraper::new(CannedPages::default(), BASE);
        assert_eq!(scraper.listing_url(None, None).unwrap(), "https://topstartups.io/?hq_location=India");
        assert_eq!(
            scraper.listing_url(Some("fintech"), None).unwrap(),
            "https://topstartups.io/?industry=fintech&hq_location=India"
        );
        assert_eq!(
            scraper.listing_url(None, Some("Bangalore")).unwrap(),
            "https://topstartups.io/?hq_location=Bangalore"
        );
    }

    #[tokio::test]
    async fn test_scrape_dedups_and_truncates() {
        let cards: Vec<String> = ["Razorpay", "Zerodha", "Razorpay", "Meesho", "Groww", "CRED", "Swiggy"]
            .iter()
            .map(|n| card(n, &format!("https://{}.com", n.to_lowercase()), ""))
            .collect();
        let pages = CannedPages::default().with("https://topstartups.io/?hq_location=India", &listing(&cards));
        let scraper = TopStartupsScraper::new(&pages, BASE);

        let companies = scraper.scrape(None, None, 4).await.unwrap();
        let names: Vec<_> = companies.iter().map(|c| c.company_name.as_str()).collect();
        assert_eq!(names, ["Razorpay", "Zerodha", "Meesho", "Groww"]);
        assert!(companies.iter().all(|c| c.source == SOURCE));

        let stats = statistics(&companies);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.with_funding, 4);
        assert_eq!(stats.well_funded, 4);
        assert_eq!(stats.with_jobs, 0);
    }
}
