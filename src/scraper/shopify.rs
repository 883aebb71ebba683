use anyhow::Result;
use chrono::Local;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use url::Url;

use super::PageSource;
use super::cleaner::{absolutize, base_url, extract_email, host_of, truncate_chars};
use super::dom;
use crate::export::joined;
use crate::scoring::{self, LeadQuality};

pub const DEFAULT_THEMES: [&str; 12] = [
    "debut", "brooklyn", "minimal", "supply", "narrative", "simple", "venture", "boundless",
    "express", "prestige", "dawn", "craft",
];

const INDUSTRY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "fashion",
        &[
            "fashion", "clothing", "apparel", "dress", "shirt", "pants", "shoes", "accessories",
            "jewelry", "watches", "bags", "style", "wear", "outfit", "boutique", "designer",
            "collection", "wardrobe", "footwear", "handbags",
        ],
    ),
    (
        "technology",
        &[
            "tech", "gadget", "electronics", "computer", "phone", "software", "hardware",
            "device", "digital", "smart", "wireless", "bluetooth", "laptop", "tablet",
            "accessory", "charger", "cable", "audio", "gaming",
        ],
    ),
    (
        "b2b_design",
        &[
            "design", "branding", "marketing", "agency", "business", "corporate",
            "professional", "services", "consulting", "solutions", "enterprise", "wholesale",
            "bulk", "b2b", "trade", "supplier", "manufacturer",
        ],
    ),
];

const SHOPIFY_MARKERS: [&str; 4] = ["shopify", "cdn.shopify.com", "myshopify.com", "shopify-analytics"];

const SOCIAL_DOMAINS: [&str; 7] = [
    "instagram.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
];

const ABOUT_PATHS: [&str; 5] = ["/pages/about", "/pages/about-us", "/pages/our-story", "/about", "/about-us"];
const MAX_ABOUT_CHECKS: usize = 5;
const MIN_ABOUT_WORDS: usize = 50;

pub const DEFAULT_QUERIES: [&str; 4] = [
    "site:myshopify.com fashion india",
    "site:myshopify.com clothing brand",
    "site:myshopify.com technology gadgets",
    "site:myshopify.com jewelry accessories",
];

/// Indian D2C brands worth checking when no URL list is given.
pub const KNOWN_STORES: &[&str] = &[
    "bewakoof.com", "thesouledstore.com", "purplle.com", "nykaa.com", "lenskart.com",
    "myntra.com", "ajio.com", "blinkit.com", "mamaearth.in", "plum.in", "myglamm.com",
    "sugarcosmetics.com", "boat-lifestyle.com", "noise.com", "giva.co", "melorra.com",
    "bluestone.com", "caratlane.com", "foreo.com", "minimalist.co", "mcaffeine.com",
    "thedermaco.com", "littlebox.in", "themancompany.com", "bombayshavingcompany.com",
    "beardhood.com", "ustraa.com", "snitch.co.in", "beyoung.in", "cultfit.com",
    "healthifyme.com", "eatfit.in", "mfine.co", "pristyncare.com",
];

static THEME_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)theme[_-]name["']?\s*[:=]\s*["']([^"']+)"#).unwrap());
static SHOPIFY_THEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)Shopify\.theme\s*=\s*\{\s*name:\s*["']([^"']+)"#).unwrap());
static STORE_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\+\(]?[0-9][0-9\s\-\(\)]{8,}[0-9]").unwrap());
static RESULT_URL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.result__url").unwrap());
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

// ── Records ───────────────────────────────────────────────────────────────────

/// A confirmed Shopify storefront with whatever contact info the homepage shows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShopifyStore {
    pub url: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_shopify: bool,
    pub source: String,
    pub country: String,
    pub collected_at: String,
}

/// Homepage/about-page signals for one store plus its lead assessment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreMetadata {
    pub url: String,
    pub domain: String,
    pub is_myshopify_domain: bool,
    pub has_custom_domain: bool,
    pub has_about_page: bool,
    pub about_page_word_count: usize,
    pub has_story_page: bool,
    pub story_page_word_count: usize,
    pub theme_name: String,
    pub is_default_theme: bool,
    #[serde(with = "joined")]
    pub social_links: Vec<String>,
    pub has_instagram: bool,
    pub has_facebook: bool,
    pub has_linkedin: bool,
    pub has_twitter: bool,
    pub meta_description: String,
    pub page_title: String,
    pub error: Option<String>,
    pub industry: String,
    pub industry_confidence: f64,
    pub lead_score: u32,
    pub lead_quality: LeadQuality,
    #[serde(with = "joined")]
    pub weaknesses: Vec<String>,
    pub weakness_count: usize,
}

impl StoreMetadata {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            domain: Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default(),
            is_myshopify_domain: url.contains("myshopify.com"),
            has_custom_domain: !url.contains("myshopify.com"),
            theme_name: "unknown".to_string(),
            ..Default::default()
        }
    }
}

// ── Pure parsing ──────────────────────────────────────────────────────────────

pub fn is_shopify_html(body: &str) -> bool {
    let low = body.to_lowercase();
    SHOPIFY_MARKERS.iter().any(|m| low.contains(m))
}

/// Name, description and contact details from a storefront homepage.
pub fn parse_store(url: &str, html: &str) -> ShopifyStore {
    let doc = Html::parse_document(html);
    ShopifyStore {
        url: url.to_string(),
        name: dom::title(&doc),
        description: description(&doc),
        email: extract_email(html),
        phone: STORE_PHONE_RE.find(html).map(|m| m.as_str().trim().to_string()),
        is_shopify: true,
        source: "shopify_directory".to_string(),
        country: "India".to_string(),
        collected_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

fn description(doc: &Html) -> Option<String> {
    dom::meta_content(doc, "description")
        .or_else(|| dom::meta_content(doc, "og:description"))
        .map(|d| truncate_chars(&d, 300))
}

/// Theme from inline settings, `Shopify.theme`, or a default theme name in
/// the body classes.
pub fn detect_theme(doc: &Html, html: &str) -> String {
    if let Some(c) = THEME_NAME_RE.captures(html) {
        return c[1].to_string();
    }
    if let Some(c) = SHOPIFY_THEME_RE.captures(html) {
        return c[1].to_string();
    }
    let classes = doc
        .select(&BODY)
        .next()
        .and_then(|b| b.value().attr("class"))
        .unwrap_or_default()
        .to_lowercase();
    DEFAULT_THEMES
        .iter()
        .find(|t| classes.contains(*t))
        .map(|t| t.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn is_default_theme(theme: &str) -> bool {
    let low = theme.to_lowercase();
    DEFAULT_THEMES.iter().any(|t| low.contains(t))
}

/// Unique social hrefs on the page, sorted.
pub fn social_links(doc: &Html) -> Vec<String> {
    dom::hrefs(doc.root_element())
        .into_iter()
        .filter(|h| SOCIAL_DOMAINS.iter().any(|d| h.contains(d)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// About/story pages to try, fixed paths first, then homepage links.
pub fn about_candidates(store_url: &str, doc: &Html) -> Vec<String> {
    let mut urls: Vec<String> = ABOUT_PATHS
        .iter()
        .filter_map(|p| absolutize(store_url, p))
        .collect();
    for href in dom::hrefs(doc.root_element()) {
        let low = href.to_lowercase();
        if !(low.contains("about") || low.contains("story")) {
            continue;
        }
        match absolutize(store_url, &href) {
            Some(full) if !urls.contains(&full) => urls.push(full),
            _ => {}
        }
    }
    urls
}

/// Words of readable content, page chrome excluded.
pub fn content_word_count(html: &str) -> usize {
    dom::content_text(&Html::parse_document(html)).split_whitespace().count()
}

/// Best-matching industry by keyword hits in title + description; confidence
/// is hits over the size of that industry's keyword list. Ties go to the
/// earlier industry.
pub fn classify_industry(title: &str, description: &str) -> (String, f64) {
    let text = format!("{} {}", title, description).to_lowercase();
    let mut best: Option<(&str, usize, usize)> = None;
    for (industry, keywords) in INDUSTRY_KEYWORDS {
        let hits = keywords.iter().filter(|k| text.contains(*k)).count();
        if hits > 0 && best.is_none_or(|(_, h, _)| hits > h) {
            best = Some((industry, hits, keywords.len()));
        }
    }
    match best {
        Some((industry, hits, total)) => (industry.to_string(), hits as f64 / total as f64),
        None => ("unknown".to_string(), 0.0),
    }
}

/// Result links from a DuckDuckGo HTML results page, unwrapping `uddg` redirects.
pub fn parse_search_results(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&RESULT_URL)
        .filter_map(|a| {
            let href = a.value().attr("href").map(str::trim).unwrap_or_default();
            let href = if href.is_empty() { dom::text_of(a) } else { href.to_string() };
            (!href.is_empty()).then(|| unwrap_redirect(&href))
        })
        .collect()
}

fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") { format!("https:{}", href) } else { href.to_string() };
    Url::parse(&absolute)
        .ok()
        .and_then(|u| u.query_pairs().find(|(k, _)| k == "uddg").map(|(_, v)| v.into_owned()))
        .unwrap_or_else(|| href.to_string())
}

// ── Scraper ───────────────────────────────────────────────────────────────────

pub struct ShopifyScraper<S: PageSource> {
    source: S,
    search_url: String,
}

impl<S: PageSource> ShopifyScraper<S> {
    pub fn new(source: S, search_url: &str) -> Self {
        Self {
            source,
            search_url: search_url.to_string(),
        }
    }

    /// Fetches `url` (scheme added when missing) and returns the store when the
    /// page is served by Shopify.
    pub async fn detect_store(&self, url: &str) -> Option<ShopifyStore> {
        let url = if url.starts_with("http") { url.to_string() } else { format!("https://{}", url) };
        match self.source.fetch(&url).await {
            Ok(html) if is_shopify_html(&html) => Some(parse_store(&url, &html)),
            Ok(_) => None,
            Err(e) => {
                debug!("{}: {}", url, e);
                None
            }
        }
    }

    /// Check URLs in order until `max_stores` Shopify stores are found.
    pub async fn scan_stores(&self, urls: &[String], max_stores: usize) -> Vec<ShopifyStore> {
        let mut stores = Vec::new();
        for (i, url) in urls.iter().enumerate() {
            if stores.len() >= max_stores {
                break;
            }
            match self.detect_store(url).await {
                Some(store) => {
                    info!("[{}/{}] Shopify store: {}", i + 1, urls.len(), store.name.as_deref().unwrap_or("Unknown"));
                    stores.push(store);
                }
                None => debug!("[{}/{}] Not a Shopify store: {}", i + 1, urls.len(), url),
            }
        }
        info!("Found {} Shopify stores", stores.len());
        stores
    }

    /// Search each query and keep results that are Shopify storefronts.
    pub async fn discover_stores(&self, queries: &[String], max_per_query: usize) -> Vec<String> {
        let mut all = BTreeSet::new();
        for query in queries {
            let search = match Url::parse_with_params(&self.search_url, &[("q", query.as_str())]) {
                Ok(u) => u.to_string(),
                Err(e) => {
                    warn!("Bad search URL {}: {}", self.search_url, e);
                    return vec![];
                }
            };
            let html = match self.source.fetch(&search).await {
                Ok(h) => h,
                Err(e) => {
                    warn!("Search failed for {:?}: {}", query, e);
                    continue;
                }
            };

            let mut count = 0;
            for href in parse_search_results(&html) {
                if count >= max_per_query {
                    break;
                }
                let keep = href.contains("myshopify.com") || self.detect_store(&href).await.is_some();
                if let (true, Some(clean)) = (keep, base_url(&href)) {
                    all.insert(clean);
                    count += 1;
                }
            }
            info!("{:?}: {} stores", query, count);
        }
        all.into_iter().collect()
    }

    /// Homepage, theme, socials and about-page signals. Fetch failures are
    /// recorded in `error` rather than returned.
    pub async fn extract_metadata(&self, store_url: &str) -> StoreMetadata {
        let mut meta = StoreMetadata::new(store_url);
        let html = match self.source.fetch(store_url).await {
            Ok(h) => h,
            Err(e) => {
                meta.error = Some(truncate_chars(&e.to_string(), 100));
                return meta;
            }
        };
        let doc = Html::parse_document(&html);

        meta.page_title = dom::title(&doc).unwrap_or_default();
        meta.meta_description = description(&doc).unwrap_or_default();
        meta.theme_name = detect_theme(&doc, &html);
        meta.is_default_theme = is_default_theme(&meta.theme_name);

        meta.social_links = social_links(&doc);
        let has = |d: &str| meta.social_links.iter().any(|l| l.contains(d));
        meta.has_instagram = has("instagram.com");
        meta.has_facebook = has("facebook.com");
        meta.has_linkedin = has("linkedin.com");
        meta.has_twitter = has("twitter.com") || has("x.com");

        for url in about_candidates(store_url, &doc).into_iter().take(MAX_ABOUT_CHECKS) {
            let Ok(page) = self.source.fetch(&url).await else {
                continue;
            };
            let words = content_word_count(&page);
            if words <= MIN_ABOUT_WORDS {
                continue;
            }
            if url.to_lowercase().contains("story") {
                meta.has_story_page = true;
                meta.story_page_word_count = words;
            } else {
                meta.has_about_page = true;
                meta.about_page_word_count = words;
            }
            break;
        }
        meta
    }

    /// Discover, analyze, classify and score; highest lead score first.
    pub async fn run_scorer(&self, queries: &[String], max_stores: usize) -> Result<Vec<StoreMetadata>> {
        let per_query = (max_stores / queries.len().max(1)).max(1);
        let mut urls = self.discover_stores(queries, per_query).await;
        urls.truncate(max_stores);
        self.score_urls(&urls).await
    }

    /// Analyze and score an explicit list of store URLs.
    pub async fn score_urls(&self, urls: &[String]) -> Result<Vec<StoreMetadata>> {
        let mut results = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            info!("[{}/{}] Analyzing {}", i + 1, urls.len(), url);
            let mut meta = self.extract_metadata(url).await;
            let (industry, confidence) = classify_industry(&meta.page_title, &meta.meta_description);
            meta.industry = industry;
            meta.industry_confidence = confidence;

            let assessment = scoring::score_store(&meta);
            meta.lead_score = assessment.score;
            meta.lead_quality = assessment.quality;
            meta.weakness_count = assessment.weaknesses.len();
            meta.weaknesses = assessment.weaknesses;
            results.push(meta);
        }
        results.sort_by(|a, b| b.lead_score.cmp(&a.lead_score));
        Ok(results)
    }
}

// ── Summary ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ScoringSummary {
    pub total: usize,
    pub by_quality: Vec<(LeadQuality, usize)>,
    pub top_industries: Vec<(String, usize)>,
    pub top_weaknesses: Vec<(String, usize)>,
}

fn most_common<K: Clone + Ord + std::hash::Hash>(items: impl Iterator<Item = K>, n: usize) -> Vec<(K, usize)> {
    let mut counts: HashMap<K, usize> = HashMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    let mut sorted: Vec<(K, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(n);
    sorted
}

pub fn summarize(results: &[StoreMetadata]) -> ScoringSummary {
    let mut by_quality: Vec<(LeadQuality, usize)> = [LeadQuality::Hot, LeadQuality::Warm, LeadQuality::Cold, LeadQuality::Poor]
        .into_iter()
        .map(|q| (q, results.iter().filter(|r| r.lead_quality == q).count()))
        .collect();
    by_quality.retain(|(_, n)| *n > 0);

    ScoringSummary {
        total: results.len(),
        by_quality,
        top_industries: most_common(results.iter().map(|r| r.industry.clone()), 5),
        top_weaknesses: most_common(results.iter().flat_map(|r| r.weaknesses.iter().cloned()), 5),
    }
}

/// Host for display, falling back to the stored domain.
pub fn display_domain(meta: &StoreMetadata) -> String {
    host_of(&meta.url).unwrap_or_else(|| meta.domain.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::CannedPages;

    const HOME: &str = r#"<html><head><title>Kora Threads | Handloom Fashion</title>
        <meta name="description" content="Handwoven clothing and accessories from Jaipur">
        <script src="https://cdn.shopify.com/s/files/theme.js"></script>
        <script>Shopify.theme = {name: "Dawn", id: 1};</script></head>
        <body class="template-index">
        <a href="https://instagram.com/korathreads">IG</a>
        <a href="https://instagram.com/korathreads">IG again</a>
        <a href="/pages/our-story">Our story</a>
        <p>Contact hello@korathreads.in or +91 98290 11223</p></body></html>"#;

    fn long_page(words: usize) -> String {
        format!("<html><body><nav>Home Shop</nav><main>{}</main></body></html>", "word ".repeat(words))
    }

    #[test]
    fn test_detect_markers_and_parse_store() {
        assert!(is_shopify_html(HOME));
        assert!(!is_shopify_html("<html>wordpress</html>"));
        let store = parse_store("https://korathreads.in", HOME);
        assert_eq!(store.name.as_deref(), Some("Kora Threads | Handloom Fashion"));
        assert_eq!(store.email.as_deref(), Some("hello@korathreads.in"));
        assert_eq!(store.phone.as_deref(), Some("+91 98290 11223"));
        assert_eq!(store.source, "shopify_directory");
    }

    #[test]
    fn test_theme_detection() {
        let doc = Html::parse_document(HOME);
        assert_eq!(detect_theme(&doc, HOME), "Dawn");
        assert!(is_default_theme("Dawn"));

        let by_class = r#"<html><body class="theme-brooklyn page"></body></html>"#;
        assert_eq!(detect_theme(&Html::parse_document(by_class), by_class), "brooklyn");
        let none = "<html><body></body></html>";
        assert_eq!(detect_theme(&Html::parse_document(none), none), "unknown");
        assert!(!is_default_theme("unknown"));
    }

    #[test]
    fn test_classify_industry() {
        let (industry, confidence) = classify_industry("Kora Threads", "Handwoven clothing and accessories");
        assert_eq!(industry, "fashion");
        assert!((confidence - 2.0 / 20.0).abs() < 1e-9);
        assert_eq!(classify_industry("Hello", "world"), ("unknown".to_string(), 0.0));
    }

    #[test]
    fn test_search_results_unwrap_redirects() {
        let html = r#"<div><a class="result__url" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fkora.myshopify.com%2Fproducts&rut=x">kora.myshopify.com</a>
            <a class="result__url" href="https://plain.example.com/">plain</a></div>"#;
        assert_eq!(
            parse_search_results(html),
            vec!["https://kora.myshopify.com/products", "https://plain.example.com/"]
        );
    }

    #[tokio::test]
    async fn test_extract_metadata_and_score() {
        let pages = CannedPages::default()
            .with("https://kora.myshopify.com", HOME)
            .with("https://kora.myshopify.com/pages/about", &long_page(20))
            .with("https://kora.myshopify.com/pages/our-story", &long_page(120));
        let scraper = ShopifyScraper::new(&pages, "https://html.duckduckgo.com/html/");

        let results = scraper.score_urls(&["https://kora.myshopify.com".to_string()]).await.unwrap();
        let meta = &results[0];
        assert_eq!(meta.domain, "kora.myshopify.com");
        assert_eq!(meta.theme_name, "Dawn");
        assert_eq!(meta.social_links, vec!["https://instagram.com/korathreads"]);
        assert!(meta.has_instagram);
        assert!(meta.has_story_page);
        assert_eq!(meta.story_page_word_count, 120);
        assert!(!meta.has_about_page);
        assert_eq!(meta.industry, "fashion");
        // myshopify 3 + weak story 2 + default theme 2 + one social 2
        assert_eq!(meta.lead_score, 9);
        assert_eq!(meta.lead_quality, LeadQuality::Hot);
        assert_eq!(meta.weakness_count, 4);
    }

    #[tokio::test]
    async fn test_extract_metadata_records_fetch_error() {
        let pages = CannedPages::default();
        let scraper = ShopifyScraper::new(&pages, "https://html.duckduckgo.com/html/");
        let meta = scraper.extract_metadata("https://gone.example.com").await;
        assert!(meta.error.is_some());
        assert_eq!(meta.theme_name, "unknown");
    }

    #[tokio::test]
    async fn test_discover_keeps_myshopify_and_detected() {
        let results = r#"<a class="result__url" href="https://kora.myshopify.com/collections/all">a</a>
            <a class="result__url" href="https://brand.in/">b</a>
            <a class="result__url" href="https://blog.example.com/">c</a>"#;
        let pages = CannedPages::default()
            .with("https://html.duckduckgo.com/html/?q=handloom", results)
            .with("https://brand.in/", HOME)
            .with("https://blog.example.com/", "<html>wordpress</html>");
        let scraper = ShopifyScraper::new(&pages, "https://html.duckduckgo.com/html/");
        let stores = scraper.discover_stores(&["handloom".to_string()], 10).await;
        assert_eq!(stores, vec!["https://brand.in", "https://kora.myshopify.com"]);
    }

    #[test]
    fn test_summarize() {
        let results = vec![
            StoreMetadata {
                lead_quality: LeadQuality::Hot,
                industry: "fashion".into(),
                weaknesses: vec!["A".into(), "B".into()],
                ..Default::default()
            },
            StoreMetadata {
                lead_quality: LeadQuality::Hot,
                industry: "fashion".into(),
                weaknesses: vec!["A".into()],
                ..Default::default()
            },
        ];
        let s = summarize(&results);
        assert_eq!(s.total, 2);
        assert_eq!(s.by_quality, vec![(LeadQuality::Hot, 2)]);
        assert_eq!(s.top_industries, vec![("fashion".to_string(), 2)]);
        assert_eq!(s.top_weaknesses[0], ("A".to_string(), 2));
    }
}
