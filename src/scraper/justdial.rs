//! JustDial listing + detail scraper.
//!
//! Walks a listing page, opens each entry's detail page, merges the two
//! (detail only fills fields the listing left empty) and pages forward until
//! `target` records are collected, no further page exists, or 20 iterations
//! have run.

use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use super::PageSource;
use super::cleaner::{
    SocialLinks, absolutize, clean_phone, extract_email, extract_phone, is_directory_or_social, parse_rating,
};
use super::dom::{first_attr, first_parsed, first_text, hrefs, script_bodies, selectors, visible_lines};

const MAX_ITERATIONS: usize = 20;

// ── Selectors ─────────────────────────────────────────────────────────────────

static LISTING: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&["li.cntanr", ".resultbox", "div.resultbox", "div.store-details", "ul.rsl-list > li"])
});
static NAME: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[".jcn a", ".resultbox_title_anchor", "a.resultbox_title_anchor", "h2 a"]));
static ADDRESS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[".resultbox_address", "span.mrehover", ".loc a", "p.address", ".adr"]));
static LIST_RATING: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[".green-box", ".rating-value", "span.star_m"]));
static LIST_REVIEWS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[".review-count", ".votes", r#"span[class*="review"]"#]));
static LIST_CUISINES: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[".cat-txt", ".cuisine", ".category-tag", r#"span[class*="cuisine"]"#]));

static DETAIL_CUISINES: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[".cuisine", ".category", ".category-tag", ".chip", "ul.cuisine-list li"]));
static DETAIL_RATING: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[r#".rating-value, .green-box, span[itemprop="ratingValue"]"#]));
static DETAIL_REVIEWS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[r#".review-count, .votes, span[itemprop="ratingCount"]"#]));
static TEL_LINKS: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(&[r#"a[href^="tel:"]"#]));
static MAILTO_LINKS: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(&[r#"a[href^="mailto:"]"#]));

static NEXT_PAGE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[r#"a[aria-label="Next"]"#, "a.next", ".pagination-next", r#"a[rel="next"]"#])
});

static REVIEWS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d,]*").unwrap());
static PRICING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(Average\s*Cost\s*for\s*two|Cost\s*for\s*Two|Average\s*price)[^\n]*").unwrap());
static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:₹|Rs\.?|\$)\s?\d[\d,]*(?:\s?-\s?(?:₹|Rs\.?|\$)?\s?\d[\d,]*)?").unwrap());
static PAGE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/page-\d+/?$").unwrap());

// ── Records ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JustDialRecord {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website_present: bool,
    pub website: String,
    pub cuisines: String,
    pub rating: Option<f64>,
    pub reviews: Option<u64>,
    pub pricing: String,
    pub instagram: String,
    pub facebook: String,
    pub twitter: String,
    pub linkedin: String,
    pub youtube: String,
}

impl JustDialRecord {
    /// Fill fields this record is missing from `detail`; never overwrite.
    pub fn merge_detail(&mut self, detail: JustDialRecord) {
        fn fill(dst: &mut String, src: String) {
            if dst.is_empty() && !src.is_empty() {
                *dst = src;
            }
        }
        fill(&mut self.name, detail.name);
        fill(&mut self.address, detail.address);
        fill(&mut self.phone, detail.phone);
        fill(&mut self.email, detail.email);
        fill(&mut self.website, detail.website);
        fill(&mut self.cuisines, detail.cuisines);
        fill(&mut self.pricing, detail.pricing);
        fill(&mut self.instagram, detail.instagram);
        fill(&mut self.facebook, detail.facebook);
        fill(&mut self.twitter, detail.twitter);
        fill(&mut self.linkedin, detail.linkedin);
        fill(&mut self.youtube, detail.youtube);
        self.rating = self.rating.or(detail.rating);
        self.reviews = self.reviews.or(detail.reviews);
        self.website_present = !self.website.is_empty();
    }

    fn absorb_social(&mut self, href: &str) {
        let mut links = SocialLinks::default();
        if !links.absorb(href) {
            return;
        }
        let pairs = [
            (&mut self.instagram, links.instagram),
            (&mut self.facebook, links.facebook),
            (&mut self.twitter, links.twitter),
            (&mut self.linkedin, links.linkedin),
            (&mut self.youtube, links.youtube),
        ];
        for (dst, src) in pairs {
            if let Some(src) = src {
                if dst.is_empty() {
                    *dst = src;
                }
            }
        }
    }
}

/// One listing entry: its list metadata plus the detail-page link, if any.
#[derive(Debug, Clone)]
pub struct ListingEntry {
    pub meta: JustDialRecord,
    pub detail_url: Option<String>,
}

// ── Listing page ──────────────────────────────────────────────────────────────

/// Entries of a listing page, using the first container selector that matches.
pub fn parse_listing(html: &str, page_url: &str) -> Vec<ListingEntry> {
    let doc = Html::parse_document(html);
    let Some(entries) = LISTING.iter().map(|sel| doc.select(sel).collect::<Vec<_>>()).find(|v| !v.is_empty())
    else {
        return vec![];
    };
    entries
        .into_iter()
        .map(|entry| ListingEntry {
            meta: list_metadata(entry),
            detail_url: entry_link(entry, page_url),
        })
        .collect()
}

fn list_metadata(entry: ElementRef<'_>) -> JustDialRecord {
    JustDialRecord {
        name: first_text(entry, &NAME).unwrap_or_default(),
        address: first_text(entry, &ADDRESS).unwrap_or_default(),
        rating: first_parsed(entry, &LIST_RATING, parse_rating),
        reviews: first_parsed(entry, &LIST_REVIEWS, parse_reviews),
        cuisines: first_text(entry, &LIST_CUISINES).unwrap_or_default(),
        ..Default::default()
    }
}

fn entry_link(entry: ElementRef<'_>, page_url: &str) -> Option<String> {
    NAME.iter().find_map(|sel| {
        let href = entry.select(sel).next()?.value().attr("href")?;
        absolutize(page_url, href).filter(|u| u.starts_with("http"))
    })
}

fn parse_reviews(text: &str) -> Option<u64> {
    REVIEWS_RE.find(text)?.as_str().replace(',', "").parse().ok()
}

/// URL of the next listing page: an explicit "next" link, else a `/page-N`
/// suffix on the current URL.
pub fn next_page_url(html: &str, current_url: &str, next_page: u32) -> Option<String> {
    let doc = Html::parse_document(html);
    if let Some(href) = first_attr(doc.root_element(), &NEXT_PAGE, "href") {
        if let Some(url) = absolutize(current_url, &href) {
            return Some(url);
        }
    }
    let (path, query) = match current_url.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (current_url, None),
    };
    let stem = PAGE_SUFFIX_RE.replace(path, "");
    let mut url = format!("{}/page-{}", stem.trim_end_matches('/'), next_page);
    if let Some(q) = query {
        url.push('?');
        url.push_str(q);
    }
    Some(url)
}

// ── Detail page ───────────────────────────────────────────────────────────────

pub fn parse_detail(html: &str) -> JustDialRecord {
    let doc = Html::parse_document(html);
    let root = doc.root_element();
    let mut data = JustDialRecord::default();

    // Phone: tel: links, then visible text
    data.phone = TEL_LINKS
        .iter()
        .flat_map(|sel| doc.select(sel))
        .filter_map(|a| a.value().attr("href"))
        .find_map(clean_phone)
        .or_else(|| extract_phone(&visible_lines(&doc).join("\n")))
        .unwrap_or_default();

    // Email: mailto:, then anywhere in the source
    data.email = first_attr(root, &MAILTO_LINKS, "href")
        .map(|h| {
            let addr = h.trim_start_matches("mailto:");
            addr.split('?').next().unwrap_or(addr).trim().to_string()
        })
        .filter(|e| !e.is_empty())
        .or_else(|| extract_email(html))
        .unwrap_or_default();

    // Socials while scanning for the first non-directory website
    for href in hrefs(root).iter().filter(|h| h.starts_with("http")) {
        data.absorb_social(href);
        if !is_directory_or_social(href) {
            data.website = href.clone();
            break;
        }
    }

    data.cuisines = first_text(root, &DETAIL_CUISINES).unwrap_or_default();
    data.rating = first_parsed(root, &DETAIL_RATING, parse_rating);
    data.reviews = first_parsed(root, &DETAIL_REVIEWS, parse_reviews);
    data.pricing = extract_pricing(&doc);

    for body in script_bodies(&doc, r#"script[type="application/ld+json"]"#) {
        apply_json_ld(&mut data, &body);
    }

    data.website_present = !data.website.is_empty();
    data
}

fn extract_pricing(doc: &Html) -> String {
    let lines = visible_lines(doc);
    let text = lines.join("\n");

    // Currency needs a real ₹/Rs/$ token, so short stray numbers never qualify
    match PRICING_RE.find(&text) {
        Some(m) => {
            let mut found = m.as_str().trim().to_string();
            // label and amount often sit in sibling nodes
            if !found.chars().any(|c| c.is_ascii_digit()) {
                if let Some(next) = text[m.end()..].lines().find(|l| !l.trim().is_empty()) {
                    found = format!("{} {}", found, next.trim());
                }
            }
            found
        }
        None => CURRENCY_RE
            .find(&text)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
    }
}

fn apply_json_ld(data: &mut JustDialRecord, raw: &str) {
    let Ok(parsed) = serde_json::from_str::<Value>(raw.trim()) else {
        return;
    };
    let items = match parsed {
        Value::Array(items) => items,
        other => vec![other],
    };

    for obj in items.iter().filter_map(Value::as_object) {
        let typ = match obj.get("@type").or_else(|| obj.get("@TYPE")) {
            Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" "),
            Some(Value::String(t)) => t.clone(),
            _ => String::new(),
        }
        .to_lowercase();
        if !["restaurant", "localbusiness", "foodestablishment"].iter().any(|k| typ.contains(k)) {
            continue;
        }

        let str_field = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| obj.get(*k))
                .and_then(|v| match v {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
        };

        if data.website.is_empty() {
            if let Some(url) = str_field(&["url", "URL"]) {
                if url.starts_with("http") && !url.to_lowercase().contains("justdial") {
                    data.website = url;
                }
            }
        }
        if data.phone.is_empty() {
            if let Some(tel) = str_field(&["telephone", "phone"]).and_then(|t| clean_phone(&t)) {
                data.phone = tel;
            }
        }
        if data.email.is_empty() {
            if let Some(email) = str_field(&["email"]).filter(|e| e.contains('@')) {
                data.email = email;
            }
        }
        if data.cuisines.is_empty() {
            data.cuisines = match obj.get("servesCuisine") {
                Some(Value::Array(list)) => list
                    .iter()
                    .filter_map(|c| c.as_str())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join(", "),
                Some(Value::String(s)) => s.clone(),
                _ => String::new(),
            };
        }
        if let Some(agg) = obj.get("aggregateRating").and_then(Value::as_object) {
            let num = |keys: &[&str]| {
                keys.iter().find_map(|k| match agg.get(*k) {
                    Some(Value::Number(n)) => n.as_f64(),
                    Some(Value::String(s)) => s.replace(',', "").trim().parse().ok(),
                    _ => None,
                })
            };
            if data.rating.is_none() {
                data.rating = num(&["ratingValue", "rating"]);
            }
            if data.reviews.is_none() {
                data.reviews = num(&["reviewCount", "ratingCount"]).map(|n| n as u64);
            }
        }
        if data.pricing.is_empty() {
            if let Some(pr) = str_field(&["priceRange"]) {
                data.pricing = pr;
            }
        }
        if let Some(Value::Array(same_as)) = obj.get("sameAs") {
            for link in same_as.iter().filter_map(Value::as_str) {
                data.absorb_social(link);
            }
        }
    }
}

// ── Scraper ───────────────────────────────────────────────────────────────────

pub struct JustDialScraper<S: PageSource> {
    source: S,
}

impl<S: PageSource> JustDialScraper<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Collect up to `target` enriched records starting from a listing URL.
    pub async fn run(&self, url: &str, target: usize) -> Result<Vec<JustDialRecord>> {
        let mut html = self
            .source
            .fetch(url)
            .await
            .with_context(|| format!("Failed to fetch listing {}", url))?;
        let mut current_url = url.to_string();
        let mut visited: HashSet<String> = HashSet::from([current_url.clone()]);
        let mut page = 1u32;

        let mut results: Vec<JustDialRecord> = Vec::new();
        let mut seen_names: HashSet<String> = HashSet::new();
        let mut iterations = 0usize;

        while results.len() < target && iterations < MAX_ITERATIONS {
            iterations += 1;
            let entries = parse_listing(&html, &current_url);
            info!("Page scan: found {} listing elements", entries.len());
            let start_seen = seen_names.len();

            for entry in entries {
                if results.len() >= target {
                    break;
                }
                if entry.meta.name.is_empty() {
                    continue;
                }
                let norm = entry.meta.name.trim().to_lowercase();
                if seen_names.contains(&norm) {
                    continue;
                }

                let mut merged = entry.meta;
                if let Some(detail_url) = &entry.detail_url {
                    match self.source.fetch(detail_url).await {
                        Ok(detail_html) => merged.merge_detail(parse_detail(&detail_html)),
                        Err(e) => warn!("Detail fetch failed for {}: {:#}", merged.name, e),
                    }
                }
                merged.website_present = !merged.website.is_empty();

                info!("Added: {}", merged.name);
                results.push(merged);
                seen_names.insert(norm);
            }

            if results.len() >= target {
                break;
            }
            if seen_names.len() == start_seen {
                debug!("No new names on {}", current_url);
            }

            page += 1;
            match self.load_more(&html, &current_url, page, &visited).await {
                Some((next_url, next_html)) => {
                    visited.insert(next_url.clone());
                    current_url = next_url;
                    html = next_html;
                }
                None => {
                    info!("No more content loaded via pagination.");
                    break;
                }
            }
        }

        info!("JustDial: {} records after {} iterations", results.len(), iterations);
        Ok(results)
    }

    /// Fetch the next listing page; `None` when there is none or it is empty.
    async fn load_more(
        &self,
        html: &str,
        current_url: &str,
        page: u32,
        visited: &HashSet<String>,
    ) -> Option<(String, String)> {
        let next_url = next_page_url(html, current_url, page)?;
        if visited.contains(&next_url) {
            return None;
        }
        match self.source.fetch(&next_url).await {
            Ok(next_html) if !parse_listing(&next_html, &next_url).is_empty() => Some((next_url, next_html)),
            Ok(_) => None,
            Err(e) => {
                debug!("Next page {} unavailable: {:#}", next_url, e);
                None
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::CannedPages;

    const LISTING_1: &str = r#"<html><body><ul>
        <li class="cntanr">
          <h2 class="jcn"><a href="/Mumbai/Sakura-Dining/detail-1">Sakura Dining</a></h2>
          <span class="mrehover">Bandra West, Mumbai</span>
          <span class="green-box">4.3</span>
          <span class="rt_count votes">1,204 Ratings</span>
          <span class="cat-txt">Japanese, Sushi</span>
        </li>
        <li class="cntanr">
          <h2 class="jcn"><a href="/Mumbai/Ramen-House/detail-2">Ramen House</a></h2>
          <span class="mrehover">Andheri, Mumbai</span>
        </li>
        <li class="cntanr"><span class="mrehover">No name here</span></li>
        <li class="cntanr">
          <h2 class="jcn"><a href="/Mumbai/Sakura-Dining/detail-1">sakura dining </a></h2>
        </li>
      </ul><a rel="next" href="/Mumbai/Japanese-Restaurants/page-2">Next</a></body></html>"#;

    const LISTING_2: &str = r#"<html><body><ul>
        <li class="cntanr"><h2 class="jcn"><a href="/Mumbai/Tokyo-Bay/detail-3">Tokyo Bay</a></h2></li>
      </ul></body></html>"#;

    const DETAIL_1: &str = r#"<html><body>
        <a href="tel:+91 22 4000 1234">Call</a>
        <a href="https://www.justdial.com/other">JD</a>
        <a href="https://instagram.com/sakuradining">IG</a>
        <a href="https://sakura-dining.in">Website</a>
        <a href="https://facebook.com/sakura">FB</a>
        <div>Average Cost for two</div><div>₹2,000</div>
        <script type="application/ld+json">
          {"@type":"Restaurant","email":"hello@sakura-dining.in","servesCuisine":["Japanese"],
           "aggregateRating":{"ratingValue":"4.6","reviewCount":"1,500"},"priceRange":"₹₹₹"}
        </script>
      </body></html>"#;

    #[test]
    fn test_parse_listing_extracts_metadata() {
        let entries = parse_listing(LISTING_1, "https://www.justdial.com/Mumbai/Japanese-Restaurants");
        assert_eq!(entries.len(), 4);
        let first = &entries[0];
        assert_eq!(first.meta.name, "Sakura Dining");
        assert_eq!(first.meta.address, "Bandra West, Mumbai");
        assert_eq!(first.meta.rating, Some(4.3));
        assert_eq!(first.meta.reviews, Some(1204));
        assert_eq!(first.meta.cuisines, "Japanese, Sushi");
        assert_eq!(
            first.detail_url.as_deref(),
            Some("https://www.justdial.com/Mumbai/Sakura-Dining/detail-1")
        );
        assert!(entries[2].meta.name.is_empty());
    }

    #[test]
    fn test_parse_detail_fields() {
        let d = parse_detail(DETAIL_1);
        assert_eq!(d.phone, "+912240001234");
        assert_eq!(d.website, "https://sakura-dining.in");
        assert!(d.website_present);
        assert_eq!(d.instagram, "https://instagram.com/sakuradining");
        // scan stops at the first real website
        assert_eq!(d.facebook, "");
        assert_eq!(d.pricing, "Average Cost for two ₹2,000");
        assert_eq!(d.email, "hello@sakura-dining.in");
        assert_eq!(d.cuisines, "Japanese");
        assert_eq!(d.rating, Some(4.6));
        assert_eq!(d.reviews, Some(1500));
    }

    #[test]
    fn test_json_ld_only_fills_empty_fields() {
        let html = r#"<html><body><span class="rating-value">4.1</span>
            <script type="application/ld+json">[{"@type":["LocalBusiness"],"url":"https://cafe.example",
              "telephone":"+91-98200 11111","aggregateRating":{"ratingValue":4.9},
              "sameAs":["https://www.youtube.com/@cafe","https://x.com/cafe"]}]</script></body></html>"#;
        let d = parse_detail(html);
        assert_eq!(d.rating, Some(4.1));
        assert_eq!(d.website, "https://cafe.example");
        assert_eq!(d.phone, "+919820011111");
        assert_eq!(d.youtube, "https://www.youtube.com/@cafe");
        assert_eq!(d.twitter, "https://x.com/cafe");
    }

    #[test]
    fn test_pricing_needs_label_or_currency() {
        let html = "<html><body><p>Rs 5</p></body></html>";
        assert_eq!(parse_detail(html).pricing, "Rs 5");
        let html = "<html><body><p>₹800 - ₹1,200</p></body></html>";
        assert_eq!(parse_detail(html).pricing, "₹800 - ₹1,200");
        // stray digits after a word ending in "s" or a full stop are not prices
        let html = "<html><body><p>Items 5</p><p>Open. 10 am</p></body></html>";
        assert_eq!(parse_detail(html).pricing, "");
    }

    #[test]
    fn test_merge_detail_never_overwrites() {
        let mut list = JustDialRecord {
            name: "Sakura".into(),
            rating: Some(4.0),
            ..Default::default()
        };
        list.merge_detail(JustDialRecord {
            name: "Other".into(),
            rating: Some(4.9),
            website: "https://s.in".into(),
            ..Default::default()
        });
        assert_eq!(list.name, "Sakura");
        assert_eq!(list.rating, Some(4.0));
        assert_eq!(list.website, "https://s.in");
        assert!(list.website_present);
    }

    #[test]
    fn test_next_page_url_fallback() {
        assert_eq!(
            next_page_url("<html></html>", "https://www.justdial.com/Mumbai/Cafes/page-2", 3),
            Some("https://www.justdial.com/Mumbai/Cafes/page-3".into())
        );
        assert_eq!(
            next_page_url("<html></html>", "https://www.justdial.com/Mumbai/Cafes?x=1", 2),
            Some("https://www.justdial.com/Mumbai/Cafes/page-2?x=1".into())
        );
    }

    #[tokio::test]
    async fn test_run_merges_dedups_and_paginates() {
        let base = "https://www.justdial.com/Mumbai/Japanese-Restaurants";
        let pages = CannedPages::default()
            .with(base, LISTING_1)
            .with("https://www.justdial.com/Mumbai/Sakura-Dining/detail-1", DETAIL_1)
            .with(&format!("{}/page-2", base), LISTING_2);
        // Ramen House and Tokyo Bay details are missing: list metadata is kept.
        let scraper = JustDialScraper::new(pages);
        let results = scraper.run(base, 10).await.unwrap();

        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Sakura Dining", "Ramen House", "Tokyo Bay"]);
        assert_eq!(results[0].website, "https://sakura-dining.in");
        assert_eq!(results[0].rating, Some(4.3));
        assert!(!results[1].website_present);
        assert_eq!(results[1].address, "Andheri, Mumbai");
    }

    #[tokio::test]
    async fn test_run_stops_at_target() {
        let base = "https://www.justdial.com/Mumbai/Japanese-Restaurants";
        let pages = CannedPages::default().with(base, LISTING_1);
        let scraper = JustDialScraper::new(pages);
        let results = scraper.run(base, 1).await.unwrap();
        assert_eq!(results.len(), 1);
        let requested = scraper.source.requested.lock().unwrap().clone();
        assert_eq!(requested.len(), 2);
    }

    #[tokio::test]
    async fn test_run_stops_after_max_iterations() {
        let base = "https://www.justdial.com/Pune/Cafes";
        let listing = |n: usize| {
            format!(r#"<html><body><ul><li class="cntanr"><h2 class="jcn"><a>Cafe {n}</a></h2></li></ul></body></html>"#)
        };
        let mut pages = CannedPages::default().with(base, &listing(1));
        for n in 2..=25 {
            pages = pages.with(&format!("{}/page-{}", base, n), &listing(n));
        }

        let scraper = JustDialScraper::new(pages);
        let results = scraper.run(base, 100).await.unwrap();

        assert_eq!(results.len(), MAX_ITERATIONS);
        assert_eq!(results.last().map(|r| r.name.as_str()), Some("Cafe 20"));
        let requested = scraper.source.requested.lock().unwrap().clone();
        assert_eq!(requested.last().map(String::as_str), Some("https://www.justdial.com/Pune/Cafes/page-21"));
    }
}
