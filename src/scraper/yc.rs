//! Y Combinator company directory: listing parse, detail enrichment, scoring.

use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use url::Url;

use super::PageSource;
use super::dom::{self, selectors};
use crate::loader;
use crate::scoring;

static SEASON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Summer|Winter|Fall|Spring)\s+20\d{2}").unwrap());
static SHORT_BATCH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([SWF]\d{2})\b").unwrap());
static LOOSE_LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?:\s[A-Z][a-z]+)*,?\s*[A-Z]{2}|Remote|[A-Z][a-z]+,?\s*[A-Z][a-z]+)\b").unwrap()
});
static DETAIL_LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Z][a-z]+(?:\s[A-Z][a-z]+)*,\s*[A-Z]{2}(?:,\s*(?:USA|United States))?)").unwrap()
});
static TEAM_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Team\s*Size:?\s*(\d+)").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{2,4})").unwrap());
static SEASON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(WINTER|FALL|SUMMER|W|F|S)").unwrap());

static COMPANY_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href^="/companies/"]"#).unwrap());
static NAME_SPAN: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[r#"span[class^="_coName_"]"#, r#"span[class*=" _coName_"]"#]));
static LOCATION_SPAN: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&[r#"span[class^="_coLocation_"]"#, r#"span[class*=" _coLocation_"]"#]));
static NAME_TAGS: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(&["h3", "h2", "h4", "strong", "a"]));
static PILLS: LazyLock<Selector> = LazyLock::new(|| Selector::parse(r#"span[class^="pill"]"#).unwrap());
static LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[class*="text-sm"] span"#).unwrap());
static LOGO: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").unwrap());
static VIDEO: LazyLock<Selector> = LazyLock::new(|| Selector::parse("video[src], iframe[src]").unwrap());
static FALLBACK_BLOCKS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    selectors(&[
        r#"div[class*="company"]"#,
        r#"div[class*="startup"]"#,
        r#"a[class*="company"]"#,
        r#"section[class*="company"]"#,
        "article",
    ])
});
static ANY_CLASSED_DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div[class]").unwrap());

const LIST_KEYS: [&str; 3] = ["companies", "startups", "data"];
const PAGE_PROPS_KEYS: [&str; 4] = ["companies", "startups", "directory", "data"];
const ANCHOR_BLOCK_MIN: usize = 50;

const BANNED_HOSTS: &[&str] = &[
    "ycombinator.com", "news.ycombinator.com", "bookface.ycombinator.com", "startupschool.org",
    "www.startupschool.org", "twitter.com", "x.com", "www.twitter.com", "www.x.com",
    "linkedin.com", "www.linkedin.com", "facebook.com", "www.facebook.com", "medium.com",
    "www.medium.com", "youtube.com", "www.youtube.com", "youtu.be", "github.com", "www.github.com",
];

// ── Record ────────────────────────────────────────────────────────────────────

/// Field order is the CSV column order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct YcCompany {
    pub name: String,
    pub batch: String,
    pub industry: String,
    pub location: String,
    pub website_present: bool,
    pub website: String,
    pub detail_url: String,
    pub description: String,
    pub description_length: usize,
    pub logo: String,
    pub video: String,
    pub team_size: Option<u32>,
    pub founders: String,
    pub github: String,
    pub score: u32,
}

/// Fields only the company page carries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YcDetail {
    pub team_size: Option<u32>,
    pub founders: String,
    pub github: String,
    pub website: String,
    pub location: String,
}

impl YcCompany {
    /// Fill still-empty fields from the detail page.
    pub fn absorb(&mut self, detail: YcDetail) {
        fn fill(slot: &mut String, value: String) {
            if slot.trim().is_empty() && !value.is_empty() {
                *slot = value;
            }
        }
        if self.team_size.is_none() {
            self.team_size = detail.team_size;
        }
        fill(&mut self.founders, detail.founders);
        fill(&mut self.github, detail.github);
        fill(&mut self.website, detail.website);
        fill(&mut self.location, detail.location);
    }

    fn finish(&mut self) {
        self.score = scoring::score_company(self);
        self.website_present = !self.website.trim().is_empty();
        self.description_length = self.description.chars().count();
    }
}

// ── Listing ───────────────────────────────────────────────────────────────────

fn str_field(item: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| item.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn company_from_json(item: &Value) -> Option<YcCompany> {
    let name = str_field(item, &["name", "company_name"]);
    if name.is_empty() {
        return None;
    }
    let mut industry = str_field(item, &["industry", "vertical"]);
    if industry.is_empty() {
        industry = item
            .get("tags")
            .and_then(Value::as_array)
            .and_then(|t| t.first())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }
    Some(YcCompany {
        name,
        batch: str_field(item, &["batch", "yc_batch"]),
        industry,
        location: str_field(item, &["location", "hq_location"]),
        website: str_field(item, &["website", "url"]),
        description: str_field(item, &["description", "one_liner"]),
        logo: str_field(item, &["logo", "logo_url"]),
        video: str_field(item, &["video", "demo_video"]),
        ..Default::default()
    })
}

fn parse_company_list(items: &[Value]) -> Vec<YcCompany> {
    items.iter().filter_map(company_from_json).collect()
}

/// Any list of more than 3 objects whose first element has a name.
fn deep_collect(value: &Value, out: &mut Vec<YcCompany>) {
    match value {
        Value::Object(map) => map.values().for_each(|v| deep_collect(v, out)),
        Value::Array(items) => {
            let all_objects = !items.is_empty() && items.iter().all(Value::is_object);
            let named = items
                .first()
                .map(|s| s.get("name").is_some() || s.get("company_name").is_some())
                .unwrap_or(false);
            if all_objects && named && items.len() > 3 {
                out.extend(parse_company_list(items));
            } else {
                items.iter().for_each(|v| deep_collect(v, out));
            }
        }
        _ => {}
    }
}

/// Companies embedded as JSON in `application/json` or `__NEXT_DATA__` scripts.
pub fn extract_from_scripts(doc: &Html) -> Vec<YcCompany> {
    let mut companies = Vec::new();

    for body in dom::script_bodies(doc, r#"script[type="application/json"]"#) {
        let Ok(data) = serde_json::from_str::<Value>(&body) else {
            continue;
        };
        for key in LIST_KEYS {
            if let Some(items) = data.get(key).and_then(Value::as_array) {
                companies.extend(parse_company_list(items));
            }
        }
    }

    let next_data: Vec<Value> = dom::script_bodies(doc, "script#__NEXT_DATA__")
        .iter()
        .filter_map(|b| serde_json::from_str(b).ok())
        .collect();
    for data in &next_data {
        let Some(props) = data.pointer("/props/pageProps") else {
            continue;
        };
        for key in PAGE_PROPS_KEYS {
            if let Some(items) = props.get(key).and_then(Value::as_array) {
                companies.extend(parse_company_list(items));
            }
        }
    }

    if companies.is_empty() {
        for data in &next_data {
            deep_collect(data, &mut companies);
        }
    }
    companies
}

fn is_company_href(href: &str) -> bool {
    href.starts_with("/companies/") && href.matches('/').count() == 2
}

/// Company cards: `/companies/<slug>` anchors, topped up from generic
/// containers when there are few of them.
fn company_blocks(doc: &Html) -> Vec<ElementRef<'_>> {
    let mut blocks: Vec<ElementRef<'_>> = doc
        .select(&COMPANY_LINKS)
        .filter(|a| a.value().attr("href").map(is_company_href).unwrap_or(false))
        .collect();
    if blocks.len() >= ANCHOR_BLOCK_MIN {
        return blocks;
    }

    let seen: HashSet<_> = blocks.iter().map(|b| b.id()).collect();
    let fallback: Vec<ElementRef<'_>> = FALLBACK_BLOCKS
        .iter()
        .map(|sel| doc.select(sel).collect::<Vec<_>>())
        .find(|found| found.len() > 5)
        .unwrap_or_else(|| doc.select(&ANY_CLASSED_DIV).take(200).collect());
    blocks.extend(fallback.into_iter().filter(|b| !seen.contains(&b.id())));
    blocks
}

/// Card fields from one directory block.
pub fn extract_block(block: ElementRef<'_>, base: &str) -> YcCompany {
    let mut c = YcCompany::default();
    let text = dom::spaced_text(block);

    c.name = dom::first_text(block, &NAME_SPAN).unwrap_or_default();
    c.location = dom::first_text(block, &LOCATION_SPAN).unwrap_or_default();

    let own_href = (block.value().name() == "a")
        .then(|| block.value().attr("href"))
        .flatten()
        .filter(|h| h.starts_with("/companies/"));
    if let Some(href) = own_href {
        c.detail_url = format!("{}{}", base, href);
    }

    if c.name.is_empty() {
        c.name = NAME_TAGS
            .iter()
            .filter_map(|sel| block.select(sel).next())
            .map(dom::text_of)
            .find(|t| {
                let n = t.chars().count();
                n > 2 && n < 100 && !t.to_lowercase().starts_with("http")
            })
            .unwrap_or_default();
    }

    let pills: Vec<String> = block.select(&PILLS).map(dom::text_of).filter(|t| !t.is_empty()).collect();
    c.batch = pills
        .iter()
        .find(|p| SEASON_RE.is_match(p))
        .cloned()
        .or_else(|| SHORT_BATCH_RE.captures(&text).map(|m| m[1].to_uppercase()))
        .unwrap_or_default();
    c.industry = pills
        .iter()
        .filter(|p| **p != c.batch && !SEASON_RE.is_match(p))
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    if c.location.is_empty() {
        c.location = LOOSE_LOCATION_RE
            .captures(&text)
            .map(|m| m[1].to_string())
            .unwrap_or_default();
    }

    for link in block.select(&LINKS) {
        let href = link.value().attr("href").unwrap_or_default();
        if href.starts_with("http") && !href.contains("ycombinator.com") {
            c.website = href.to_string();
            break;
        }
        if href.starts_with("/companies/") {
            c.detail_url = format!("{}{}", base, href);
        }
    }

    c.description = block.select(&DESCRIPTION).next().map(dom::text_of).unwrap_or_default();
    c.logo = block
        .select(&LOGO)
        .next()
        .and_then(|i| i.value().attr("src"))
        .unwrap_or_default()
        .to_string();
    c.video = block
        .select(&VIDEO)
        .next()
        .and_then(|v| v.value().attr("src"))
        .unwrap_or_default()
        .to_string();
    c
}

/// Companies on a directory page: embedded JSON when present, else card blocks.
pub fn parse_listing(html: &str, base: &str) -> Vec<YcCompany> {
    let doc = Html::parse_document(html);
    let from_scripts = extract_from_scripts(&doc);
    if !from_scripts.is_empty() {
        info!("Found {} companies in embedded data", from_scripts.len());
        return from_scripts;
    }
    let blocks = company_blocks(&doc);
    debug!("{} company blocks", blocks.len());
    blocks
        .into_iter()
        .map(|b| extract_block(b, base))
        .filter(|c| !c.name.is_empty())
        .collect()
}

/// "W25" matches "Winter 2025" and vice versa; plain substrings either way also match.
pub fn batch_matches(batch: &str, filters: &[String]) -> bool {
    let batch = batch.trim().to_uppercase();
    if batch.is_empty() {
        return false;
    }
    let year = |s: &str| YEAR_RE.captures(s).map(|c| c[1].chars().rev().take(2).collect::<String>());
    let season = |s: &str| SEASON_WORD_RE.captures(s).and_then(|c| c[1].chars().next());

    filters.iter().any(|f| {
        let f = f.trim().to_uppercase();
        if f.contains(&batch) || batch.contains(&f) {
            return true;
        }
        match (year(&batch), season(&batch), year(&f), season(&f)) {
            (Some(by), Some(bs), Some(fy), Some(fs)) => by == fy && bs == fs,
            _ => false,
        }
    })
}

/// Navigation blocks and blurbs without a batch are not companies.
pub fn is_listing_entry(c: &YcCompany, base: &str) -> bool {
    let root = format!("{}/companies", base);
    if c.detail_url.is_empty() || c.detail_url.trim_end_matches('/') == root {
        return false;
    }
    c.description.trim().chars().count() >= 10 || !c.batch.is_empty()
}

// ── Detail page ───────────────────────────────────────────────────────────────

fn walk_props(value: &Value, d: &mut YcDetail) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                let kl = key.to_lowercase();
                match v {
                    Value::Object(_) | Value::Array(_) => walk_props(v, d),
                    Value::String(s) => {
                        let sl = s.to_lowercase();
                        let link_key = (kl.contains("website") || kl.contains("url"))
                            && !kl.contains("logo")
                            && !kl.contains("image");
                        if d.website.is_empty()
                            && link_key
                            && s.starts_with("http")
                            && !sl.contains("ycombinator.com")
                            && !sl.contains("github.com")
                        {
                            d.website = s.clone();
                        }
                        if d.github.is_empty() && sl.contains("github.com") {
                            d.github = s.clone();
                        }
                        if kl.contains("team") && d.team_size.is_none() {
                            d.team_size = s.trim().parse().ok();
                        }
                        if (kl.contains("location") || kl.contains("hq")) && d.location.is_empty() {
                            d.location = s.clone();
                        }
                    }
                    Value::Number(n) if kl.contains("team") && d.team_size.is_none() => {
                        d.team_size = n.as_u64().and_then(|n| u32::try_from(n).ok());
                    }
                    _ => {}
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| walk_props(v, d)),
        _ => {}
    }
}

fn collect_founders(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            let keys: HashSet<String> = map.keys().map(|k| k.to_lowercase()).collect();
            let founder_like = ["founder", "founders", "role"].iter().any(|k| keys.contains(*k));
            if founder_like {
                if let Some(name) = map.get("name").and_then(Value::as_str) {
                    out.insert(name.to_string());
                }
            }
            map.values().for_each(|v| collect_founders(v, out));
        }
        Value::Array(items) => items.iter().for_each(|v| collect_founders(v, out)),
        _ => {}
    }
}

/// Best external host for a company: slug tokens in the host score, extra
/// subdomain levels cost.
fn pick_website(candidates: &[(String, String)], slug: &str) -> Option<String> {
    let tokens: Vec<&str> = slug.split(['-', '_', '.']).filter(|t| !t.is_empty()).collect();
    let mut best: Option<(i64, &str)> = None;
    for (host, href) in candidates {
        let mut score: i64 = 0;
        if !slug.is_empty() && host.contains(slug) {
            score += 3;
        }
        score += tokens.iter().filter(|t| host.contains(*t)).count() as i64;
        score -= host.matches('.').count() as i64;
        if best.is_none_or(|(s, _)| score > s) {
            best = Some((score, href));
        }
    }
    best.map(|(_, href)| href.to_string())
}

pub fn parse_detail(html: &str, url: &str) -> YcDetail {
    let doc = Html::parse_document(html);
    let mut d = YcDetail::default();

    if let Some(props) = dom::script_bodies(&doc, "script#__NEXT_DATA__")
        .first()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| v.pointer("/props/pageProps").cloned())
    {
        walk_props(&props, &mut d);
        let mut founders = BTreeSet::new();
        collect_founders(&props, &mut founders);
        d.founders = founders.into_iter().collect::<Vec<_>>().join(", ");
    }

    let body_text = dom::visible_lines(&doc).join("\n");
    if d.team_size.is_none() {
        d.team_size = TEAM_SIZE_RE.captures(&body_text).and_then(|c| c[1].parse().ok());
    }

    let anchors: Vec<ElementRef<'_>> = doc.select(&LINKS).collect();
    if d.founders.is_empty() {
        let founders: BTreeSet<String> = anchors
            .iter()
            .filter(|a| a.value().attr("href").unwrap_or_default().contains("/profiles/"))
            .map(|a| dom::text_of(*a))
            .filter(|t| !t.is_empty() && t.split_whitespace().count() <= 4)
            .collect();
        d.founders = founders.into_iter().collect::<Vec<_>>().join(", ");
    }

    if d.website.is_empty() || d.github.is_empty() {
        let mut candidates = Vec::new();
        for a in &anchors {
            let href = a.value().attr("href").unwrap_or_default();
            if !href.starts_with("http") {
                continue;
            }
            let host = Url::parse(href)
                .ok()
                .and_then(|u| u.host_str().map(str::to_lowercase))
                .unwrap_or_default();
            if BANNED_HOSTS.contains(&host.as_str()) {
                if d.github.is_empty() && host.contains("github.com") {
                    d.github = href.to_string();
                }
                continue;
            }
            candidates.push((host, href.to_string()));
        }
        let slug = url.trim_end_matches('/').rsplit('/').next().unwrap_or_default().to_lowercase();
        if d.website.is_empty() {
            d.website = pick_website(&candidates, &slug).unwrap_or_default();
        }
    }

    if d.location.is_empty() {
        d.location = DETAIL_LOCATION_RE
            .captures(&body_text)
            .map(|m| m[1].to_string())
            .unwrap_or_default();
    }
    d
}

// ── Prior runs ────────────────────────────────────────────────────────────────

/// Lowercased names from earlier `yc_startups_*.csv` files.
pub fn load_existing_names(dir: &Path) -> HashSet<String> {
    let files = match loader::discover_files(dir, "yc_startups_", "csv") {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed loading existing names: {:#}", e);
            return HashSet::new();
        }
    };
    let names: HashSet<String> = files
        .iter()
        .filter_map(|p| loader::load_csv_rows(p).ok())
        .flatten()
        .filter_map(|row| loader::field(&row, &["name"]).map(str::to_lowercase))
        .collect();
    if !names.is_empty() {
        info!("Loaded {} existing names to exclude", names.len());
    }
    names
}

// ── Scraper ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct YcOptions {
    pub batches: Vec<String>,
    pub max_results: usize,
    pub regions: Option<String>,
    /// Lowercased names to skip.
    pub exclude: HashSet<String>,
}

pub struct YcScraper<S: PageSource + 'static> {
    source: Arc<S>,
    base: String,
    concurrency: usize,
}

impl<S: PageSource + 'static> YcScraper<S> {
    pub fn new(source: Arc<S>, base: &str, concurrency: usize) -> Self {
        Self {
            source,
            base: base.trim_end_matches('/').to_string(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn directory_url(&self, regions: Option<&str>) -> String {
        let url = format!("{}/companies", self.base);
        match regions {
            Some(r) => Url::parse_with_params(&url, &[("regions", r)])
                .map(|u| u.to_string())
                .unwrap_or(url),
            None => url,
        }
    }

    /// Listing → filters → detail enrichment → score; weakest brands first.
    pub async fn run(&self, opts: &YcOptions) -> Result<Vec<YcCompany>> {
        let url = self.directory_url(opts.regions.as_deref());
        info!("Fetching YC companies from {}", url);
        let html = self.source.fetch(&url).await.context("YC directory fetch failed")?;
        let mut companies = parse_listing(&html, &self.base);

        if !opts.batches.is_empty() {
            companies.retain(|c| batch_matches(&c.batch, &opts.batches));
            info!("{} companies match batches {:?}", companies.len(), opts.batches);
        }
        if !opts.exclude.is_empty() {
            let before = companies.len();
            companies.retain(|c| !opts.exclude.contains(&c.name.to_lowercase()));
            info!("Excluded {} previously saved companies", before - companies.len());
        }
        let before = companies.len();
        companies.retain(|c| is_listing_entry(c, &self.base));
        if companies.len() != before {
            info!("Filtered out {} navigation/invalid blocks", before - companies.len());
        }
        if companies.is_empty() {
            warn!("No companies found");
            return Ok(vec![]);
        }

        self.enrich(&mut companies).await;

        for c in &mut companies {
            c.finish();
        }
        companies.sort_by(|a, b| b.score.cmp(&a.score));
        if opts.max_results > 0 {
            companies.truncate(opts.max_results);
        }
        info!(
            "Processed {} companies (top score {})",
            companies.len(),
            companies.first().map(|c| c.score).unwrap_or(0)
        );
        Ok(companies)
    }

    /// Fetch every detail page with bounded concurrency. A failed page leaves
    /// the listing fields as they are.
    async fn enrich(&self, companies: &mut [YcCompany]) {
        let sem = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::new();

        for (idx, company) in companies.iter().enumerate() {
            let url = company.detail_url.clone();
            let source = Arc::clone(&self.source);
            let sem = Arc::clone(&sem);

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await?;
                let html = source.fetch(&url).await.with_context(|| format!("detail page {}", url))?;
                Ok::<YcDetail, anyhow::Error>(parse_detail(&html, &url))
            });
            handles.push((idx, handle));
        }

        for (idx, handle) in handles {
            match handle.await {
                Ok(Ok(detail)) => companies[idx].absorb(detail),
                Ok(Err(e)) => warn!("{}: {:#}", companies[idx].name, e),
                Err(e) => error!("Task panic for {}: {}", companies[idx].name, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::CannedPages;

    const BASE: &str = "https://www.ycombinator.com";

    const LISTING: &str = r#"<html><body>
        <a href="/companies">All companies</a>
        <a href="/companies/pixelforge" class="_company_abc">
          <img src="https://cdn.yc/pixelforge.png">
          <span class="_coName_x1">PixelForge</span>
          <span class="_coLocation_x2">Bengaluru, KA, India</span>
          <div class="text-sm"><span>AI design assistant for D2C brands</span></div>
          <span class="pill _pill_1">Winter 2025</span>
          <span class="pill _pill_2">B2B</span>
        </a>
        <a href="/companies/quietco">
          <span class="_coName_x1">QuietCo</span>
          <span class="pill">S24</span>
        </a>
        </body></html>"#;

    const DETAIL: &str = r#"<html><body>
        <h1>PixelForge</h1>
        <div>Team Size: 3</div>
        <a href="/people/profiles/ana">Ana Rao</a>
        <a href="/people/profiles/dev">Dev Shah</a>
        <a href="https://twitter.com/pixelforge">tw</a>
        <a href="https://github.com/pixelforge">gh</a>
        <a href="https://blog.medium-clone.io/post">blog</a>
        <a href="https://pixelforge.ai">site</a>
        <p>San Francisco, CA</p>
        </body></html>"#;

    #[test]
    fn test_parse_listing_blocks() {
        let companies = parse_listing(LISTING, BASE);
        let pf = companies.iter().find(|c| c.name == "PixelForge").unwrap();
        assert_eq!(pf.detail_url, "https://www.ycombinator.com/companies/pixelforge");
        assert_eq!(pf.location, "Bengaluru, KA, India");
        assert_eq!(pf.batch, "Winter 2025");
        assert_eq!(pf.industry, "B2B");
        assert_eq!(pf.description, "AI design assistant for D2C brands");
        assert_eq!(pf.logo, "https://cdn.yc/pixelforge.png");

        let quiet = companies.iter().find(|c| c.name == "QuietCo").unwrap();
        assert_eq!(quiet.batch, "S24");
        assert!(is_listing_entry(quiet, BASE));
    }

    #[test]
    fn test_embedded_json_wins() {
        let html = r#"<html><body><script id="__NEXT_DATA__" type="application/json">
            {"props":{"pageProps":{"companies":[
              {"name":"Alpha","batch":"W25","one_liner":"Payments for kirana stores","tags":["Fintech"]},
              {"company_name":"Beta","website":"https://beta.dev"}
            ]}}}</script></body></html>"#;
        let companies = parse_listing(html, BASE);
        assert_eq!(companies.len(), 2);
        assert_eq!(companies[0].industry, "Fintech");
        assert_eq!(companies[0].description, "Payments for kirana stores");
        assert_eq!(companies[1].website, "https://beta.dev");
    }

    #[test]
    fn test_batch_matching() {
        let f = |s: &[&str]| s.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        assert!(batch_matches("Winter 2025", &f(&["W25"])));
        assert!(batch_matches("W25", &f(&["Winter 2025"])));
        assert!(batch_matches("S24", &f(&["s24"])));
        assert!(!batch_matches("Summer 2024", &f(&["W24"])));
        assert!(!batch_matches("", &f(&["W25"])));
    }

    #[test]
    fn test_listing_entry_filter() {
        let nav = YcCompany {
            name: "All companies".into(),
            detail_url: format!("{}/companies/", BASE),
            ..Default::default()
        };
        assert!(!is_listing_entry(&nav, BASE));
        let thin = YcCompany {
            name: "Thin".into(),
            detail_url: format!("{}/companies/thin", BASE),
            description: "short".into(),
            ..Default::default()
        };
        assert!(!is_listing_entry(&thin, BASE));
    }

    #[test]
    fn test_parse_detail_fallbacks() {
        let d = parse_detail(DETAIL, "https://www.ycombinator.com/companies/pixelforge");
        assert_eq!(d.team_size, Some(3));
        assert_eq!(d.founders, "Ana Rao, Dev Shah");
        assert_eq!(d.github, "https://github.com/pixelforge");
        assert_eq!(d.website, "https://pixelforge.ai");
        assert_eq!(d.location, "San Francisco, CA");
    }

    #[test]
    fn test_parse_detail_next_data() {
        let html = r#"<html><body><script id="__NEXT_DATA__" type="application/json">
            {"props":{"pageProps":{"company":{
              "website":"https://alpha.in","team_size":12,"location":"Pune, India",
              "founders":[{"name":"Meera Iyer","role":"CEO"}]}}}}</script></body></html>"#;
        let d = parse_detail(html, "https://www.ycombinator.com/companies/alpha");
        assert_eq!(d.website, "https://alpha.in");
        assert_eq!(d.team_size, Some(12));
        assert_eq!(d.location, "Pune, India");
        assert_eq!(d.founders, "Meera Iyer");
    }

    #[tokio::test]
    async fn test_run_enriches_and_scores() {
        let pages = Arc::new(
            CannedPages::default()
                .with("https://www.ycombinator.com/companies", LISTING)
                .with("https://www.ycombinator.com/companies/pixelforge", DETAIL),
        );
        let scraper = YcScraper::new(pages, BASE, 4);
        let opts = YcOptions {
            max_results: 10,
            ..Default::default()
        };
        let companies = scraper.run(&opts).await.unwrap();
        assert_eq!(companies.len(), 2);

        // QuietCo's detail page is missing: listing fields kept, weakest brand
        assert_eq!(companies[0].name, "QuietCo");
        assert_eq!(companies[0].score, 11);
        assert!(!companies[0].website_present);

        let pf = &companies[1];
        assert_eq!(pf.website, "https://pixelforge.ai");
        assert_eq!(pf.team_size, Some(3));
        // short description 2 + no video 2 + small team 1
        assert_eq!(pf.score, 5);
        assert_eq!(pf.description_length, 34);
    }
}
