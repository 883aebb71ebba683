//! Brand mentions in influencer captions ("glasses from @lenskart", "wearing Zara").

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::loader::{self, Row};
use crate::scraper::instagram::BrandProfile;

pub const PRODUCT_KEYWORDS: &[&str] = &[
    // clothing
    "shirt", "tshirt", "t-shirt", "tee", "top", "jacket", "coat", "blazer", "hoodie", "sweatshirt",
    "sweater", "cardigan", "vest", "pants", "jeans", "trousers", "shorts", "joggers", "cargo", "kurta",
    "kurti", "sherwani", "dhoti",
    // footwear
    "shoes", "sneakers", "sneaker", "boots", "sandals", "slippers", "loafers", "oxfords", "trainers",
    // accessories
    "watch", "glasses", "sunglasses", "bag", "backpack", "wallet", "belt", "hat", "cap", "beanie",
    "scarf", "tie", "bowtie", "necklace", "chain", "bracelet", "ring", "earrings",
    // grooming
    "fragrance", "perfume", "cologne", "deodorant",
    // general
    "outfit", "fit", "look", "collection", "piece",
];

const NEARBY_WINDOW: usize = 50;
const CONTEXT_MAX: usize = 150;

static FROM_BY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:from|by)\s+@?([a-zA-Z0-9_]+)(?:'s|s)?").unwrap());
static COLLECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@([a-zA-Z0-9_]+)(?:'s|s)?\s+([A-Z][A-Z\-\s]+(?:Collection|Edition|Series|Line))").unwrap()
});
static WEARING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)wearing\s+@?([a-zA-Z0-9_]+)(?:'s|s)?").unwrap());
static AT_MENTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@([a-zA-Z0-9_]+)").unwrap());
static PRODUCT_FROM_RES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    PRODUCT_KEYWORDS
        .iter()
        .map(|kw| {
            let pat = format!(
                r"(?i)(?:the\s+)?(?:\w+\s+)?{}(?:\s+\w+)?\s+(?:from|by|is|are)\s+@?([a-zA-Z0-9_]+)",
                regex::escape(kw)
            );
            (*kw, Regex::new(&pat).unwrap())
        })
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    FromBy,
    Collection,
    ProductFrom,
    Wearing,
    Proximity,
}

/// One brand reference inside a caption.
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    pub brand: String,
    pub product: Option<String>,
    pub context: String,
    pub pattern: Pattern,
}

fn floor_boundary(s: &str, mut i: usize) -> usize {
    i = i.min(s.len());
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// `text[start - before .. end + after]`, clamped to the string and char boundaries.
fn around(text: &str, start: usize, end: usize, before: usize, after: usize) -> String {
    let from = floor_boundary(text, start.saturating_sub(before));
    let to = floor_boundary(text, end + after);
    text[from..to].trim().to_string()
}

/// First product keyword within the window around `pos`.
pub fn nearby_product(text: &str, pos: usize) -> Option<&'static str> {
    let window = around(text, pos, pos, NEARBY_WINDOW, NEARBY_WINDOW).to_lowercase();
    PRODUCT_KEYWORDS.iter().copied().find(|kw| window.contains(kw))
}

/// Every brand mention in a caption, in pattern order.
pub fn extract_mentions(text: &str) -> Vec<Mention> {
    let mut mentions = Vec::new();
    if text.trim().is_empty() {
        return mentions;
    }

    for m in FROM_BY_RE.captures_iter(text) {
        let whole = m.get(0).map(|g| (g.start(), g.end())).unwrap_or_default();
        mentions.push(Mention {
            brand: m[1].to_string(),
            product: nearby_product(text, whole.0).map(str::to_string),
            context: around(text, whole.0, whole.1, 30, 30),
            pattern: Pattern::FromBy,
        });
    }

    for m in COLLECTION_RE.captures_iter(text) {
        mentions.push(Mention {
            brand: m[1].to_string(),
            product: Some(m[2].trim().to_string()),
            context: m[0].to_string(),
            pattern: Pattern::Collection,
        });
    }

    // Matched on the lowercased caption; context comes from the original when
    // lowercasing kept byte offsets intact.
    let lower = text.to_lowercase();
    let context_src = if lower.len() == text.len() { text } else { lower.as_str() };
    for (kw, re) in PRODUCT_FROM_RES.iter() {
        for m in re.captures_iter(&lower) {
            let whole = m.get(0).map(|g| (g.start(), g.end())).unwrap_or_default();
            mentions.push(Mention {
                brand: m[1].to_string(),
                product: Some(kw.to_string()),
                context: around(context_src, whole.0, whole.1, 0, 20),
                pattern: Pattern::ProductFrom,
            });
        }
    }

    for m in WEARING_RE.captures_iter(text) {
        let whole = m.get(0).map(|g| (g.start(), g.end())).unwrap_or_default();
        mentions.push(Mention {
            brand: m[1].to_string(),
            product: Some(nearby_product(text, whole.0).unwrap_or("clothing").to_string()),
            context: around(text, whole.0, whole.1, 20, 30),
            pattern: Pattern::Wearing,
        });
    }

    for m in AT_MENTION_RE.captures_iter(text) {
        let whole = m.get(0).map(|g| (g.start(), g.end())).unwrap_or_default();
        let window = around(text, whole.0, whole.1, 50, 50).to_lowercase();
        let Some(product) = PRODUCT_KEYWORDS.iter().find(|kw| window.contains(*kw)) else {
            continue;
        };
        let brand = &m[1];
        let already = mentions
            .iter()
            .any(|x| x.brand.eq_ignore_ascii_case(brand) && x.product.as_deref() == Some(*product));
        if !already {
            mentions.push(Mention {
                brand: brand.to_string(),
                product: Some(product.to_string()),
                context: around(text, whole.0, whole.1, 30, 30),
                pattern: Pattern::Proximity,
            });
        }
    }
    mentions
}

// ── Posts and mention rows ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub influencer_handle: String,
    pub shortcode: String,
    pub url: String,
    pub date: String,
    pub caption: String,
    pub likes: i64,
    pub comments: i64,
    pub engagement: i64,
}

impl Post {
    pub fn from_row(row: &Row) -> Self {
        let text = |k: &str| loader::field(row, &[k]).unwrap_or_default().to_string();
        let num = |k: &str| {
            loader::field(row, &[k])
                .and_then(|v| v.parse::<f64>().ok())
                .map(|f| f as i64)
                .unwrap_or(0)
        };
        Self {
            influencer_handle: text("influencer_handle"),
            shortcode: text("shortcode"),
            url: text("url"),
            date: text("date"),
            caption: text("caption"),
            likes: num("likes"),
            comments: num("comments"),
            engagement: num("engagement"),
        }
    }
}

/// Posts exported by an earlier profile scrape.
pub fn load_posts(path: &Path) -> Result<Vec<Post>> {
    Ok(loader::load_csv_rows(path)?.iter().map(Post::from_row).collect())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrandMention {
    pub influencer_handle: String,
    pub brand: String,
    pub product: String,
    pub context: String,
    pub pattern_type: String,
    pub post_shortcode: String,
    pub post_url: String,
    pub date: String,
    pub likes: i64,
    pub comments: i64,
    pub engagement: i64,
}

fn pattern_name(p: Pattern) -> String {
    serde_json::to_value(p)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Mention rows for every post, one per (brand, post, product).
pub fn analyze_posts(posts: &[Post]) -> Vec<BrandMention> {
    let handle = posts
        .first()
        .map(|p| p.influencer_handle.as_str())
        .filter(|h| !h.is_empty())
        .unwrap_or("unknown");

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for post in posts {
        for m in extract_mentions(&post.caption) {
            let product = m.product.unwrap_or_default();
            if !seen.insert((m.brand.clone(), post.shortcode.clone(), product.clone())) {
                continue;
            }
            rows.push(BrandMention {
                influencer_handle: handle.to_string(),
                brand: m.brand,
                product,
                context: m.context.chars().take(CONTEXT_MAX).collect(),
                pattern_type: pattern_name(m.pattern),
                post_shortcode: post.shortcode.clone(),
                post_url: post.url.clone(),
                date: post.date.clone(),
                likes: post.likes,
                comments: post.comments,
                engagement: post.engagement,
            });
        }
    }
    info!("{} brand mentions across {} posts", rows.len(), posts.len());
    rows
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// Per-brand totals, optionally joined with the brand's Instagram profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrandSummary {
    pub influencer_handle: String,
    pub brand_account: String,
    pub total_mentions: usize,
    pub products_mentioned: String,
    pub total_engagement: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub avg_engagement: i64,
    pub brand_instagram_url: String,
    pub brand_full_name: String,
    pub brand_followers: Option<u64>,
    pub brand_is_verified: Option<bool>,
    pub brand_is_business: Option<bool>,
    pub brand_category: String,
    pub profile_found: Option<bool>,
}

impl BrandSummary {
    pub fn apply_profile(&mut self, p: &BrandProfile) {
        self.brand_instagram_url = p.brand_instagram_url.clone();
        self.profile_found = Some(p.profile_found);
        if p.profile_found {
            self.brand_full_name = p.brand_full_name.clone();
            self.brand_followers = Some(p.brand_followers);
            self.brand_is_verified = Some(p.brand_is_verified);
            self.brand_is_business = Some(p.brand_is_business);
            self.brand_category = p.brand_category.clone();
        }
    }
}

/// Mentions grouped by lowercased brand, most mentioned first.
pub fn summarize(mentions: &[BrandMention]) -> Vec<BrandSummary> {
    let handle = mentions.first().map(|m| m.influencer_handle.clone()).unwrap_or_default();
    let mut groups: BTreeMap<String, (usize, BTreeSet<String>, i64, i64, i64)> = BTreeMap::new();
    for m in mentions {
        let g = groups.entry(m.brand.to_lowercase()).or_default();
        g.0 += 1;
        if !m.product.is_empty() {
            g.1.insert(m.product.clone());
        }
        g.2 += m.engagement;
        g.3 += m.likes;
        g.4 += m.comments;
    }

    let mut summary: Vec<BrandSummary> = groups
        .into_iter()
        .map(|(brand, (count, products, engagement, likes, comments))| BrandSummary {
            influencer_handle: handle.clone(),
            brand_account: brand,
            total_mentions: count,
            products_mentioned: products.into_iter().collect::<Vec<_>>().join(", "),
            total_engagement: engagement,
            total_likes: likes,
            total_comments: comments,
            avg_engagement: (engagement as f64 / count as f64).round() as i64,
            ..Default::default()
        })
        .collect();
    summary.sort_by(|a, b| b.total_mentions.cmp(&a.total_mentions));
    summary
}

/// Brand summaries saved by earlier runs, for the merger.
pub fn load_summaries(dir: &Path) -> Vec<BrandSummary> {
    let files = loader::discover_files(dir, "brand_summary_", "csv").unwrap_or_default();
    let mut out = Vec::new();
    for path in files {
        match csv::Reader::from_path(&path) {
            Ok(mut reader) => {
                for row in reader.deserialize::<BrandSummary>() {
                    match row {
                        Ok(s) => out.push(s),
                        Err(e) => warn!("Skipping row in {:?}: {}", path, e),
                    }
                }
            }
            Err(e) => warn!("Cannot read {:?}: {}", path, e),
        }
    }
    out
}
