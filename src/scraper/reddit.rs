use anyhow::{Context, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use super::cleaner::host_of;
use super::http_client::{FetchError, HttpClient};
use crate::export::joined;

const BRANDING_KEYWORDS: &[&str] = &[
    "branding", "brand", "logo", "name", "naming", "identity", "story", "website",
    "landing page", "lp", "copy", "copywriting", "content", "marketing", "growth", "seo",
    "ads", "google ads", "meta ads", "facebook ads", "instagram ads", "performance marketing",
    "campaign", "design", "ui", "ux", "rebrand", "revamp", "feedback", "critique",
];

const LAUNCH_KEYWORDS: &[&str] = &[
    "launched", "launch", "built", "building", "mvp", "side project", "showcase", "demo",
    "beta", "early access", "need feedback",
];

const BRANDING_FLAIRS: &[&str] = &[
    "startup showcase",
    "startup help",
    "how to grow?",
    "feedback",
    "business ride along",
    "product",
    "marketing",
];

pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Sort {
    Hot,
    New,
    Top,
}

impl Sort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sort::Hot => "hot",
            Sort::New => "new",
            Sort::Top => "top",
        }
    }
}

/// One subreddit post. `score` is engagement (upvotes + 2 × comments), not
/// Reddit's own score. The branding fields are only set by the lead filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RedditPost {
    pub title: String,
    pub reddit_url: String,
    pub external_url: String,
    pub external_domain: String,
    pub author: String,
    pub upvotes: i64,
    pub comments: i64,
    pub score: i64,
    pub flair: String,
    pub selftext: String,
    pub created_iso: String,
    pub created_utc: i64,
    pub branding_need_score: Option<u32>,
    #[serde(with = "joined")]
    pub branding_reasons: Vec<String>,
}

fn int(raw: &Value, key: &str) -> i64 {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn text(raw: &Value, key: &str) -> String {
    raw.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

impl RedditPost {
    pub fn from_raw(raw: &Value, base: &str) -> Self {
        let permalink = text(raw, "permalink");
        let reddit_url = if permalink.is_empty() {
            text(raw, "url")
        } else {
            format!("{}{}", base.trim_end_matches('/'), permalink)
        };
        let external_url = raw
            .get("url_overridden_by_dest")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| text(raw, "url"));
        let external_domain = url::Url::parse(&external_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        let upvotes = int(raw, "score");
        let comments = int(raw, "num_comments");
        let created_utc = int(raw, "created_utc");
        let created_iso = match created_utc {
            0 => String::new(),
            ts => DateTime::from_timestamp(ts, 0)
                .map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_default(),
        };

        Self {
            title: text(raw, "title").trim().to_string(),
            reddit_url,
            external_url,
            external_domain,
            author: text(raw, "author"),
            upvotes,
            comments,
            score: upvotes + 2 * comments,
            flair: text(raw, "link_flair_text"),
            selftext: text(raw, "selftext").trim().to_string(),
            created_iso,
            created_utc,
            branding_need_score: None,
            branding_reasons: vec![],
        }
    }
}

pub fn rank_posts(mut posts: Vec<RedditPost>) -> Vec<RedditPost> {
    posts.sort_by(|a, b| b.score.cmp(&a.score));
    posts
}

/// How likely the post's author needs branding or marketing help.
pub fn classify_branding_need(p: &RedditPost) -> (u32, Vec<String>) {
    let mut score = 0;
    let mut reasons = Vec::new();
    let body = format!("{} \n {}", p.title, p.selftext).to_lowercase();
    let flair = p.flair.to_lowercase();

    if BRANDING_FLAIRS.contains(&flair.as_str()) {
        score += 2;
        reasons.push(format!("Flair suggests need: {}", p.flair));
    }
    if BRANDING_KEYWORDS.iter().any(|k| body.contains(k)) {
        score += 2;
        reasons.push("Mentions branding/marketing keywords".to_string());
    }
    if LAUNCH_KEYWORDS.iter().any(|k| body.contains(k)) {
        score += 1;
        reasons.push("Launch/feedback intent".to_string());
    }

    let domain = p.external_domain.to_lowercase();
    if domain.ends_with("myshopify.com") {
        score += 2;
        reasons.push("Using myshopify.com (needs custom domain)".to_string());
    }
    if domain.ends_with("linktr.ee") || domain.ends_with("bio.link") {
        score += 1;
        reasons.push("Using link aggregator instead of site".to_string());
    }
    if p.score >= 30 || p.comments >= 10 {
        score += 1;
        reasons.push("Community engagement present".to_string());
    }
    (score, reasons)
}

/// Posts clearing both thresholds, strongest need first, then engagement.
pub fn filter_branding_leads(posts: &[RedditPost], min_need: u32, min_score: i64) -> Vec<RedditPost> {
    let mut leads: Vec<RedditPost> = posts
        .iter()
        .filter_map(|p| {
            let (need, reasons) = classify_branding_need(p);
            (need >= min_need && p.score >= min_score).then(|| RedditPost {
                branding_need_score: Some(need),
                branding_reasons: reasons,
                ..p.clone()
            })
        })
        .collect();
    leads.sort_by(|a, b| (b.branding_need_score, b.score).cmp(&(a.branding_need_score, a.score)));
    leads
}

/// True when the post links somewhere other than Reddit itself.
pub fn has_external_site(p: &RedditPost) -> bool {
    match host_of(&p.external_url) {
        Some(h) => !h.ends_with("reddit.com") && !h.ends_with("redd.it"),
        None => false,
    }
}

pub struct RedditClient<'a> {
    http: &'a HttpClient,
    base: String,
    retry_delay: Duration,
}

impl<'a> RedditClient<'a> {
    pub fn new(http: &'a HttpClient, base: &str) -> Self {
        Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Raw `data` objects of a subreddit listing, at most 100.
    pub async fn fetch_posts(&self, subreddit: &str, sort: Sort, limit: usize) -> Result<Vec<Value>> {
        let url = format!("{}/r/{}/{}.json", self.base, subreddit, sort.as_str());
        let query = [("limit", limit.min(MAX_LIMIT).to_string())];

        let body: Value = match self.http.get_json(&url, &query, &[]).await {
            Ok(v) => v,
            Err(e @ FetchError::Status { .. }) => {
                warn!("{}; retrying once", e);
                tokio::time::sleep(self.retry_delay).await;
                self.http
                    .get_json(&url, &query, &[])
                    .await
                    .with_context(|| format!("Reddit listing failed for r/{}", subreddit))?
            }
            Err(e) => return Err(e).with_context(|| format!("Reddit listing failed for r/{}", subreddit)),
        };

        let children = body
            .pointer("/data/children")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(children
            .into_iter()
            .filter_map(|c| c.get("data").cloned())
            .collect())
    }

    /// Fetch, drop stickied posts, and rank by engagement.
    pub async fn ranked_posts(&self, subreddit: &str, sort: Sort, limit: usize) -> Result<Vec<RedditPost>> {
        let raw = self.fetch_posts(subreddit, sort, limit).await?;
        let posts: Vec<RedditPost> = raw
            .iter()
            .filter(|p| !p.get("stickied").and_then(Value::as_bool).unwrap_or(false))
            .map(|p| RedditPost::from_raw(p, &self.base))
            .collect();
        info!("r/{}: {} posts ({} stickied dropped)", subreddit, posts.len(), raw.len() - posts.len());
        Ok(rank_posts(posts))
    }
}
