//! Instagram business-account profiles via the public web profile endpoint.

use anyhow::{Context, Result, bail};
use chrono::Local;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use super::cleaner::{non_empty, truncate_chars};
use super::http_client::HttpClient;
use crate::merge::UnifiedLead;

pub const SOURCE: &str = "instagram_business";
const BIO_MAX: usize = 500;
const BRAND_BIO_MAX: usize = 200;
const MIN_FOLLOWERS: u64 = 500;

/// Seed hashtags per category. Hashtag feeds need a logged-in session, so
/// these document where usernames come from rather than drive a crawl.
pub const HASHTAGS: &[(&str, &[&str])] = &[
    (
        "fashion",
        &["indianbrand", "madeinindiastartup", "d2cbrand", "indianfashionbrand", "indiastreetwear", "indiandesigner"],
    ),
    ("beauty", &["indianbeautybrand", "makeinindia", "organicbeautyindia", "indianskincare"]),
    ("food", &["indianfoodbrand", "organicfoodindia", "homemadeindia"]),
    ("lifestyle", &["indianstartup", "indiaentrepreneur", "smallbusinessindia"]),
];

static BIO_EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\w\.-]+@[\w\.-]+\.\w+").unwrap());
static BIO_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\+\(]?[0-9][0-9\s\-\(\)]{7,}[0-9]").unwrap());

pub fn hashtags_for(category: &str) -> &'static [&'static str] {
    HASHTAGS
        .iter()
        .find(|(c, _)| *c == category)
        .or_else(|| HASHTAGS.first())
        .map(|(_, tags)| *tags)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InstagramProfile {
    pub username: String,
    pub instagram_url: String,
    pub full_name: String,
    pub bio: String,
    pub website: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub posts: u64,
    pub is_verified: bool,
    pub is_business: bool,
    pub category: String,
    pub discovered_at: String,
    pub source: String,
    pub category_scraped: String,
    pub collected_at: String,
}

pub fn profile_url(username: &str) -> String {
    format!("https://instagram.com/{}", username)
}

fn count(user: &Value, edge: &str) -> u64 {
    user.pointer(&format!("/{}/count", edge)).and_then(Value::as_u64).unwrap_or(0)
}

fn text(user: &Value, key: &str) -> String {
    user.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Profile from a `web_profile_info` response body.
pub fn parse_profile(username: &str, body: &Value) -> Result<InstagramProfile> {
    let Some(user) = body.pointer("/data/user").filter(|u| u.is_object()) else {
        bail!("Profile not found: {}", username);
    };
    let bio = text(user, "biography");
    let flag = |key: &str| user.get(key).and_then(Value::as_bool).unwrap_or(false);

    Ok(InstagramProfile {
        username: username.to_string(),
        instagram_url: profile_url(username),
        full_name: text(user, "full_name"),
        email: BIO_EMAIL_RE.find(&bio).map(|m| m.as_str().to_string()),
        phone: BIO_PHONE_RE.find(&bio).map(|m| m.as_str().to_string()),
        bio: truncate_chars(&bio, BIO_MAX),
        website: text(user, "external_url"),
        followers: count(user, "edge_followed_by"),
        following: count(user, "edge_follow"),
        posts: count(user, "edge_owner_to_timeline_media"),
        is_verified: flag("is_verified"),
        is_business: flag("is_business_account"),
        category: text(user, "category_name"),
        discovered_at: Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string(),
        ..Default::default()
    })
}

pub fn is_brand_account(p: &InstagramProfile) -> bool {
    p.is_business || p.is_verified || p.followers > MIN_FOLLOWERS
}

/// Fill a lead's empty contact fields and its brand columns from a profile.
pub fn enrich(lead: &mut UnifiedLead, profile: &InstagramProfile) {
    fn fill(slot: &mut String, value: Option<&str>) {
        if slot.trim().is_empty() {
            if let Some(v) = value.and_then(non_empty) {
                *slot = v;
            }
        }
    }
    fill(&mut lead.website, Some(&profile.website));
    fill(&mut lead.email, profile.email.as_deref());
    fill(&mut lead.phone, profile.phone.as_deref());

    lead.brand_account = profile.username.clone();
    lead.brand_instagram_url = profile.instagram_url.clone();
    lead.brand_full_name = profile.full_name.clone();
    lead.brand_followers = Some(profile.followers);
    lead.brand_is_verified = Some(profile.is_verified);
    lead.brand_is_business = Some(profile.is_business);
}

/// Profile columns added to a brand summary row, `brand_` prefixed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrandProfile {
    pub brand_username: String,
    pub brand_instagram_url: String,
    pub brand_full_name: String,
    pub brand_bio: String,
    pub brand_followers: u64,
    pub brand_following: u64,
    pub brand_posts: u64,
    pub brand_is_verified: bool,
    pub brand_is_business: bool,
    pub brand_category: String,
    pub profile_found: bool,
    pub error: String,
}

impl BrandProfile {
    pub fn from_lookup(username: &str, lookup: &Result<InstagramProfile>) -> Self {
        match lookup {
            Ok(p) => Self {
                brand_username: username.to_string(),
                brand_instagram_url: profile_url(username),
                brand_full_name: p.full_name.clone(),
                brand_bio: truncate_chars(&p.bio, BRAND_BIO_MAX),
                brand_followers: p.followers,
                brand_following: p.following,
                brand_posts: p.posts,
                brand_is_verified: p.is_verified,
                brand_is_business: p.is_business,
                brand_category: p.category.clone(),
                profile_found: true,
                error: String::new(),
            },
            Err(e) => Self {
                brand_username: username.to_string(),
                brand_instagram_url: profile_url(username),
                error: format!("{:#}", e),
                ..Default::default()
            },
        }
    }
}

pub struct InstagramClient<'a> {
    http: &'a HttpClient,
    base: String,
    app_id: String,
    session_id: Option<String>,
}

impl<'a> InstagramClient<'a> {
    pub fn new(http: &'a HttpClient, base: &str, app_id: &str, session_id: Option<String>) -> Self {
        Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            session_id,
        }
    }

    pub async fn fetch_profile(&self, username: &str) -> Result<InstagramProfile> {
        let username = username.trim().trim_start_matches('@');
        let url = format!("{}/api/v1/users/web_profile_info/", self.base);
        let mut headers = vec![("x-ig-app-id", self.app_id.clone())];
        if let Some(session) = &self.session_id {
            headers.push(("cookie", format!("sessionid={}", session)));
        }
        let body: Value = self
            .http
            .get_json(&url, &[("username", username.to_string())], &headers)
            .await
            .with_context(|| format!("Instagram profile @{}", username))?;
        parse_profile(username, &body)
    }

    /// Profiles for each username that look like brand accounts, tagged
    /// with the scraped category. Lookups that fail are logged and skipped.
    pub async fn business_accounts(&self, usernames: &[String], category: &str) -> Vec<InstagramProfile> {
        let collected_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut accounts = Vec::new();

        for (i, username) in usernames.iter().enumerate() {
            debug!("[{}/{}] @{}", i + 1, usernames.len(), username);
            match self.fetch_profile(username).await {
                Ok(p) if is_brand_account(&p) => accounts.push(InstagramProfile {
                    source: SOURCE.to_string(),
                    category_scraped: category.to_string(),
                    collected_at: collected_at.clone(),
                    ..p
                }),
                Ok(p) => debug!("@{} is not a brand account ({} followers)", p.username, p.followers),
                Err(e) => warn!("{:#}", e),
            }
        }
        info!("{} of {} accounts kept for {}", accounts.len(), usernames.len(), category);
        accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body() -> Value {
        json!({"data": {"user": {
            "username": "kora.label",
            "full_name": "Kora Label",
            "biography": "Handwoven in Jaipur. Orders: hello@kora.in / +91 98765 43210",
            "external_url": "https://kora.in",
            "edge_followed_by": {"count": 1200},
            "edge_follow": {"count": 80},
            "edge_owner_to_timeline_media": {"count": 45},
            "is_verified": false,
            "is_business_account": true,
            "category_name": "Clothing (Brand)"
        }}})
    }

    #[test]
    fn test_parse_profile() {
        let p = parse_profile("kora.label", &body()).unwrap();
        assert_eq!(p.instagram_url, "https://instagram.com/kora.label");
        assert_eq!(p.email.as_deref(), Some("hello@kora.in"));
        assert_eq!(p.phone.as_deref(), Some("+91 98765 43210"));
        assert_eq!((p.followers, p.following, p.posts), (1200, 80, 45));
        assert!(p.is_business && !p.is_verified);
        assert_eq!(p.category, "Clothing (Brand)");
        assert!(is_brand_account(&p));
    }

    #[test]
    fn test_missing_user_is_error() {
        assert!(parse_profile("ghost", &json!({"data": {"user": null}})).is_err());
    }

    #[test]
    fn test_brand_filter() {
        let small = InstagramProfile {
            followers: 500,
            ..Default::default()
        };
        assert!(!is_brand_account(&small));
        let verified = InstagramProfile {
            is_verified: true,
            ..small
        };
        assert!(is_brand_account(&verified));
    }

    #[test]
    fn test_enrich_fills_only_gaps() {
        let p = parse_profile("kora.label", &body()).unwrap();
        let mut lead = UnifiedLead {
            name: "Kora".into(),
            phone: "9999999999".into(),
            ..Default::default()
        };
        enrich(&mut lead, &p);
        assert_eq!(lead.website, "https://kora.in");
        assert_eq!(lead.email, "hello@kora.in");
        assert_eq!(lead.phone, "9999999999");
        assert_eq!(lead.brand_followers, Some(1200));
        assert_eq!(lead.brand_is_business, Some(true));
    }

    #[test]
    fn test_brand_profile_lookup() {
        let found = BrandProfile::from_lookup("kora.label", &parse_profile("kora.label", &body()));
        assert!(found.profile_found);
        assert!(found.brand_bio.chars().count() <= BRAND_BIO_MAX);

        let missing = BrandProfile::from_lookup("ghost", &Err(anyhow::anyhow!("Profile not found: ghost")));
        assert!(!missing.profile_found);
        assert_eq!(missing.brand_followers, 0);
        assert_eq!(missing.error, "Profile not found: ghost");
    }

    #[test]
    fn test_hashtags_fall_back_to_fashion() {
        assert_eq!(hashtags_for("food").len(), 3);
        assert_eq!(hashtags_for("cars"), hashtags_for("fashion"));
    }
}
