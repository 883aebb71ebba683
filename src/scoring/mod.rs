//! Fixed-weight lead scores: website quality, Shopify store weakness, YC
//! brand weakness and the derived outreach priority.

pub mod classify;

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::models::WebsiteAnalysis;
use crate::scraper::cleaner::normalize_url;
use crate::scraper::http_client::HttpClient;
use crate::scraper::shopify::StoreMetadata;
use crate::scraper::yc::YcCompany;

// ── Website quality ───────────────────────────────────────────────────────────

pub const WEIGHT_EXISTS: u32 = 40;
pub const WEIGHT_SSL: u32 = 30;
pub const WEIGHT_FAST_LOAD: u32 = 20;
pub const WEIGHT_VALID_DOMAIN: u32 = 10;

pub const WEBSITE_TIMEOUT: Duration = Duration::from_secs(5);
const FAST_LOAD_SECS: f64 = 3.0;

/// Host (or the bare path for scheme-less input) must be ≥4 chars with a dot
/// and none of `@`, space, `<`, `>`.
pub fn is_valid_domain(url: &str) -> bool {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let domain = rest.split(['/', '?', '#']).next().unwrap_or_default();
    domain.len() >= 4 && domain.contains('.') && !domain.contains(['@', ' ', '<', '>'])
}

/// Sum of the weights for the signals set on `analysis`.
pub fn website_score(analysis: &WebsiteAnalysis) -> u32 {
    let mut score = 0;
    if analysis.valid_domain {
        score += WEIGHT_VALID_DOMAIN;
    }
    if analysis.exists {
        score += WEIGHT_EXISTS;
        if analysis.fast_load {
            score += WEIGHT_FAST_LOAD;
        }
        if analysis.has_ssl {
            score += WEIGHT_SSL;
        }
    }
    score
}

/// Check one website. Never fails: problems end up in `error` with score 0
/// for the signals that could not be confirmed.
pub async fn analyze_website(http: &HttpClient, raw: Option<&str>) -> WebsiteAnalysis {
    let checked_at = Local::now().naive_local();
    let Some(url) = raw.and_then(normalize_url) else {
        return WebsiteAnalysis::failed(raw.map(str::to_string), checked_at, "Invalid or empty URL");
    };

    let mut analysis = WebsiteAnalysis::empty(Some(url.clone()), checked_at);
    analysis.valid_domain = is_valid_domain(&url);

    match http.probe(&url, WEBSITE_TIMEOUT).await {
        Ok(probe) => {
            let secs = probe.elapsed.as_secs_f64();
            analysis.exists = probe.status < 400;
            analysis.load_time = (secs * 100.0).round() / 100.0;
            if analysis.exists {
                analysis.fast_load = secs < FAST_LOAD_SECS;
                analysis.has_ssl = url.starts_with("https://");
            }
        }
        Err(e) => debug!("Website check failed for {}: {}", url, e),
    }

    analysis.score = website_score(&analysis);
    analysis
}

// ── Shopify store weakness ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadQuality {
    Hot,
    Warm,
    Cold,
    #[default]
    Poor,
}

impl LeadQuality {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 8 => LeadQuality::Hot,
            s if s >= 5 => LeadQuality::Warm,
            s if s >= 3 => LeadQuality::Cold,
            _ => LeadQuality::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadQuality::Hot => "hot",
            LeadQuality::Warm => "warm",
            LeadQuality::Cold => "cold",
            LeadQuality::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeadAssessment {
    pub score: u32,
    pub quality: LeadQuality,
    pub weaknesses: Vec<String>,
}

/// Higher means the store needs more help (domain, story, theme, social).
pub fn score_store(meta: &StoreMetadata) -> LeadAssessment {
    let mut score = 0;
    let mut weaknesses = Vec::new();

    if meta.is_myshopify_domain {
        score += 3;
        weaknesses.push("Using myshopify.com domain (needs custom domain)".to_string());
    }

    if !meta.has_about_page && !meta.has_story_page {
        score += 3;
        weaknesses.push("No About/Story page (needs brand storytelling)".to_string());
    } else if meta.about_page_word_count < 150 && meta.story_page_word_count < 150 {
        score += 2;
        weaknesses.push("Weak About page (<150 words)".to_string());
    }

    if meta.is_default_theme {
        score += 2;
        weaknesses.push(format!("Using default Shopify theme ({})", meta.theme_name));
    }

    match meta.social_links.len() {
        0 => {
            score += 3;
            weaknesses.push("No social media links (needs marketing setup)".to_string());
        }
        1..=2 => {
            score += 2;
            weaknesses.push("Weak social media presence (1-2 platforms)".to_string());
        }
        _ => {}
    }

    LeadAssessment {
        score,
        quality: LeadQuality::from_score(score),
        weaknesses,
    }
}

// ── YC brand weakness ─────────────────────────────────────────────────────────

pub fn score_company(company: &YcCompany) -> u32 {
    let mut score = 0;
    if company.website.trim().is_empty() {
        score += 3;
    }
    if company.description.chars().count() < 150 {
        score += 2;
    }
    if company.logo.trim().is_empty() {
        score += 2;
    }
    if company.video.trim().is_empty() {
        score += 2;
    }
    if company.github.trim().is_empty() {
        score += 1;
    }
    if matches!(company.team_size, Some(n) if n > 0 && n < 5) {
        score += 1;
    }
    if company.founders.trim().is_empty() {
        score += 1;
    }
    score
}

// ── Priority ──────────────────────────────────────────────────────────────────

pub const PRIORITY_CAP: u32 = 100;
pub const NO_WEBSITE_BONUS: u32 = 10;
pub const PRIORITY_MIN_SCORE: u32 = 8;

/// Worth a slot on the prioritized sheet.
pub fn is_priority_candidate(score: u32, has_website: bool) -> bool {
    !has_website || score >= PRIORITY_MIN_SCORE
}

pub fn priority_score(score: u32, has_website: bool) -> u32 {
    let bonus = if has_website { 0 } else { NO_WEBSITE_BONUS };
    (score + bonus).min(PRIORITY_CAP)
}

/// Priority for a directory listing from what it lacks: weak digital
/// presence ranks higher.
pub fn presence_priority(has_website: bool, has_email: bool, has_phone: bool) -> u32 {
    let mut score = if has_website { 30 } else { 70 };
    if !has_email {
        score += 15;
    }
    if !has_phone {
        score += 10;
    }
    score.min(PRIORITY_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn analysis(valid: bool, exists: bool, fast: bool, ssl: bool) -> WebsiteAnalysis {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        WebsiteAnalysis {
            valid_domain: valid,
            exists,
            fast_load: fast,
            has_ssl: ssl,
            ..WebsiteAnalysis::empty(None, at)
        }
    }

    #[test]
    fn test_website_score_weights() {
        assert_eq!(website_score(&analysis(true, true, true, true)), 100);
        assert_eq!(website_score(&analysis(true, true, false, false)), 50);
        assert_eq!(website_score(&analysis(true, false, false, false)), 10);
        // speed and ssl only count for a site that loaded
        assert_eq!(website_score(&analysis(false, false, true, true)), 0);
    }

    #[test]
    fn test_domain_validity() {
        assert!(is_valid_domain("http://chaipoint.in"));
        assert!(is_valid_domain("https://www.example.com/menu"));
        assert!(!is_valid_domain("http://abc"));
        assert!(!is_valid_domain("http://a.b"));
        assert!(!is_valid_domain("http://user@mail.com"));
        assert!(!is_valid_domain("http://bad <site>.com"));
    }

    #[tokio::test]
    async fn test_empty_url_scores_zero() {
        let http = HttpClient::new(&crate::config::HttpConfig::default()).unwrap();
        let a = analyze_website(&http, Some("N/A")).await;
        assert_eq!(a.score, 0);
        assert_eq!(a.error.as_deref(), Some("Invalid or empty URL"));
        let none = analyze_website(&http, None).await;
        assert!(none.url.is_none());
        assert_eq!(none.error.as_deref(), Some("Invalid or empty URL"));
    }

    #[test]
    fn test_store_score_hot() {
        let meta = StoreMetadata {
            is_myshopify_domain: true,
            is_default_theme: true,
            theme_name: "dawn".into(),
            ..Default::default()
        };
        let a = score_store(&meta);
        assert_eq!(a.score, 11);
        assert_eq!(a.quality, LeadQuality::Hot);
        assert_eq!(a.weaknesses.len(), 4);
        assert_eq!(a.weaknesses[2], "Using default Shopify theme (dawn)");
    }

    #[test]
    fn test_store_score_weak_about_and_some_socials() {
        let meta = StoreMetadata {
            has_about_page: true,
            about_page_word_count: 90,
            social_links: vec!["https://instagram.com/x".into()],
            ..Default::default()
        };
        let a = score_store(&meta);
        assert_eq!(a.score, 4);
        assert_eq!(a.quality, LeadQuality::Cold);

        let strong = StoreMetadata {
            has_story_page: true,
            story_page_word_count: 400,
            social_links: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        };
        assert_eq!(score_store(&strong).score, 0);
        assert_eq!(score_store(&strong).quality, LeadQuality::Poor);
    }

    #[test]
    fn test_company_score() {
        let bare = YcCompany {
            name: "Stealth".into(),
            ..Default::default()
        };
        assert_eq!(score_company(&bare), 11);

        let polished = YcCompany {
            name: "Acme".into(),
            website: "https://acme.dev".into(),
            description: "x".repeat(200),
            logo: "logo.png".into(),
            video: "demo.mp4".into(),
            github: "https://github.com/acme".into(),
            team_size: Some(3),
            founders: "Ada, Linus".into(),
            ..Default::default()
        };
        assert_eq!(score_company(&polished), 1);
    }

    #[test]
    fn test_priority() {
        assert!(is_priority_candidate(2, false));
        assert!(is_priority_candidate(8, true));
        assert!(!is_priority_candidate(7, true));
        assert_eq!(priority_score(9, false), 19);
        assert_eq!(priority_score(9, true), 9);
        assert_eq!(priority_score(95, false), 100);
    }

    #[test]
    fn test_presence_priority() {
        assert_eq!(presence_priority(false, false, false), 95);
        assert_eq!(presence_priority(false, true, true), 70);
        assert_eq!(presence_priority(true, false, true), 45);
        assert_eq!(presence_priority(true, true, true), 30);
    }
}
