use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\+?\d[\d\s\-]{7,}\d").unwrap());
static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());
static COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[\d,]*(?:\.\d+)?)([KkMmBb])?\b").unwrap());

const EMPTY_MARKERS: [&str; 6] = ["", "N/A", "n/a", "None", "-", "—"];

// ── Field parsers ─────────────────────────────────────────────────────────────

/// Keep digits and `+`. "+91 98200-12345" → "+919820012345"
pub fn clean_phone(s: &str) -> Option<String> {
    let cleaned: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect();
    if cleaned.chars().any(|c| c.is_ascii_digit()) {
        Some(cleaned)
    } else {
        None
    }
}

/// First email-looking token in free text.
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

/// First phone-looking run of digits in free text, cleaned.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_RE.find(text).and_then(|m| clean_phone(m.as_str()))
}

/// First decimal number in text. "★ 4.3 (120)" → 4.3
pub fn parse_rating(s: &str) -> Option<f64> {
    DECIMAL_RE.find(s).and_then(|m| m.as_str().parse().ok())
}

/// Counts with thousands separators or K/M/B suffixes.
/// "1,234 Ratings" → 1234 | "1.2K" → 1200 | "3M followers" → 3,000,000
pub fn parse_count(s: &str) -> Option<u64> {
    let caps = COUNT_RE.captures(s)?;
    let num = caps.get(1)?.as_str().replace(',', "");
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(ref m) if m == "K" => 1_000.0,
        Some(ref m) if m == "M" => 1_000_000.0,
        Some(ref m) if m == "B" => 1_000_000_000.0,
        _ => 1.0,
    };
    let value: f64 = num.parse().ok()?;
    Some((value * multiplier).round() as u64)
}

/// Trimmed, non-empty and not a placeholder like "N/A".
pub fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if EMPTY_MARKERS.contains(&s) { None } else { Some(s.to_string()) }
}

/// Collapse runs of whitespace (including newlines) to single spaces.
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ── URLs ──────────────────────────────────────────────────────────────────────

/// "example.com" → "http://example.com"; placeholders → None.
pub fn normalize_url(raw: &str) -> Option<String> {
    let url = non_empty(raw)?;
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url)
    } else {
        Some(format!("http://{}", url))
    }
}

/// Scheme + host, e.g. "https://shop.example.com/products/x" → "https://shop.example.com"
pub fn base_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    let parsed = Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?;
    Some(format!("{}://{}", parsed.scheme(), host))
}

/// Lowercased host without a leading "www.".
pub fn host_of(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.trim_start_matches("www.").to_string())
}

/// Resolve a possibly-relative href against the page it came from.
pub fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") || href.starts_with('#') {
        return None;
    }
    Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string())
}

/// Directory, social or messaging links are never a business's own website.
pub fn is_directory_or_social(href: &str) -> bool {
    let low = href.to_lowercase();
    ["justdial", "facebook", "instagram", "twitter", "linkedin", "youtube", "whatsapp", "x.com"]
        .iter()
        .any(|d| low.contains(d))
}

// ── Social links ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialKind {
    Instagram,
    Facebook,
    Twitter,
    LinkedIn,
    YouTube,
    TikTok,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocialLinks {
    pub instagram: Option<String>,
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub youtube: Option<String>,
    pub tiktok: Option<String>,
}

impl SocialLinks {
    pub fn classify(href: &str) -> Option<SocialKind> {
        let low = href.trim().to_lowercase();
        if low.contains("instagram.com") || low.contains("instagr.am") {
            Some(SocialKind::Instagram)
        } else if low.contains("facebook.com") || low.contains("fb.com/") {
            Some(SocialKind::Facebook)
        } else if low.contains("linkedin.com") {
            Some(SocialKind::LinkedIn)
        } else if low.contains("youtube.com") || low.contains("youtu.be") {
            Some(SocialKind::YouTube)
        } else if low.contains("twitter.com")
            || low.starts_with("https://x.com")
            || low.starts_with("http://x.com")
            || low.contains("//www.x.com")
        {
            Some(SocialKind::Twitter)
        } else if low.contains("tiktok.com") {
            Some(SocialKind::TikTok)
        } else {
            None
        }
    }

    /// Record `href` in its bucket unless that bucket is already filled.
    /// Returns true when the href was a social link of any kind.
    pub fn absorb(&mut self, href: &str) -> bool {
        let Some(kind) = Self::classify(href) else {
            return false;
        };
        let slot = match kind {
            SocialKind::Instagram => &mut self.instagram,
            SocialKind::Facebook => &mut self.facebook,
            SocialKind::Twitter => &mut self.twitter,
            SocialKind::LinkedIn => &mut self.linkedin,
            SocialKind::YouTube => &mut self.youtube,
            SocialKind::TikTok => &mut self.tiktok,
        };
        if slot.is_none() {
            *slot = Some(href.trim().to_string());
        }
        true
    }

    pub fn count(&self) -> usize {
        [&self.instagram, &self.facebook, &self.twitter, &self.linkedin, &self.youtube, &self.tiktok]
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    pub fn all(&self) -> Vec<String> {
        [&self.instagram, &self.facebook, &self.twitter, &self.linkedin, &self.youtube, &self.tiktok]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_phone() {
        assert_eq!(clean_phone("tel:+91 98200-12345"), Some("+919820012345".into()));
        assert_eq!(clean_phone("call now"), None);
        assert_eq!(clean_phone("+"), None);
    }

    #[test]
    fn test_extract_email_and_phone() {
        let text = "Reach us at hello@chai.co.in or +91 22 4000 1234 today";
        assert_eq!(extract_email(text), Some("hello@chai.co.in".into()));
        assert_eq!(extract_phone(text), Some("+912240001234".into()));
        assert_eq!(extract_phone("open 10 to 11"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1.2K"), Some(1_200));
        assert_eq!(parse_count("1,234 Ratings"), Some(1_234));
        assert_eq!(parse_count("3M followers"), Some(3_000_000));
        assert_eq!(parse_count("12 members"), Some(12));
        assert_eq!(parse_count("no digits"), None);
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("★ 4.3 (120)"), Some(4.3));
        assert_eq!(parse_rating("5"), Some(5.0));
        assert_eq!(parse_rating(""), None);
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), Some("http://example.com".into()));
        assert_eq!(normalize_url(" https://a.io "), Some("https://a.io".into()));
        assert_eq!(normalize_url("N/A"), None);
        assert_eq!(normalize_url("-"), None);
        assert_eq!(normalize_url(""), None);
    }

    #[test]
    fn test_base_url_and_host() {
        assert_eq!(
            base_url("https://shop.example.com/products/x?y=1"),
            Some("https://shop.example.com".into())
        );
        assert_eq!(base_url("brand.myshopify.com/about"), Some("https://brand.myshopify.com".into()));
        assert_eq!(host_of("https://www.Acme.io/team"), Some("acme.io".into()));
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize("https://www.tradeindia.com/search.html", "/company/acme-1/"),
            Some("https://www.tradeindia.com/company/acme-1/".into())
        );
        assert_eq!(absolutize("https://a.com", "javascript:void(0)"), None);
    }

    #[test]
    fn test_social_links() {
        let mut links = SocialLinks::default();
        assert!(links.absorb("https://instagram.com/chai"));
        assert!(links.absorb("https://instagram.com/other"));
        assert!(links.absorb("https://x.com/chai"));
        assert!(!links.absorb("https://chai.in"));
        assert_eq!(links.instagram.as_deref(), Some("https://instagram.com/chai"));
        assert_eq!(links.twitter.as_deref(), Some("https://x.com/chai"));
        assert_eq!(links.count(), 2);
    }

    #[test]
    fn test_directory_links() {
        assert!(is_directory_or_social("https://www.justdial.com/Mumbai/x"));
        assert!(is_directory_or_social("https://wa.me/919800000000?text=whatsapp"));
        assert!(!is_directory_or_social("https://sakura-dining.in"));
    }
}
