//! Per-source column mappings into [`UnifiedLead`].

use std::path::Path;

use super::{UnifiedLead, now_iso};
use crate::loader::{Row, field};
use crate::scoring::classify::{classify_role_services, default_venture, derive_venture_type};
use crate::scraper::cleaner::{clean_phone, parse_count, parse_rating};

pub const BUSINESS: &str = "business";
pub const DEFAULT_COUNTRY: &str = "India";
const TOPSTARTUPS_URL: &str = "https://topstartups.io/?hq_location=India";

const US_STATES: [&str; 50] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA", "KS", "KY", "LA",
    "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM", "NY", "NC", "ND", "OH", "OK",
    "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV", "WI", "WY",
];

/// Country from a free-form location: a trailing US state code means USA.
pub fn infer_country(location: &str) -> &'static str {
    let last = location.rsplit(',').next().map(str::trim).unwrap_or_default();
    if US_STATES.contains(&last) {
        "USA"
    } else if location.contains("India") {
        "India"
    } else {
        ""
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    TopStartups,
    GoogleMaps,
    IndiaMart,
    JustDial,
    TradeIndia,
    ProductHunt,
    Instagram,
    RedditBranding,
    Yc,
    ShopifyStores,
    ShopifyScored,
    BrandSummary,
}

impl SourceKind {
    pub const ALL: &'static [SourceKind] = &[
        SourceKind::TopStartups,
        SourceKind::GoogleMaps,
        SourceKind::IndiaMart,
        SourceKind::JustDial,
        SourceKind::TradeIndia,
        SourceKind::ProductHunt,
        SourceKind::Instagram,
        SourceKind::RedditBranding,
        SourceKind::Yc,
        SourceKind::ShopifyStores,
        SourceKind::ShopifyScored,
        SourceKind::BrandSummary,
    ];

    /// File name prefix of this source's CSV outputs.
    pub fn prefix(&self) -> &'static str {
        match self {
            SourceKind::TopStartups => "topstartups_",
            SourceKind::GoogleMaps => "google_maps_",
            SourceKind::IndiaMart => "indiamart_",
            SourceKind::JustDial => "justdial_",
            SourceKind::TradeIndia => "tradeindia_",
            SourceKind::ProductHunt => "producthunt_",
            SourceKind::Instagram => "instagram_business_",
            SourceKind::RedditBranding => "reddit_",
            SourceKind::Yc => "yc_startups_",
            SourceKind::ShopifyStores => "shopify_stores_",
            SourceKind::ShopifyScored => "shopify_leads_scored_",
            SourceKind::BrandSummary => "brand_summary_",
        }
    }

    /// The `source` column value.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::TopStartups => "topstartups",
            SourceKind::GoogleMaps => "google_maps",
            SourceKind::IndiaMart => "indiamart",
            SourceKind::JustDial => "justdial",
            SourceKind::TradeIndia => "tradeindia",
            SourceKind::ProductHunt => "producthunt",
            SourceKind::Instagram => "instagram_business",
            SourceKind::RedditBranding => "reddit",
            SourceKind::Yc => "yc_directory",
            SourceKind::ShopifyStores => "shopify",
            SourceKind::ShopifyScored => "shopify_lead_scorer",
            SourceKind::BrandSummary => "brand_mentions",
        }
    }

    pub fn lead_type(&self) -> &'static str {
        match self {
            SourceKind::Yc => "yc_startup",
            SourceKind::ShopifyStores => "ecommerce_d2c",
            SourceKind::ShopifyScored => "ecommerce_scored",
            SourceKind::BrandSummary => "influencer_brand",
            _ => BUSINESS,
        }
    }

    /// Reddit writes every post and the branding subset under one prefix;
    /// only the subset are leads.
    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            SourceKind::RedditBranding => path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains("_branding_")),
            _ => true,
        }
    }

    /// Map one CSV row. Rows without a usable name are dropped.
    pub fn map_row(&self, row: &Row) -> Option<UnifiedLead> {
        let lead = match self {
            SourceKind::TopStartups => topstartups(row),
            SourceKind::GoogleMaps => google_maps(row),
            SourceKind::IndiaMart => indiamart(row),
            SourceKind::JustDial => justdial(row),
            SourceKind::TradeIndia => tradeindia(row),
            SourceKind::ProductHunt => producthunt(row),
            SourceKind::Instagram => instagram(row),
            SourceKind::RedditBranding => reddit(row),
            SourceKind::Yc => yc(row),
            SourceKind::ShopifyStores => shopify_store(row),
            SourceKind::ShopifyScored => shopify_scored(row),
            SourceKind::BrandSummary => brand_summary(row),
        };
        if lead.name.trim().is_empty() {
            return None;
        }
        let lead = UnifiedLead {
            lead_type: self.lead_type().to_string(),
            source: if lead.source.is_empty() { self.label().to_string() } else { lead.source },
            collected_at: if lead.collected_at.is_empty() { now_iso() } else { lead.collected_at },
            ..lead
        };
        Some(if self.lead_type() == BUSINESS { classify(lead, self.label()) } else { lead })
    }
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn text(row: &Row, keys: &[&str]) -> String {
    field(row, keys).unwrap_or_default().to_string()
}

fn phone(row: &Row, keys: &[&str]) -> String {
    field(row, keys).and_then(clean_phone).unwrap_or_default()
}

fn count(row: &Row, keys: &[&str]) -> Option<u64> {
    field(row, keys).and_then(parse_count)
}

fn flag(row: &Row, key: &str) -> Option<bool> {
    field(row, &[key]).and_then(|v| match v.to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    })
}

/// Venture from industry then name, the source default last; role and
/// services from name, industry and website.
fn classify(mut lead: UnifiedLead, source: &str) -> UnifiedLead {
    if lead.venture_type.is_empty() {
        lead.venture_type = derive_venture_type(&lead.industry)
            .or_else(|| derive_venture_type(&lead.name))
            .or_else(|| default_venture(source))
            .unwrap_or_default()
            .to_string();
    }
    if lead.company_role.is_empty() {
        if let Some((role, services)) = classify_role_services(&lead.name, &lead.industry, &lead.website) {
            lead.company_role = role.to_string();
            if lead.services.is_empty() {
                lead.services = services.to_string();
            }
        }
    }
    lead
}

// ── Business sources ──────────────────────────────────────────────────────────

fn topstartups(row: &Row) -> UnifiedLead {
    UnifiedLead {
        name: text(row, &["company_name", "name"]),
        industry: text(row, &["industry"]),
        location: text(row, &["hq_location", "location"]),
        website: text(row, &["website_url", "website"]),
        phone: phone(row, &["phone"]),
        employees: text(row, &["employees"]),
        funding_usd: count(row, &["funding_amount", "funding_usd"]),
        hiring: flag(row, "jobs_available"),
        jobs_link: text(row, &["jobs_link"]),
        source_url: TOPSTARTUPS_URL.to_string(),
        country: DEFAULT_COUNTRY.to_string(),
        ..Default::default()
    }
}

fn google_maps(row: &Row) -> UnifiedLead {
    UnifiedLead {
        name: text(row, &["name", "business_name"]),
        industry: text(row, &["category", "types"]),
        location: text(row, &["address"]),
        website: text(row, &["website"]),
        email: text(row, &["email"]),
        phone: phone(row, &["phone"]),
        rating: field(row, &["rating"]).and_then(parse_rating),
        reviews: count(row, &["reviews", "reviews_count"]),
        price_level: text(row, &["price_level"]),
        source_url: text(row, &["google_maps_url"]),
        city: text(row, &["city"]),
        state: text(row, &["state"]),
        country: DEFAULT_COUNTRY.to_string(),
        ..Default::default()
    }
}

fn indiamart(row: &Row) -> UnifiedLead {
    UnifiedLead {
        name: text(row, &["company_name", "business_name", "name"]),
        industry: text(row, &["business_type", "products"]),
        location: text(row, &["address"]),
        website: text(row, &["website"]),
        email: text(row, &["email"]),
        phone: phone(row, &["phone", "mobile"]),
        employees: text(row, &["employees"]),
        source_url: text(row, &["company_url"]),
        city: text(row, &["city"]),
        state: text(row, &["state"]),
        country: DEFAULT_COUNTRY.to_string(),
        ..Default::default()
    }
}

fn justdial(row: &Row) -> UnifiedLead {
    UnifiedLead {
        name: text(row, &["name", "business_name"]),
        industry: text(row, &["cuisines", "category"]),
        location: text(row, &["address"]),
        website: text(row, &["website"]),
        email: text(row, &["email"]),
        phone: phone(row, &["phone"]),
        rating: field(row, &["rating"]).and_then(parse_rating),
        reviews: count(row, &["reviews", "reviews_count"]),
        price_level: text(row, &["cost_for_two", "pricing"]),
        source_url: text(row, &["detail_url"]),
        city: text(row, &["city"]),
        state: text(row, &["state"]),
        country: DEFAULT_COUNTRY.to_string(),
        ..Default::default()
    }
}

fn tradeindia(row: &Row) -> UnifiedLead {
    let location = text(row, &["location"]);
    UnifiedLead {
        name: text(row, &["name"]),
        industry: text(row, &["category", "company_type"]),
        city: location.split(',').next().map(str::trim).unwrap_or_default().to_string(),
        location,
        phone: phone(row, &["phone"]),
        source_url: text(row, &["tradeindia_url"]),
        collected_at: text(row, &["collected_at"]),
        country: DEFAULT_COUNTRY.to_string(),
        ..Default::default()
    }
}

/// Launches are global; no country is assumed.
fn producthunt(row: &Row) -> UnifiedLead {
    UnifiedLead {
        name: text(row, &["name"]),
        industry: text(row, &["tagline"]),
        website: text(row, &["website"]),
        source_url: text(row, &["product_hunt_url"]),
        collected_at: text(row, &["collected_at"]),
        ..Default::default()
    }
}

fn instagram(row: &Row) -> UnifiedLead {
    let username = text(row, &["username"]);
    UnifiedLead {
        name: text(row, &["full_name", "username"]),
        industry: text(row, &["category", "category_scraped"]),
        website: text(row, &["website"]),
        email: text(row, &["email"]),
        phone: phone(row, &["phone"]),
        source_url: text(row, &["instagram_url"]),
        brand_instagram_url: text(row, &["instagram_url"]),
        brand_full_name: text(row, &["full_name"]),
        brand_followers: count(row, &["followers"]),
        brand_is_verified: flag(row, "is_verified"),
        brand_is_business: flag(row, "is_business"),
        brand_account: username,
        collected_at: text(row, &["collected_at"]),
        country: DEFAULT_COUNTRY.to_string(),
        ..Default::default()
    }
}

/// Posts whose author links a product site: the domain names the lead.
fn reddit(row: &Row) -> UnifiedLead {
    UnifiedLead {
        name: text(row, &["external_domain", "title"]),
        industry: text(row, &["flair"]),
        website: text(row, &["external_url"]),
        services: text(row, &["branding_reasons"]),
        source_url: text(row, &["reddit_url"]),
        ..Default::default()
    }
}

// ── Other lead types ──────────────────────────────────────────────────────────

pub fn yc(row: &Row) -> UnifiedLead {
    let location = text(row, &["location"]);
    UnifiedLead {
        name: text(row, &["name"]),
        industry: text(row, &["industry"]),
        venture_type: derive_venture_type(&text(row, &["industry"])).unwrap_or_default().to_string(),
        country: infer_country(&location).to_string(),
        location,
        website: text(row, &["website"]),
        employees: text(row, &["team_size"]),
        source_url: text(row, &["detail_url"]),
        ..Default::default()
    }
}

fn shopify_store(row: &Row) -> UnifiedLead {
    UnifiedLead {
        name: text(row, &["name", "url"]),
        source: text(row, &["source"]),
        collected_at: text(row, &["collected_at"]),
        venture_type: "E-commerce".to_string(),
        country: text(row, &["country"]),
        website: text(row, &["url"]),
        email: text(row, &["email"]),
        phone: text(row, &["phone"]),
        ..Default::default()
    }
}

fn shopify_scored(row: &Row) -> UnifiedLead {
    let weaknesses: Vec<&str> = field(row, &["weaknesses"])
        .map(|w| w.split(';').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    UnifiedLead {
        name: text(row, &["domain"]),
        venture_type: field(row, &["industry"]).unwrap_or("E-commerce").to_string(),
        website: text(row, &["url"]),
        rating: field(row, &["lead_score"]).and_then(parse_rating),
        services: weaknesses.join(", "),
        ..Default::default()
    }
}

fn brand_summary(row: &Row) -> UnifiedLead {
    let products = text(row, &["products_mentioned"]);
    UnifiedLead {
        name: text(row, &["brand_account"]),
        venture_type: derive_venture_type(&text(row, &["brand_category"])).unwrap_or("Fashion").to_string(),
        company_role: "Influencer Partnership".to_string(),
        services: products.clone(),
        website: text(row, &["brand_instagram_url"]),
        country: DEFAULT_COUNTRY.to_string(),
        influencer_handle: text(row, &["influencer_handle"]),
        brand_account: text(row, &["brand_account"]),
        brand_instagram_url: text(row, &["brand_instagram_url"]),
        brand_full_name: text(row, &["brand_full_name"]),
        brand_followers: count(row, &["brand_followers"]),
        brand_is_verified: flag(row, "brand_is_verified"),
        brand_is_business: flag(row, "brand_is_business"),
        products_mentioned: products,
        total_mentions: count(row, &["total_mentions"]),
        total_engagement: field(row, &["total_engagement"]).and_then(|v| v.parse().ok()),
        ..Default::default()
    }
}
