use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{info, warn};

use super::cleaner::extract_email;
use super::http_client::HttpClient;
use crate::config::OutscraperConfig;
use crate::models::Business;

/// Google Maps search through the Outscraper API.
pub struct OutscraperClient<'a> {
    http: &'a HttpClient,
    api_key: String,
    endpoint: String,
}

impl<'a> OutscraperClient<'a> {
    /// Fails before any request is made when no API key is configured.
    pub fn new(http: &'a HttpClient, config: &OutscraperConfig) -> Result<Self> {
        let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
            bail!("OUTSCRAPER_API_KEY not found. Get one from outscraper.com");
        };
        Ok(Self {
            http,
            api_key,
            endpoint: config.endpoint.clone(),
        })
    }

    pub async fn search(&self, query: &str, location: &str, limit: usize) -> Result<Vec<Business>> {
        let full_query = if location.trim().is_empty() {
            query.to_string()
        } else {
            format!("{} in {}", query, location)
        };
        info!("Searching Google Maps: {} (limit {})", full_query, limit);

        let body: Value = self
            .http
            .get_json(
                &self.endpoint,
                &[
                    ("query", full_query.clone()),
                    ("limit", limit.to_string()),
                    ("async", "false".to_string()),
                    ("language", "en".to_string()),
                    ("region", "IN".to_string()),
                ],
                &[("X-API-KEY", self.api_key.clone())],
            )
            .await
            .with_context(|| format!("Outscraper search failed for {:?}", full_query))?;

        let places = flatten_places(&body);
        let businesses: Vec<Business> = places.iter().filter_map(parse_place).collect();
        if businesses.len() < places.len() {
            warn!("{} places had no name and were skipped", places.len() - businesses.len());
        }
        info!("Collected {} businesses", businesses.len());
        Ok(businesses)
    }
}

/// `data` is either a list of places or a list of per-query lists.
pub fn flatten_places(body: &Value) -> Vec<Value> {
    let data = match body.get("data") {
        Some(d) => d,
        None => body,
    };
    let Some(items) = data.as_array() else {
        return vec![];
    };
    items
        .iter()
        .flat_map(|item| match item {
            Value::Array(inner) => inner.clone(),
            Value::Object(_) => vec![item.clone()],
            _ => vec![],
        })
        .collect()
}

pub fn parse_place(place: &Value) -> Option<Business> {
    let s = |key: &str| {
        place.get(key).and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };
    let f = |key: &str| place.get(key).and_then(Value::as_f64);

    let name = s("name")?;
    let phone = s("phone").map(|p| p.replace("+91", "").replace(['-', ' '], ""));
    let reviews = place
        .get("reviews")
        .and_then(Value::as_u64)
        .or_else(|| place.get("reviews_count").and_then(Value::as_u64));
    let working_hours = match place.get("working_hours") {
        Some(Value::Null) | None => None,
        Some(Value::String(h)) => Some(h.clone()),
        Some(other) => Some(other.to_string()),
    };

    Some(Business {
        business_name: Some(name),
        address: s("full_address").or_else(|| s("address")),
        phone,
        email: s("description").and_then(|d| extract_email(&d)),
        website: s("site").or_else(|| s("website")),
        rating: f("rating"),
        reviews: reviews.or(Some(0)),
        category: s("type").or_else(|| s("category")),
        location: s("city"),
        source: Some("google_maps".to_string()),
        google_maps_url: s("google_url").or_else(|| s("url")),
        latitude: f("latitude"),
        longitude: f("longitude"),
        place_id: s("place_id"),
        business_status: s("business_status"),
        price_level: s("price_level"),
        working_hours,
        verified: place.get("verified").and_then(Value::as_bool).unwrap_or(false),
    })
}

/// Coverage figures printed after a Maps run.
#[derive(Debug, Default, PartialEq)]
pub struct MapsStats {
    pub total: usize,
    pub with_phone: usize,
    pub with_email: usize,
    pub with_website: usize,
    pub verified: usize,
    pub average_rating: f64,
}

pub fn statistics(businesses: &[Business]) -> MapsStats {
    let total = businesses.len();
    if total == 0 {
        return MapsStats::default();
    }
    let rating_sum: f64 = businesses.iter().filter_map(|b| b.rating).sum();
    MapsStats {
        total,
        with_phone: businesses.iter().filter(|b| b.phone.is_some()).count(),
        with_email: businesses.iter().filter(|b| b.email.is_some()).count(),
        with_website: businesses.iter().filter(|b| b.website.is_some()).count(),
        verified: businesses.iter().filter(|b| b.verified).count(),
        average_rating: (rating_sum / total as f64 * 100.0).round() / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_and_flat() {
        let nested = json!({"data": [[{"name": "A"}, {"name": "B"}], [{"name": "C"}]]});
        assert_eq!(flatten_places(&nested).len(), 3);
        let flat = json!({"data": [{"name": "A"}]});
        assert_eq!(flatten_places(&flat).len(), 1);
        assert!(flatten_places(&json!({"status": "Pending"})).is_empty());
    }

    #[test]
    fn test_parse_place_fields() {
        let place = json!({
            "name": "Pixel Studio",
            "address": "Powai, Mumbai",
            "phone": "+91 98200-12345",
            "website": "pixelstudio.in",
            "rating": 4.7,
            "reviews_count": 88,
            "category": "Design agency",
            "working_hours": {"Monday": "10AM-7PM"},
            "description": "Write to hello@pixelstudio.in",
            "verified": true
        });
        let b = parse_place(&place).unwrap();
        assert_eq!(b.business_name.as_deref(), Some("Pixel Studio"));
        assert_eq!(b.address.as_deref(), Some("Powai, Mumbai"));
        assert_eq!(b.phone.as_deref(), Some("9820012345"));
        assert_eq!(b.website.as_deref(), Some("pixelstudio.in"));
        assert_eq!(b.reviews, Some(88));
        assert_eq!(b.category.as_deref(), Some("Design agency"));
        assert_eq!(b.email.as_deref(), Some("hello@pixelstudio.in"));
        assert_eq!(b.working_hours.as_deref(), Some(r#"{"Monday":"10AM-7PM"}"#));
        assert!(b.verified);
    }

    #[test]
    fn test_parse_place_requires_name() {
        assert!(parse_place(&json!({"address": "x"})).is_none());
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let http = HttpClient::new(&crate::config::HttpConfig::default()).unwrap();
        let cfg = OutscraperConfig {
            api_key: Some("  ".into()),
            ..Default::default()
        };
        assert!(OutscraperClient::new(&http, &cfg).is_err());
    }

    #[test]
    fn test_statistics() {
        let bs = vec![
            Business {
                rating: Some(4.0),
                phone: Some("1".into()),
                ..Default::default()
            },
            Business {
                rating: Some(5.0),
                website: Some("a.in".into()),
                verified: true,
                ..Default::default()
            },
        ];
        let st = statistics(&bs);
        assert_eq!(st.total, 2);
        assert_eq!(st.with_phone, 1);
        assert_eq!(st.with_website, 1);
        assert_eq!(st.verified, 1);
        assert_eq!(st.average_rating, 4.5);
    }
}
