use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Business ──────────────────────────────────────────────────────────────────

/// A local business as collected by the Maps scraper; also the input record
/// of the website-scoring pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Business {
    pub business_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    #[serde(deserialize_with = "de_opt_f64")]
    pub rating: Option<f64>,
    #[serde(deserialize_with = "de_opt_u64")]
    pub reviews: Option<u64>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub source: Option<String>,
    pub google_maps_url: Option<String>,
    #[serde(deserialize_with = "de_opt_f64")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "de_opt_f64")]
    pub longitude: Option<f64>,
    pub place_id: Option<String>,
    pub business_status: Option<String>,
    #[serde(deserialize_with = "de_opt_string")]
    pub price_level: Option<String>,
    #[serde(deserialize_with = "de_opt_string")]
    pub working_hours: Option<String>,
    pub verified: bool,
}

impl Business {
    pub fn display_name(&self) -> &str {
        self.business_name.as_deref().unwrap_or("Unknown")
    }
}

// ── Website analysis ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebsiteAnalysis {
    pub url: Option<String>,
    pub score: u32,
    pub exists: bool,
    pub has_ssl: bool,
    pub fast_load: bool,
    pub valid_domain: bool,
    /// seconds, two decimals
    pub load_time: f64,
    pub checked_at: NaiveDateTime,
    pub error: Option<String>,
}

impl WebsiteAnalysis {
    pub fn empty(url: Option<String>, checked_at: NaiveDateTime) -> Self {
        Self {
            url,
            score: 0,
            exists: false,
            has_ssl: false,
            fast_load: false,
            valid_domain: false,
            load_time: 0.0,
            checked_at,
            error: None,
        }
    }

    pub fn failed(url: Option<String>, checked_at: NaiveDateTime, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(url, checked_at)
        }
    }
}

/// A business with its website analysis attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredBusiness {
    #[serde(flatten)]
    pub business: Business,
    pub website_analysis: WebsiteAnalysis,
    pub score: u32,
}

// ── Lenient field decoding ────────────────────────────────────────────────────
//
// Scraped JSON carries numbers as numbers, strings ("4.5", "1,203") or null.

fn number_from(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

pub fn de_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(number_from))
}

pub fn de_opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(number_from).filter(|n| *n >= 0.0).map(|n| n as u64))
}

/// Any scalar or structured value rendered as a string.
pub fn de_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Booleans written as `true`, `True`, `yes` or `1` by different exporters.
pub fn de_opt_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_tolerates_mixed_types() {
        let b: Business = serde_json::from_str(
            r#"{"business_name":"Chai Point","rating":"4.4","reviews":"1,203",
                "price_level":2,"working_hours":{"Mon":"9-5"},"unknown_field":true}"#,
        )
        .unwrap();
        assert_eq!(b.rating, Some(4.4));
        assert_eq!(b.reviews, Some(1203));
        assert_eq!(b.price_level.as_deref(), Some("2"));
        assert_eq!(b.working_hours.as_deref(), Some(r#"{"Mon":"9-5"}"#));
        assert!(b.website.is_none());
    }

    #[test]
    fn test_scored_business_flattens() {
        let checked = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let scored = ScoredBusiness {
            business: Business {
                business_name: Some("Acme".into()),
                ..Default::default()
            },
            website_analysis: WebsiteAnalysis::failed(None, checked, "Invalid or empty URL"),
            score: 0,
        };
        let v = serde_json::to_value(&scored).unwrap();
        assert_eq!(v["business_name"], "Acme");
        assert_eq!(v["website_analysis"]["error"], "Invalid or empty URL");
    }
}
