//! The prioritized view: scored YC companies and weak-presence directory
//! listings, highest priority first.

use anyhow::Result;
use chrono::Local;
use std::path::Path;
use tracing::info;

use super::sources::{self, DEFAULT_COUNTRY};
use super::{PRIORITIZED_FILE, UnifiedLead, append_unique, load_unified};
use crate::export;
use crate::loader::{Row, field, latest_file, load_csv_rows};
use crate::scoring::{is_priority_candidate, presence_priority, priority_score};
use crate::scraper::cleaner::{clean_phone, parse_count, parse_rating};

pub const YC_SCORED: &str = "yc_startup_scored";
pub const RESTAURANT_SCORED: &str = "restaurant_scored";

fn has(row: &Row, key: &str) -> bool {
    field(row, &[key]).is_some()
}

/// YC companies worth a call: no website, or a strong directory score.
pub fn prioritized_yc(rows: &[Row]) -> Vec<UnifiedLead> {
    rows.iter()
        .filter_map(|row| {
            let score = field(row, &["score"]).and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);
            let has_site = has(row, "website");
            if !is_priority_candidate(score, has_site) {
                return None;
            }
            let lead = sources::yc(row);
            if lead.name.is_empty() {
                return None;
            }
            Some(UnifiedLead {
                lead_type: YC_SCORED.to_string(),
                source: sources::SourceKind::Yc.label().to_string(),
                collected_at: super::now_iso(),
                priority_score: Some(u64::from(priority_score(score, has_site))),
                ..lead
            })
        })
        .collect()
}

/// JustDial listings ranked by what they are missing.
pub fn prioritized_justdial(rows: &[Row]) -> Vec<UnifiedLead> {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    rows.iter()
        .filter_map(|row| {
            let name = field(row, &["name"])?;
            let score = presence_priority(has(row, "website"), has(row, "email"), has(row, "phone"));
            Some(UnifiedLead {
                lead_type: RESTAURANT_SCORED.to_string(),
                name: name.to_string(),
                source: sources::SourceKind::JustDial.label().to_string(),
                collected_at: now.clone(),
                industry: "Restaurants".to_string(),
                venture_type: "Restaurants".to_string(),
                location: field(row, &["address"]).unwrap_or_default().to_string(),
                city: field(row, &["city"]).unwrap_or_default().to_string(),
                country: DEFAULT_COUNTRY.to_string(),
                website: field(row, &["website"]).unwrap_or_default().to_string(),
                email: field(row, &["email"]).unwrap_or_default().to_string(),
                phone: field(row, &["phone"]).and_then(clean_phone).unwrap_or_default(),
                rating: field(row, &["rating"]).and_then(parse_rating),
                reviews: field(row, &["reviews"]).and_then(parse_count),
                price_level: field(row, &["pricing"]).unwrap_or_default().to_string(),
                source_url: field(row, &["detail_url", "source_url"]).unwrap_or_default().to_string(),
                priority_score: Some(u64::from(score)),
                ..Default::default()
            })
        })
        .collect()
}

/// Add unseen names to `existing` and order everything by priority,
/// missing scores last. Returns how many were added.
pub fn merge_prioritized(existing: &mut Vec<UnifiedLead>, incoming: Vec<UnifiedLead>) -> usize {
    let added = append_unique(existing, incoming);
    existing.sort_by(|a, b| b.priority_score.unwrap_or(0).cmp(&a.priority_score.unwrap_or(0)));
    added
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrioritizeReport {
    pub yc_added: usize,
    pub justdial_added: usize,
    pub total: usize,
}

/// Fold the latest YC and JustDial outputs in `dir` into
/// `<dir>/leads_prioritized.csv`.
pub fn update_prioritized(dir: &Path) -> Result<PrioritizeReport> {
    let path = dir.join(PRIORITIZED_FILE);
    let mut leads = load_unified(&path)?;
    let mut report = PrioritizeReport::default();

    if let Some(file) = latest_file(dir, sources::SourceKind::Yc.prefix(), "csv")? {
        let rows = load_csv_rows(&file)?;
        report.yc_added = merge_prioritized(&mut leads, prioritized_yc(&rows));
        info!("{:?}: {} YC companies added", file, report.yc_added);
    }
    if let Some(file) = latest_file(dir, sources::SourceKind::JustDial.prefix(), "csv")? {
        let rows = load_csv_rows(&file)?;
        report.justdial_added = merge_prioritized(&mut leads, prioritized_justdial(&rows));
        info!("{:?}: {} JustDial listings added", file, report.justdial_added);
    }

    report.total = leads.len();
    export::write_csv_atomic(&path, &leads)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_yc_candidates() {
        let rows = vec![
            row(&[("name", "QuietCo"), ("score", "3")]),
            row(&[("name", "PixelForge"), ("score", "9"), ("website", "https://pixelforge.dev")]),
            row(&[("name", "Meh"), ("score", "5"), ("website", "https://meh.io")]),
            row(&[("name", "BigCo"), ("score", "95")]),
        ];
        let leads = prioritized_yc(&rows);
        let got: Vec<_> = leads.iter().map(|l| (l.name.as_str(), l.priority_score)).collect();
        assert_eq!(got, [("QuietCo", Some(13)), ("PixelForge", Some(9)), ("BigCo", Some(100))]);
        assert!(leads.iter().all(|l| l.lead_type == YC_SCORED));
    }

    #[test]
    fn test_justdial_presence() {
        let rows = vec![
            row(&[("name", "Bombay Brew"), ("phone", "+91 98200 12345")]),
            row(&[("name", "Sushi Ko"), ("website", "https://sushiko.in"), ("email", "hi@sushiko.in")]),
            row(&[("address", "no name")]),
        ];
        let leads = prioritized_justdial(&rows);
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].priority_score, Some(85));
        assert_eq!(leads[0].phone, "+919820012345");
        assert_eq!(leads[1].priority_score, Some(40));
        assert_eq!(leads[1].lead_type, RESTAURANT_SCORED);
    }

    #[test]
    fn test_merge_sorts_by_priority() {
        let mut existing = vec![UnifiedLead {
            name: "Old".into(),
            priority_score: Some(50),
            ..Default::default()
        }];
        let incoming = vec![
            UnifiedLead {
                name: "old".into(),
                priority_score: Some(99),
                ..Default::default()
            },
            UnifiedLead {
                name: "New".into(),
                priority_score: Some(80),
                ..Default::default()
            },
            UnifiedLead {
                name: "Unscored".into(),
                ..Default::default()
            },
        ];
        assert_eq!(merge_prioritized(&mut existing, incoming), 2);
        let names: Vec<_> = existing.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["New", "Old", "Unscored"]);
    }

    #[test]
    fn test_update_prioritized_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("yc_startups_20250101_000000.csv"),
            "name,location,website,score\nQuietCo,\"San Francisco, CA\",,11\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("justdial_mumbai_20250101_000000.csv"),
            "name,address,phone,email,website\nBombay Brew,Fort,,,\n",
        )
        .unwrap();

        let report = update_prioritized(dir.path()).unwrap();
        assert_eq!(report, PrioritizeReport { yc_added: 1, justdial_added: 1, total: 2 });

        let again = update_prioritized(dir.path()).unwrap();
        assert_eq!((again.yc_added, again.justdial_added, again.total), (0, 0, 2));

        let leads = load_unified(&dir.path().join(PRIORITIZED_FILE)).unwrap();
        assert_eq!(leads[0].name, "Bombay Brew");
        assert_eq!(leads[0].priority_score, Some(95));
        assert_eq!(leads[1].country, "USA");
    }
}
