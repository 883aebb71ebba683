//! One lead table across every source: mapping, deduplication, appends and
//! the prioritized view.

pub mod prioritize;
pub mod sources;

use anyhow::Result;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::export;
use crate::loader::{self, load_csv_rows};
use crate::models::{de_opt_bool, de_opt_f64, de_opt_u64};
pub use sources::SourceKind;

pub const UNIFIED_FILE: &str = "leads_unified.csv";
pub const PRIORITIZED_FILE: &str = "leads_prioritized.csv";

/// Row of the unified table. Columns absent for a source stay empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UnifiedLead {
    pub lead_type: String,
    pub name: String,
    pub source: String,
    pub collected_at: String,
    pub venture_type: String,
    pub company_role: String,
    pub services: String,
    pub industry: String,
    pub location: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub website: String,
    pub email: String,
    pub phone: String,
    pub employees: String,
    #[serde(deserialize_with = "de_opt_u64")]
    pub funding_usd: Option<u64>,
    #[serde(deserialize_with = "de_opt_bool")]
    pub hiring: Option<bool>,
    pub jobs_link: String,
    #[serde(deserialize_with = "de_opt_f64")]
    pub rating: Option<f64>,
    #[serde(deserialize_with = "de_opt_u64")]
    pub reviews: Option<u64>,
    pub price_level: String,
    pub source_url: String,
    pub influencer_handle: String,
    pub brand_account: String,
    pub brand_instagram_url: String,
    pub brand_full_name: String,
    #[serde(deserialize_with = "de_opt_u64")]
    pub brand_followers: Option<u64>,
    #[serde(deserialize_with = "de_opt_bool")]
    pub brand_is_verified: Option<bool>,
    #[serde(deserialize_with = "de_opt_bool")]
    pub brand_is_business: Option<bool>,
    pub products_mentioned: String,
    #[serde(deserialize_with = "de_opt_u64")]
    pub total_mentions: Option<u64>,
    pub total_engagement: Option<i64>,
    #[serde(deserialize_with = "de_opt_u64")]
    pub priority_score: Option<u64>,
}

impl UnifiedLead {
    pub fn has_website(&self) -> bool {
        !self.website.trim().is_empty()
    }

    /// Case-insensitive name key used by appends.
    pub fn name_key(&self) -> String {
        self.name.trim().to_lowercase()
    }

    /// Names scraped from "See who works here" links or initials are poor
    /// representatives when two rows share a key.
    fn has_good_name(&self) -> bool {
        !self.name.to_lowercase().contains("see who works here") && self.name.chars().count() > 3
    }
}

/// Timestamp written into `collected_at` by the mappers.
pub fn now_iso() -> String {
    Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string()
}

// ── Deduplication ─────────────────────────────────────────────────────────────

/// Keep the first row per non-empty key after a stable sort; rows without a
/// key are appended untouched.
fn dedup_on<K, F, S>(leads: Vec<UnifiedLead>, key: F, sort: S) -> Vec<UnifiedLead>
where
    K: Eq + std::hash::Hash,
    F: Fn(&UnifiedLead) -> Option<K>,
    S: FnMut(&UnifiedLead, &UnifiedLead) -> Ordering,
{
    let (mut keyed, rest): (Vec<_>, Vec<_>) = leads.into_iter().partition(|l| key(l).is_some());
    keyed.sort_by(sort);
    let mut seen = HashSet::new();
    let mut out: Vec<UnifiedLead> = keyed.into_iter().filter(|l| key(l).is_some_and(|k| seen.insert(k))).collect();
    out.extend(rest);
    out
}

fn present(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Collapse business rows sharing a website, then a phone, then a
/// (name, city) pair. For websites the better-named row wins.
pub fn dedup(leads: Vec<UnifiedLead>) -> Vec<UnifiedLead> {
    let before = leads.len();
    let leads = dedup_on(
        leads,
        |l| present(&l.website),
        |a, b| {
            a.website
                .cmp(&b.website)
                .then(b.has_good_name().cmp(&a.has_good_name()))
                .then(a.source.cmp(&b.source))
        },
    );
    let leads = dedup_on(
        leads,
        |l| present(&l.phone),
        |a, b| a.phone.cmp(&b.phone).then(a.source.cmp(&b.source)),
    );
    let leads = dedup_on(
        leads,
        |l| present(&l.name).zip(present(&l.city)),
        |a, b| a.name.cmp(&b.name).then(a.city.cmp(&b.city)).then(a.source.cmp(&b.source)),
    );
    debug!("Deduplicated {} -> {}", before, leads.len());
    leads
}

/// Final pass over the whole table: grouped by (lead_type, source), one row
/// per website, rows without a website last.
pub fn dedup_by_website(mut leads: Vec<UnifiedLead>) -> Vec<UnifiedLead> {
    leads.sort_by(|a, b| a.lead_type.cmp(&b.lead_type).then(a.source.cmp(&b.source)));
    let (with_site, without): (Vec<_>, Vec<_>) = leads.into_iter().partition(UnifiedLead::has_website);
    let mut seen = HashSet::new();
    let mut out: Vec<UnifiedLead> = with_site
        .into_iter()
        .filter(|l| seen.insert(l.website.trim().to_string()))
        .collect();
    out.extend(without);
    out
}

// ── Merge ─────────────────────────────────────────────────────────────────────

/// Every row of every `kind` file in `dir`, mapped. Unreadable files are
/// logged and skipped.
pub fn load_source(dir: &Path, kind: SourceKind) -> Result<Vec<UnifiedLead>> {
    let mut leads = Vec::new();
    for path in loader::discover_files(dir, kind.prefix(), "csv")? {
        if !kind.accepts(&path) {
            continue;
        }
        match load_csv_rows(&path) {
            Ok(rows) => {
                let mapped: Vec<UnifiedLead> = rows.iter().filter_map(|r| kind.map_row(r)).collect();
                debug!("{:?}: {} leads", path, mapped.len());
                leads.extend(mapped);
            }
            Err(e) => warn!("Failed to load {:?}: {:#}", path, e),
        }
    }
    Ok(leads)
}

/// Build the unified table from every source file in `dir`.
pub fn merge_all(dir: &Path) -> Result<Vec<UnifiedLead>> {
    let mut business = Vec::new();
    let mut other = Vec::new();
    for kind in SourceKind::ALL {
        let leads = load_source(dir, *kind)?;
        info!("{}: {} leads", kind.label(), leads.len());
        if kind.lead_type() == sources::BUSINESS {
            business.extend(leads);
        } else {
            other.extend(leads);
        }
    }

    let mut all = dedup(business);
    all.extend(other);
    let merged = dedup_by_website(all);
    info!("Unified leads: {}", merged.len());
    Ok(merged)
}

/// Merge `dir` and replace `<dir>/leads_unified.csv`.
pub fn write_unified(dir: &Path) -> Result<Vec<UnifiedLead>> {
    let leads = merge_all(dir)?;
    export::write_csv_atomic(&dir.join(UNIFIED_FILE), &leads)?;
    Ok(leads)
}

pub fn load_unified(path: &Path) -> Result<Vec<UnifiedLead>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    loader::load_csv_records(path)
}

/// Append `incoming` rows whose names are not in `existing`, rows without a
/// website first. Returns how many were added.
pub fn append_unique(existing: &mut Vec<UnifiedLead>, mut incoming: Vec<UnifiedLead>) -> usize {
    let mut names: HashSet<String> = existing.iter().map(UnifiedLead::name_key).collect();
    incoming.sort_by_key(UnifiedLead::has_website);
    let before = existing.len();
    for lead in incoming {
        let key = lead.name_key();
        if key.is_empty() || !names.insert(key) {
            continue;
        }
        existing.push(lead);
    }
    existing.len() - before
}

/// Load `path`, append the new names, and replace the file in one step.
pub fn append_unique_file(path: &Path, incoming: Vec<UnifiedLead>) -> Result<usize> {
    let mut leads = load_unified(path)?;
    let added = append_unique(&mut leads, incoming);
    export::write_csv_atomic(path, &leads)?;
    info!("Appended {} leads to {:?} ({} total)", added, path, leads.len());
    Ok(added)
}

// ── Summary ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeSummary {
    pub total: usize,
    pub by_lead_type: BTreeMap<String, usize>,
    pub by_venture: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub with_website: usize,
    pub with_email: usize,
    pub with_phone: usize,
}

fn or_unknown(s: &str) -> String {
    present(s).unwrap_or_else(|| "Unknown".to_string())
}

pub fn summary(leads: &[UnifiedLead]) -> MergeSummary {
    let mut s = MergeSummary {
        total: leads.len(),
        ..Default::default()
    };
    for l in leads {
        *s.by_lead_type.entry(or_unknown(&l.lead_type)).or_default() += 1;
        *s.by_venture.entry(or_unknown(&l.venture_type)).or_default() += 1;
        *s.by_source.entry(or_unknown(&l.source)).or_default() += 1;
        s.with_website += usize::from(l.has_website());
        s.with_email += usize::from(!l.email.trim().is_empty());
        s.with_phone += usize::from(!l.phone.trim().is_empty());
    }
    s
}

/// Counts sorted largest first, ties by name.
pub fn ranked(counts: &BTreeMap<String, usize>) -> Vec<(&str, usize)> {
    let mut v: Vec<(&str, usize)> = counts.iter().map(|(k, n)| (k.as_str(), *n)).collect();
    v.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    v
}
