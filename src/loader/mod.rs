//! Readers for earlier scraper outputs (CSV and JSON) in the data directory.

use crate::models::Business;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A CSV row keyed by header name.
pub type Row = HashMap<String, String>;

/// Files in `dir` named `<prefix>*.<ext>`, sorted by name (timestamps sort
/// chronologically).
pub fn discover_files(dir: &Path, prefix: &str, ext: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(vec![]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Cannot list {:?}", dir))? {
        let path = entry?.path();
        let name_ok = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(prefix))
            .unwrap_or(false);
        let ext_ok = path.extension().map(|e| e == ext).unwrap_or(false);
        if path.is_file() && name_ok && ext_ok {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Most recent `<prefix>*.<ext>` file, if any.
pub fn latest_file(dir: &Path, prefix: &str, ext: &str) -> Result<Option<PathBuf>> {
    Ok(discover_files(dir, prefix, ext)?.pop())
}

/// Read a CSV into header-keyed rows. Rows that fail to parse are skipped.
pub fn load_csv_rows(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Cannot open {:?}", path))?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {} in {:?}: {}", i + 1, path, e);
                continue;
            }
        };
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.trim().to_string()))
            .collect();
        rows.push(row);
    }

    debug!("{:?}: {} rows", path, rows.len());
    Ok(rows)
}

/// Typed records from a CSV with headers. Unreadable rows are skipped.
pub fn load_csv_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Cannot open {:?}", path))?;
    let mut records = Vec::new();
    for (i, result) in reader.deserialize().enumerate() {
        match result {
            Ok(r) => records.push(r),
            Err(e) => warn!("Row {} in {:?}: {}", i + 1, path, e),
        }
    }
    Ok(records)
}

/// Businesses from a JSON file holding a list, `{"data": [...]}` or a single
/// object. Missing or invalid files yield an empty list.
pub fn load_businesses_json(path: &Path) -> Vec<Business> {
    let raw = match std::fs::read_to_string(path) {
        Ok(r) => r,
        Err(e) => {
            warn!("Cannot read {:?}: {}", path, e);
            return vec![];
        }
    };
    let value: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("Invalid JSON in {:?}: {}", path, e);
            return vec![];
        }
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            Some(_) => vec![],
            None => vec![Value::Object(obj)],
        },
        _ => vec![],
    };

    let businesses: Vec<Business> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(b) => Some(b),
            Err(e) => {
                warn!("Skipping malformed record in {:?}: {}", path, e);
                None
            }
        })
        .collect();
    info!("Loaded {} businesses from {:?}", businesses.len(), path);
    businesses
}

/// Every `*.json` in `dir`, concatenated.
pub fn load_all_json(dir: &Path) -> Result<Vec<Business>> {
    let mut all = Vec::new();
    for path in discover_files(dir, "", "json")? {
        all.extend(load_businesses_json(&path));
    }
    Ok(all)
}

/// Value of the first listed column that is present and non-empty.
pub fn field<'a>(row: &'a Row, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .map(|v| v.trim())
        .find(|v| !v.is_empty() && *v != "nan" && *v != "None")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_sorted_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["yc_startups_20240102_000000.csv", "yc_startups_20240101_000000.csv", "other.csv"] {
            fs::write(dir.path().join(name), "name\nx\n").unwrap();
        }
        let files = discover_files(dir.path(), "yc_startups_", "csv").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("yc_startups_20240101_000000.csv"));
        let latest = latest_file(dir.path(), "yc_startups_", "csv").unwrap().unwrap();
        assert!(latest.ends_with("yc_startups_20240102_000000.csv"));
        assert!(discover_files(&dir.path().join("missing"), "", "csv").unwrap().is_empty());
    }

    #[test]
    fn test_load_csv_rows_flexible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leads.csv");
        fs::write(&path, "\u{feff}name,website\nAcme, acme.io \nShort\n").unwrap();
        let rows = load_csv_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Acme");
        assert_eq!(rows[0]["website"], "acme.io");
        assert!(!rows[1].contains_key("website"));
    }

    #[test]
    fn test_load_businesses_json_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("a.json");
        fs::write(&list, r#"[{"business_name":"A"},{"business_name":"B"}]"#).unwrap();
        let wrapped = dir.path().join("b.json");
        fs::write(&wrapped, r#"{"data":[{"business_name":"C"}]}"#).unwrap();
        let single = dir.path().join("c.json");
        fs::write(&single, r#"{"business_name":"D","website":"d.in"}"#).unwrap();
        let broken = dir.path().join("d.json");
        fs::write(&broken, "{not json").unwrap();

        assert_eq!(load_businesses_json(&list).len(), 2);
        assert_eq!(load_businesses_json(&wrapped).len(), 1);
        assert_eq!(load_businesses_json(&single)[0].website.as_deref(), Some("d.in"));
        assert!(load_businesses_json(&broken).is_empty());
        assert!(load_businesses_json(&dir.path().join("nope.json")).is_empty());
        assert_eq!(load_all_json(dir.path()).unwrap().len(), 4);
    }

    #[test]
    fn test_field_skips_blank_and_nan() {
        let row: Row = [("a", ""), ("b", "nan"), ("c", "value")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(field(&row, &["a", "b", "c"]), Some("value"));
        assert_eq!(field(&row, &["a"]), None);
    }
}
