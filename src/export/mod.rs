//! CSV/JSON output files.

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// `YYYYmmdd_HHMMSS`, the suffix of every timestamped output.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Cannot create {:?}", parent))?;
    }
    Ok(())
}

/// One CSV row per record; headers come from the record's field names.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("Cannot create {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// CSV with explicit headers, for tables whose columns are only known at runtime.
pub fn write_table(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("Cannot create {:?}", path))?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Records flattened to a header row plus string cells, in field order.
pub fn to_table<T: Serialize>(rows: &[T]) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut writer = csv::Writer::from_writer(vec![]);
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Cannot flush table: {}", e.error()))?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let cells = reader
        .records()
        .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, _>>()?;
    Ok((headers, cells))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_vec_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write {:?}", path))?;
    Ok(())
}

/// Replace `path` in one step: write `<path>.tmp`, then rename over it.
pub fn write_csv_atomic<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    write_csv(&tmp, rows)?;
    fs::rename(&tmp, path).with_context(|| format!("Cannot replace {:?}", path))?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SavedFiles {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// `<dir>/<base>_<timestamp>.csv` and `.json` with the same rows.
pub fn save_results<T: Serialize>(dir: &Path, base: &str, rows: &[T]) -> Result<SavedFiles> {
    let ts = timestamp();
    let files = SavedFiles {
        csv: dir.join(format!("{}_{}.csv", base, ts)),
        json: dir.join(format!("{}_{}.json", base, ts)),
    };
    write_csv(&files.csv, rows)?;
    write_json(&files.json, rows)?;
    info!("Saved {} rows to {:?} and {:?}", rows.len(), files.csv, files.json);
    Ok(files)
}

/// Lowercased, filename-safe slug: "Japanese Restaurants" → "japanese_restaurants"
pub fn slugify(s: &str) -> String {
    let slug: String = s
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    slug.split('_').filter(|p| !p.is_empty()).collect::<Vec<_>>().join("_")
}

/// Worksheet title: alphanumerics and `_` only, at most 28 chars.
pub fn sanitize_sheet_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .take(28)
        .collect()
}

/// List fields stored as one `; `-separated cell so they fit in CSV.
pub mod joined {
    use serde::{Deserialize, Deserializer, Serializer};

    const SEP: &str = "; ";

    pub fn serialize<S: Serializer>(items: &[String], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&items.join(SEP))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(raw
            .split(SEP.trim())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Row {
        name: String,
        #[serde(with = "joined")]
        tags: Vec<String>,
        rating: Option<f64>,
    }

    #[test]
    fn test_save_results_writes_both() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![Row {
            name: "Acme".into(),
            tags: vec!["a".into(), "b".into()],
            rating: None,
        }];
        let files = save_results(&dir.path().join("out"), "acme_leads", &rows).unwrap();

        let csv_text = fs::read_to_string(&files.csv).unwrap();
        assert_eq!(csv_text, "name,tags,rating\nAcme,a; b,\n");
        let name = files.json.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("acme_leads_") && name.ends_with(".json"));

        let back: Vec<Row> = serde_json::from_slice(&fs::read(&files.json).unwrap()).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_atomic_replace_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unified.csv");
        fs::write(&path, "old\n").unwrap();
        write_csv_atomic(&path, &[("x", 1)]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x,1\n");
        assert!(!dir.path().join("unified.csv.tmp").exists());
    }

    #[test]
    fn test_to_table_keeps_field_order() {
        let rows = vec![Row {
            name: "Acme".into(),
            tags: vec!["a".into()],
            rating: Some(4.5),
        }];
        let (headers, cells) = to_table(&rows).unwrap();
        assert_eq!(headers, ["name", "tags", "rating"]);
        assert_eq!(cells, [["Acme", "a", "4.5"]]);
    }

    #[test]
    fn test_names() {
        assert_eq!(slugify("  Japanese Restaurants, Mumbai "), "japanese_restaurants_mumbai");
        assert_eq!(sanitize_sheet_name("Food & Beverage"), "Food___Beverage");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), 28);
    }
}
