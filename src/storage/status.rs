//! Human-readable run status kept in `data/status.txt`.

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Counters shown by `leadgen status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    BusinessesScraped,
    WebsitesChecked,
    LeadsInSheet,
    Errors,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub last_run: Option<String>,
    pub businesses_scraped: u64,
    pub websites_checked: u64,
    pub leads_in_sheet: u64,
    pub errors: u64,
    pub next_run: Option<String>,
}

impl Status {
    fn counter_mut(&mut self, c: Counter) -> &mut u64 {
        match c {
            Counter::BusinessesScraped => &mut self.businesses_scraped,
            Counter::WebsitesChecked => &mut self.websites_checked,
            Counter::LeadsInSheet => &mut self.leads_in_sheet,
            Counter::Errors => &mut self.errors,
        }
    }

    /// Parse `Key: value` lines. Unknown keys and unparsable numbers are
    /// ignored, so a damaged file degrades to defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Status::default();
        for line in content.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            let text = (!value.is_empty() && value != "None").then(|| value.to_string());
            let number = value.parse::<u64>().ok();
            match key.trim().to_lowercase().replace(' ', "_").as_str() {
                "last_run" => s.last_run = text,
                "next_run" => s.next_run = text,
                "businesses_scraped" => s.businesses_scraped = number.unwrap_or(s.businesses_scraped),
                "websites_checked" => s.websites_checked = number.unwrap_or(s.websites_checked),
                "leads_in_sheet" => s.leads_in_sheet = number.unwrap_or(s.leads_in_sheet),
                "errors" => s.errors = number.unwrap_or(s.errors),
                _ => {}
            }
        }
        s
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_none = |v: &Option<String>| v.clone().unwrap_or_else(|| "None".to_string());
        writeln!(f, "Last Run: {}", or_none(&self.last_run))?;
        writeln!(f, "Businesses Scraped: {}", self.businesses_scraped)?;
        writeln!(f, "Websites Checked: {}", self.websites_checked)?;
        writeln!(f, "Leads in Sheet: {}", self.leads_in_sheet)?;
        writeln!(f, "Errors: {}", self.errors)?;
        writeln!(f, "Next Run: {}", or_none(&self.next_run))
    }
}

pub struct StatusTracker {
    path: PathBuf,
    pub status: Status,
}

impl StatusTracker {
    /// Load `path` if it exists; a missing or unreadable file starts fresh.
    pub fn load(path: &Path) -> Self {
        let status = match fs::read_to_string(path) {
            Ok(content) => Status::parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Status::default(),
            Err(e) => {
                warn!("Could not load status {:?}: {}", path, e);
                Status::default()
            }
        };
        Self {
            path: path.to_path_buf(),
            status,
        }
    }

    /// Apply `f` and stamp `last_run` with the current time.
    pub fn update(&mut self, f: impl FnOnce(&mut Status)) {
        f(&mut self.status);
        self.status.last_run = Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
    }

    pub fn increment(&mut self, counter: Counter, amount: u64) {
        *self.status.counter_mut(counter) += amount;
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        fs::write(&self.path, self.status.to_string()).with_context(|| format!("Cannot write {:?}", self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tolerates_garbage() {
        let s = Status::parse("Last Run: 2025-01-02 03:04:05\nWebsites Checked: 12\nErrors: lots\nnonsense\nNext Run: None\n");
        assert_eq!(s.last_run.as_deref(), Some("2025-01-02 03:04:05"));
        assert_eq!(s.websites_checked, 12);
        assert_eq!(s.errors, 0);
        assert_eq!(s.next_run, None);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/status.txt");

        let mut tracker = StatusTracker::load(&path);
        assert_eq!(tracker.status, Status::default());
        tracker.update(|s| s.businesses_scraped = 50);
        tracker.increment(Counter::Errors, 2);
        tracker.increment(Counter::Errors, 1);
        tracker.save().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Last Run: "));
        assert!(text.contains("Leads in Sheet: 0\n"));

        let reloaded = StatusTracker::load(&path);
        assert_eq!(reloaded.status.businesses_scraped, 50);
        assert_eq!(reloaded.status.errors, 3);
        assert!(reloaded.status.last_run.is_some());
    }
}
