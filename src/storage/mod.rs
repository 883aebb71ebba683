pub mod status;

use crate::merge::UnifiedLead;
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::info;

pub use status::StatusTracker;

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS leads (
    lead_key        TEXT PRIMARY KEY,
    lead_type       TEXT NOT NULL DEFAULT '',
    name            TEXT NOT NULL,
    source          TEXT NOT NULL DEFAULT '',
    venture_type    TEXT,
    company_role    TEXT,
    industry        TEXT,
    city            TEXT,
    country         TEXT,
    website         TEXT,
    email           TEXT,
    phone           TEXT,
    rating          REAL,
    reviews         INTEGER,
    source_url      TEXT,
    priority_score  INTEGER,
    collected_at    TEXT,
    updated_at      TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS runs (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    command         TEXT NOT NULL,
    started_at      TIMESTAMP NOT NULL,
    finished_at     TIMESTAMP,
    status          TEXT NOT NULL DEFAULT 'running',
    processed       INTEGER DEFAULT 0,
    written         INTEGER DEFAULT 0,
    errors          INTEGER DEFAULT 0,
    error_msg       TEXT
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_leads_source   ON leads (source);
CREATE INDEX IF NOT EXISTS idx_leads_priority ON leads (priority_score);
CREATE INDEX IF NOT EXISTS idx_runs_command   ON runs (command);
"#;

/// Website when known, otherwise the name; lowercased.
pub fn lead_key(lead: &UnifiedLead) -> String {
    let key = if lead.has_website() { &lead.website } else { &lead.name };
    key.trim().to_lowercase()
}

fn opt(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

/// One row of the run log.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub command: String,
    pub started_at: NaiveDateTime,
    pub finished_at: Option<NaiveDateTime>,
    pub status: String,
    pub processed: i64,
    pub written: i64,
    pub errors: i64,
    pub error_msg: Option<String>,
}

impl RunRecord {
    fn from_row(r: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: r.get(0)?,
            command: r.get(1)?,
            started_at: r.get(2)?,
            finished_at: r.get(3)?,
            status: r.get(4)?,
            processed: r.get(5)?,
            written: r.get(6)?,
            errors: r.get(7)?,
            error_msg: r.get(8)?,
        })
    }
}

/// Counters recorded when a run ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunTotals {
    pub processed: usize,
    pub written: usize,
    pub errors: usize,
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path).with_context(|| format!("Failed to open SQLite at {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn.execute_batch(INDEXES).context("Index creation failed")?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    pub fn schema_version(&self) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))?)
    }

    // ── Leads ─────────────────────────────────────────────────────────────────

    /// Upsert leads by key. Re-running on the same data is a no-op apart
    /// from `updated_at`; empty incoming fields keep what was stored.
    pub fn upsert_leads(&self, leads: &[UnifiedLead]) -> Result<usize> {
        if leads.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let sql = r#"
            INSERT INTO leads
                (lead_key, lead_type, name, source, venture_type, company_role, industry,
                 city, country, website, email, phone, rating, reviews, source_url,
                 priority_score, collected_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (lead_key) DO UPDATE SET
                lead_type      = excluded.lead_type,
                name           = excluded.name,
                source         = excluded.source,
                venture_type   = COALESCE(excluded.venture_type,   leads.venture_type),
                company_role   = COALESCE(excluded.company_role,   leads.company_role),
                industry       = COALESCE(excluded.industry,       leads.industry),
                city           = COALESCE(excluded.city,           leads.city),
                country        = COALESCE(excluded.country,        leads.country),
                website        = COALESCE(excluded.website,        leads.website),
                email          = COALESCE(excluded.email,          leads.email),
                phone          = COALESCE(excluded.phone,          leads.phone),
                rating         = COALESCE(excluded.rating,         leads.rating),
                reviews        = COALESCE(excluded.reviews,        leads.reviews),
                source_url     = COALESCE(excluded.source_url,     leads.source_url),
                priority_score = COALESCE(excluded.priority_score, leads.priority_score),
                collected_at   = COALESCE(excluded.collected_at,   leads.collected_at),
                updated_at     = excluded.updated_at
        "#;

        let now = Utc::now().naive_utc();
        let mut written = 0;
        for l in leads {
            let key = lead_key(l);
            if key.is_empty() {
                continue;
            }
            tx.execute(
                sql,
                params![
                    key,
                    l.lead_type,
                    l.name.trim(),
                    l.source,
                    opt(&l.venture_type),
                    opt(&l.company_role),
                    opt(&l.industry),
                    opt(&l.city),
                    opt(&l.country),
                    opt(&l.website),
                    opt(&l.email),
                    opt(&l.phone),
                    l.rating,
                    l.reviews.map(|n| n as i64),
                    opt(&l.source_url),
                    l.priority_score.map(|n| n as i64),
                    opt(&l.collected_at),
                    now,
                ],
            )
            .with_context(|| format!("upsert lead {}", key))?;
            written += 1;
        }

        tx.commit()?;
        Ok(written)
    }

    /// Stored leads with at least `min_priority`, highest first. Without a
    /// threshold every lead is returned.
    pub fn list_leads(&self, min_priority: Option<u64>) -> Result<Vec<UnifiedLead>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT lead_type, name, source, venture_type, company_role, industry, city,
                      country, website, email, phone, rating, reviews, source_url,
                      priority_score, collected_at
               FROM leads
               WHERE ?1 IS NULL OR priority_score >= ?1
               ORDER BY priority_score DESC NULLS LAST, name"#,
        )?;
        let text = |r: &Row<'_>, i: usize| -> rusqlite::Result<String> {
            Ok(r.get::<_, Option<String>>(i)?.unwrap_or_default())
        };
        let leads = stmt
            .query_map(params![min_priority.map(|n| n as i64)], |r| {
                Ok(UnifiedLead {
                    lead_type: text(r, 0)?,
                    name: text(r, 1)?,
                    source: text(r, 2)?,
                    venture_type: text(r, 3)?,
                    company_role: text(r, 4)?,
                    industry: text(r, 5)?,
                    city: text(r, 6)?,
                    country: text(r, 7)?,
                    website: text(r, 8)?,
                    email: text(r, 9)?,
                    phone: text(r, 10)?,
                    rating: r.get(11)?,
                    reviews: r.get::<_, Option<i64>>(12)?.map(|n| n as u64),
                    source_url: text(r, 13)?,
                    priority_score: r.get::<_, Option<i64>>(14)?.map(|n| n as u64),
                    collected_at: text(r, 15)?,
                    ..Default::default()
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(leads)
    }

    pub fn lead_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM leads")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    /// `(source, count)` pairs, largest first.
    pub fn count_by_source(&self) -> Result<Vec<(String, i64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT source, COUNT(*) AS n FROM leads GROUP BY source ORDER BY n DESC, source")?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // ── Run log ───────────────────────────────────────────────────────────────

    pub fn begin_run(&self, command: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO runs (command, started_at, status) VALUES (?, ?, 'running')",
            params![command, Utc::now().naive_utc()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn finish_run(&self, run_id: i64, totals: RunTotals, error: Option<&str>) -> Result<()> {
        self.conn.execute(
            r#"UPDATE runs SET
               finished_at = ?, status = ?,
               processed = ?, written = ?, errors = ?, error_msg = ?
               WHERE id = ?"#,
            params![
                Utc::now().naive_utc(),
                if error.is_none() { "success" } else { "error" },
                totals.processed as i64,
                totals.written as i64,
                totals.errors as i64,
                error,
                run_id,
            ],
        )?;
        Ok(())
    }

    /// Most recent run, optionally of one command.
    pub fn last_run(&self, command: Option<&str>) -> Result<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                r#"SELECT id, command, started_at, finished_at, status,
                          processed, written, errors, error_msg
                   FROM runs
                   WHERE ?1 IS NULL OR command = ?1
                   ORDER BY id DESC LIMIT 1"#,
                params![command],
                RunRecord::from_row,
            )
            .optional()?;
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Repository {
        let repo = Repository::open_in_memory().unwrap();
        repo.run_migrations().unwrap();
        repo
    }

    fn lead(name: &str, source: &str, website: &str, priority: Option<u64>) -> UnifiedLead {
        UnifiedLead {
            lead_type: "business".into(),
            name: name.into(),
            source: source.into(),
            website: website.into(),
            priority_score: priority,
            ..Default::default()
        }
    }

    #[test]
    fn test_migrations_idempotent() {
        let repo = repo();
        repo.run_migrations().unwrap();
        assert_eq!(repo.schema_version().unwrap(), Some(1));
    }

    #[test]
    fn test_upsert_keeps_existing_fields() {
        let repo = repo();
        let mut first = lead("Sushi Ko", "justdial", "https://SushiKo.in", Some(40));
        first.phone = "+919820012345".into();
        assert_eq!(repo.upsert_leads(&[first]).unwrap(), 1);

        let second = lead("Sushi Ko Bandra", "google_maps", "https://sushiko.in", None);
        repo.upsert_leads(&[second]).unwrap();

        assert_eq!(repo.lead_count().unwrap(), 1);
        let stored = &repo.list_leads(None).unwrap()[0];
        assert_eq!(stored.name, "Sushi Ko Bandra");
        assert_eq!(stored.phone, "+919820012345");
        assert_eq!(stored.priority_score, Some(40));
    }

    #[test]
    fn test_list_by_priority() {
        let repo = repo();
        repo.upsert_leads(&[
            lead("Low", "yc_directory", "", Some(12)),
            lead("High", "justdial", "", Some(95)),
            lead("None", "justdial", "", None),
            lead("", "justdial", "", Some(99)),
        ])
        .unwrap();

        let names: Vec<_> = repo.list_leads(None).unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, ["High", "Low", "None"]);
        let top: Vec<_> = repo.list_leads(Some(50)).unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(top, ["High"]);
        assert_eq!(
            repo.count_by_source().unwrap(),
            [("justdial".to_string(), 2), ("yc_directory".to_string(), 1)]
        );
    }

    #[test]
    fn test_run_log() {
        let repo = repo();
        assert!(repo.last_run(None).unwrap().is_none());

        let a = repo.begin_run("score-websites").unwrap();
        repo.finish_run(a, RunTotals { processed: 50, written: 12, errors: 1 }, None).unwrap();
        let b = repo.begin_run("justdial").unwrap();
        repo.finish_run(b, RunTotals::default(), Some("HTTP 403")).unwrap();

        let last = repo.last_run(None).unwrap().unwrap();
        assert_eq!(last.command, "justdial");
        assert_eq!(last.status, "error");
        assert_eq!(last.error_msg.as_deref(), Some("HTTP 403"));

        let scored = repo.last_run(Some("score-websites")).unwrap().unwrap();
        assert_eq!((scored.processed, scored.written, scored.errors), (50, 12, 1));
        assert_eq!(scored.status, "success");
        assert!(scored.finished_at.is_some());
    }
}
