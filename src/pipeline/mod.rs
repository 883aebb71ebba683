//! Website-scoring pipeline: load businesses → check websites → keep
//! qualified leads → publish → report.
//!
//! Every step after loading is failure-tolerant. A business whose check
//! blows up is scored 0 and the batch carries on; a Sheets failure falls
//! back to the JSON backup written in step 4.

use crate::config::AppConfig;
use crate::export;
use crate::loader;
use crate::models::{Business, ScoredBusiness, WebsiteAnalysis};
use crate::scoring::analyze_website;
use crate::scraper::http_client::HttpClient;
use crate::sheets::{self, PublishResult};
use crate::storage::status::Counter;
use crate::storage::{Repository, RunTotals, StatusTracker};
use anyhow::{Context, Result, bail};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub const RUN_COMMAND: &str = "score-websites";
const TOP_LEADS: usize = 10;
const RULE: &str = "========================================";

pub struct Pipeline {
    config: AppConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineStats {
    pub businesses_loaded: usize,
    pub websites_checked: usize,
    pub qualified: usize,
    pub leads_added: usize,
    pub errors: usize,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub stats: PipelineStats,
    pub qualified: Vec<ScoredBusiness>,
    pub publish: PublishResult,
    pub qualified_file: PathBuf,
    pub report_file: PathBuf,
    pub report: String,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run once over `input`, or over every JSON file in the data dir.
    pub async fn run(&self, input: Option<&Path>) -> Result<PipelineOutcome> {
        let repo = Repository::open(&self.config.output.db_path).context("Failed to open lead database")?;
        repo.run_migrations()?;
        let run_id = match repo.begin_run(RUN_COMMAND) {
            Ok(id) => id,
            Err(e) => {
                warn!("Could not open run log: {:#}", e);
                0
            }
        };

        let result = self.execute(input).await;

        let (totals, failure) = match &result {
            Ok(outcome) => (
                RunTotals {
                    processed: outcome.stats.websites_checked,
                    written: outcome.stats.leads_added,
                    errors: outcome.stats.errors,
                },
                None,
            ),
            Err(e) => (RunTotals::default(), Some(format!("{:#}", e))),
        };
        if run_id > 0 {
            if let Err(e) = repo.finish_run(run_id, totals, failure.as_deref()) {
                warn!("Could not close run {}: {:#}", run_id, e);
            }
        }
        result
    }

    async fn execute(&self, input: Option<&Path>) -> Result<PipelineOutcome> {
        let cfg = &self.config;
        let data_dir = &cfg.output.data_dir;
        let mut stats = PipelineStats::default();

        // ── 1. Load businesses ────────────────────────────────────────────────
        info!("=== Step 1: Loading business data ===");
        let mut businesses = match input {
            Some(path) => loader::load_businesses_json(path),
            None => loader::load_all_json(data_dir)?,
        };
        if businesses.is_empty() {
            bail!("No business data found; add JSON files to {:?}", data_dir);
        }
        businesses.truncate(cfg.pipeline.batch_size);
        stats.businesses_loaded = businesses.len();
        info!("Processing {} businesses", businesses.len());

        // ── 2. Check websites ─────────────────────────────────────────────────
        info!("=== Step 2: Analyzing websites (concurrency {}) ===", cfg.pipeline.concurrency);
        let http = Arc::new(HttpClient::new(&cfg.http)?);
        let analyzed = analyze_all(http, businesses, cfg.pipeline.concurrency, &mut stats).await;
        stats.websites_checked = analyzed.len();

        // ── 3. Qualify ────────────────────────────────────────────────────────
        info!("=== Step 3: Filtering qualified leads ===");
        let qualified = filter_qualified(&analyzed, cfg.pipeline.min_score);
        stats.qualified = qualified.len();
        info!("{} qualified leads (score >= {})", qualified.len(), cfg.pipeline.min_score);
        if qualified.is_empty() {
            warn!("No qualified leads; consider lowering min_score");
        }

        // ── 4. Back up and publish ────────────────────────────────────────────
        info!("=== Step 4: Publishing ===");
        let ts = export::timestamp();
        let qualified_file = data_dir.join(format!("qualified_leads_{}.json", ts));
        match export::write_json(&qualified_file, &qualified) {
            Ok(()) => info!("Saved qualified leads to {:?}", qualified_file),
            Err(e) => error!("Failed to save backup file: {:#}", e),
        }

        let publish = self.publish(&qualified, &qualified_file).await?;
        stats.leads_added = publish.leads_added;

        // ── 5. Report and status ──────────────────────────────────────────────
        info!("=== Step 5: Summary report ===");
        let report = summary_report(&stats, &qualified, &publish, cfg.pipeline.min_score);
        let report_file = data_dir.join(format!("report_{}.txt", ts));
        match fs::write(&report_file, &report) {
            Ok(()) => info!("Report saved to {:?}", report_file),
            Err(e) => warn!("Cannot write {:?}: {}", report_file, e),
        }

        let mut status = StatusTracker::load(&cfg.output.status_path);
        status.update(|s| {
            s.businesses_scraped = stats.businesses_loaded as u64;
            s.websites_checked = stats.websites_checked as u64;
            s.leads_in_sheet = stats.leads_added as u64;
            s.next_run = Some("Manual".to_string());
        });
        status.increment(Counter::Errors, stats.errors as u64);
        if let Err(e) = status.save() {
            warn!("{:#}", e);
        }

        Ok(PipelineOutcome {
            stats,
            qualified,
            publish,
            qualified_file,
            report_file,
            report,
        })
    }

    /// Sheets when credentials are configured; otherwise, or when the write
    /// fails, the JSON backup stands in as the published location.
    async fn publish(&self, leads: &[ScoredBusiness], backup: &Path) -> Result<PublishResult> {
        let fallback = PublishResult {
            success: true,
            leads_added: leads.len(),
            sheet_url: Some(backup.display().to_string()),
            error: None,
        };
        if self.config.sheets.service_account_json.is_none() {
            info!("Google Sheets not configured; leads kept in {:?}", backup);
            return Ok(fallback);
        }

        let http = HttpClient::new(&self.config.http)?;
        let result = sheets::publish_leads(&http, &self.config.sheets, leads).await;
        if result.success {
            info!("Added {} leads to Google Sheets", result.leads_added);
            if let Some(url) = &result.sheet_url {
                info!("Sheet URL: {}", url);
            }
            Ok(result)
        } else {
            warn!(
                "Google Sheets write failed: {}",
                result.error.as_deref().unwrap_or("no rows written")
            );
            info!("Leads kept in {:?}", backup);
            Ok(fallback)
        }
    }
}

/// Check every business's website with at most `concurrency` in flight.
/// Output order follows input order.
async fn analyze_all(
    http: Arc<HttpClient>,
    businesses: Vec<Business>,
    concurrency: usize,
    stats: &mut PipelineStats,
) -> Vec<ScoredBusiness> {
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::new();

    for business in businesses {
        let http = Arc::clone(&http);
        let sem = Arc::clone(&sem);
        let website = business.website.clone();

        let handle = tokio::spawn(async move {
            let _permit = sem.acquire().await?;
            Ok::<WebsiteAnalysis, anyhow::Error>(analyze_website(&http, website.as_deref()).await)
        });
        handles.push((business, handle));
    }

    let mut scored = Vec::with_capacity(handles.len());
    for (business, handle) in handles {
        let analysis = match handle.await {
            Ok(Ok(analysis)) => analysis,
            Ok(Err(e)) => {
                warn!("{}: {:#}", business.display_name(), e);
                stats.errors += 1;
                WebsiteAnalysis::failed(business.website.clone(), Local::now().naive_local(), format!("{:#}", e))
            }
            Err(e) => {
                error!("Task panic for {}: {}", business.display_name(), e);
                stats.errors += 1;
                WebsiteAnalysis::failed(business.website.clone(), Local::now().naive_local(), e.to_string())
            }
        };
        let score = analysis.score;
        scored.push(ScoredBusiness {
            business,
            website_analysis: analysis,
            score,
        });
    }
    scored
}

pub fn filter_qualified(businesses: &[ScoredBusiness], min_score: u32) -> Vec<ScoredBusiness> {
    businesses.iter().filter(|b| b.score >= min_score).cloned().collect()
}

/// Plain-text run summary with the ten best leads.
pub fn summary_report(
    stats: &PipelineStats,
    qualified: &[ScoredBusiness],
    publish: &PublishResult,
    min_score: u32,
) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "LEAD GENERATION PIPELINE SUMMARY".to_string(),
        RULE.to_string(),
        String::new(),
        format!("Execution Time: {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        String::new(),
        "STATISTICS:".to_string(),
        "-----------".to_string(),
        format!("Total Businesses Processed: {}", stats.businesses_loaded),
        format!("Websites Analyzed: {}", stats.websites_checked),
        format!("Qualified Leads (Score >= {}): {}", min_score, stats.qualified),
        format!("Leads Added to Sheets: {}", publish.leads_added),
        format!("Errors: {}", stats.errors),
        String::new(),
        "RESULTS:".to_string(),
        "--------".to_string(),
        format!("Success: {}", publish.success),
        format!("Google Sheet URL: {}", publish.sheet_url.as_deref().unwrap_or("N/A")),
        String::new(),
        "TOP LEADS:".to_string(),
        "----------".to_string(),
    ];

    let mut top: Vec<&ScoredBusiness> = qualified.iter().collect();
    top.sort_by(|a, b| b.score.cmp(&a.score));
    for (i, lead) in top.iter().take(TOP_LEADS).enumerate() {
        let mut line = format!("{}. {} - Score: {}", i + 1, lead.business.display_name(), lead.score);
        if let Some(site) = lead.business.website.as_deref().filter(|s| !s.is_empty()) {
            line.push_str(&format!(" ({})", site));
        }
        lines.push(line);
    }
    lines.push(String::new());
    lines.push(RULE.to_string());
    lines.join("\n") + "\n"
}
