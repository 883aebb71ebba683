use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use leadgen::brands;
use leadgen::config::AppConfig;
use leadgen::export;
use leadgen::merge::{self, UNIFIED_FILE, prioritize};
use leadgen::pipeline::Pipeline;
use leadgen::scraper::cleaner;
use leadgen::scraper::http_client::HttpClient;
use leadgen::scraper::instagram::{self, BrandProfile, InstagramClient};
use leadgen::scraper::justdial::JustDialScraper;
use leadgen::scraper::outscraper::{self, OutscraperClient};
use leadgen::scraper::producthunt::{self, ProductHuntScraper};
use leadgen::scraper::reddit::{self, RedditClient, Sort};
use leadgen::scraper::shopify::{self, ShopifyScraper};
use leadgen::scraper::topstartups::{self, TopStartupsScraper};
use leadgen::scraper::tradeindia::TradeIndiaScraper;
use leadgen::scraper::indiamart::{self, IndiaMartScraper};
use leadgen::scraper::yc::{self, YcOptions, YcScraper};
use leadgen::sheets::SheetsClient;
use leadgen::storage::status::Counter;
use leadgen::storage::{Repository, RunTotals, StatusTracker};
use leadgen::utils;

#[derive(Parser)]
#[command(name = "leadgen", about = "Lead collection, scoring and publishing", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Score business websites and publish qualified leads
    ScoreWebsites {
        /// Input JSON file (default: every JSON file in the data dir)
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        batch_size: Option<usize>,
        #[arg(short, long)]
        min_score: Option<u32>,
        #[arg(short, long)]
        sheet_id: Option<String>,
    },

    /// Scrape a JustDial listing with detail-page enrichment
    Justdial {
        /// Listing URL or path, e.g. Mumbai/Coffee-Shops/nct-10104727
        #[arg(long)]
        url: String,
        #[arg(long, default_value_t = 60)]
        target: usize,
        /// Output name: justdial_<name>_<timestamp>
        #[arg(long, default_value = "mumbai")]
        name: String,
    },

    /// Google Maps businesses through the Outscraper API
    Maps {
        #[arg(long)]
        query: String,
        #[arg(long, default_value = "Mumbai")]
        location: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Look up Instagram profiles and keep brand accounts
    Instagram {
        /// Usernames to look up
        usernames: Vec<String>,
        /// File with one username per line
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long, default_value = "fashion")]
        category: String,
    },

    /// Extract brand mentions from exported post captions
    Brands {
        /// Posts CSV (influencer_handle, shortcode, url, date, caption, likes, comments, engagement)
        #[arg(long)]
        posts: PathBuf,
        /// Fetch each brand's Instagram profile
        #[arg(long)]
        lookup: bool,
    },

    /// Find Shopify stores and score them as leads
    Shopify {
        /// Search queries (default: built-in list)
        #[arg(long)]
        query: Vec<String>,
        /// Score these store URLs instead of searching
        #[arg(long)]
        url: Vec<String>,
        #[arg(long, default_value_t = 20)]
        max_stores: usize,
        /// Only detect stores from the known-brand list; no scoring
        #[arg(long)]
        detect_only: bool,
    },

    /// Subreddit posts filtered to branding-need leads
    Reddit {
        #[arg(long, default_value = "indianstartups")]
        subreddit: String,
        #[arg(long, value_enum, default_value = "hot")]
        sort: Sort,
        #[arg(long, default_value_t = 100)]
        limit: usize,
        #[arg(long, default_value_t = 3)]
        min_need: u32,
        #[arg(long, default_value_t = 20)]
        min_score: i64,
    },

    /// Y Combinator directory companies ranked by brand weakness
    Yc {
        /// Batch filters, e.g. W25 F24
        #[arg(long, num_args = 1..)]
        batch: Vec<String>,
        #[arg(long, default_value_t = 100)]
        max: usize,
        /// Skip companies saved by earlier runs
        #[arg(long)]
        exclude_existing: bool,
        #[arg(long)]
        regions: Option<String>,
    },

    /// TradeIndia suppliers by keyword or category
    Tradeindia {
        #[arg(long, conflicts_with = "category")]
        query: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long, default_value_t = 50)]
        max: usize,
    },

    /// IndiaMART category listing
    Indiamart {
        /// Category URL or path under the directory site
        #[arg(long)]
        url: String,
        #[arg(long, default_value_t = 3)]
        max_pages: usize,
        #[arg(long, default_value = "businesses")]
        name: String,
    },

    /// Product Hunt launches of the last few days
    Producthunt {
        #[arg(long, default_value_t = 7)]
        days: u32,
        #[arg(long, default_value_t = 50)]
        max_per_day: usize,
        /// Fetch each product page for website and maker
        #[arg(long)]
        details: bool,
    },

    /// topstartups.io companies, Indian HQs unless --location is given
    Topstartups {
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long, default_value_t = 200)]
        max: usize,
    },

    /// Merge every source file into leads_unified.csv
    Merge,

    /// Update leads_prioritized.csv from the latest YC and JustDial files
    Prioritize,

    /// Publish the unified lead set to Google Sheets, one tab per venture type
    Publish {
        #[arg(short, long)]
        sheet_id: Option<String>,
        /// Also write leads_prioritized.csv to its own tab
        #[arg(long)]
        prioritized: bool,
    },

    /// Show database statistics
    Stats,

    /// Show the status file
    Status,

    /// Apply schema migrations
    Migrate,
}

impl Command {
    /// Name recorded in the run log; commands that keep their own log, or
    /// only read, return `None`.
    fn run_name(&self) -> Option<&'static str> {
        Some(match self {
            Command::Justdial { .. } => "justdial",
            Command::Maps { .. } => "maps",
            Command::Instagram { .. } => "instagram",
            Command::Brands { .. } => "brands",
            Command::Shopify { .. } => "shopify",
            Command::Reddit { .. } => "reddit",
            Command::Yc { .. } => "yc",
            Command::Tradeindia { .. } => "tradeindia",
            Command::Indiamart { .. } => "indiamart",
            Command::Producthunt { .. } => "producthunt",
            Command::Topstartups { .. } => "topstartups",
            Command::Merge => "merge",
            Command::Prioritize => "prioritize",
            Command::Publish { .. } => "publish",
            Command::ScoreWebsites { .. } | Command::Stats | Command::Status | Command::Migrate => return None,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "leadgen=info,warn",
        1 => "leadgen=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::ScoreWebsites {
            input,
            batch_size,
            min_score,
            sheet_id,
        } => {
            let _t = utils::Timer::start("Website scoring");
            if let Some(n) = batch_size {
                config.pipeline.batch_size = n;
            }
            if let Some(n) = min_score {
                config.pipeline.min_score = n;
            }
            if sheet_id.is_some() {
                config.sheets.sheet_id = sheet_id;
            }
            let outcome = Pipeline::new(config).run(input.as_deref()).await?;
            println!("{}", outcome.report);
        }

        Command::Stats => print_stats(&config)?,

        Command::Status => {
            let tracker = StatusTracker::load(&config.output.status_path);
            print!("{}", tracker.status);
            if let Ok(repo) = Repository::open(&config.output.db_path) {
                if let Ok(Some(run)) = repo.run_migrations().and_then(|_| repo.last_run(None)) {
                    println!(
                        "Last Command: {} ({}, {} processed, {} written, {} errors)",
                        run.command, run.status, run.processed, run.written, run.errors
                    );
                }
            }
        }

        Command::Migrate => {
            Repository::open(&config.output.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }

        command => {
            let name = command.run_name().unwrap_or("command");
            let _t = utils::Timer::start(name);
            let repo = Repository::open(&config.output.db_path)?;
            repo.run_migrations()?;
            let run_id = match repo.begin_run(name) {
                Ok(id) => id,
                Err(e) => {
                    warn!("Could not open run log: {:#}", e);
                    0
                }
            };

            let result = run_command(command, &config, &repo).await;

            let mut status = StatusTracker::load(&config.output.status_path);
            let error = result.as_ref().err().map(|e| format!("{:#}", e));
            let totals = result.as_ref().copied().unwrap_or_default();
            status.update(|_| {});
            if error.is_some() {
                status.increment(Counter::Errors, 1);
            } else if name != "merge" && name != "prioritize" && name != "publish" {
                status.increment(Counter::BusinessesScraped, totals.written as u64);
            }
            if let Err(e) = status.save() {
                warn!("{:#}", e);
            }
            if run_id > 0 {
                if let Err(e) = repo.finish_run(run_id, totals, error.as_deref()) {
                    warn!("Could not close run {}: {:#}", run_id, e);
                }
            }
            result?;
        }
    }

    Ok(())
}

async fn run_command(command: Command, config: &AppConfig, repo: &Repository) -> Result<RunTotals> {
    let data_dir = config.output.data_dir.as_path();
    let http = HttpClient::new(&config.http)?;

    match command {
        Command::Justdial { url, target, name } => {
            let url = listing_url(&config.sources.justdial, &url)?;
            let records = JustDialScraper::new(&http).run(&url, target).await?;
            if records.is_empty() {
                println!("No results");
                return Ok(RunTotals::default());
            }
            let files = export::save_results(data_dir, &format!("justdial_{}", export::slugify(&name)), &records)?;
            print_files(&files);
            Ok(written(records.len()))
        }

        Command::Maps { query, location, limit } => {
            let client = OutscraperClient::new(&http, &config.outscraper)?;
            let businesses = client.search(&query, &location, limit).await?;
            let base = format!("google_maps_{}", export::slugify(&format!("{} {}", query, location)));
            let files = export::save_results(data_dir, &base, &businesses)?;
            let s = outscraper::statistics(&businesses);
            println!("─────────────────────────────────");
            println!("  Google Maps: {}", query);
            println!("─────────────────────────────────");
            println!("  Businesses   : {}", s.total);
            println!("  With phone   : {}", utils::fmt_share(s.with_phone, s.total));
            println!("  With email   : {}", utils::fmt_share(s.with_email, s.total));
            println!("  With website : {}", utils::fmt_share(s.with_website, s.total));
            println!("  Verified     : {}", s.verified);
            println!("  Avg rating   : {:.2}", s.average_rating);
            print_files(&files);
            Ok(written(businesses.len()))
        }

        Command::Instagram {
            mut usernames,
            file,
            category,
        } => {
            if let Some(path) = file {
                let text = std::fs::read_to_string(&path).with_context(|| format!("Cannot read {:?}", path))?;
                usernames.extend(text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string));
            }
            if usernames.is_empty() {
                bail!(
                    "No usernames given; candidates come from hashtags such as #{}",
                    instagram::hashtags_for(&category).join(", #")
                );
            }
            let client = InstagramClient::new(
                &http,
                &config.sources.instagram,
                &config.instagram.app_id,
                config.instagram.session_id.clone(),
            );
            let accounts = client.business_accounts(&usernames, &category).await;
            if accounts.is_empty() {
                println!("No brand accounts found");
                return Ok(RunTotals {
                    processed: usernames.len(),
                    ..Default::default()
                });
            }
            let base = format!("{}_{}", instagram::SOURCE, export::slugify(&category));
            let files = export::save_results(data_dir, &base, &accounts)?;

            let enriched = enrich_unified(&data_dir.join(UNIFIED_FILE), &accounts)?;
            let followers: u64 = accounts.iter().map(|a| a.followers).sum();
            println!("Total accounts    : {}", accounts.len());
            println!("Business accounts : {}", accounts.iter().filter(|a| a.is_business).count());
            println!("Verified accounts : {}", accounts.iter().filter(|a| a.is_verified).count());
            println!("With websites     : {}", accounts.iter().filter(|a| !a.website.is_empty()).count());
            println!("With emails       : {}", accounts.iter().filter(|a| a.email.is_some()).count());
            println!("Avg followers     : {}", utils::fmt_number((followers / accounts.len() as u64) as i64));
            if enriched > 0 {
                println!("Unified leads enriched: {}", enriched);
            }
            print_files(&files);
            Ok(RunTotals {
                processed: usernames.len(),
                written: accounts.len(),
                errors: 0,
            })
        }

        Command::Brands { posts, lookup } => {
            let posts = brands::load_posts(&posts)?;
            let mentions = brands::analyze_posts(&posts);
            if mentions.is_empty() {
                println!("No product-brand mentions found");
                return Ok(RunTotals {
                    processed: posts.len(),
                    ..Default::default()
                });
            }
            let mut summary = brands::summarize(&mentions);
            if lookup {
                let client = InstagramClient::new(
                    &http,
                    &config.sources.instagram,
                    &config.instagram.app_id,
                    config.instagram.session_id.clone(),
                );
                for s in &mut summary {
                    let profile = client.fetch_profile(&s.brand_account).await;
                    s.apply_profile(&BrandProfile::from_lookup(&s.brand_account, &profile));
                }
            }

            let handle = export::slugify(&mentions[0].influencer_handle);
            let mention_files = export::save_results(data_dir, &format!("brand_mentions_{}", handle), &mentions)?;
            let summary_files = export::save_results(data_dir, &format!("brand_summary_{}", handle), &summary)?;

            println!("{:<25} {:<10} {:<40} {:>12}", "Brand", "Mentions", "Products", "Engagement");
            println!("{}", "-".repeat(90));
            for s in summary.iter().take(20) {
                let products: String = if s.products_mentioned.chars().count() > 35 {
                    format!("{}...", s.products_mentioned.chars().take(35).collect::<String>())
                } else {
                    s.products_mentioned.clone()
                };
                println!(
                    "@{:<24} {:<10} {:<40} {:>12}",
                    s.brand_account,
                    s.total_mentions,
                    products,
                    utils::fmt_number(s.total_engagement)
                );
            }
            print_files(&mention_files);
            print_files(&summary_files);
            Ok(RunTotals {
                processed: posts.len(),
                written: summary.len(),
                errors: 0,
            })
        }

        Command::Shopify {
            query,
            url,
            max_stores,
            detect_only,
        } => {
            let scraper = ShopifyScraper::new(&http, &config.sources.duckduckgo);
            if detect_only {
                let urls: Vec<String> = if url.is_empty() {
                    shopify::KNOWN_STORES.iter().map(|s| s.to_string()).collect()
                } else {
                    url
                };
                let stores = scraper.scan_stores(&urls, max_stores).await;
                let files = export::save_results(data_dir, "shopify_stores", &stores)?;
                print_files(&files);
                return Ok(RunTotals {
                    processed: urls.len(),
                    written: stores.len(),
                    errors: 0,
                });
            }

            let results = if url.is_empty() {
                let queries: Vec<String> = if query.is_empty() {
                    shopify::DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect()
                } else {
                    query
                };
                scraper.run_scorer(&queries, max_stores).await?
            } else {
                scraper.score_urls(&url).await?
            };
            if results.is_empty() {
                println!("No stores found");
                return Ok(RunTotals::default());
            }
            let files = export::save_results(data_dir, "shopify_leads_scored", &results)?;

            let summary = shopify::summarize(&results);
            println!("Stores analyzed: {}", summary.total);
            for (quality, n) in &summary.by_quality {
                println!("  {:<5} {}", quality.as_str(), n);
            }
            println!("Top industries:");
            for (industry, n) in &summary.top_industries {
                println!("  {:<20} {}", industry, n);
            }
            println!("Top weaknesses:");
            for (weakness, n) in &summary.top_weaknesses {
                println!("  {:<45} {}", weakness, n);
            }
            println!("Top leads:");
            for m in results.iter().take(10) {
                println!(
                    "  {:<35} score {:>2} ({})",
                    shopify::display_domain(m),
                    m.lead_score,
                    m.lead_quality.as_str()
                );
            }
            print_files(&files);
            Ok(RunTotals {
                processed: results.len(),
                written: results.len(),
                errors: results.iter().filter(|r| r.error.is_some()).count(),
            })
        }

        Command::Reddit {
            subreddit,
            sort,
            limit,
            min_need,
            min_score,
        } => {
            let posts = RedditClient::new(&http, &config.sources.reddit)
                .ranked_posts(&subreddit, sort, limit)
                .await?;
            let leads = reddit::filter_branding_leads(&posts, min_need, min_score);
            let base = format!("reddit_{}_branding", export::slugify(&subreddit));
            let files = export::save_results(data_dir, &base, &leads)?;
            println!("Saved {} branding-focused posts", leads.len());
            if leads.is_empty() {
                println!("No posts matched filters. Try lowering --min-need or --min-score.");
            }
            for (i, p) in leads.iter().take(10).enumerate() {
                println!(
                    "{:2}. [{}] score={} need={} - {}",
                    i + 1,
                    p.flair,
                    p.score,
                    p.branding_need_score.unwrap_or(0),
                    p.title
                );
                if !p.branding_reasons.is_empty() {
                    println!("    reasons: {}", p.branding_reasons.join(", "));
                }
                if reddit::has_external_site(p) {
                    println!("    site: {}", p.external_url);
                }
            }
            print_files(&files);
            Ok(RunTotals {
                processed: posts.len(),
                written: leads.len(),
                errors: 0,
            })
        }

        Command::Yc {
            batch,
            max,
            exclude_existing,
            regions,
        } => {
            let opts = YcOptions {
                batches: batch,
                max_results: max,
                regions,
                exclude: if exclude_existing {
                    yc::load_existing_names(data_dir)
                } else {
                    Default::default()
                },
            };
            let scraper = YcScraper::new(Arc::new(http), &config.sources.yc, config.pipeline.concurrency);
            let companies = scraper.run(&opts).await?;
            if companies.is_empty() {
                println!("No companies found");
                return Ok(RunTotals::default());
            }
            let files = export::save_results(data_dir, "yc_startups", &companies)?;
            println!("Top companies by brand weakness:");
            for c in companies.iter().take(10) {
                println!("  {:<30} {:<6} score {}", c.name, c.batch, c.score);
            }
            print_files(&files);
            Ok(written(companies.len()))
        }

        Command::Tradeindia {
            query,
            category,
            city,
            max,
        } => {
            let scraper = TradeIndiaScraper::new(&http, &config.sources.tradeindia);
            let (label, companies) = match (query, category) {
                (_, Some(key)) => (key.clone(), scraper.category(&key, max).await?),
                (Some(q), None) => (q.clone(), scraper.search(&q, city.as_deref(), max).await?),
                (None, None) => bail!("Give --query or --category"),
            };
            let files = export::save_results(data_dir, &format!("tradeindia_{}", export::slugify(&label)), &companies)?;
            println!("TradeIndia: {} companies", companies.len());
            print_files(&files);
            Ok(written(companies.len()))
        }

        Command::Indiamart { url, max_pages, name } => {
            let url = listing_url(&config.sources.indiamart, &url)?;
            let businesses = IndiaMartScraper::new(&http).scrape_category(&url, max_pages).await?;
            let files = export::save_results(data_dir, &format!("indiamart_{}", export::slugify(&name)), &businesses)?;
            let s = indiamart::statistics(&businesses);
            println!("IndiaMART businesses : {}", s.total);
            println!("  With email   : {}", utils::fmt_share(s.with_email, s.total));
            println!("  With phone   : {}", utils::fmt_share(s.with_phone, s.total));
            println!("  With website : {}", utils::fmt_share(s.with_website, s.total));
            println!("  With GST     : {}", utils::fmt_share(s.with_gst, s.total));
            print_files(&files);
            Ok(written(businesses.len()))
        }

        Command::Producthunt {
            days,
            max_per_day,
            details,
        } => {
            let scraper = ProductHuntScraper::new(&http, &config.sources.producthunt);
            let products = scraper
                .scrape_days(Local::now().date_naive(), days, max_per_day, details)
                .await?;
            let files = export::save_results(data_dir, "producthunt_products", &products)?;
            println!("Top products by upvotes:");
            for p in producthunt::top_by_upvotes(&products, 10) {
                println!("  {:<30} {:>5}  {}", p.name, p.upvotes, p.tagline);
            }
            print_files(&files);
            Ok(written(products.len()))
        }

        Command::Topstartups { industry, location, max } => {
            let scraper = TopStartupsScraper::new(&http, &config.sources.topstartups);
            let companies = scraper.scrape(industry.as_deref(), location.as_deref(), max).await?;
            let label = industry.as_deref().or(location.as_deref()).unwrap_or("india");
            let files = export::save_results(data_dir, &format!("topstartups_{}", export::slugify(label)), &companies)?;
            let s = topstartups::statistics(&companies);
            println!("topstartups.io companies : {}", s.total);
            println!("  With website   : {}", utils::fmt_share(s.with_website, s.total));
            println!("  With phone     : {}", utils::fmt_share(s.with_phone, s.total));
            println!("  With funding   : {}", utils::fmt_share(s.with_funding, s.total));
            println!("  Hiring         : {}", utils::fmt_share(s.with_jobs, s.total));
            println!("  With headcount : {}", utils::fmt_share(s.with_employees, s.total));
            if s.with_funding > 0 {
                println!("  Total funding  : ${}", utils::fmt_number(s.total_funding as i64));
                println!("  Average        : ${}", utils::fmt_number((s.total_funding / s.with_funding as u64) as i64));
            }
            println!("  Funded > $1M   : {}", s.well_funded);
            print_files(&files);
            Ok(written(companies.len()))
        }

        Command::Merge => {
            let leads = merge::write_unified(data_dir)?;
            let stored = repo.upsert_leads(&leads)?;
            let s = merge::summary(&leads);
            println!("─────────────────────────────────");
            println!("  Unified leads: {}", utils::fmt_number(s.total as i64));
            println!("─────────────────────────────────");
            println!("  With website : {}", utils::fmt_share(s.with_website, s.total));
            println!("  With email   : {}", utils::fmt_share(s.with_email, s.total));
            println!("  With phone   : {}", utils::fmt_share(s.with_phone, s.total));
            println!("  By lead type:");
            for (k, n) in merge::ranked(&s.by_lead_type) {
                println!("    {:<25} {}", k, n);
            }
            println!("  By venture type:");
            for (k, n) in merge::ranked(&s.by_venture) {
                println!("    {:<25} {}", k, n);
            }
            println!("  By source:");
            for (k, n) in merge::ranked(&s.by_source) {
                println!("    {:<25} {}", k, n);
            }
            println!("  Saved to {:?}", data_dir.join(UNIFIED_FILE));
            Ok(RunTotals {
                processed: leads.len(),
                written: stored,
                errors: 0,
            })
        }

        Command::Prioritize => {
            let report = prioritize::update_prioritized(data_dir)?;
            let leads = merge::load_unified(&data_dir.join(merge::PRIORITIZED_FILE))?;
            let stored = repo.upsert_leads(&leads)?;
            println!(
                "Prioritized leads: {} (+{} YC, +{} JustDial)",
                report.total, report.yc_added, report.justdial_added
            );
            for l in leads.iter().take(10) {
                println!("  {:<35} priority {}", l.name, l.priority_score.unwrap_or(0));
            }
            Ok(RunTotals {
                processed: report.total,
                written: stored,
                errors: 0,
            })
        }

        Command::Publish { sheet_id, prioritized } => {
            let leads = merge::load_unified(&data_dir.join(UNIFIED_FILE))?;
            if leads.is_empty() {
                bail!("No unified leads; run `leadgen merge` first");
            }
            let mut sheets = config.sheets.clone();
            if sheet_id.is_some() {
                sheets.sheet_id = sheet_id;
            }
            let mut client = SheetsClient::connect(&http, &sheets)
                .await
                .context("Authentication failed")?;

            let (headers, rows) = export::to_table(&leads)?;
            let tabs = client.write_split(&headers, &rows, "venture_type").await?;
            info!("Wrote worksheets: {}", tabs.join(", "));

            if prioritized {
                let ranked = merge::load_unified(&data_dir.join(merge::PRIORITIZED_FILE))?;
                let (headers, rows) = export::to_table(&ranked)?;
                client.write_table("Prioritized_Leads", &headers, &rows).await?;
            }
            println!("Published {} leads to {}", leads.len(), client.url());
            let mut status = StatusTracker::load(&config.output.status_path);
            status.update(|s| s.leads_in_sheet = leads.len() as u64);
            status.save()?;
            Ok(RunTotals {
                processed: leads.len(),
                written: rows.len(),
                errors: 0,
            })
        }

        Command::ScoreWebsites { .. } | Command::Stats | Command::Status | Command::Migrate => {
            bail!("not a logged command")
        }
    }
}

fn written(n: usize) -> RunTotals {
    RunTotals {
        processed: n,
        written: n,
        errors: 0,
    }
}

/// Absolute URLs pass through; paths resolve against the site's base.
fn listing_url(base: &str, target: &str) -> Result<String> {
    cleaner::absolutize(&format!("{}/", base.trim_end_matches('/')), target)
        .with_context(|| format!("Bad listing URL {:?}", target))
}

fn print_files(files: &export::SavedFiles) {
    println!("CSV:  {}", files.csv.display());
    println!("JSON: {}", files.json.display());
}

/// Apply fetched profiles to unified leads naming the same brand account.
/// Returns how many leads changed.
fn enrich_unified(path: &Path, profiles: &[instagram::InstagramProfile]) -> Result<usize> {
    let mut leads = merge::load_unified(path)?;
    let mut changed = 0;
    for lead in &mut leads {
        let account = lead.brand_account.trim().trim_start_matches('@').to_lowercase();
        if account.is_empty() {
            continue;
        }
        if let Some(p) = profiles.iter().find(|p| p.username.to_lowercase() == account) {
            instagram::enrich(lead, p);
            changed += 1;
        }
    }
    if changed > 0 {
        export::write_csv_atomic(path, &leads)?;
    }
    Ok(changed)
}

fn print_stats(config: &AppConfig) -> Result<()> {
    let repo = Repository::open(&config.output.db_path)?;
    repo.run_migrations()?;
    let total = repo.lead_count()?;
    let by_source = repo.count_by_source()?;
    let last = repo.last_run(None)?;

    println!("─────────────────────────────────");
    println!("  leadgen database stats");
    println!("─────────────────────────────────");
    println!("  Leads    : {}", utils::fmt_number(total));
    for (source, n) in &by_source {
        println!("    {:<22} {}", source, utils::fmt_number(*n));
    }
    match last {
        Some(run) => println!(
            "  Last run : {} at {} ({})",
            run.command,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.status
        ),
        None => println!("  Last run : none"),
    }
    println!("─────────────────────────────────");
    if total == 0 {
        println!("No leads stored; run `leadgen merge` first.");
    }
    Ok(())
}
