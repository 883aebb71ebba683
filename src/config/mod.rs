use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub outscraper: OutscraperConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub instagram: InstagramConfig,
    #[serde(default)]
    pub sources: SourceUrls,
}

/// HTTP client behaviour shared by every scraper
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Where results, the database and the status file live
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_status_path")]
    pub status_path: PathBuf,
}

/// Website-scoring pipeline knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_min_score")]
    pub min_score: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutscraperConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_outscraper_endpoint")]
    pub endpoint: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SheetsConfig {
    #[serde(default)]
    pub sheet_id: Option<String>,

    #[serde(default)]
    pub service_account_json: Option<PathBuf>,

    #[serde(default = "default_worksheet")]
    pub worksheet: String,

    #[serde(default = "default_sheets_api")]
    pub api_base: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstagramConfig {
    #[serde(default = "default_ig_app_id")]
    pub app_id: String,

    #[serde(default)]
    pub session_id: Option<String>,
}

/// Base URLs for every scraped site, overridable for local mirrors and tests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceUrls {
    #[serde(default = "default_justdial")]
    pub justdial: String,
    #[serde(default = "default_instagram")]
    pub instagram: String,
    #[serde(default = "default_duckduckgo")]
    pub duckduckgo: String,
    #[serde(default = "default_reddit")]
    pub reddit: String,
    #[serde(default = "default_yc")]
    pub yc: String,
    #[serde(default = "default_tradeindia")]
    pub tradeindia: String,
    #[serde(default = "default_indiamart")]
    pub indiamart: String,
    #[serde(default = "default_producthunt")]
    pub producthunt: String,
    #[serde(default = "default_topstartups")]
    pub topstartups: String,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    1500
}
fn default_jitter_ms() -> u64 {
    500
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/leads.db")
}
fn default_status_path() -> PathBuf {
    PathBuf::from("data/status.txt")
}
fn default_concurrency() -> usize {
    10
}
fn default_batch_size() -> usize {
    100
}
fn default_min_score() -> u32 {
    40
}
fn default_outscraper_endpoint() -> String {
    "https://api.outscraper.com/maps/search".to_string()
}
fn default_worksheet() -> String {
    "Lead Gen Data".to_string()
}
fn default_sheets_api() -> String {
    "https://sheets.googleapis.com/v4/spreadsheets".to_string()
}
fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}
fn default_ig_app_id() -> String {
    "936619743392459".to_string()
}
fn default_justdial() -> String {
    "https://www.justdial.com".to_string()
}
fn default_instagram() -> String {
    "https://www.instagram.com".to_string()
}
fn default_duckduckgo() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}
fn default_reddit() -> String {
    "https://www.reddit.com".to_string()
}
fn default_yc() -> String {
    "https://www.ycombinator.com".to_string()
}
fn default_tradeindia() -> String {
    "https://www.tradeindia.com".to_string()
}
fn default_indiamart() -> String {
    "https://dir.indiamart.com".to_string()
}
fn default_producthunt() -> String {
    "https://www.producthunt.com".to_string()
}
fn default_topstartups() -> String {
    "https://topstartups.io".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_path: default_db_path(),
            status_path: default_status_path(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_size: default_batch_size(),
            min_score: default_min_score(),
        }
    }
}

impl Default for OutscraperConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_outscraper_endpoint(),
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            service_account_json: None,
            worksheet: default_worksheet(),
            api_base: default_sheets_api(),
            token_uri: default_token_uri(),
        }
    }
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            app_id: default_ig_app_id(),
            session_id: None,
        }
    }
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            justdial: default_justdial(),
            instagram: default_instagram(),
            duckduckgo: default_duckduckgo(),
            reddit: default_reddit(),
            yc: default_yc(),
            tradeindia: default_tradeindia(),
            indiamart: default_indiamart(),
            producthunt: default_producthunt(),
            topstartups: default_topstartups(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("LEADGEN").separator("__"))
            .build()?;

        let mut app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|_| AppConfig::default());
        app_cfg.apply_legacy_env();
        Ok(app_cfg)
    }

    /// Plain env names used by the deployment scripts (.env) fill gaps left by
    /// the layered sources.
    fn apply_legacy_env(&mut self) {
        if self.outscraper.api_key.is_none() {
            self.outscraper.api_key = std::env::var("OUTSCRAPER_API_KEY").ok().filter(|k| !k.is_empty());
        }
        if self.sheets.sheet_id.is_none() {
            self.sheets.sheet_id = std::env::var("GOOGLE_SHEET_ID").ok().filter(|k| !k.is_empty());
        }
        if self.sheets.service_account_json.is_none() {
            self.sheets.service_account_json = std::env::var("GOOGLE_SERVICE_ACCOUNT_JSON")
                .ok()
                .filter(|k| !k.is_empty())
                .map(PathBuf::from);
        }
        if self.instagram.session_id.is_none() {
            self.instagram.session_id = std::env::var("INSTAGRAM_SESSION_ID").ok().filter(|k| !k.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_source() {
        let cfg: AppConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.pipeline.min_score, 40);
        assert_eq!(cfg.pipeline.concurrency, 10);
        assert_eq!(cfg.http.max_retries, 3);
        assert_eq!(cfg.output.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.sheets.worksheet, "Lead Gen Data");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[pipeline]\nmin_score = 70\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.pipeline.min_score, 70);
        assert_eq!(cfg.pipeline.batch_size, 100);
        assert_eq!(cfg.sources.reddit, "https://www.reddit.com");
        assert_eq!(cfg.sources.topstartups, "https://topstartups.io");
    }
}
