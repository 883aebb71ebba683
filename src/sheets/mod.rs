//! Google Sheets publishing through the v4 REST API with a service account.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Duration, Local, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};
use url::Url;

use crate::config::SheetsConfig;
use crate::export::sanitize_sheet_name;
use crate::models::ScoredBusiness;
use crate::scraper::http_client::HttpClient;

pub const SCOPES: &str = "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const MIN_ROWS: usize = 1000;
const MIN_COLS: usize = 20;
pub const ALL_LEADS_SHEET: &str = "All_Leads";

pub const LEAD_HEADERS: [&str; 12] = [
    "Business Name",
    "Website",
    "Phone",
    "Address",
    "Score",
    "Has Website",
    "Has SSL",
    "Fast Load",
    "Category",
    "Location",
    "Source",
    "Added Date",
];

// ── Service account auth ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Credentials file not found: {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid service account JSON in {:?}", path))
    }

    /// Signed RS256 assertion for the token endpoint, valid for one hour.
    pub fn assertion(&self, audience: &str, now: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            iss: self.client_email.clone(),
            scope: SCOPES.to_string(),
            aud: audience.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).context("Invalid private key")?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    /// Exchange a fresh assertion for an access token. The key's own
    /// `token_uri` wins over `default_uri`.
    pub async fn access_token(&self, http: &HttpClient, default_uri: &str) -> Result<String> {
        let uri = self.token_uri.as_deref().unwrap_or(default_uri);
        let jwt = self.assertion(uri, Utc::now())?;
        let resp: TokenResponse = http
            .post_form(uri, &[("grant_type", GRANT_TYPE), ("assertion", &jwt)])
            .await
            .context("Token exchange failed")?;
        Ok(resp.access_token)
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PublishResult {
    pub success: bool,
    pub leads_added: usize,
    pub sheet_url: Option<String>,
    pub error: Option<String>,
}

impl PublishResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

fn yes_no(b: bool) -> String {
    if b { "Yes" } else { "No" }.to_string()
}

/// One sheet row for a scored business.
pub fn lead_row(lead: &ScoredBusiness, added: &str) -> Vec<String> {
    let b = &lead.business;
    let a = &lead.website_analysis;
    let s = |v: &Option<String>| v.clone().unwrap_or_default();
    vec![
        s(&b.business_name),
        s(&b.website),
        s(&b.phone),
        s(&b.address),
        lead.score.to_string(),
        yes_no(a.exists),
        yes_no(a.has_ssl),
        yes_no(a.fast_load),
        s(&b.category),
        s(&b.location),
        s(&b.source),
        added.to_string(),
    ]
}

/// `'Title'!A1` notation with quotes escaped.
pub fn a1(title: &str, cells: &str) -> String {
    format!("'{}'!{}", title.replace('\'', "''"), cells)
}

// ── API wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spreadsheet {
    spreadsheet_id: String,
    #[serde(default)]
    spreadsheet_url: String,
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

// ── Client ────────────────────────────────────────────────────────────────────

pub struct SheetsClient<'a> {
    http: &'a HttpClient,
    base: String,
    token: String,
    spreadsheet_id: String,
    spreadsheet_url: String,
    titles: Vec<String>,
}

impl<'a> SheetsClient<'a> {
    pub fn new(http: &'a HttpClient, base: &str, token: String) -> Self {
        Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            token,
            spreadsheet_id: String::new(),
            spreadsheet_url: String::new(),
            titles: vec![],
        }
    }

    /// Authenticate with the configured key and open (or create) the spreadsheet.
    pub async fn connect(http: &'a HttpClient, cfg: &SheetsConfig) -> Result<Self> {
        let Some(path) = &cfg.service_account_json else {
            bail!("no service account key configured");
        };
        let key = ServiceAccountKey::load(path)?;
        let token = key.access_token(http, &cfg.token_uri).await?;
        info!("Authenticated with Google Sheets as {}", key.client_email);
        let mut client = Self::new(http, &cfg.api_base, token);
        client.open_or_create(cfg.sheet_id.as_deref()).await?;
        Ok(client)
    }

    pub fn url(&self) -> &str {
        &self.spreadsheet_url
    }

    pub fn worksheets(&self) -> &[String] {
        &self.titles
    }

    fn url_for(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<String> {
        let mut url = Url::parse(&self.base).with_context(|| format!("Bad Sheets API base {:?}", self.base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Sheets API base cannot take a path"))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.to_string())
    }

    async fn call<B: Serialize + ?Sized, T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<T> {
        Ok(self.http.send_json(method, url, &self.token, body).await?)
    }

    fn absorb(&mut self, sheet: Spreadsheet) {
        self.spreadsheet_url = if sheet.spreadsheet_url.is_empty() {
            format!("https://docs.google.com/spreadsheets/d/{}", sheet.spreadsheet_id)
        } else {
            sheet.spreadsheet_url
        };
        self.spreadsheet_id = sheet.spreadsheet_id;
        self.titles = sheet.sheets.into_iter().map(|s| s.properties.title).collect();
    }

    /// Open `sheet_id`, or create "Lead Gen Data <date>" when none is given.
    pub async fn open_or_create(&mut self, sheet_id: Option<&str>) -> Result<()> {
        let sheet: Spreadsheet = match sheet_id.filter(|s| !s.is_empty()) {
            Some(id) => {
                let url = self.url_for(&[id], &[])?;
                self.call(Method::GET, &url, None::<&Value>).await?
            }
            None => {
                let title = format!("Lead Gen Data {}", Local::now().format("%Y-%m-%d"));
                let url = self.url_for(&[], &[])?;
                let created: Spreadsheet = self
                    .call(Method::POST, &url, Some(&json!({"properties": {"title": title}})))
                    .await?;
                info!("Created new spreadsheet: {}", created.spreadsheet_url);
                created
            }
        };
        self.absorb(sheet);
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        let url = self.url_for(&[self.spreadsheet_id.as_str()], &[])?;
        let sheet: Spreadsheet = self.call(Method::GET, &url, None::<&Value>).await?;
        self.absorb(sheet);
        Ok(())
    }

    /// Add `title` if missing, sized for at least `rows` × `cols`; an
    /// existing worksheet is cleared when `clear` is set.
    pub async fn ensure_worksheet(&mut self, title: &str, rows: usize, cols: usize, clear: bool) -> Result<()> {
        if self.titles.iter().any(|t| t == title) {
            if clear {
                let target = format!("{}:clear", a1(title, "A:ZZ"));
                let url = self.url_for(&[self.spreadsheet_id.as_str(), "values", target.as_str()], &[])?;
                let _: Value = self.call(Method::POST, &url, Some(&json!({}))).await?;
            }
            return Ok(());
        }

        let request = json!({"requests": [{"addSheet": {"properties": {
            "title": title,
            "gridProperties": {"rowCount": rows.max(MIN_ROWS), "columnCount": cols.max(MIN_COLS)}
        }}}]});
        let target = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.url_for(&[target.as_str()], &[])?;
        let _: Value = self.call(Method::POST, &url, Some(&request)).await?;
        info!("Added worksheet {:?}", title);
        self.refresh().await
    }

    pub async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = self.url_for(&[self.spreadsheet_id.as_str(), "values", range], &[])?;
        let vr: ValueRange = self.call(Method::GET, &url, None::<&Value>).await?;
        Ok(vr
            .values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| match v {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect())
    }

    pub async fn update_range(&self, range: &str, values: &[Vec<String>]) -> Result<()> {
        let url = self.url_for(&[self.spreadsheet_id.as_str(), "values", range], &[("valueInputOption", "RAW")])?;
        let _: Value = self
            .call(Method::PUT, &url, Some(&json!({"range": range, "values": values})))
            .await?;
        Ok(())
    }

    pub async fn append_rows(&self, worksheet: &str, rows: &[Vec<String>]) -> Result<()> {
        let target = format!("{}:append", a1(worksheet, "A1"));
        let url = self.url_for(
            &[self.spreadsheet_id.as_str(), "values", target.as_str()],
            &[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")],
        )?;
        let _: Value = self.call(Method::POST, &url, Some(&json!({"values": rows}))).await?;
        Ok(())
    }

    /// Make sure row 1 holds the lead headers.
    async fn ensure_headers(&self, worksheet: &str) -> Result<()> {
        let range = a1(worksheet, "A1:L1");
        let existing = self.read_range(&range).await?;
        let matches = existing
            .first()
            .is_some_and(|row| row.iter().map(String::as_str).eq(LEAD_HEADERS.iter().copied()));
        if !matches {
            let headers: Vec<Vec<String>> = vec![LEAD_HEADERS.iter().map(|h| h.to_string()).collect()];
            self.update_range(&range, &headers).await?;
            info!("Sheet headers initialized");
        }
        Ok(())
    }

    /// Append scored businesses below the header row. A failed batch falls
    /// back to one request per row; returns how many rows landed.
    pub async fn write_leads(&mut self, worksheet: &str, leads: &[ScoredBusiness]) -> Result<usize> {
        self.ensure_worksheet(worksheet, MIN_ROWS, MIN_COLS, false)
            .await
            .context("Failed to get/create worksheet")?;
        self.ensure_headers(worksheet).await?;
        if leads.is_empty() {
            return Ok(0);
        }

        let added_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let rows: Vec<Vec<String>> = leads.iter().map(|l| lead_row(l, &added_at)).collect();
        match self.append_rows(worksheet, &rows).await {
            Ok(()) => {
                info!("Successfully added {} leads to Google Sheets", rows.len());
                Ok(rows.len())
            }
            Err(e) => {
                warn!("Batch append failed: {:#}; retrying row by row", e);
                let mut added = 0;
                for row in &rows {
                    match self.append_rows(worksheet, std::slice::from_ref(row)).await {
                        Ok(()) => added += 1,
                        Err(e) => warn!("Row {:?} failed: {:#}", row.first(), e),
                    }
                }
                Ok(added)
            }
        }
    }

    /// Replace the contents of `worksheet` with `headers` and `rows`.
    pub async fn write_table(&mut self, worksheet: &str, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
        self.ensure_worksheet(worksheet, rows.len() + 1, headers.len(), true).await?;
        let mut values = Vec::with_capacity(rows.len() + 1);
        values.push(headers.to_vec());
        values.extend(rows.iter().cloned());
        self.update_range(&a1(worksheet, "A1"), &values).await?;
        info!("Wrote {} rows to {:?}", rows.len(), worksheet);
        Ok(())
    }

    /// `All_Leads` plus one worksheet per distinct non-empty value of
    /// `column`. Returns the worksheet titles written.
    pub async fn write_split(&mut self, headers: &[String], rows: &[Vec<String>], column: &str) -> Result<Vec<String>> {
        self.write_table(ALL_LEADS_SHEET, headers, rows).await?;
        let mut written = vec![ALL_LEADS_SHEET.to_string()];

        let Some(idx) = headers.iter().position(|h| h == column) else {
            warn!("No {:?} column; wrote {} only", column, ALL_LEADS_SHEET);
            return Ok(written);
        };
        for (value, group) in split_by(rows, idx) {
            let title = sanitize_sheet_name(&value);
            self.write_table(&title, headers, &group).await?;
            written.push(title);
        }
        Ok(written)
    }
}

/// Rows grouped by the trimmed, non-empty cell at `idx`, sorted by value.
pub fn split_by(rows: &[Vec<String>], idx: usize) -> BTreeMap<String, Vec<Vec<String>>> {
    let mut groups: BTreeMap<String, Vec<Vec<String>>> = BTreeMap::new();
    for row in rows {
        if let Some(v) = row.get(idx).map(|v| v.trim()).filter(|v| !v.is_empty()) {
            groups.entry(v.to_string()).or_default().push(row.clone());
        }
    }
    groups
}

/// Publish scored businesses. Failures come back in the result; nothing
/// here aborts the caller.
pub async fn publish_leads(http: &HttpClient, cfg: &SheetsConfig, leads: &[ScoredBusiness]) -> PublishResult {
    let mut client = match SheetsClient::connect(http, cfg).await {
        Ok(c) => c,
        Err(e) => {
            warn!("Authentication failed: {:#}", e);
            return PublishResult::failed(format!("Authentication failed: {:#}", e));
        }
    };
    match client.write_leads(&cfg.worksheet, leads).await {
        Ok(added) => PublishResult {
            success: added > 0,
            leads_added: added,
            sheet_url: Some(client.url().to_string()),
            error: None,
        },
        Err(e) => {
            warn!("{:#}", e);
            PublishResult {
                sheet_url: Some(client.url().to_string()),
                ..PublishResult::failed(format!("{:#}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Business, WebsiteAnalysis};
    use jsonwebtoken::{DecodingKey, Validation, decode};

    const TEST_KEY: &str = include_str!("../../tests/fixtures/test_rsa_key.pem");
    const TEST_PUB: &str = include_str!("../../tests/fixtures/test_rsa_pub.pem");

    fn scored() -> ScoredBusiness {
        let at = Utc::now().naive_utc();
        ScoredBusiness {
            business: Business {
                business_name: Some("Bombay Brew".into()),
                phone: Some("+919820012345".into()),
                website: Some("http://bombaybrew.in".into()),
                category: Some("Cafe".into()),
                ..Default::default()
            },
            website_analysis: WebsiteAnalysis {
                exists: true,
                has_ssl: false,
                fast_load: true,
                ..WebsiteAnalysis::empty(Some("http://bombaybrew.in".into()), at)
            },
            score: 70,
        }
    }

    #[test]
    fn test_lead_row() {
        let row = lead_row(&scored(), "2025-01-01 10:00:00");
        assert_eq!(row.len(), LEAD_HEADERS.len());
        assert_eq!(row[0], "Bombay Brew");
        assert_eq!(row[4], "70");
        assert_eq!(&row[5..8], ["Yes", "No", "Yes"]);
        assert_eq!(row[3], "");
        assert_eq!(row[11], "2025-01-01 10:00:00");
    }

    #[test]
    fn test_a1_quotes_titles() {
        assert_eq!(a1("Lead Gen Data", "A1:L1"), "'Lead Gen Data'!A1:L1");
        assert_eq!(a1("Bob's", "A1"), "'Bob''s'!A1");
    }

    #[test]
    fn test_assertion_claims() {
        let key = ServiceAccountKey {
            client_email: "bot@project.iam.gserviceaccount.com".into(),
            private_key: TEST_KEY.into(),
            token_uri: None,
        };
        let now = Utc::now();
        let jwt = key.assertion("https://oauth2.googleapis.com/token", now).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://oauth2.googleapis.com/token"]);
        let decoded = decode::<Claims>(&jwt, &DecodingKey::from_rsa_pem(TEST_PUB.as_bytes()).unwrap(), &validation)
            .unwrap();
        assert_eq!(decoded.header.alg, Algorithm::RS256);
        let claims = decoded.claims;
        assert_eq!(claims.iss, "bot@project.iam.gserviceaccount.com");
        assert_eq!(claims.scope, SCOPES);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_split_by_column() {
        let rows = vec![
            vec!["a".to_string(), "Tech".to_string()],
            vec!["b".to_string(), " ".to_string()],
            vec!["c".to_string(), "Fashion".to_string()],
            vec!["d".to_string(), "Tech".to_string()],
        ];
        let groups = split_by(&rows, 1);
        assert_eq!(groups.keys().collect::<Vec<_>>(), ["Fashion", "Tech"]);
        assert_eq!(groups["Tech"].len(), 2);
    }
}
