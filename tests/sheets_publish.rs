//! Google Sheets publishing against a mock token endpoint and Sheets API.

use chrono::Utc;
use leadgen::config::{HttpConfig, SheetsConfig};
use leadgen::models::{Business, ScoredBusiness, WebsiteAnalysis};
use leadgen::scraper::http_client::HttpClient;
use leadgen::sheets::{SheetsClient, publish_leads};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_KEY: &str = include_str!("fixtures/test_rsa_key.pem");

fn fast_http() -> HttpClient {
    HttpClient::new(&HttpConfig {
        timeout_secs: 5,
        request_delay_ms: 0,
        jitter_ms: 0,
        max_retries: 1,
        ..Default::default()
    })
    .unwrap()
}

fn write_key(dir: &Path, token_uri: &str) -> std::path::PathBuf {
    let key_path = dir.join("service_account.json");
    let key = json!({
        "type": "service_account",
        "client_email": "leadgen@test-project.iam.gserviceaccount.com",
        "private_key": TEST_KEY,
        "token_uri": token_uri,
    });
    std::fs::write(&key_path, key.to_string()).unwrap();
    key_path
}

fn sheets_config(server: &MockServer, dir: &Path) -> SheetsConfig {
    SheetsConfig {
        sheet_id: Some("SHEET1".into()),
        service_account_json: Some(write_key(dir, &format!("{}/token", server.uri()))),
        worksheet: "Lead Gen Data".into(),
        api_base: format!("{}/v4/spreadsheets", server.uri()),
        token_uri: "http://unused.invalid/token".into(),
    }
}

async fn mount_auth_and_sheet(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/SHEET1"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": "SHEET1",
            "spreadsheetUrl": "https://docs.google.com/spreadsheets/d/SHEET1/edit",
            "sheets": [{"properties": {"title": "Lead Gen Data", "sheetId": 0}}]
        })))
        .mount(server)
        .await;
}

fn scored(name: &str, score: u32) -> ScoredBusiness {
    let website = format!("https://{}.in", name.to_lowercase().replace(' ', ""));
    ScoredBusiness {
        business: Business {
            business_name: Some(name.into()),
            website: Some(website.clone()),
            source: Some("google_maps".into()),
            ..Default::default()
        },
        website_analysis: WebsiteAnalysis {
            exists: true,
            has_ssl: true,
            ..WebsiteAnalysis::empty(Some(website), Utc::now().naive_utc())
        },
        score,
    }
}

#[tokio::test]
async fn test_publish_writes_headers_then_appends() {
    let server = MockServer::start().await;
    mount_auth_and_sheet(&server).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v4/spreadsheets/SHEET1/values/.*A1:L1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"range": "'Lead Gen Data'!A1:L1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v4/spreadsheets/SHEET1/values/.*A1:L1$"))
        .and(body_string_contains("Business Name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updatedCells": 12})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v4/spreadsheets/SHEET1/values/.*A1:append$"))
        .and(body_string_contains("Kora Label"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updates": {"updatedRows": 2}})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let cfg = sheets_config(&server, dir.path());
    let http = fast_http();
    let result = publish_leads(&http, &cfg, &[scored("Kora Label", 90), scored("Bombay Brew", 70)]).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.leads_added, 2);
    assert_eq!(
        result.sheet_url.as_deref(),
        Some("https://docs.google.com/spreadsheets/d/SHEET1/edit")
    );
}

#[tokio::test]
async fn test_publish_without_key_file_reports_auth_failure() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let cfg = SheetsConfig {
        service_account_json: Some(dir.path().join("missing.json")),
        api_base: format!("{}/v4/spreadsheets", server.uri()),
        ..Default::default()
    };

    let http = fast_http();
    let result = publish_leads(&http, &cfg, &[scored("Kora Label", 90)]).await;

    assert!(!result.success);
    assert_eq!(result.leads_added, 0);
    assert!(result.error.unwrap().starts_with("Authentication failed"));
}

#[tokio::test]
async fn test_write_split_adds_one_worksheet_per_value() {
    let server = MockServer::start().await;
    mount_auth_and_sheet(&server).await;
    Mock::given(method("POST"))
        .and(path("/v4/spreadsheets/SHEET1:batchUpdate"))
        .and(body_string_contains("addSheet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"replies": [{}]})))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/v4/spreadsheets/SHEET1/values/.*!A1$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let cfg = sheets_config(&server, dir.path());
    let http = fast_http();
    let mut client = SheetsClient::connect(&http, &cfg).await.unwrap();
    assert_eq!(client.worksheets(), ["Lead Gen Data"]);

    let headers = vec!["company_name".to_string(), "venture_type".to_string()];
    let rows = vec![
        vec!["Kora".to_string(), "D2C".to_string()],
        vec!["Finly".to_string(), "Fintech".to_string()],
        vec!["Nameless".to_string(), String::new()],
    ];
    let written = client.write_split(&headers, &rows, "venture_type").await.unwrap();
    assert_eq!(written, ["All_Leads", "D2C", "Fintech"]);
}
