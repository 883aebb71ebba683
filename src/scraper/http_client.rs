use crate::config::HttpConfig;
use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tokio_retry::RetryIf;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("rate limited (HTTP {status}) by {url}")]
    RateLimited { status: u16, url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not decode body from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    /// Transport failures and 429/503 are worth another attempt; other
    /// statuses and bad bodies are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. } | FetchError::Transport { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } | FetchError::RateLimited { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Outcome of a single un-retried GET, used by the website checker.
#[derive(Debug, Clone)]
pub struct Probe {
    pub status: u16,
    pub elapsed: Duration,
    pub final_url: String,
}

pub struct HttpClient {
    inner: reqwest::Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// Fetch a URL as text with rate-limiting and retry.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get_text_with(url, &[]).await
    }

    /// Like `get_text`, with extra request headers.
    pub async fn get_text_with(&self, url: &str, headers: &[(&str, String)]) -> Result<String, FetchError> {
        self.polite_delay().await;
        let resp = self
            .send_with_retry(url, || {
                let mut req = self.inner.get(url);
                for (name, value) in headers {
                    req = req.header(*name, value);
                }
                req
            })
            .await?;
        read_text(url, resp).await
    }

    /// GET a JSON document with query parameters and headers.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &[(&str, String)],
    ) -> Result<T, FetchError> {
        self.polite_delay().await;
        let resp = self
            .send_with_retry(url, || {
                let mut req = self.inner.get(url).query(query);
                for (name, value) in headers {
                    req = req.header(*name, value);
                }
                req
            })
            .await?;
        decode_json(url, resp).await
    }

    /// POST a urlencoded form and decode the JSON reply. No polite delay:
    /// used for API endpoints, not scraped sites.
    pub async fn post_form<T: DeserializeOwned>(&self, url: &str, form: &[(&str, &str)]) -> Result<T, FetchError> {
        let resp = self.send_with_retry(url, || self.inner.post(url).form(form)).await?;
        decode_json(url, resp).await
    }

    /// Authenticated JSON API call (bearer token).
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        token: &str,
        body: Option<&B>,
    ) -> Result<T, FetchError> {
        let resp = self
            .send_with_retry(url, || {
                let req = self.inner.request(method.clone(), url).bearer_auth(token);
                match body {
                    Some(b) => req.json(b),
                    None => req,
                }
            })
            .await?;
        decode_json(url, resp).await
    }

    /// Single GET following redirects, with its own timeout. Never retried.
    pub async fn probe(&self, url: &str, timeout: Duration) -> Result<Probe, FetchError> {
        let started = Instant::now();
        let resp = self
            .inner
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;
        Ok(Probe {
            status: resp.status().as_u16(),
            elapsed: started.elapsed(),
            final_url: resp.url().to_string(),
        })
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response, FetchError>
    where
        F: Fn() -> RequestBuilder,
    {
        // delays: 2d, 4d, 8d ... for d = request_delay_ms
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.config.request_delay_ms)
            .max_delay(Duration::from_secs(60))
            .take(self.config.max_retries as usize);

        let mut attempt = 0u32;
        let action = || {
            attempt += 1;
            debug!("GET {} (attempt {})", url, attempt);
            let request = build();
            let url = url.to_string();
            async move {
                let resp = request
                    .send()
                    .await
                    .map_err(|source| FetchError::Transport { url: url.clone(), source })?;
                check_status(&url, resp)
            }
        };

        RetryIf::start(strategy, action, |e: &FetchError| {
            let retry = e.is_retryable();
            if retry {
                warn!("{}; backing off", e);
            }
            retry
        })
        .await
    }

    /// Sleep for the configured delay + random jitter.
    async fn polite_delay(&self) {
        let jitter = if self.config.jitter_ms > 0 {
            rand::random_range(0..=self.config.jitter_ms)
        } else {
            0
        };
        let total = self.config.request_delay_ms + jitter;
        if total > 0 {
            sleep(Duration::from_millis(total)).await;
        }
    }
}

fn check_status(url: &str, resp: Response) -> Result<Response, FetchError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let code = status.as_u16();
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
        Err(FetchError::RateLimited {
            status: code,
            url: url.to_string(),
        })
    } else {
        Err(FetchError::Status {
            status: code,
            url: url.to_string(),
        })
    }
}

async fn read_text(url: &str, resp: Response) -> Result<String, FetchError> {
    resp.text().await.map_err(|e| FetchError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

async fn decode_json<T: DeserializeOwned>(url: &str, resp: Response) -> Result<T, FetchError> {
    let body = read_text(url, resp).await?;
    serde_json::from_str(&body).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let limited = FetchError::RateLimited {
            status: 429,
            url: "https://x.test".into(),
        };
        let missing = FetchError::Status {
            status: 404,
            url: "https://x.test".into(),
        };
        assert!(limited.is_retryable());
        assert!(!missing.is_retryable());
        assert_eq!(missing.status(), Some(404));
    }
}
