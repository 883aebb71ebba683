pub mod cleaner;
pub mod dom;
pub mod http_client;
pub mod indiamart;
pub mod instagram;
pub mod justdial;
pub mod outscraper;
pub mod producthunt;
pub mod reddit;
pub mod shopify;
pub mod topstartups;
pub mod tradeindia;
pub mod yc;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use self::http_client::HttpClient;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Anything that can hand back the HTML of a URL. The HTTP client is the
/// production implementation; tests serve canned pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch(&self, url: &str) -> Result<String> {
        Ok(self.get_text(url).await?)
    }
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for &T {
    async fn fetch(&self, url: &str) -> Result<String> {
        (**self).fetch(url).await
    }
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<String> {
        (**self).fetch(url).await
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CannedPages;
    use super::*;
    use tokio_test::{assert_err, assert_ok, block_on};

    async fn fetch_via(source: impl PageSource, url: &str) -> Result<String> {
        source.fetch(url).await
    }

    #[test]
    fn test_shared_sources_delegate() {
        let pages = Arc::new(CannedPages::default().with("https://a.test/", "<title>A</title>"));

        let html = assert_ok!(block_on(fetch_via(Arc::clone(&pages), "https://a.test/")));
        assert_eq!(html, "<title>A</title>");
        assert_err!(block_on(fetch_via(&*pages, "https://b.test/")));
        assert_eq!(pages.requested.lock().unwrap().len(), 2);
    }
}
