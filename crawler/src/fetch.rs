use reqwest::blocking::Client;
use reqwest::{header, redirect};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::error::CrawlError;

pub const MAX_REDIRECTS: usize = 3;
const USER_AGENT: &str = "wordindex-crawler/0.1";

/// Downloads a page. `None` covers every reason a page is not indexed: not
/// reachable, not 2xx, not HTML, too many redirects.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &Url) -> Option<String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, CrawlError> {
        Self::with_redirects(MAX_REDIRECTS)
    }

    pub fn with_redirects(max_redirects: usize) -> Result<Self, CrawlError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::limited(max_redirects))
            .timeout(Duration::from_secs(12))
            .build()
            .map_err(CrawlError::Client)?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Option<String> {
        let resp = match self.client.get(url.clone()).send() {
            Ok(resp) => resp,
            Err(err) => {
                tracing::debug!(%url, error = %err, "fetch failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::debug!(%url, status = %resp.status(), "non-success status");
            return None;
        }
        let content_type = resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
        if !content_type.is_some_and(is_html) {
            tracing::debug!(%url, "not html");
            return None;
        }
        resp.text()
            .map_err(|err| tracing::debug!(%url, error = %err, "unreadable body"))
            .ok()
    }
}

/// Media type of a `Content-Type` value is `text/html`, compared without case.
pub fn is_html(content_type: &str) -> bool {
    let media_type = content_type.split(';').next().unwrap_or_default();
    media_type.trim().eq_ignore_ascii_case("text/html")
}

/// Serves pages from memory, keyed by url string.
#[derive(Debug, Default, Clone)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self { Self::default() }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, url: &Url) -> Option<String> {
        self.pages.get(url.as_str()).cloned()
    }
}
