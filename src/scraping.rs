//! Page fetching and DOM selection.
//!
//! Storefronts serve different (often blocked) markup to clients that do
//! not look like a desktop browser, so every request starts from a set of
//! scraping defaults and then layers a fixed browser-emulation header set
//! over them.
//!
//! Fetching goes through the `PageFetcher` trait so hosts and tests can
//! swap the transport; `HttpFetcher` is the reqwest-backed default.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, DNT, PRAGMA,
    REFERER, USER_AGENT,
};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Baseline headers for any scraping request.
pub fn request_defaults() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers
}

/// Fixed browser-emulation set sent with every product-page request.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.8,de;q=0.6"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(REFERER, HeaderValue::from_static("http://www.amazon.com"));
    headers
}

/// Layer `overrides` on top of `base`; same-named headers are replaced.
pub fn merge_headers(mut base: HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    for (name, value) in overrides {
        base.insert(name.clone(), value.clone());
    }
    base
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A fully prepared GET request.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub url: Url,
    pub headers: HeaderMap,
}

impl PageRequest {
    /// Scraping defaults overridden by the browser-emulation set.
    pub fn browser_like(url: Url) -> Self {
        Self {
            url,
            headers: merge_headers(request_defaults(), &browser_headers()),
        }
    }
}

/// Whatever the server answered. Non-2xx statuses still carry a body.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over the HTTP transport.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Issue exactly one GET. Errors are transport-level only.
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage>;
}

// ---------------------------------------------------------------------------
// reqwest fetcher
// ---------------------------------------------------------------------------

/// reqwest-backed fetcher. No timeout unless one is configured.
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client for page fetcher")?;
        Ok(Self { http })
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for page fetcher")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchedPage> {
        debug!(url = %request.url, "Fetching product page");

        let resp = self
            .http
            .get(request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", request.url))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", request.url))?;

        debug!(status, bytes = body.len(), "Product page received");
        Ok(FetchedPage { status, body })
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Text content of every node matched by a CSS query, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    texts: Vec<String>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Concatenated descendant text of the first match.
    pub fn first_text(&self) -> Option<&str> {
        self.texts.first().map(String::as_str)
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }
}

/// Run a CSS query against an HTML body.
///
/// Returns `None` when there is nothing to query (blank body) or the
/// selector itself is unusable; `Some` with an empty selection when the
/// document simply has no matching node.
pub fn query(selector: &str, body: &str) -> Option<Selection> {
    if body.trim().is_empty() {
        return None;
    }

    let parsed = match Selector::parse(selector) {
        Ok(s) => s,
        Err(e) => {
            debug!(selector, error = ?e, "Unusable CSS selector");
            return None;
        }
    };

    let document = Html::parse_document(body);
    let texts = document
        .select(&parsed)
        .map(|el| el.text().collect::<String>())
        .collect();

    Some(Selection { texts })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_carry_user_agent() {
        let headers = request_defaults();
        assert!(headers[USER_AGENT].to_str().unwrap().starts_with("Mozilla/5.0"));
    }

    #[test]
    fn test_browser_headers_override_defaults() {
        let merged = merge_headers(request_defaults(), &browser_headers());

        assert_eq!(
            merged[ACCEPT],
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
        );
        assert_eq!(merged[ACCEPT_LANGUAGE], "en-US,en;q=0.8,de;q=0.6");
        assert_eq!(merged[DNT], "1");
        assert_eq!(merged[REFERER], "http://www.amazon.com");
        assert_eq!(merged[PRAGMA], "no-cache");
        assert_eq!(merged[CACHE_CONTROL], "no-cache");
        assert_eq!(merged[CONNECTION], "keep-alive");
        // Defaults without an override survive.
        assert!(merged.contains_key(USER_AGENT));
        assert_eq!(merged.get_all(ACCEPT).iter().count(), 1);
    }

    #[test]
    fn test_browser_like_request() {
        let url = Url::parse("https://www.amazon.de/dp/B0000").unwrap();
        let req = PageRequest::browser_like(url.clone());
        assert_eq!(req.url, url);
        assert_eq!(req.headers.len(), 8);
    }

    #[test]
    fn test_fetched_page_success_range() {
        let ok = FetchedPage { status: 200, body: String::new() };
        let blocked = FetchedPage { status: 503, body: String::new() };
        assert!(ok.is_success());
        assert!(!blocked.is_success());
    }

    #[test]
    fn test_query_single_match() {
        let html = r#"<html><body><span id="priceblock_ourprice">EUR 24,95</span></body></html>"#;
        let sel = query("#priceblock_ourprice", html).unwrap();
        assert_eq!(sel.len(), 1);
        assert_eq!(sel.first_text(), Some("EUR 24,95"));
    }

    #[test]
    fn test_query_nested_text_is_concatenated() {
        let html = r#"<div><span class="p"><sup>$</sup>19<span>.99</span></span></div>"#;
        let sel = query("span.p", html).unwrap();
        assert_eq!(sel.first_text(), Some("$19.99"));
    }

    #[test]
    fn test_query_multiple_matches_in_document_order() {
        let html = r#"<p class="x">first</p><p class="x">second</p>"#;
        let sel = query(".x", html).unwrap();
        assert_eq!(sel.len(), 2);
        assert_eq!(sel.first_text(), Some("first"));
        assert_eq!(sel.texts()[1], "second");
    }

    #[test]
    fn test_query_no_match_is_empty_selection() {
        let sel = query("#priceblock_ourprice", "<html><body><p>captcha</p></body></html>").unwrap();
        assert!(sel.is_empty());
        assert_eq!(sel.first_text(), None);
    }

    #[test]
    fn test_query_blank_body_is_none() {
        assert!(query("#priceblock_ourprice", "").is_none());
        assert!(query("#priceblock_ourprice", "  \n ").is_none());
    }

    #[test]
    fn test_query_bad_selector_is_none() {
        assert!(query("#[", "<p>x</p>").is_none());
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new().is_ok());
        assert!(HttpFetcher::with_timeout(Duration::from_secs(5)).is_ok());
    }
}
