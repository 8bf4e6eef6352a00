//! Page fetching
//!
//! This module defines the `PageFetcher` seam that the retry and worker-pool
//! logic is written against, plus the plain-HTTP implementation:
//! - Building HTTP clients with proper user agent strings
//! - GET requests bounded by a per-call deadline
//! - Error classification into timeout / transport failures
//! - Checking that the primary-content marker is present in the markup
//!
//! The headless-browser implementation lives in `browser.rs`.

use crate::config::FetcherConfig;
use crate::CatalogError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

/// Renders one URL and returns its document markup
///
/// Implementations must give up once `deadline` elapses instead of hanging,
/// and must release whatever per-call resources they acquire on every path.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, deadline: Duration) -> Result<String, CatalogError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration (user agent)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let user_agent = config.user_agent.clone().unwrap_or_else(|| {
        format!(
            "{}/{}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )
    });

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches session pages with plain GET requests
///
/// Suitable when the session markup is rendered server-side. The ready
/// selector must already be present in the response body; a page without it
/// fails with `MarkerMissing` since nothing will render it later.
pub struct HttpFetcher {
    client: Client,
    ready_selector: Selector,
    ready_selector_text: String,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, CatalogError> {
        let client = build_http_client(config)?;
        Self::with_client(client, &config.ready_selector)
    }

    pub fn with_client(client: Client, ready_selector: &str) -> Result<Self, CatalogError> {
        let selector = Selector::parse(ready_selector).map_err(|e| {
            crate::ConfigError::InvalidSelector(format!("'{}': {:?}", ready_selector, e))
        })?;

        Ok(Self {
            client,
            ready_selector: selector,
            ready_selector_text: ready_selector.to_string(),
        })
    }

    fn has_marker(&self, body: &str) -> bool {
        Html::parse_document(body)
            .select(&self.ready_selector)
            .next()
            .is_some()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, deadline: Duration) -> Result<String, CatalogError> {
        tracing::debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::FetchTransport {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        if !self.has_marker(&body) {
            return Err(CatalogError::MarkerMissing {
                url: url.to_string(),
                selector: self.ready_selector_text.clone(),
            });
        }

        Ok(body)
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> CatalogError {
    if error.is_timeout() {
        CatalogError::FetchTimeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        CatalogError::FetchTransport {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        CatalogError::FetchTransport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
