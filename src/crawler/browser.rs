//! Headless browser page fetcher
//!
//! Session pages render their content client-side, so the default fetcher
//! drives a headless Chromium over CDP. Resource scoping:
//! - The browser process and its CDP handler task belong to the *browser
//!   scope* (`CancellationToken`), cancelled once by `shutdown` or on drop.
//! - The logical load session gets a child token (`session_token`); cancelling
//!   it aborts in-flight fetches without tearing the browser down first.
//! - Every fetch opens its own tab and closes it on every exit path.

use crate::config::FetcherConfig;
use crate::crawler::fetcher::PageFetcher;
use crate::CatalogError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct BrowserFetcher {
    browser: Browser,
    handler: Option<JoinHandle<()>>,
    browser_scope: CancellationToken,
    session_scope: CancellationToken,
    ready_selector: String,
    poll_interval: Duration,
}

impl BrowserFetcher {
    /// Launches the browser process and starts its CDP event loop
    pub async fn launch(config: &FetcherConfig) -> Result<Self, CatalogError> {
        tracing::info!("Launching headless browser...");

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-background-networking")
            .arg("--disable-default-apps")
            .arg("--disable-extensions")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .request_timeout(config.request_timeout());
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(CatalogError::Browser)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CatalogError::Browser(e.to_string()))?;

        let browser_scope = CancellationToken::new();
        let session_scope = browser_scope.child_token();

        let scope = browser_scope.clone();
        let handler_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = scope.cancelled() => break,
                    event = handler.next() => match event {
                        Some(Ok(())) => {}
                        Some(Err(e)) => tracing::trace!("CDP handler event error: {}", e),
                        None => break,
                    },
                }
            }
            tracing::debug!("Browser handler stopped");
        });

        tracing::info!("Browser connected.");

        Ok(Self {
            browser,
            handler: Some(handler_task),
            browser_scope,
            session_scope,
            ready_selector: config.ready_selector.clone(),
            poll_interval: config.poll_interval(),
        })
    }

    /// Token for the logical load session; a child of the browser scope
    pub fn session_token(&self) -> CancellationToken {
        self.session_scope.clone()
    }

    /// Cancels the session, closes the browser and stops the handler task
    pub async fn shutdown(mut self) {
        self.session_scope.cancel();

        if let Err(e) = self.browser.close().await {
            tracing::warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Failed to reap browser process: {}", e);
        }

        self.browser_scope.cancel();
        if let Some(handler) = self.handler.take() {
            let _ = handler.await;
        }
        tracing::info!("Browser closed.");
    }

    /// Navigates, waits for the ready marker and captures the outer HTML
    async fn render(&self, page: &Page, url: &str) -> Result<String, CatalogError> {
        page.goto(url).await.map_err(|e| CatalogError::FetchTransport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        // find_element fails immediately when nothing matches, so poll until
        // the marker appears; the caller's deadline bounds the loop.
        let selector = self.ready_selector.as_str();
        wait_for_marker(
            move || async move {
                match page.find_element(selector).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::trace!("Waiting for '{}' on {}: {}", selector, url, e);
                        false
                    }
                }
            },
            self.poll_interval,
        )
        .await;

        page.content().await.map_err(|e| CatalogError::FetchTransport {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl PageFetcher for BrowserFetcher {
    async fn fetch(&self, url: &str, deadline: Duration) -> Result<String, CatalogError> {
        if self.session_scope.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }

        tracing::debug!("Fetching {:?}", url);
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| CatalogError::Browser(e.to_string()))?;

        let outcome = bounded(&self.session_scope, deadline, url, self.render(&page, url)).await;

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close tab for {}: {}", url, e);
        }

        outcome
    }
}

/// Runs `work` under a per-call deadline, giving up early once `scope` is cancelled
async fn bounded<T, W>(
    scope: &CancellationToken,
    deadline: Duration,
    url: &str,
    work: W,
) -> Result<T, CatalogError>
where
    W: Future<Output = Result<T, CatalogError>>,
{
    tokio::select! {
        _ = scope.cancelled() => Err(CatalogError::Cancelled),
        outcome = tokio::time::timeout(deadline, work) => match outcome {
            Ok(result) => result,
            Err(_) => Err(CatalogError::FetchTimeout { url: url.to_string() }),
        },
    }
}

/// Calls `marker_present` every `interval` until it returns true
///
/// Never gives up on its own; callers bound it with `bounded`.
async fn wait_for_marker<P, R>(mut marker_present: P, interval: Duration)
where
    P: FnMut() -> R,
    R: Future<Output = bool>,
{
    while !marker_present().await {
        tokio::time::sleep(interval).await;
    }
}

impl Drop for BrowserFetcher {
    fn drop(&mut self) {
        // Stops the handler task if shutdown was never awaited; the browser
        // child process is killed by chromiumoxide's own drop.
        self.browser_scope.cancel();
    }
}
