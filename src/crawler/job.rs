//! Retry-wrapped fetch of a single session
//!
//! One job = fetch the detail page, extract the session. A failed attempt is
//! retried after a linear backoff (attempt N waits N units) until the attempt
//! budget runs out; the terminal error names the session and URL.

use crate::catalog::Session;
use crate::config::PoolConfig;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::SessionExtractor;
use crate::CatalogError;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Attempt budget and backoff unit for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &PoolConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_unit: config.backoff_unit(),
        }
    }

    /// Delay before the attempt that follows `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }
}

/// Builds the detail page URL for a session identifier
///
/// The identifier is appended to the base path as a single, percent-encoded
/// segment, so `/`, `..` or `//host` inside it can never escape the base.
/// A trailing slash on the base is optional.
pub fn session_url(base: &Url, id: &str) -> Result<Url, CatalogError> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(CatalogError::InvalidSessionId {
            id: id.to_string(),
            reason: "not a usable path segment".to_string(),
        });
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| CatalogError::InvalidSessionId {
            id: id.to_string(),
            reason: format!("base URL '{}' cannot carry a path", base),
        })?
        .pop_if_empty()
        .push(id);
    Ok(url)
}

/// Everything a worker needs to turn an identifier into a session
pub struct FetchJob<F: ?Sized> {
    fetcher: Arc<F>,
    extractor: Arc<SessionExtractor>,
    base_url: Url,
    policy: RetryPolicy,
    deadline: Duration,
}

impl<F: ?Sized> Clone for FetchJob<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            base_url: self.base_url.clone(),
            policy: self.policy,
            deadline: self.deadline,
        }
    }
}

impl<F> FetchJob<F>
where
    F: PageFetcher + ?Sized,
{
    pub fn new(
        fetcher: Arc<F>,
        extractor: Arc<SessionExtractor>,
        base_url: Url,
        policy: RetryPolicy,
        deadline: Duration,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            base_url,
            policy,
            deadline,
        }
    }

    /// Fetches and extracts one session, retrying failed attempts
    ///
    /// # Returns
    ///
    /// * `Ok(Session)` - The first successful attempt's record
    /// * `Err(CatalogError::JobFailed)` - Every attempt failed; wraps the last error
    /// * `Err(_)` - A non-transient error such as cancellation, returned as-is
    pub async fn run(&self, id: &str) -> Result<Session, CatalogError> {
        let url = session_url(&self.base_url, id)?;
        let url = url.as_str();

        let mut attempt = 1;
        loop {
            let error = match self.attempt(id, url).await {
                Ok(session) => return Ok(session),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.policy.max_attempts {
                return Err(CatalogError::JobFailed {
                    id: id.to_string(),
                    url: url.to_string(),
                    attempts: attempt,
                    source: Box::new(error),
                });
            }

            let delay = self.policy.delay_after(attempt);
            tracing::warn!(
                session = id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying session: {}",
                error
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, id: &str, url: &str) -> Result<Session, CatalogError> {
        let html = self.fetcher.fetch(url, self.deadline).await?;
        self.extractor.extract(id, url, &html)
    }
}
