//! Load coordinator - worker pool orchestration
//!
//! Fans the identifier set out to a fixed pool of workers and merges their
//! results into the catalog:
//! - Every identifier is queued up front on a channel sized to the whole set
//! - Workers pull identifiers, run the retrying fetch job, and push outcomes
//!   onto a results channel of the same size
//! - A watcher task joins all workers and then drops the last results
//!   sender, which ends the merge loop
//! - The merge loop writes each success into the store as it arrives and
//!   logs failures; once drained, the catalog is marked ready exactly once

use crate::catalog::{Catalog, Session};
use crate::config::{Config, FetcherBackend};
use crate::crawler::browser::BrowserFetcher;
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::job::{FetchJob, RetryPolicy};
use crate::crawler::parser::SessionExtractor;
use crate::output::LoadStatistics;
use crate::CatalogError;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Result of one fetch job, consumed once by the merge loop
#[derive(Debug)]
pub struct FetchOutcome {
    pub id: String,
    pub result: Result<Session, CatalogError>,
}

/// Main load coordinator structure
pub struct Coordinator<F: ?Sized> {
    job: FetchJob<F>,
    catalog: Arc<Catalog>,
    workers: usize,
    cancel: CancellationToken,
}

impl<F> Coordinator<F>
where
    F: PageFetcher + ?Sized + 'static,
{
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `job` - The retrying fetch job each worker runs
    /// * `catalog` - The catalog results are merged into
    /// * `workers` - Pool size; clamped to at least 1
    pub fn new(job: FetchJob<F>, catalog: Arc<Catalog>, workers: usize) -> Self {
        Self {
            job,
            catalog,
            workers: workers.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Workers stop picking up new identifiers once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Runs the load to completion
    ///
    /// Never fails as a whole: identifiers that cannot be loaded are recorded
    /// in the returned statistics and left out of the catalog. The catalog is
    /// marked ready before this returns.
    pub async fn run(&self, ids: &[String]) -> LoadStatistics {
        let mut stats = LoadStatistics::begin(ids.len());
        let unique = dedupe_ids(ids);
        stats.unique = unique.len();

        let worker_count = self.workers.min(unique.len()).max(1);
        tracing::info!(
            "Loading {} sessions using {} workers",
            unique.len(),
            worker_count
        );

        let capacity = unique.len().max(1);
        let (work_tx, work_rx) = mpsc::channel::<String>(capacity);
        let (result_tx, mut result_rx) = mpsc::channel::<FetchOutcome>(capacity);

        // Fully buffered: queueing the whole set never waits on a worker.
        for id in unique {
            if let Err(e) = work_tx.try_send(id) {
                tracing::error!("Failed to queue session: {}", e);
            }
        }
        drop(work_tx);

        let work_rx = Arc::new(Mutex::new(work_rx));
        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            workers.spawn(worker(
                worker_id,
                self.job.clone(),
                Arc::clone(&work_rx),
                result_tx.clone(),
                self.cancel.clone(),
            ));
        }

        let watcher = tokio::spawn(async move {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    tracing::error!("Worker task failed: {}", e);
                }
            }
            drop(result_tx);
        });

        while let Some(outcome) = result_rx.recv().await {
            self.merge(outcome, &mut stats);
        }
        if let Err(e) = watcher.await {
            tracing::error!("Worker watcher failed: {}", e);
        }

        stats.finish();
        tracing::info!(
            "Total sessions loaded: {} ({} failed)",
            self.catalog.len(),
            stats.failed.len()
        );
        self.catalog.mark_ready();

        stats
    }

    fn merge(&self, outcome: FetchOutcome, stats: &mut LoadStatistics) {
        match outcome.result {
            Ok(session) => {
                tracing::info!(
                    "Successfully loaded session {}: {}",
                    outcome.id,
                    session.title
                );
                self.catalog.store().put(outcome.id, session);
                stats.record_success();
            }
            Err(e) => {
                tracing::warn!("Error loading session {}: {}", outcome.id, e);
                stats.record_failure(outcome.id, e.to_string());
            }
        }
    }
}

async fn worker<F>(
    worker_id: usize,
    job: FetchJob<F>,
    queue: Arc<Mutex<mpsc::Receiver<String>>>,
    results: mpsc::Sender<FetchOutcome>,
    cancel: CancellationToken,
) where
    F: PageFetcher + ?Sized,
{
    loop {
        let next = queue.lock().await.recv().await;
        let Some(id) = next else {
            break;
        };

        let result = if cancel.is_cancelled() {
            Err(CatalogError::Cancelled)
        } else {
            // A panicking job must still report its identifier.
            match AssertUnwindSafe(job.run(&id)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Err(CatalogError::JobPanicked {
                    id: id.clone(),
                    message: panic_message(panic.as_ref()),
                }),
            }
        };

        if results.send(FetchOutcome { id, result }).await.is_err() {
            break;
        }
    }
    tracing::debug!("Worker {} finished", worker_id);
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Drops repeated identifiers, keeping the first occurrence's position
pub fn dedupe_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Loads the catalog from the live site using the configured fetcher backend
///
/// Returns an error only for setup problems (bad selectors, base URL or HTTP
/// client). A browser that fails to launch loses every session but still
/// marks the catalog ready, like any other partial failure.
pub async fn load_live(
    config: &Config,
    catalog: Arc<Catalog>,
    shutdown: CancellationToken,
) -> Result<LoadStatistics, CatalogError> {
    let extractor = Arc::new(SessionExtractor::new(&config.selectors)?);
    let base_url = Url::parse(&config.source.base_url)?;
    let policy = RetryPolicy::from_config(&config.pool);
    let deadline = config.fetcher.request_timeout();
    let workers = config.pool.worker_count();
    let ids = &config.source.ids;

    match config.fetcher.backend {
        FetcherBackend::Http => {
            let fetcher = Arc::new(HttpFetcher::new(&config.fetcher)?);
            let job = FetchJob::new(fetcher, extractor, base_url, policy, deadline);
            let coordinator = Coordinator::new(job, catalog, workers).with_cancellation(shutdown);
            Ok(coordinator.run(ids).await)
        }
        FetcherBackend::Browser => {
            let fetcher = match BrowserFetcher::launch(&config.fetcher).await {
                Ok(fetcher) => Arc::new(fetcher),
                Err(e) => {
                    tracing::error!("Browser unavailable, no sessions can be fetched: {}", e);
                    return Ok(abandon(ids, &e.to_string(), &catalog));
                }
            };

            let session = fetcher.session_token();
            let forward = tokio::spawn({
                let session = session.clone();
                async move {
                    tokio::select! {
                        _ = shutdown.cancelled() => session.cancel(),
                        _ = session.cancelled() => {}
                    }
                }
            });

            let stats = {
                let job = FetchJob::new(Arc::clone(&fetcher), extractor, base_url, policy, deadline);
                Coordinator::new(job, catalog, workers)
                    .with_cancellation(session)
                    .run(ids)
                    .await
            };

            match Arc::try_unwrap(fetcher) {
                Ok(fetcher) => fetcher.shutdown().await,
                Err(_) => tracing::warn!("Browser still referenced after load; leaving it to drop"),
            }
            forward.abort();

            Ok(stats)
        }
    }
}

/// Records every identifier as failed and marks the catalog ready
fn abandon(ids: &[String], reason: &str, catalog: &Catalog) -> LoadStatistics {
    let mut stats = LoadStatistics::begin(ids.len());
    let unique = dedupe_ids(ids);
    stats.unique = unique.len();
    for id in unique {
        stats.record_failure(id, reason);
    }
    stats.finish();
    catalog.mark_ready();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QueryMode, SelectorConfig};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves a session page for every URL except those ending in a failing id
    struct StubFetcher {
        failing: HashSet<String>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn new(failing: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str, _deadline: Duration) -> Result<String, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let id = url.rsplit('/').next().unwrap_or_default();
            if self.failing.contains(id) {
                return Err(CatalogError::FetchTransport {
                    url: url.to_string(),
                    message: "connection reset".to_string(),
                });
            }
            tokio::task::yield_now().await;
            Ok(format!(
                r#"<html><body><h1 class="session-title">Talk {}</h1></body></html>"#,
                id
            ))
        }
    }

    /// Panics while fetching the page of `id`
    struct PanickingFetcher {
        id: &'static str,
    }

    #[async_trait]
    impl PageFetcher for PanickingFetcher {
        async fn fetch(&self, url: &str, _deadline: Duration) -> Result<String, CatalogError> {
            if url.ends_with(self.id) {
                panic!("renderer crashed on {}", url);
            }
            Ok(r#"<h1 class="session-title">Fine</h1>"#.to_string())
        }
    }

    fn coordinator(fetcher: Arc<StubFetcher>, catalog: Arc<Catalog>) -> Coordinator<StubFetcher> {
        let job = FetchJob::new(
            fetcher,
            Arc::new(SessionExtractor::new(&SelectorConfig::default()).unwrap()),
            Url::parse("https://example.com/session/").unwrap(),
            RetryPolicy {
                max_attempts: 3,
                backoff_unit: Duration::from_millis(1),
            },
            Duration::from_secs(5),
        );
        Coordinator::new(job, catalog, 4)
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let deduped = dedupe_ids(&ids(&["3", "1", "3", "2", "1"]));
        assert_eq!(deduped, ids(&["3", "1", "2"]));
    }

    #[tokio::test]
    async fn test_all_succeed() {
        let catalog = Arc::new(Catalog::new(QueryMode::Block));
        let fetcher = Arc::new(StubFetcher::new(&[]));
        let input = ids(&["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]);

        let stats = coordinator(Arc::clone(&fetcher), Arc::clone(&catalog))
            .run(&input)
            .await;

        assert!(catalog.is_ready());
        assert_eq!(stats.loaded, 10);
        assert!(stats.failed.is_empty());
        assert_eq!(catalog.len(), 10);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 10);
        assert_eq!(catalog.get_by_id("7").await.unwrap().title, "Talk 7");
    }

    #[tokio::test]
    async fn test_partial_failure_excludes_failed_ids() {
        let catalog = Arc::new(Catalog::new(QueryMode::Block));
        let fetcher = Arc::new(StubFetcher::new(&["2", "4"]));

        let stats = coordinator(Arc::clone(&fetcher), Arc::clone(&catalog))
            .run(&ids(&["1", "2", "3", "4", "5"]))
            .await;

        assert_eq!(stats.loaded, 3);
        assert_eq!(stats.failed.len(), 2);
        assert_eq!(catalog.len(), 3);
        // Each failing id used its full attempt budget
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3 + 2 * 3);
        assert!(matches!(
            catalog.get_by_id("2").await,
            Err(CatalogError::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_every_id_failing_still_signals_ready() {
        let catalog = Arc::new(Catalog::new(QueryMode::Incomplete));
        let fetcher = Arc::new(StubFetcher::new(&["1", "2"]));

        let stats = coordinator(fetcher, Arc::clone(&catalog))
            .run(&ids(&["1", "2"]))
            .await;

        assert_eq!(stats.loaded, 0);
        assert!(catalog.is_ready());
        assert!(!catalog.mark_ready());
        assert!(catalog.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_ids_fetched_once() {
        let catalog = Arc::new(Catalog::new(QueryMode::Block));
        let fetcher = Arc::new(StubFetcher::new(&[]));

        let stats = coordinator(Arc::clone(&fetcher), Arc::clone(&catalog))
            .run(&ids(&["1", "2", "1"]))
            .await;

        assert_eq!(stats.requested, 3);
        assert_eq!(stats.unique, 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_id_set() {
        let catalog = Arc::new(Catalog::new(QueryMode::Block));
        let stats = coordinator(Arc::new(StubFetcher::new(&[])), Arc::clone(&catalog))
            .run(&[])
            .await;

        assert_eq!(stats.unique, 0);
        assert!(catalog.is_ready());
    }

    #[tokio::test]
    async fn test_cancelled_run_skips_fetches() {
        let catalog = Arc::new(Catalog::new(QueryMode::Block));
        let fetcher = Arc::new(StubFetcher::new(&[]));
        let token = CancellationToken::new();
        token.cancel();

        let stats = coordinator(Arc::clone(&fetcher), Arc::clone(&catalog))
            .with_cancellation(token)
            .run(&ids(&["1", "2", "3"]))
            .await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(stats.failed.len(), 3);
        assert!(catalog.is_ready());
    }

    #[tokio::test]
    async fn test_panicking_job_is_counted_as_failed() {
        let catalog = Arc::new(Catalog::new(QueryMode::Block));
        let job = FetchJob::new(
            Arc::new(PanickingFetcher { id: "2" }),
            Arc::new(SessionExtractor::new(&SelectorConfig::default()).unwrap()),
            Url::parse("https://example.com/session/").unwrap(),
            RetryPolicy::default(),
            Duration::from_secs(5),
        );

        let stats = Coordinator::new(job, Arc::clone(&catalog), 1)
            .run(&ids(&["1", "2", "3"]))
            .await;

        assert_eq!(stats.loaded, 2);
        assert_eq!(stats.failed.len(), 1);
        assert_eq!(stats.failed[0].id, "2");
        assert!(stats.failed[0].reason.contains("renderer crashed"));
        assert_eq!(stats.loaded + stats.failed.len(), stats.unique);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.is_ready());
    }

    #[test]
    fn test_panic_message() {
        let panic: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(panic.as_ref()), "boom");
        let panic: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(panic.as_ref()), "bang");
        let panic: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(panic.as_ref()), "unknown panic");
    }

    #[test]
    fn test_abandon_marks_ready() {
        let catalog = Catalog::new(QueryMode::Block);
        let stats = abandon(&ids(&["a", "b", "a"]), "no browser", &catalog);
        assert_eq!(stats.unique, 2);
        assert_eq!(stats.failed.len(), 2);
        assert!(catalog.is_ready());
    }
}
