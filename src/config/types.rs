use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Session-Catalog
///
/// Every section is optional; an empty file yields the built-in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub fetcher: FetcherConfig,
    pub pool: PoolConfig,
    pub selectors: SelectorConfig,
    pub query: QueryConfig,
    pub snapshot: SnapshotConfig,
}

/// Where session pages live and which sessions to load
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL that session identifiers are joined onto
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Identifier set for one run, in dispatch order
    pub ids: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ids: DEFAULT_SESSION_IDS.iter().map(|id| id.to_string()).collect(),
        }
    }
}

/// Which page fetcher implementation renders session pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherBackend {
    /// Headless Chromium; waits for client-side rendering
    #[default]
    Browser,

    /// Plain HTTP GET; for pages that ship their content server-side
    Http,
}

/// Page fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    pub backend: FetcherBackend,

    /// Per-request deadline (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Element that marks the page's primary content as rendered
    #[serde(rename = "ready-selector")]
    pub ready_selector: String,

    /// How often the browser backend checks for the ready selector (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Run the browser without a window
    pub headless: bool,

    /// User agent for the HTTP backend
    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            backend: FetcherBackend::default(),
            request_timeout_secs: 30,
            ready_selector: ".session-title".to_string(),
            poll_interval_ms: 250,
            headless: true,
            user_agent: None,
        }
    }
}

impl FetcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Worker pool and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of concurrent workers; 0 uses the available parallelism
    pub workers: usize,

    /// Attempts per session before giving up
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Backoff unit (milliseconds); attempt N waits N units before retrying
    #[serde(rename = "backoff-unit-ms")]
    pub backoff_unit_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            max_attempts: 3,
            backoff_unit_ms: 1000,
        }
    }
}

impl PoolConfig {
    /// Resolves the configured worker count, falling back to the hardware parallelism
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

/// CSS selectors used to pull fields out of a session page
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub title: String,
    pub description: String,
    pub date: String,
    pub time: String,
    pub location: String,
    pub duration: String,
    pub speakers: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            title: ".session-title".to_string(),
            description: ".session-description".to_string(),
            date: ".session-date".to_string(),
            time: ".session-dates time".to_string(),
            location: ".session-location".to_string(),
            duration: ".session-duration".to_string(),
            speakers: ".speaker-name".to_string(),
        }
    }
}

/// How queries behave before the catalog is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Wait for the readiness signal
    #[default]
    Block,

    /// Return `StillLoading` immediately
    Incomplete,
}

/// Query configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub mode: QueryMode,
}

/// Offline snapshot configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub path: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: "sessions_backup.json".to_string(),
        }
    }
}

pub const DEFAULT_BASE_URL: &str = "https://www.gophercon.com/agenda/session/";

/// GopherCon 2025 session identifiers
pub const DEFAULT_SESSION_IDS: &[&str] = &[
    "1545653", "1557197", "1590663", "1545640", "1590103", "1594224", "1545643", "1545641",
    "1557237", "1557206", "1545646", "1557199", "1557216", "1545650", "1545651", "1565804",
    "1557235", "1545655", "1545656", "1545657", "1545658", "1545682", "1572365", "1545661",
    "1545662", "1545663", "1545664", "1557386", "1557394", "1545667", "1557388", "1557392",
    "1557390", "1557391", "1545671", "1557387", "1557389", "1557348", "1647415", "1557393",
    "1557391", "1545679", "1545681", "1557342", "1572366", "1557343", "1545685", "1545686",
    "1545687", "1557395", "1557396", "1557397", "1557345", "1557398", "1557399", "1557400",
    "1557347", "1557344", "1557402", "1557403", "1545674", "1557401", "1557404", "1557405",
    "1557195",
];
