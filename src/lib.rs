//! Session-Catalog: an in-memory catalog of conference sessions
//!
//! This crate fetches a fixed set of session detail pages concurrently,
//! extracts structured records from the rendered markup, and serves
//! read-only queries against the resulting catalog while (or after) it loads.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Session-Catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request timeout for {url}")]
    FetchTimeout { url: String },

    #[error("Transport error for {url}: {message}")]
    FetchTransport { url: String, message: String },

    #[error("Content marker '{selector}' not found on {url}")]
    MarkerMissing { url: String, selector: String },

    #[error("HTML parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Session {id} not found")]
    RecordNotFound { id: String },

    #[error("Catalog is still loading ({loaded} sessions so far)")]
    StillLoading { loaded: usize },

    #[error("Failed to load session {id} from {url} after {attempts} attempts: {source}")]
    JobFailed {
        id: String,
        url: String,
        attempts: u32,
        #[source]
        source: Box<CatalogError>,
    },

    #[error("Session identifier '{id}' cannot form a page URL: {reason}")]
    InvalidSessionId { id: String, reason: String },

    #[error("Fetch job for session {id} panicked: {message}")]
    JobPanicked { id: String, message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] storage::SnapshotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Returns true for per-fetch failures that are worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CatalogError::FetchTimeout { .. }
                | CatalogError::FetchTransport { .. }
                | CatalogError::MarkerMissing { .. }
                | CatalogError::Parse { .. }
                | CatalogError::Browser(_)
                | CatalogError::Http(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Session-Catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogStore, QueryMode, ReadySignal, Session};
pub use config::Config;
pub use crawler::{Coordinator, PageFetcher};
