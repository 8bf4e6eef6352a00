//! Configuration module for Session-Catalog
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so running without a config file uses the built-in
//! GopherCon 2025 identifier set and selectors.
//!
//! # Example
//!
//! ```no_run
//! use session_catalog::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("catalog.toml")).unwrap();
//! println!("Loading {} sessions", config.source.ids.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetcherBackend, FetcherConfig, PoolConfig, QueryConfig, QueryMode, SelectorConfig,
    SnapshotConfig, SourceConfig, DEFAULT_BASE_URL, DEFAULT_SESSION_IDS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
