use crate::config::types::{Config, FetcherConfig, PoolConfig, SelectorConfig, SourceConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_pool_config(&config.pool)?;
    validate_selector_config(&config.selectors)?;

    if config.snapshot.path.is_empty() {
        return Err(ConfigError::Validation(
            "snapshot path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the base URL and identifier set
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' cannot carry a path",
            config.base_url
        )));
    }

    if config.ids.is_empty() {
        return Err(ConfigError::Validation(
            "ids must contain at least one session identifier".to_string(),
        ));
    }

    if let Some(pos) = config.ids.iter().position(|id| id.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "session identifier at position {} is empty",
            pos
        )));
    }

    if let Some(id) = config.ids.iter().find(|id| *id == "." || *id == "..") {
        return Err(ConfigError::Validation(format!(
            "session identifier '{}' is not a usable path segment",
            id
        )));
    }

    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll-interval-ms must be >= 1".to_string(),
        ));
    }

    validate_selector("ready-selector", &config.ready_selector)
}

fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be <= 256, got {}",
            config.workers
        )));
    }

    Ok(())
}

fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    validate_selector("title", &config.title)?;
    validate_selector("description", &config.description)?;
    validate_selector("date", &config.date)?;
    validate_selector("time", &config.time)?;
    validate_selector("location", &config.location)?;
    validate_selector("duration", &config.duration)?;
    validate_selector("speakers", &config.speakers)?;
    Ok(())
}

/// Validates that a CSS selector is non-empty and parseable
pub(crate) fn validate_selector(name: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(format!(
            "{} selector cannot be empty",
            name
        )));
    }

    Selector::parse(selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("{} selector '{}': {:?}", name, selector, e))
    })?;

    Ok(())
}
