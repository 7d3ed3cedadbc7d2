use crate::config::types::{Config, CrawlerConfig, FilterConfig, OutputConfig, PatternEntry};
use crate::url::{PatternMap, PatternSet};
use crate::ConfigError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use url::Url;

/// Change frequencies accepted by the sitemap protocol
pub const CHANGE_FREQUENCIES: &[&str] = &[
    "always", "hourly", "daily", "weekly", "monthly", "yearly", "never",
];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_filters(&config.filters)?;
    validate_output_config(&config.output)?;
    validate_changefreq(&config.changefreq)?;
    validate_priority(&config.priority)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_root_url(&config.root_url)?;

    if config.max_tasks < 1 || config.max_tasks > 1000 {
        return Err(ConfigError::Validation(format!(
            "max_tasks must be between 1 and 1000, got {}",
            config.max_tasks
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.probe_timeout < 1 {
        return Err(ConfigError::Validation(
            "probe_timeout must be >= 1 second".to_string(),
        ));
    }

    header_map(&config.headers)?;

    Ok(())
}

/// Converts the configured extra headers into a request header map
///
/// Shared by validation and client construction so both reject the same
/// names and values.
pub(crate) fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::Validation(format!("Invalid header name '{}'", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ConfigError::Validation(format!("Invalid value for header '{}'", name)))?;
        map.insert(header, value);
    }
    Ok(map)
}

/// Validates the crawl root: absolute http(s) URL with a host
fn validate_root_url(root_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(root_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid root_url '{}': {}", root_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "root_url '{}' must use http or https",
            root_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "root_url '{}' has no host",
            root_url
        )));
    }

    Ok(())
}

/// Validates exclusion patterns and image roots
fn validate_filters(filters: &FilterConfig) -> Result<(), ConfigError> {
    PatternSet::compile(&filters.exclude_urls)?;
    PatternSet::compile(&filters.exclude_images)?;

    for root in &filters.image_root_urls {
        Url::parse(root).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid image root URL '{}': {}", root, e))
        })?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if !(-12..=14).contains(&config.timezone_offset) {
        return Err(ConfigError::Validation(format!(
            "timezone_offset must be between -12 and 14 hours, got {}",
            config.timezone_offset
        )));
    }

    Ok(())
}

fn validate_changefreq(entries: &[PatternEntry<String>]) -> Result<(), ConfigError> {
    PatternMap::compile(entries)?;

    for entry in entries {
        if !CHANGE_FREQUENCIES.contains(&entry.value.as_str()) {
            return Err(ConfigError::Validation(format!(
                "changefreq '{}' for pattern '{}' must be one of: {}",
                entry.value,
                entry.pattern,
                CHANGE_FREQUENCIES.join(", ")
            )));
        }
    }

    Ok(())
}

fn validate_priority(entries: &[PatternEntry<f64>]) -> Result<(), ConfigError> {
    PatternMap::compile(entries)?;

    for entry in entries {
        if !(0.0..=1.0).contains(&entry.value) {
            return Err(ConfigError::Validation(format!(
                "priority {} for pattern '{}' must be between 0.0 and 1.0",
                entry.value, entry.pattern
            )));
        }
    }

    Ok(())
}
