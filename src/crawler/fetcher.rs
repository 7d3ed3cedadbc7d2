//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client (timeouts, extra headers, TLS toggle)
//! - GET requests for pages, classified into HTML / non-HTML / failure
//! - Content-type probes for candidate resources such as images
//!
//! Transport failures are never propagated; they become a `FetchResult`
//! that the coordinator records as a negative outcome for that URL.

use crate::config::{header_map, CrawlerConfig};
use crate::state::parse_http_date;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LAST_MODIFIED, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Result of a page fetch
#[derive(Debug)]
pub enum FetchResult {
    /// 200 response with an HTML content type
    Html {
        /// Body decoded as UTF-8 (invalid sequences replaced)
        body: String,
        /// Parsed Last-Modified header, if present and valid
        last_modified: Option<DateTime<Utc>>,
    },

    /// Reachable, but not a 200 HTML page
    NotHtml {
        /// The HTTP status code
        status_code: u16,
        /// The Content-Type header value (empty if missing)
        content_type: String,
    },

    /// Network error (connection refused, DNS failure, timeout, broken body)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds the HTTP client shared by every worker
///
/// # Example
///
/// ```no_run
/// use sitemapper::config::parse_config;
/// use sitemapper::crawler::build_http_client;
///
/// let config = parse_config(r#"
/// [crawler]
/// root-url = "https://example.com/"
/// verify-ssl = false
///
/// [output]
/// path = "sitemap.xml"
/// "#).unwrap();
///
/// let client = build_http_client(&config.crawler).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> crate::Result<Client> {
    let headers = header_map(&config.headers)?;

    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout))
        .connect_timeout(Duration::from_secs(10))
        .danger_accept_invalid_certs(!config.verify_ssl)
        .gzip(true)
        .brotli(true);

    if !headers.contains_key(USER_AGENT) {
        builder = builder.user_agent(concat!("sitemapper/", env!("CARGO_PKG_VERSION")));
    }

    Ok(builder.default_headers(headers).build()?)
}

/// Fetches a page and classifies the response
///
/// | Response | Result |
/// |----------|--------|
/// | 200 + `text/html` content type | `Html` with decoded body |
/// | Any other status or content type | `NotHtml` |
/// | Connection/DNS/TLS failure, timeout, body read failure | `NetworkError` |
pub async fn fetch_page(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchResult::NetworkError {
                error: describe_error(&e),
            }
        }
    };

    let status = response.status();
    let content_type = header_str(response.headers(), CONTENT_TYPE.as_str()).to_string();

    if status != StatusCode::OK || !content_type.contains("text/html") {
        return FetchResult::NotHtml {
            status_code: status.as_u16(),
            content_type,
        };
    }

    let last_modified = response
        .headers()
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date);

    match response.bytes().await {
        Ok(bytes) => FetchResult::Html {
            body: String::from_utf8_lossy(&bytes).into_owned(),
            last_modified,
        },
        Err(e) => FetchResult::NetworkError {
            error: describe_error(&e),
        },
    }
}

/// Checks that a URL serves the expected content type
///
/// Returns true only for a 200 response whose Content-Type matches
/// `expected`. Any transport failure counts as a mismatch. The body is
/// never read.
pub async fn probe_content_type(client: &Client, url: &str, expected: &Regex) -> bool {
    match client.get(url).send().await {
        Ok(response) => {
            let content_type = header_str(response.headers(), CONTENT_TYPE.as_str());
            let accepted = response.status() == StatusCode::OK && expected.is_match(content_type);
            tracing::debug!(
                "Probe {} -> {} '{}' (accepted: {})",
                url,
                response.status().as_u16(),
                content_type,
                accepted
            );
            accepted
        }
        Err(e) => {
            tracing::debug!("Probe {} failed: {}", url, describe_error(&e));
            false
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else {
        e.to_string()
    }
}
