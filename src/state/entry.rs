//! Per-URL crawl records

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Attribute names recognized on `<img>` tags
pub const IMAGE_FIELDS: &[&str] = &["src", "title", "caption", "geo_location", "license"];

/// The recorded outcome for one crawled URL
///
/// Created once when the URL's worker finishes and never modified after.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlEntry {
    /// The fetch succeeded (any status, any content type)
    pub ok: bool,

    /// Parsed `Last-Modified` header of an HTML page
    pub last_modified: Option<DateTime<Utc>>,

    pub change_freq: Option<String>,

    pub priority: Option<f64>,

    /// Accepted images referenced by the page, in order of appearance
    pub images: Vec<ImageRef>,
}

impl CrawlEntry {
    /// Entry for a URL whose fetch failed at the transport level
    pub fn failed() -> Self {
        Self::default()
    }

    /// Entry for a reachable URL that carries no metadata
    pub fn reachable() -> Self {
        Self {
            ok: true,
            ..Self::default()
        }
    }

    /// Returns true if any metadata was resolved for this URL
    pub fn has_metadata(&self) -> bool {
        self.last_modified.is_some()
            || self.change_freq.is_some()
            || self.priority.is_some()
            || !self.images.is_empty()
    }
}

/// An image accepted for a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Absolute image URL
    pub src: String,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub geo_location: Option<String>,
    pub license: Option<String>,
}

impl ImageRef {
    /// Builds an image reference from the resolved source and the
    /// recognized attributes of its tag
    pub fn from_tag(src: String, attributes: &HashMap<String, String>) -> Self {
        let field = |name: &str| attributes.get(name).cloned();
        Self {
            src,
            title: field("title"),
            caption: field("caption"),
            geo_location: field("geo_location"),
            license: field("license"),
        }
    }
}

/// Parses an HTTP date header value (`Wed, 21 Oct 2015 07:28:00 GMT`)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc2822(value.trim()) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!("Ignoring unparseable date '{}': {}", value, e);
            None
        }
    }
}
