//! Sitemap writer trait and types
//!
//! This module defines the trait interface every sitemap writer implements
//! and the errors writers report.

use crate::state::CrawlEntry;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for sitemap writers
///
/// A writer is invoked exactly once per crawl with the full, quiesced set
/// of entries in URL order. Implementations flush to stable storage when
/// the document starts, after every record, and when the document ends.
pub trait SitemapWriter: Send {
    /// Writes the whole document
    ///
    /// # Arguments
    ///
    /// * `entries` - `(url, entry)` pairs, URLs non-empty
    /// * `timezone_offset` - Hours east of UTC used to render timestamps
    fn write(&self, entries: &[(&str, &CrawlEntry)], timezone_offset: i32) -> OutputResult<()>;
}
