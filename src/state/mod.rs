//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlState`: Which frontier set a URL is in (queued, in-flight, done)
//! - `CrawlEntry`: The recorded outcome of one URL
//! - `ImageRef`: An image accepted for a page

mod entry;
mod url_state;

// Re-export main types
pub use entry::{parse_http_date, CrawlEntry, ImageRef, IMAGE_FIELDS};
pub use url_state::UrlState;
