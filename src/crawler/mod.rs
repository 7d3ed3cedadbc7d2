//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and content-type probes
//! - Best-effort link and tag extraction
//! - The shared frontier with its queued / in-flight / done sets
//! - Overall crawl coordination

mod classifier;
mod coordinator;
mod extract;
mod fetcher;
mod frontier;

pub use classifier::ResourceClassifier;
pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use extract::{build_extractor, DomExtractor, LexicalExtractor, MarkupExtractor, TagRecord};
pub use fetcher::{build_http_client, fetch_page, probe_content_type, FetchResult};
pub use frontier::{Frontier, FrontierCounts, ImageClaim, ProbeTicket, WorkTicket};

use crate::config::Config;
use crate::SitemapError;

/// Runs a complete crawl operation
///
/// This is the main entry point for generating a sitemap. It will:
/// 1. Compile the crawl rules and build the HTTP client
/// 2. Seed the frontier with the root URL
/// 3. Fetch pages and follow in-site links until the frontier is quiescent
/// 4. Write the sitemap once
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl finished and the sitemap was written
/// * `Err(SitemapError)` - Setup or writing the output failed
pub async fn crawl(config: Config) -> Result<CrawlReport, SitemapError> {
    run_crawl(config).await
}
