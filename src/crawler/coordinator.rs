//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker body and the crawl entry points:
//! - Building the shared crawl context (client, gates, compiled patterns)
//! - Filtering and enqueueing discovered links
//! - Fetching, extracting and classifying each page
//! - Waiting for quiescence and handing the result to the output writer

use crate::config::{Config, OutputConfig};
use crate::crawler::classifier::ResourceClassifier;
use crate::crawler::extract::{build_extractor, MarkupExtractor, TagRecord};
use crate::crawler::fetcher::{build_http_client, fetch_page, FetchResult};
use crate::crawler::frontier::{Frontier, WorkTicket};
use crate::output::build_writer;
use crate::state::{CrawlEntry, ImageRef, IMAGE_FIELDS};
use crate::url::{
    canonical_root, resolve_image_src, same_site_candidate, ImageScope, PatternMap, PatternSet,
};
use crate::{ConfigError, SitemapError};
use reqwest::Client;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use url::Url;

/// Diagnostic counts for a finished crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// URLs left in the queued set (zero after a normal crawl)
    pub queued: usize,
    /// URLs left in flight (zero after a normal crawl)
    pub in_flight: usize,
    /// Recorded URLs
    pub done: usize,
    /// Recorded URLs whose fetch succeeded
    pub ok: usize,
    /// Accepted images over all pages
    pub images: usize,
}

impl CrawlReport {
    fn new(frontier: &Frontier, entries: &BTreeMap<String, CrawlEntry>) -> Self {
        let counts = frontier.counts();
        Self {
            queued: counts.queued,
            in_flight: counts.in_flight,
            done: entries.len(),
            ok: entries.values().filter(|e| e.ok).count(),
            images: entries.values().map(|e| e.images.len()).sum(),
        }
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "done: {}, ok: {}, images: {}, queued: {}, in flight: {}",
            self.done, self.ok, self.images, self.queued, self.in_flight
        )
    }
}

/// Compiled, read-only crawl rules
struct CrawlSettings {
    root: Url,
    exclude_urls: PatternSet,
    exclude_images: PatternSet,
    image_scope: ImageScope,
    find_images: bool,
    use_last_modified: bool,
    changefreq: PatternMap<String>,
    priority: PatternMap<f64>,
}

impl CrawlSettings {
    fn from_config(config: &Config) -> Result<Self, SitemapError> {
        let root = canonical_root(&config.crawler.root_url)?;

        let image_roots = config
            .filters
            .image_root_urls
            .iter()
            .map(|u| Url::parse(u).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", u, e))))
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_urls = PatternSet::compile(&config.filters.exclude_urls)?;
        let exclude_images = PatternSet::compile(&config.filters.exclude_images)?;
        let changefreq = PatternMap::compile(&config.changefreq)?;
        let priority = PatternMap::compile(&config.priority)?;

        tracing::debug!(
            "Rules: {} url exclusions, {} image exclusions, {} image roots, {} changefreq, {} priority",
            exclude_urls.len(),
            exclude_images.len(),
            image_roots.len(),
            changefreq.len(),
            priority.len()
        );

        Ok(Self {
            exclude_urls,
            exclude_images,
            image_scope: ImageScope {
                root: root.as_str().to_string(),
                image_roots,
                this_domain: config.crawler.images_this_domain,
            },
            find_images: config.crawler.find_images,
            use_last_modified: config.crawler.use_last_modified,
            changefreq,
            priority,
            root,
        })
    }
}

/// Everything a worker needs, shared by reference across tasks
struct CrawlContext {
    settings: CrawlSettings,
    client: Client,
    frontier: Arc<Frontier>,
    page_gate: Semaphore,
    classifier: ResourceClassifier,
    extractor: Box<dyn MarkupExtractor>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    output: OutputConfig,
    max_tasks: usize,
    shared: Arc<CrawlContext>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Compiles every pattern and builds the HTTP client; nothing is
    /// fetched yet.
    ///
    /// # Errors
    ///
    /// * `SitemapError::Url` - The root URL is not an http(s) URL with a host
    /// * `SitemapError::Config` - A pattern or image root is invalid
    /// * `SitemapError::HttpClient` - The HTTP client cannot be built
    pub fn new(config: Config) -> Result<Self, SitemapError> {
        let settings = CrawlSettings::from_config(&config)?;
        let client = build_http_client(&config.crawler)?;
        let max_tasks = config.crawler.max_tasks.max(1) as usize;

        let frontier = Arc::new(Frontier::new());
        let classifier = ResourceClassifier::for_images(
            client.clone(),
            Arc::clone(&frontier),
            max_tasks,
            Duration::from_secs(config.crawler.probe_timeout),
        )?;

        let shared = Arc::new(CrawlContext {
            settings,
            client,
            frontier,
            page_gate: Semaphore::new(max_tasks),
            classifier,
            extractor: build_extractor(config.crawler.extractor),
        });

        Ok(Self {
            output: config.output,
            max_tasks,
            shared,
        })
    }

    /// The frontier this coordinator crawls into
    pub fn frontier(&self) -> &Arc<Frontier> {
        &self.shared.frontier
    }

    /// Crawls from the root until quiescent and returns every recorded URL
    pub async fn crawl(&self) -> BTreeMap<String, CrawlEntry> {
        let root = &self.shared.settings.root;
        tracing::info!("Starting crawl of {} with {} tasks", root, self.max_tasks);

        enqueue(&self.shared, root.as_str(), root);
        self.shared.frontier.wait_until_quiescent().await;

        let counts = self.shared.frontier.counts();
        tracing::debug!(
            "Frontier quiescent: {} done, {} queued, {} in flight",
            counts.done,
            counts.queued,
            counts.in_flight
        );

        self.shared.frontier.take_done()
    }

    /// Runs the crawl, then writes the sitemap exactly once
    ///
    /// # Errors
    ///
    /// Only a failure to write the output is fatal; per-URL failures are
    /// recorded as entries with `ok = false`.
    pub async fn run(self) -> Result<CrawlReport, SitemapError> {
        let start_time = Instant::now();

        let entries = self.crawl().await;
        let report = CrawlReport::new(&self.shared.frontier, &entries);

        tracing::info!("Closing HTTP session");
        let Self { output, shared, .. } = self;
        drop(shared);

        tracing::info!(
            "Crawl completed in {:?}: {}",
            start_time.elapsed(),
            report
        );

        let records: Vec<(&str, &CrawlEntry)> = entries
            .iter()
            .filter(|(url, _)| !url.is_empty())
            .map(|(url, entry)| (url.as_str(), entry))
            .collect();

        let writer = build_writer(&output);
        writer.write(&records, output.timezone_offset)?;
        tracing::info!(
            "Wrote {} URLs to {} ({})",
            records.len(),
            output.path,
            output.format.as_str()
        );

        Ok(report)
    }
}

/// Filters a discovered link and spawns a worker for it if it is new
fn enqueue(ctx: &Arc<CrawlContext>, href: &str, page_url: &Url) {
    let settings = &ctx.settings;

    let Some(url) = same_site_candidate(href, page_url, settings.root.as_str()) else {
        return;
    };

    if settings.exclude_urls.is_excluded(&url) {
        tracing::debug!("Excluded {}", url);
        return;
    }

    let Some(ticket) = ctx.frontier.try_enqueue(url) else {
        return;
    };

    tracing::trace!("Queued {}", ticket.url());
    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        process(ctx, ticket).await;
    });
}

/// Worker body for one URL
///
/// The slot is held for the whole fetch and is released when this future
/// ends, however it ends. The ticket records a failure if no outcome was
/// reached.
async fn process(ctx: Arc<CrawlContext>, mut ticket: WorkTicket) {
    let _permit = match ctx.page_gate.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!("Concurrency gate closed before {} started", ticket.url());
            return;
        }
    };

    if let Err(e) = ticket.start() {
        tracing::warn!("{}", e);
        return;
    }

    let entry = visit(&ctx, ticket.url()).await;
    ticket.finish(entry);

    let counts = ctx.frontier.counts();
    tracing::debug!(
        "{} completed, {} in flight, {} queued",
        counts.done,
        counts.in_flight,
        counts.queued
    );
}

/// Fetches one URL and builds its entry
async fn visit(ctx: &Arc<CrawlContext>, url: &str) -> CrawlEntry {
    let page_url = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!("Cannot parse queued URL {}: {}", url, e);
            return CrawlEntry::failed();
        }
    };

    match fetch_page(&ctx.client, url).await {
        FetchResult::NetworkError { error } => {
            tracing::warn!("Failed to fetch {}: {}", url, error);
            CrawlEntry::failed()
        }

        FetchResult::NotHtml {
            status_code,
            content_type,
        } => {
            tracing::info!(
                "Reached {} ({} '{}'), not extracting",
                url,
                status_code,
                content_type
            );
            CrawlEntry::reachable()
        }

        FetchResult::Html {
            body,
            last_modified,
        } => {
            let settings = &ctx.settings;

            let links = ctx.extractor.extract_links(&body);
            let tags = if settings.find_images {
                ctx.extractor.extract_tags(&body, "img", IMAGE_FIELDS)
            } else {
                Vec::new()
            };
            drop(body);

            for link in &links {
                enqueue(ctx, link, &page_url);
            }

            let images = accept_images(ctx, &page_url, tags).await;

            let entry = CrawlEntry {
                ok: true,
                last_modified: last_modified.filter(|_| settings.use_last_modified),
                change_freq: settings.changefreq.lookup(url).cloned(),
                priority: settings.priority.lookup(url).copied(),
                images,
            };

            tracing::info!(
                "Processed {} ({} links, {} images)",
                url,
                links.len(),
                entry.images.len()
            );
            entry
        }
    }
}

/// Filters, resolves and probes the image tags of one page
///
/// Duplicate sources within the page are probed and recorded once.
async fn accept_images(ctx: &CrawlContext, page_url: &Url, tags: Vec<TagRecord>) -> Vec<ImageRef> {
    let settings = &ctx.settings;
    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for tag in tags {
        let Some(raw_src) = tag.get("src") else {
            continue;
        };

        if settings.exclude_images.is_excluded(raw_src) {
            tracing::debug!("Excluded image {}", raw_src);
            continue;
        }

        let Some(src) = resolve_image_src(raw_src, page_url, &settings.image_scope) else {
            tracing::trace!("Image {} is out of scope for {}", raw_src, page_url);
            continue;
        };

        if !seen.insert(src.clone()) {
            continue;
        }

        if ctx.classifier.classify(&src).await {
            images.push(ImageRef::from_tag(src, &tag));
        }
    }

    images
}

/// Runs the main crawl operation
///
/// Builds a coordinator from the configuration, crawls until quiescent and
/// writes the sitemap.
///
/// # Example
///
/// ```no_run
/// use sitemapper::config::load_config;
/// use sitemapper::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("sitemap.toml"))?;
/// let report = run_crawl(config).await?;
/// println!("{} URLs", report.done);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport, SitemapError> {
    let coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
