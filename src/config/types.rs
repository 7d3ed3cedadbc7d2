use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for a sitemap crawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    pub output: OutputConfig,

    /// Ordered URL pattern -> change frequency entries (first match wins)
    #[serde(default)]
    pub changefreq: Vec<PatternEntry<String>>,

    /// Ordered URL pattern -> priority entries (first match wins)
    #[serde(default)]
    pub priority: Vec<PatternEntry<f64>>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Site root; only URLs starting with it are crawled
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Maximum number of concurrent page fetches
    #[serde(rename = "max-tasks", default = "default_max_tasks")]
    pub max_tasks: u32,

    /// Verify the site's TLS certificate
    #[serde(rename = "verify-ssl", default = "default_true")]
    pub verify_ssl: bool,

    /// Extract and probe `<img>` references
    #[serde(rename = "find-images", default = "default_true")]
    pub find_images: bool,

    /// Restrict images to the site root and the configured image roots
    #[serde(rename = "images-this-domain", default = "default_true")]
    pub images_this_domain: bool,

    /// Record the Last-Modified header of each page
    #[serde(rename = "use-last-modified", default = "default_true")]
    pub use_last_modified: bool,

    /// Page fetch timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Image probe timeout (seconds)
    #[serde(rename = "probe-timeout", default = "default_probe_timeout")]
    pub probe_timeout: u64,

    /// Which markup extractor scans page bodies
    #[serde(default)]
    pub extractor: ExtractorKind,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// URL and image filtering configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Regexes; a page URL matching any of them is never crawled
    #[serde(rename = "exclude-urls", default)]
    pub exclude_urls: Vec<String>,

    /// Regexes; an image source matching any of them is never recorded
    #[serde(rename = "exclude-images", default)]
    pub exclude_images: Vec<String>,

    /// Recognized image roots used to resolve relative image sources
    #[serde(rename = "image-root-urls", default)]
    pub image_root_urls: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the sitemap file
    pub path: String,

    /// Output document format
    #[serde(default)]
    pub format: OutputFormat,

    /// Offset (hours) used when rendering lastmod timestamps
    #[serde(rename = "timezone-offset", default)]
    pub timezone_offset: i32,
}

/// One entry of an ordered pattern map
#[derive(Debug, Clone, Deserialize)]
pub struct PatternEntry<V> {
    /// Regex matched anywhere in the URL
    pub pattern: String,
    pub value: V,
}

/// Sitemap document format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum OutputFormat {
    /// Sitemap protocol XML document
    #[default]
    #[serde(rename = "xml", alias = "structured-markup")]
    Xml,

    /// One URL per line
    #[serde(rename = "txt", alias = "plain-list")]
    Txt,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Txt => "txt",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "xml" | "structured-markup" => Ok(Self::Xml),
            "txt" | "plain-list" => Ok(Self::Txt),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Markup extractor backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    /// Regex-based lexical scanner
    #[default]
    Lexical,

    /// DOM-based extraction through `scraper`
    Dom,
}

fn default_max_tasks() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    20
}
