//! XML sitemap writer
//!
//! Emits the sitemaps.org `urlset` document, adding the Google image
//! extension namespace when any page recorded an image.

use crate::output::traits::{OutputResult, SitemapWriter};
use crate::state::{CrawlEntry, ImageRef};
use chrono::{DateTime, FixedOffset, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const SCHEMA_LOCATION: &str =
    "http://www.sitemaps.org/schemas/sitemap/0.9 http://www.sitemaps.org/schemas/sitemap/0.9/sitemap.xsd";
const IMAGE_NS: &str = "http://www.google.com/schemas/sitemap-image/1.1";

/// Writes a structured-markup sitemap to a file
#[derive(Debug, Clone)]
pub struct XmlWriter {
    path: PathBuf,
}

impl XmlWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SitemapWriter for XmlWriter {
    fn write(&self, entries: &[(&str, &CrawlEntry)], timezone_offset: i32) -> OutputResult<()> {
        let mut out = BufWriter::new(File::create(&self.path)?);

        let with_images = entries.iter().any(|(_, entry)| !entry.images.is_empty());
        out.write_all(render_header(with_images).as_bytes())?;
        sync(&mut out)?;

        for (url, entry) in entries {
            out.write_all(render_url(url, entry, timezone_offset).as_bytes())?;
            sync(&mut out)?;
        }

        out.write_all(b"</urlset>\n")?;
        sync(&mut out)?;

        tracing::debug!("Wrote {} url elements to {}", entries.len(), self.path.display());
        Ok(())
    }
}

fn sync(out: &mut BufWriter<File>) -> std::io::Result<()> {
    out.flush()?;
    out.get_ref().sync_data()
}

fn render_header(with_images: bool) -> String {
    let mut header = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    header.push_str(&format!(
        "<urlset xmlns=\"{}\" xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" xsi:schemaLocation=\"{}\"",
        SITEMAP_NS, SCHEMA_LOCATION
    ));
    if with_images {
        header.push_str(&format!(" xmlns:image=\"{}\"", IMAGE_NS));
    }
    header.push_str(">\n");
    header
}

/// Renders one `<url>` element on a single line
pub fn render_url(url: &str, entry: &CrawlEntry, timezone_offset: i32) -> String {
    let mut xml = String::from("<url>");
    push_element(&mut xml, "loc", url);

    if let Some(lastmod) = entry
        .last_modified
        .and_then(|ts| render_lastmod(ts, timezone_offset))
    {
        push_element(&mut xml, "lastmod", &lastmod);
    }
    if let Some(changefreq) = &entry.change_freq {
        push_element(&mut xml, "changefreq", changefreq);
    }
    if let Some(priority) = entry.priority {
        push_element(&mut xml, "priority", &format_priority(priority));
    }
    for image in &entry.images {
        push_image(&mut xml, image);
    }

    xml.push_str("</url>\n");
    xml
}

fn push_image(xml: &mut String, image: &ImageRef) {
    xml.push_str("<image:image>");
    push_element(xml, "image:loc", &image.src);

    let optional = [
        ("image:title", &image.title),
        ("image:caption", &image.caption),
        ("image:geo_location", &image.geo_location),
        ("image:license", &image.license),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            push_element(xml, name, value);
        }
    }

    xml.push_str("</image:image>");
}

fn push_element(xml: &mut String, name: &str, text: &str) {
    xml.push('<');
    xml.push_str(name);
    xml.push('>');
    xml.push_str(&html_escape::encode_text(text));
    xml.push_str("</");
    xml.push_str(name);
    xml.push('>');
}

/// Renders a timestamp in the given offset (hours east of UTC)
///
/// Returns `None` when the offset is outside chrono's range.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use sitemapper::output::render_lastmod;
///
/// let ts = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
/// assert_eq!(render_lastmod(ts, 3).unwrap(), "2015-10-21T10:28:00+03:00");
/// ```
pub fn render_lastmod(ts: DateTime<Utc>, timezone_offset: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(timezone_offset.checked_mul(3600)?)?;
    Some(ts.with_timezone(&offset).to_rfc3339())
}

/// Whole numbers keep one decimal, others use the shortest form
pub fn format_priority(priority: f64) -> String {
    if priority.fract() == 0.0 {
        format!("{:.1}", priority)
    } else {
        priority.to_string()
    }
}
