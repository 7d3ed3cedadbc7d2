//! Output module for writing the finished sitemap
//!
//! This module handles:
//! - The `SitemapWriter` interface every output format implements
//! - The XML (`urlset`) and plain-list writers
//! - Choosing a writer from the output configuration

mod text;
mod traits;
mod xml;

pub use text::TextWriter;
pub use traits::{OutputError, OutputResult, SitemapWriter};
pub use xml::{format_priority, render_lastmod, render_url, XmlWriter};

use crate::config::{OutputConfig, OutputFormat};

/// Builds the writer selected by the output configuration
pub fn build_writer(config: &OutputConfig) -> Box<dyn SitemapWriter> {
    match config.format {
        OutputFormat::Xml => Box::new(XmlWriter::new(&config.path)),
        OutputFormat::Txt => Box::new(TextWriter::new(&config.path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CrawlEntry;
    use tempfile::TempDir;

    #[test]
    fn test_build_writer_by_format() {
        let dir = TempDir::new().unwrap();
        let entry = CrawlEntry::reachable();
        let entries = [("https://example.com/", &entry)];

        for (format, name) in [(OutputFormat::Xml, "out.xml"), (OutputFormat::Txt, "out.txt")] {
            let config = OutputConfig {
                path: dir.path().join(name).to_string_lossy().into_owned(),
                format,
                timezone_offset: 0,
            };
            build_writer(&config).write(&entries, 0).unwrap();
        }

        let xml = std::fs::read_to_string(dir.path().join("out.xml")).unwrap();
        let txt = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert!(xml.contains("<urlset"));
        assert_eq!(txt, "https://example.com/\n");
    }
}
