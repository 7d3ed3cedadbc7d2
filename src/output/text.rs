//! Plain-list sitemap writer: one URL per line, no metadata

use crate::output::traits::{OutputResult, SitemapWriter};
use crate::state::CrawlEntry;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct TextWriter {
    path: PathBuf,
}

impl TextWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SitemapWriter for TextWriter {
    fn write(&self, entries: &[(&str, &CrawlEntry)], _timezone_offset: i32) -> OutputResult<()> {
        let mut out = BufWriter::new(File::create(&self.path)?);
        sync(&mut out)?;

        for (url, _) in entries {
            writeln!(out, "{}", url)?;
            sync(&mut out)?;
        }

        sync(&mut out)?;
        Ok(())
    }
}

fn sync(out: &mut BufWriter<File>) -> std::io::Result<()> {
    out.flush()?;
    out.get_ref().sync_data()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_one_url_per_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sitemap.txt");

        let mut entry = CrawlEntry::reachable();
        entry.change_freq = Some("daily".to_string());
        let entries = vec![("https://example.com/", &entry), ("https://example.com/a", &entry)];

        TextWriter::new(&path).write(&entries, 3).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "https://example.com/\nhttps://example.com/a\n");
    }

    #[test]
    fn test_write_empty_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.txt");

        TextWriter::new(&path).write(&[], 0).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
