//! Link and tag extraction from raw page bodies
//!
//! Extraction sits behind the `MarkupExtractor` trait so the coordinator never
//! depends on how markup is read. Two backends exist:
//! - `LexicalExtractor`: a best-effort regex scanner over the raw text. It
//!   never fails; malformed attributes are logged and skipped.
//! - `DomExtractor`: a real HTML parse through `scraper`.

use crate::config::ExtractorKind;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Recognized attributes of one tag occurrence (unrecognized ones dropped)
pub type TagRecord = HashMap<String, String>;

/// Reads links and tags out of a page body
pub trait MarkupExtractor: Send + Sync {
    /// Returns every raw `href` value in order of appearance, duplicates kept
    fn extract_links(&self, body: &str) -> Vec<String>;

    /// Returns one record per `<tag ...>` occurrence holding only the
    /// attributes named in `fields`
    fn extract_tags(&self, body: &str, tag: &str, fields: &[&str]) -> Vec<TagRecord>;
}

/// Builds the extractor selected in the configuration
pub fn build_extractor(kind: ExtractorKind) -> Box<dyn MarkupExtractor> {
    match kind {
        ExtractorKind::Lexical => Box::new(LexicalExtractor),
        ExtractorKind::Dom => Box::new(DomExtractor),
    }
}

/// Regex-based scanner over raw markup
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalExtractor;

fn href_regex() -> &'static Regex {
    static HREF: OnceLock<Regex> = OnceLock::new();
    HREF.get_or_init(|| Regex::new(r#"(?i)href=["']?([^\s"'<>]+)"#).expect("href pattern is valid"))
}

/// Whitespace followed by `name=` starts a new attribute
fn boundary_regex() -> &'static Regex {
    static BOUNDARY: OnceLock<Regex> = OnceLock::new();
    BOUNDARY.get_or_init(|| Regex::new(r"\s[\w:-]+\s*=").expect("boundary pattern is valid"))
}

impl MarkupExtractor for LexicalExtractor {
    fn extract_links(&self, body: &str) -> Vec<String> {
        href_regex()
            .captures_iter(body)
            .filter_map(|cap| cap.get(1))
            .map(|m| decode(m.as_str()))
            .collect()
    }

    fn extract_tags(&self, body: &str, tag: &str, fields: &[&str]) -> Vec<TagRecord> {
        let pattern = format!(r"(?s)<{}((?:\s|/)[^>]*)?>", regex::escape(tag));
        let tag_regex = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!("Cannot scan for <{}> tags: {}", tag, e);
                return Vec::new();
            }
        };

        tag_regex
            .captures_iter(body)
            .map(|cap| {
                let region = cap.get(1).map_or("", |m| m.as_str());
                parse_attributes(region.trim_end().trim_end_matches('/'), fields)
            })
            .collect()
    }
}

/// Splits a tag's attribute region and keeps the recognized fields
///
/// The first occurrence of a repeated attribute wins.
fn parse_attributes(region: &str, fields: &[&str]) -> TagRecord {
    let mut record = TagRecord::new();

    for segment in split_attributes(region) {
        match parse_segment(segment) {
            Ok(pairs) => {
                for (key, value) in pairs {
                    if fields.contains(&key.as_str()) {
                        record.entry(key).or_insert(value);
                    }
                }
            }
            Err(reason) => {
                tracing::warn!("Skipping malformed attribute '{}': {}", segment.trim(), reason);
            }
        }
    }

    record
}

/// Cuts the region at every whitespace that precedes a `name=` pattern
fn split_attributes(region: &str) -> Vec<&str> {
    let mut starts: Vec<usize> = boundary_regex().find_iter(region).map(|m| m.start()).collect();
    if starts.first() != Some(&0) {
        starts.insert(0, 0);
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(region.len());
            &region[start..end]
        })
        .filter(|segment| !segment.trim().is_empty())
        .collect()
}

/// Parses `key="value"`, `key='value'`, `key=value` or bare keys
fn parse_segment(segment: &str) -> Result<Vec<(String, String)>, &'static str> {
    let segment = segment.trim();

    let Some((key, rest)) = segment.split_once('=') else {
        return Ok(bare_keys(segment));
    };

    let key = key.trim();
    if !is_attribute_name(key) {
        return Err("invalid attribute name");
    }

    let rest = rest.trim_start();
    let (value, tail) = match rest.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let inner = &rest[1..];
            let end = inner.find(quote).ok_or("unterminated quoted value")?;
            (&inner[..end], &inner[end + 1..])
        }
        _ => {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        }
    };

    let mut pairs = vec![(key.to_string(), decode(value))];
    pairs.extend(bare_keys(tail));
    Ok(pairs)
}

fn bare_keys(text: &str) -> Vec<(String, String)> {
    text.split_whitespace()
        .filter(|token| is_attribute_name(token))
        .map(|token| (token.to_string(), String::new()))
        .collect()
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == ':')
}

fn decode(value: &str) -> String {
    html_escape::decode_html_entities(value).into_owned()
}

/// DOM-backed extraction through `scraper`
#[derive(Debug, Clone, Copy, Default)]
pub struct DomExtractor;

impl MarkupExtractor for DomExtractor {
    fn extract_links(&self, body: &str) -> Vec<String> {
        let document = Html::parse_document(body);
        let Ok(selector) = Selector::parse("[href]") else {
            return Vec::new();
        };

        document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .map(str::to_string)
            .collect()
    }

    fn extract_tags(&self, body: &str, tag: &str, fields: &[&str]) -> Vec<TagRecord> {
        let selector = match Selector::parse(tag) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::warn!("Invalid tag selector '{}': {:?}", tag, e);
                return Vec::new();
            }
        };

        let document = Html::parse_document(body);
        document
            .select(&selector)
            .map(|element| {
                fields
                    .iter()
                    .filter_map(|field| {
                        element
                            .value()
                            .attr(field)
                            .map(|value| (field.to_string(), value.to_string()))
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::IMAGE_FIELDS;

    fn lexical() -> LexicalExtractor {
        LexicalExtractor
    }

    #[test]
    fn test_extract_links_in_order_with_duplicates() {
        let body = r#"<a href="/a">A</a> <A HREF='/b'>B</A> <a href=/c>C</a> <a href="/a">again</a>"#;
        let links = lexical().extract_links(body);
        assert_eq!(links, vec!["/a", "/b", "/c", "/a"]);
    }

    #[test]
    fn test_extract_links_decodes_entities() {
        let body = r#"<a href="/search?q=1&amp;page=2">next</a>"#;
        let links = lexical().extract_links(body);
        assert_eq!(links, vec!["/search?q=1&page=2"]);
    }

    #[test]
    fn test_extract_image_tag() {
        let body = r#"<p><img src="a.jpg" title="Cat"></p>"#;
        let tags = lexical().extract_tags(body, "img", IMAGE_FIELDS);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].get("src").map(String::as_str), Some("a.jpg"));
        assert_eq!(tags[0].get("title").map(String::as_str), Some("Cat"));
    }

    #[test]
    fn test_unrecognized_attributes_dropped() {
        let body = r#"<img class="hero" src='b.png' alt="B" loading=lazy />"#;
        let tags = lexical().extract_tags(body, "img", IMAGE_FIELDS);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].len(), 1);
        assert_eq!(tags[0].get("src").map(String::as_str), Some("b.png"));
    }

    #[test]
    fn test_multiline_tag() {
        let body = "<img\n  src=\"c.jpg\"\n  caption=\"A caption\"\n>";
        let tags = lexical().extract_tags(body, "img", IMAGE_FIELDS);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].get("src").map(String::as_str), Some("c.jpg"));
        assert_eq!(tags[0].get("caption").map(String::as_str), Some("A caption"));
    }

    #[test]
    fn test_tag_name_is_case_sensitive() {
        let body = r#"<IMG src="upper.jpg"><img src="lower.jpg">"#;
        let tags = lexical().extract_tags(body, "img", IMAGE_FIELDS);

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].get("src").map(String::as_str), Some("lower.jpg"));
    }

    #[test]
    fn test_similar_tag_names_ignored() {
        let body = r#"<imgur src="x.jpg"><img src="y.jpg">"#;
        let tags = lexical().extract_tags(body, "img", IMAGE_FIELDS);
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_malformed_tag_contributes_empty_record() {
        let body = r#"<img ="broken" src="unterminated><img src="ok.jpg">"#;
        let tags = lexical().extract_tags(body, "img", IMAGE_FIELDS);

        assert_eq!(tags.len(), 2);
        assert!(tags[0].is_empty());
        assert_eq!(tags[1].get("src").map(String::as_str), Some("ok.jpg"));
    }

    #[test]
    fn test_bare_keys_and_unquoted_values() {
        let body = r#"<img hidden src=photo.jpg?w=100 license="cc-by">"#;
        let tags = lexical().extract_tags(body, "img", IMAGE_FIELDS);

        assert_eq!(tags[0].get("src").map(String::as_str), Some("photo.jpg?w=100"));
        assert_eq!(tags[0].get("license").map(String::as_str), Some("cc-by"));
    }

    #[test]
    fn test_split_attributes() {
        let segments = split_attributes(r#" src="a.jpg" title="Cat""#);
        assert_eq!(segments, vec![r#" src="a.jpg""#, r#" title="Cat""#]);
    }

    #[test]
    fn test_parse_segment_errors() {
        assert!(parse_segment(r#"src="a.jpg"#).is_err());
        assert!(parse_segment(r#"="x""#).is_err());
        assert_eq!(parse_segment("async").unwrap(), vec![("async".to_string(), String::new())]);
    }

    #[test]
    fn test_dom_extractor_links() {
        let body = r#"<html><body><a href="/a">A</a><link href="/style.css"></body></html>"#;
        let links = DomExtractor.extract_links(body);

        assert_eq!(links.len(), 2);
        assert!(links.contains(&"/a".to_string()));
        assert!(links.contains(&"/style.css".to_string()));
    }

    #[test]
    fn test_dom_extractor_tags() {
        let body = r#"<html><body><img src="a.jpg" title="Cat" class="x"><img alt="none"></body></html>"#;
        let tags = DomExtractor.extract_tags(body, "img", IMAGE_FIELDS);

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].get("title").map(String::as_str), Some("Cat"));
        assert!(tags[1].is_empty());
    }

    #[test]
    fn test_build_extractor_backends_agree_on_simple_markup() {
        let body = r#"<html><body><a href="/x">X</a><img src="a.jpg"></body></html>"#;
        for kind in [ExtractorKind::Lexical, ExtractorKind::Dom] {
            let extractor = build_extractor(kind);
            assert_eq!(extractor.extract_links(body), vec!["/x"]);
            assert_eq!(extractor.extract_tags(body, "img", IMAGE_FIELDS).len(), 1);
        }
    }
}
