use crate::config::PatternEntry;
use crate::ConfigError;
use regex::Regex;

/// An ordered list of URL exclusion patterns
///
/// Patterns are unanchored regexes: a pattern matches when it is found
/// anywhere in the URL string.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compiles every pattern, failing on the first invalid one
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| compile_pattern(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if any pattern matches the URL
    ///
    /// # Examples
    ///
    /// ```
    /// use sitemapper::url::PatternSet;
    ///
    /// let excludes = PatternSet::compile(&[r"\.png$", "/admin/"]).unwrap();
    /// assert!(excludes.is_excluded("https://example.com/admin/x"));
    /// assert!(!excludes.is_excluded("https://example.com/page"));
    /// ```
    pub fn is_excluded(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// An ordered regex -> value mapping resolved first-match-wins
///
/// Used identically for change frequency and priority lookups. The first
/// entry (in declaration order) whose pattern matches decides the value;
/// a later, longer or more specific pattern never overrides it.
#[derive(Debug, Clone)]
pub struct PatternMap<V> {
    entries: Vec<(Regex, V)>,
}

impl<V> Default for PatternMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V: Clone> PatternMap<V> {
    /// Compiles the configured entries, preserving their order
    pub fn compile(entries: &[PatternEntry<V>]) -> Result<Self, ConfigError> {
        let entries = entries
            .iter()
            .map(|e| Ok((compile_pattern(&e.pattern)?, e.value.clone())))
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { entries })
    }
}

impl<V> PatternMap<V> {
    /// Returns the value of the first entry whose pattern matches the URL
    pub fn lookup(&self, url: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(re, _)| re.is_match(url))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))
}
