//! Cache key construction.

use std::fmt;

/// Separator between key segments.
pub const SEPARATOR: char = ':';

/// Hierarchical, colon-delimited cache key (`domain:subresource:identifier`).
///
/// Every segment is percent-encoded, keeping only ASCII alphanumerics and
/// `-_.~`. The encoding is injective, so distinct identifiers always yield
/// distinct keys, and no segment can contain `:` or a glob metacharacter.
/// [`pattern`](Self::pattern) therefore matches exactly the keys nested
/// under this one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    raw: String,
}

impl CacheKey {
    /// Starts a key at the given top-level domain.
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_cache::CacheKey;
    ///
    /// let key = CacheKey::new("company").push("42").push("invoices");
    /// assert_eq!(key.as_str(), "company:42:invoices");
    /// assert_eq!(key.pattern(), "company:42:invoices:*");
    /// ```
    pub fn new(domain: impl AsRef<str>) -> Self {
        Self {
            raw: sanitize(domain.as_ref()),
        }
    }

    /// Appends a segment.
    pub fn push(mut self, segment: impl fmt::Display) -> Self {
        self.raw.push(SEPARATOR);
        self.raw.push_str(&sanitize(&segment.to_string()));
        self
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the glob pattern matching every key nested under this one.
    pub fn pattern(&self) -> String {
        format!("{}{}*", self.raw, SEPARATOR)
    }

    /// Returns the individual segments, still encoded.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split(SEPARATOR)
    }
}

fn sanitize(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.raw
    }
}
