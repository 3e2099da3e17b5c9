//! Package identifiers used as graph node keys.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::error::CrawlError;

/// Suffix of every feedstock repository name.
pub const FEEDSTOCK_SUFFIX: &str = "-feedstock";

static IDENTIFIER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("identifier pattern is valid")
});

/// Canonical package (feedstock) identifier.
///
/// Normalization trims surrounding whitespace and drops a trailing
/// `-feedstock`, so `numpy`, ` numpy ` and `numpy-feedstock` are the same
/// key. Case is preserved and compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageId(String);

impl PackageId {
    /// Normalize without validating.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        let bare = trimmed.strip_suffix(FEEDSTOCK_SUFFIX).unwrap_or(trimmed);
        Self(bare.to_string())
    }

    /// Normalize and validate user input.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::InvalidIdentifier`] when the normalized name is
    /// empty or contains characters outside `[A-Za-z0-9._-]`.
    pub fn parse(raw: &str) -> Result<Self, CrawlError> {
        let id = Self::new(raw);
        if IDENTIFIER_PATTERN.is_match(&id.0) {
            Ok(id)
        } else {
            Err(CrawlError::InvalidIdentifier {
                identifier: raw.to_string(),
            })
        }
    }

    /// Parse a comma separated list, skipping empty entries.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, CrawlError> {
        raw.split(',').filter(|s| !s.trim().is_empty()).map(Self::parse).collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Repository name, e.g. `numpy-feedstock`.
    pub fn feedstock_name(&self) -> String {
        format!("{}{FEEDSTOCK_SUFFIX}", self.0)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
