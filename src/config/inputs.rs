//! Pinned-packages and manifest files.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use tokio::fs;
use tracing::warn;

use crate::constants::BUILTIN_EXCLUSIONS;
use crate::core::{CrawlError, PackageId};
use crate::recipe::DependencyFilter;

/// Packages fixed by the build configuration, in file order.
///
/// The built-in infrastructure exclusions and any configured extras follow
/// the names from the file; duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinnedPackages {
    names: Vec<String>,
}

impl PinnedPackages {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut pinned = Self::default();
        pinned.extend(names);
        pinned
    }

    /// Read the keys of the YAML mapping at `path` and add the exclusions.
    ///
    /// A missing file yields only the exclusions and a warning.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::ManifestParseError`] when the file exists but is
    /// not a YAML mapping, or an I/O error when it cannot be read.
    pub async fn load(path: &Path, extra_exclusions: &[String]) -> Result<Self> {
        let mut pinned = if path.exists() {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read pinned packages from {}", path.display()))?;
            Self::parse(&content, &path.display().to_string())?
        } else {
            warn!("Pinned packages file {} not found; using built-in exclusions only", path.display());
            Self::default()
        };
        pinned.extend(BUILTIN_EXCLUSIONS.iter().copied());
        pinned.extend(extra_exclusions.iter().cloned());
        Ok(pinned)
    }

    /// Keys of a YAML mapping, in order. An empty document has no keys.
    ///
    /// Repeated keys, common when each carries a different selector, are
    /// kept once.
    pub fn parse(content: &str, file: &str) -> Result<Self, CrawlError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let keys: MappingKeys =
            serde_yaml::from_str(content).map_err(|e| CrawlError::ManifestParseError {
                file: file.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::from_names(keys.0))
    }

    fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !name.is_empty() && !self.names.contains(&name) {
                self.names.push(name);
            }
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Dependency filter excluding every pinned package.
    pub fn filter(&self, toolchain_prefixes: Vec<String>) -> DependencyFilter {
        DependencyFilter::new(self.names.iter().cloned(), toolchain_prefixes)
    }
}

/// Keys of a mapping; values are skipped unread.
struct MappingKeys(Vec<String>);

impl<'de> Deserialize<'de> for MappingKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeysVisitor;

        impl<'de> Visitor<'de> for KeysVisitor {
            type Value = MappingKeys;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of pinned package names")
            }

            fn visit_unit<E: de::Error>(self) -> Result<MappingKeys, E> {
                Ok(MappingKeys(Vec::new()))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<MappingKeys, A::Error> {
                let mut keys = Vec::new();
                while let Some(key) = map.next_key::<serde_yaml::Value>()? {
                    map.next_value::<IgnoredAny>()?;
                    match key {
                        serde_yaml::Value::String(s) => keys.push(s),
                        serde_yaml::Value::Number(n) => keys.push(n.to_string()),
                        serde_yaml::Value::Bool(b) => keys.push(b.to_string()),
                        _ => {}
                    }
                }
                Ok(MappingKeys(keys))
            }
        }

        deserializer.deserialize_any(KeysVisitor)
    }
}

/// Feedstocks listed in a manifest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub feedstocks: Vec<PackageId>,
}

#[derive(Deserialize)]
struct RawManifest {
    feedstocks: Option<Vec<String>>,
}

impl Manifest {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read manifest from {}", path.display()))?;
        Ok(Self::parse(&content, &path.display().to_string())?)
    }

    /// Parse a manifest document.
    ///
    /// # Errors
    ///
    /// [`CrawlError::ManifestParseError`] for malformed YAML or a missing
    /// `feedstocks` list, [`CrawlError::InvalidIdentifier`] for a bad entry.
    pub fn parse(content: &str, file: &str) -> Result<Self, CrawlError> {
        let raw: RawManifest =
            serde_yaml::from_str(content).map_err(|e| CrawlError::ManifestParseError {
                file: file.to_string(),
                reason: e.to_string(),
            })?;
        let entries = raw.feedstocks.ok_or_else(|| CrawlError::ManifestParseError {
            file: file.to_string(),
            reason: "missing 'feedstocks' list".to_string(),
        })?;
        let feedstocks = entries
            .iter()
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| PackageId::parse(entry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { feedstocks })
    }

    pub fn contains(&self, feedstock: &PackageId) -> bool {
        self.feedstocks.contains(feedstock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pinned_keys_in_file_order() {
        let content = "zlib:\n  - 1.3  # [linux]\nlibpng:\n  - 1.6\nzlib:\n  - 1.2  # [win]\n";
        let pinned = PinnedPackages::parse(content, "cbc.yaml").unwrap();
        assert_eq!(pinned.names(), ["zlib", "libpng"]);
    }

    #[test]
    fn test_pinned_rejects_non_mapping() {
        let err = PinnedPackages::parse("- zlib\n", "cbc.yaml").unwrap_err();
        assert!(matches!(err, CrawlError::ManifestParseError { .. }));
        assert!(PinnedPackages::parse("", "cbc.yaml").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_pinned_file_yields_exclusions() {
        let temp = TempDir::new().unwrap();
        let pinned = PinnedPackages::load(&temp.path().join("absent.yaml"), &["cuda".to_string()])
            .await
            .unwrap();
        assert_eq!(pinned.len(), BUILTIN_EXCLUSIONS.len() + 1);
        assert!(pinned.contains("liblapacke"));
        assert!(pinned.contains("cuda"));
    }

    #[tokio::test]
    async fn test_pinned_file_unions_exclusions() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conda_build_config.yaml");
        std::fs::write(&path, "libxml2:\n  - 2.10\nnumpy:\n  - 1.26\n").unwrap();

        let pinned = PinnedPackages::load(&path, &[]).await.unwrap();
        assert_eq!(&pinned.names()[..2], ["libxml2", "numpy"]);
        assert_eq!(pinned.len(), BUILTIN_EXCLUSIONS.len() + 1);

        let filter = pinned.filter(Vec::new());
        assert!(filter.is_excluded("libxml2"));
        assert!(!filter.includes("openblas"));
        assert!(filter.includes("zlib"));
    }

    #[test]
    fn test_manifest_parse() {
        let manifest =
            Manifest::parse("feedstocks:\n  - numpy-feedstock\n  - pandas\n", "manifest.yaml").unwrap();
        assert_eq!(
            manifest.feedstocks,
            vec![PackageId::new("numpy"), PackageId::new("pandas")]
        );
        assert!(manifest.contains(&PackageId::new("pandas-feedstock")));
    }

    #[test]
    fn test_manifest_errors() {
        assert!(matches!(
            Manifest::parse("other: []\n", "m.yaml"),
            Err(CrawlError::ManifestParseError { .. })
        ));
        assert!(matches!(
            Manifest::parse("feedstocks:\n  - \"bad name\"\n", "m.yaml"),
            Err(CrawlError::InvalidIdentifier { .. })
        ));
        assert!(matches!(
            Manifest::parse("feedstocks: [\n", "m.yaml"),
            Err(CrawlError::ManifestParseError { .. })
        ));
    }
}
