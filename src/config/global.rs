//! Global configuration management for feedcrawl.
//!
//! The global configuration file lives at `~/.feedcrawl/config.toml`
//! (`%LOCALAPPDATA%\feedcrawl\config.toml` on Windows). The location can be
//! overridden with the `FEEDCRAWL_CONFIG_PATH` environment variable or the
//! `--config` flag. Every key is optional:
//!
//! | Key | Default |
//! |-----|---------|
//! | `base_url` | `https://raw.githubusercontent.com` |
//! | `org` | `conda-forge` |
//! | `branch` | `main` |
//! | `request_timeout_secs` | `30` |
//! | `user_agent` | `feedcrawl/<version>` |
//! | `cache_capacity` | `1000` |
//! | `pinned_file` | `conda_build_config.yaml` |
//! | `extra_exclusions` | `[]` |
//! | `toolchain_prefixes` | `["ctng-compilers-"]` |
//! | `archs` | all supported |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_BRANCH, DEFAULT_CACHE_CAPACITY, DEFAULT_ORG, DEFAULT_PINNED_FILE,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_TOOLCHAIN_PREFIXES, default_user_agent,
};
use crate::core::CrawlError;
use crate::templating::Arch;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "FEEDCRAWL_CONFIG_PATH";

/// User-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Host serving raw repository files.
    pub base_url: String,
    /// Organization owning the feedstocks.
    pub org: String,
    /// Branch recipes are read from unless `--branch` is given.
    pub branch: String,
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Entries per memoization cache.
    pub cache_capacity: usize,
    /// Pinned-packages file used when `--pinned` is not given.
    pub pinned_file: PathBuf,
    /// Packages never crawled, on top of the built-in list.
    pub extra_exclusions: Vec<String>,
    /// Identifier prefixes of compiler toolchain packages.
    pub toolchain_prefixes: Vec<String>,
    /// Architectures used when `--archs` is not given; empty means all.
    pub archs: Vec<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            org: DEFAULT_ORG.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            user_agent: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            pinned_file: PathBuf::from(DEFAULT_PINNED_FILE),
            extra_exclusions: Vec::new(),
            toolchain_prefixes: DEFAULT_TOOLCHAIN_PREFIXES.iter().map(|s| s.to_string()).collect(),
            archs: Vec::new(),
        }
    }
}

impl GlobalConfig {
    /// Load from the default location, or defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an explicit path when one is given, the default location
    /// otherwise.
    ///
    /// An explicit path must exist; the default location may be absent.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(&path).await,
            None => Self::load().await,
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file path, honoring `FEEDCRAWL_CONFIG_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory cannot be
    /// determined.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.is_empty()
        {
            return Ok(PathBuf::from(path));
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("feedcrawl")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".feedcrawl")
        };

        Ok(config_dir.join("config.toml"))
    }

    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(default_user_agent)
    }

    /// Architectures from `archs`, all supported ones when empty.
    pub fn default_archs(&self) -> Result<Vec<Arch>, CrawlError> {
        if self.archs.is_empty() {
            return Ok(Arch::SUPPORTED.to_vec());
        }
        Arch::parse_list(&self.archs.join(" "))
    }

    fn validate(&self) -> Result<(), CrawlError> {
        if self.base_url.trim().is_empty() {
            return Err(CrawlError::ConfigError {
                message: "base_url must not be empty".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(CrawlError::ConfigError {
                message: "request_timeout_secs must be positive".to_string(),
            });
        }
        self.default_archs()?;
        Ok(())
    }
}
