//! Command-line interface for feedcrawl.
//!
//! # Commands
//!
//! - `crawl` - walk the dependency graph of one or more feedstocks, print the
//!   dependency tree, a summary of problems and the build order
//! - `pinned` - list the manifest feedstocks that build pinned packages
//!
//! # Global Options
//!
//! - `--verbose` - debug logging on stderr
//! - `--quiet` - errors only, no spinner
//! - `--no-progress` - disable the spinner
//! - `--config` - path to a config file instead of `~/.feedcrawl/config.toml`
//!
//! # Example
//!
//! ```bash
//! feedcrawl crawl -f numpy-feedstock,scipy-feedstock -a "linux-64 osx-arm64"
//! feedcrawl crawl -m manifest.yaml --check-version-selector --expand-tree
//! feedcrawl pinned -m manifest.yaml --pinned conda_build_config.yaml
//! ```
//!
//! Logs go to stderr so that the build order stays the last line on stdout.

mod crawl;
mod pinned;
pub mod tree;


use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::GlobalConfig;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Filter directive for the subscriber; `None` keeps `RUST_LOG` or the
    /// default `warn`.
    pub log_level: Option<String>,

    pub no_progress: bool,

    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the stderr subscriber. Only the first call in a process wins.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "feedcrawl",
    about = "Crawl feedstock recipes and compute a build order",
    version,
    long_about = "feedcrawl follows the dependencies declared in conda-forge style feedstock \
                  recipes, reports what is missing or outdated, and prints an order in which \
                  the feedstocks can be built."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable the progress spinner
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl dependencies and print the tree and build order
    Crawl(crawl::CrawlCommand),

    /// Print the manifest feedstocks that provide pinned packages
    Pinned(pinned::PinnedCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress || self.quiet,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();
        let global = GlobalConfig::load_with_optional(config.config_path.clone()).await?;

        match self.command {
            Commands::Crawl(cmd) => cmd.execute(&global, &config).await,
            Commands::Pinned(cmd) => cmd.execute(&global).await,
        }
    }
}
