//! feedcrawl - feedstock dependency crawler
//!
//! Given one or more conda-forge style feedstocks, feedcrawl fetches their
//! `meta.yaml` recipes, renders the Jinja-like templating and `# [selector]`
//! annotations for the requested architectures, follows every declared
//! dependency to a fixed point and prints a build order in which each
//! feedstock comes after the feedstocks it depends on.
//!
//! # Architecture Overview
//!
//! ```text
//! cli ─▶ resolver::Crawler ─▶ source::RecipeFetcher ─▶ source::RecipeSource (HTTP)
//!               │                      │
//!               │                      └─▶ templating::RecipeRenderer ─▶ recipe::Recipe
//!               ▼
//!        resolver::sort ─▶ equivalence classes ─▶ build order
//! ```
//!
//! Dependency cycles are tolerated: the feedstocks of a cycle form one
//! equivalence class and are built together.
//!
//! # Core Modules
//!
//! - [`cli`] - `crawl` and `pinned` subcommands, tree and summary output
//! - [`config`] - global TOML configuration, pinned-packages and manifest files
//! - [`core`] - [`core::CrawlError`], [`core::PackageId`] and user-facing errors
//! - [`resolver`] - crawl orchestration, availability checks, topological sort
//!
//! ## Recipes
//! - [`source`] - recipe and feedstock-name lookups, memoized name resolution
//! - [`templating`] - template evaluation and selector processing
//! - [`recipe`] - typed recipe model and dependency extraction
//! - [`version`] - conda version ordering and range matching
//!
//! ## Supporting Modules
//! - [`cache`] - bounded LRU memoization used by the fetcher
//! - [`constants`] - default URLs, branches and exclusion lists
//! - [`utils`] - progress spinner
//!
//! # Example
//!
//! ```rust,no_run
//! use feedcrawl::config::GlobalConfig;
//! use feedcrawl::core::PackageId;
//! use feedcrawl::resolver::{CrawlOptions, Crawler};
//! use feedcrawl::source::{HttpRecipeSource, RecipeFetcher};
//! use feedcrawl::templating::RecipeRenderer;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! let source = HttpRecipeSource::from_config(&config)?;
//! let fetcher = RecipeFetcher::new(source, RecipeRenderer::default());
//! let mut crawler = Crawler::new(fetcher, CrawlOptions::default());
//!
//! let report = crawler.crawl(&PackageId::parse_list("numpy-feedstock")?).await;
//! for feedstock in report.build_order() {
//!     println!("{}", feedstock.feedstock_name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod recipe;
pub mod resolver;
pub mod source;
pub mod templating;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
