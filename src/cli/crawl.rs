//! The `crawl` command.
//!
//! Roots come from `--feedstocks` or a manifest's `feedstocks` list. The
//! identifiers and architectures are validated before any request is made.
//! Output goes to stdout in three parts: the dependency tree, the summary and,
//! as the very last line, the comma-separated build order.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use tracing::debug;

use super::CliConfig;
use super::tree::{TreeOptions, render_summary, render_tree};
use crate::config::{GlobalConfig, Manifest, PinnedPackages};
use crate::core::{CrawlError, PackageId};
use crate::resolver::{CrawlOptions, CrawlReport, Crawler};
use crate::source::{HttpRecipeSource, RecipeFetcher};
use crate::templating::{Arch, RecipeRenderer, RenderContext};
use crate::utils::progress::Spinner;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("roots").required(true).args(["feedstocks", "manifest"])))]
pub struct CrawlCommand {
    /// Comma-separated feedstock names, e.g. `numpy-feedstock,scipy`
    #[arg(short, long)]
    feedstocks: Option<String>,

    /// Manifest file with a `feedstocks` list
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Space-separated architectures, e.g. "linux-64 osx-arm64"
    ///
    /// Defaults to the configured list, or every supported architecture.
    #[arg(short, long)]
    archs: Option<String>,

    /// Also check declared version ranges and per-architecture skips
    #[arg(long)]
    check_version_selector: bool,

    /// Print available dependencies too, not just the paths to problems
    #[arg(long)]
    expand_tree: bool,

    /// Pinned-packages file (conda_build_config.yaml)
    #[arg(long)]
    pinned: Option<PathBuf>,

    /// Branch to read recipes from
    #[arg(long)]
    branch: Option<String>,
}

impl CrawlCommand {
    pub async fn execute(self, global: &GlobalConfig, cli: &CliConfig) -> Result<()> {
        let roots = self.roots().await?;
        let archs = self.archs(global)?;
        debug!(
            "Crawling {} roots for {}",
            roots.len(),
            archs.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(" ")
        );

        let pinned_path = self.pinned.clone().unwrap_or_else(|| global.pinned_file.clone());
        let pinned = PinnedPackages::load(&pinned_path, &global.extra_exclusions).await?;

        let source = HttpRecipeSource::from_config(global)?;
        let renderer = RecipeRenderer::new(RenderContext::new(archs.clone()));
        let branch = self.branch.clone().unwrap_or_else(|| global.branch.clone());
        let fetcher = RecipeFetcher::with_capacity(source, renderer, global.cache_capacity)
            .with_branch(branch);

        let options = CrawlOptions {
            archs,
            check_constraints: self.check_version_selector,
            filter: pinned.filter(global.toolchain_prefixes.clone()),
        };
        let mut crawler = Crawler::new(fetcher, options).with_progress(Spinner::new(cli.no_progress));
        let report = crawler.crawl(&roots).await;
        let [(recipe_hits, recipe_misses), (lookup_hits, lookup_misses)] =
            crawler.fetcher().cache_stats();
        debug!(
            "Recipe cache: {recipe_hits} hits, {recipe_misses} misses; lookup cache: {lookup_hits} hits, {lookup_misses} misses"
        );

        for line in self.render(&report) {
            println!("{line}");
        }
        Ok(())
    }

    async fn roots(&self) -> Result<Vec<PackageId>> {
        let roots = match (&self.feedstocks, &self.manifest) {
            (Some(list), _) => PackageId::parse_list(list)?,
            (None, Some(path)) => {
                Manifest::load(path)
                    .await
                    .with_context(|| format!("Failed to load manifest {}", path.display()))?
                    .feedstocks
            }
            (None, None) => Vec::new(),
        };
        if roots.is_empty() {
            return Err(CrawlError::NoRoots.into());
        }
        Ok(roots)
    }

    fn archs(&self, global: &GlobalConfig) -> Result<Vec<Arch>> {
        match self.archs.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Ok(Arch::parse_list(raw)?),
            _ => Ok(global.default_archs()?),
        }
    }

    fn render(&self, report: &CrawlReport) -> Vec<String> {
        let options = TreeOptions {
            expand: self.expand_tree,
            show_ranges: self.check_version_selector,
        };
        let mut lines = render_tree(report, options);
        lines.extend(render_summary(report));
        lines.push(String::new());
        let order: Vec<String> =
            report.build_order().iter().map(PackageId::feedstock_name).collect();
        lines.push(order.join(","));
        lines
    }
}
