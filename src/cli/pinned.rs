//! The `pinned` command: manifest feedstocks that build pinned packages.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::{GlobalConfig, Manifest, PinnedPackages};
use crate::core::PackageId;
use crate::resolver::find_pinned_feedstocks;
use crate::source::{HttpRecipeSource, RecipeFetcher};
use crate::templating::RecipeRenderer;

#[derive(Args, Debug)]
pub struct PinnedCommand {
    /// Manifest file with a `feedstocks` list
    #[arg(short, long)]
    manifest: PathBuf,

    /// Pinned-packages file (conda_build_config.yaml)
    #[arg(long)]
    pinned: Option<PathBuf>,
}

impl PinnedCommand {
    pub async fn execute(self, global: &GlobalConfig) -> Result<()> {
        let manifest = Manifest::load(&self.manifest)
            .await
            .with_context(|| format!("Failed to load manifest {}", self.manifest.display()))?;
        let pinned_path = self.pinned.unwrap_or_else(|| global.pinned_file.clone());
        let pinned = PinnedPackages::load(&pinned_path, &global.extra_exclusions).await?;

        let source = HttpRecipeSource::from_config(global)?;
        let mut fetcher =
            RecipeFetcher::with_capacity(source, RecipeRenderer::default(), global.cache_capacity);
        let order = find_pinned_feedstocks(&mut fetcher, &manifest, &pinned).await;

        let names: Vec<String> = order.iter().map(PackageId::feedstock_name).collect();
        println!("{}", names.join(","));
        Ok(())
    }
}
