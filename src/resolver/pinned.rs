//! Manifest feedstocks that build pinned packages.
//!
//! Pinned packages are excluded from crawls, so the feedstocks producing them
//! have to be built up front. For each pinned package, every feedstock the
//! lookup service lists is checked against the manifest; matches are
//! collected in discovery order and returned reversed.

use tracing::debug;

use crate::config::{Manifest, PinnedPackages};
use crate::core::PackageId;
use crate::source::{RecipeFetcher, RecipeSource};

/// Manifest feedstocks providing a pinned package, in reverse discovery
/// order.
pub async fn find_pinned_feedstocks<S: RecipeSource>(
    fetcher: &mut RecipeFetcher<S>,
    manifest: &Manifest,
    pinned: &PinnedPackages,
) -> Vec<PackageId> {
    let mut found: Vec<PackageId> = Vec::new();
    for package in pinned.names() {
        for feedstock in fetcher.lookup_feedstocks(package).await {
            let feedstock = PackageId::new(&feedstock);
            if manifest.contains(&feedstock) && !found.contains(&feedstock) {
                debug!("{} provides pinned package {}", feedstock.feedstock_name(), package);
                found.push(feedstock);
            }
        }
    }
    found.reverse();
    found
}
