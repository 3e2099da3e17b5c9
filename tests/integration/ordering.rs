//! Build order of crawled graphs, with and without cycles.

use std::collections::BTreeMap;

use feedcrawl::core::PackageId;
use feedcrawl::resolver::{CrawlOptions, CrawlReport, Crawler};
use feedcrawl::source::RecipeFetcher;
use feedcrawl::templating::RecipeRenderer;
use feedcrawl::test_utils::{MemorySource, RecipeFixture};

async fn crawl(source: MemorySource, roots: &[&str]) -> CrawlReport {
    let fetcher = RecipeFetcher::new(source, RecipeRenderer::default());
    let mut crawler = Crawler::new(fetcher, CrawlOptions::default());
    let roots: Vec<PackageId> = roots.iter().map(PackageId::new).collect();
    crawler.crawl(&roots).await
}

fn order(report: &CrawlReport) -> Vec<String> {
    report.build_order().iter().map(ToString::to_string).collect()
}

/// pandas -> {bottleneck, pytest}, bottleneck -> cython, pytest <-> pluggy.
fn pandas_source() -> MemorySource {
    MemorySource::new()
        .with_recipe("pandas", &RecipeFixture::new("pandas").host(&["bottleneck"]).run(&["pytest"]).to_yaml())
        .with_recipe("bottleneck", &RecipeFixture::new("bottleneck").build(&["cython"]).to_yaml())
        .with_recipe("cython", &RecipeFixture::new("cython").to_yaml())
        .with_recipe("pytest", &RecipeFixture::new("pytest").run(&["pluggy"]).to_yaml())
        .with_recipe("pluggy", &RecipeFixture::new("pluggy").run(&["pytest"]).to_yaml())
}

#[tokio::test]
async fn test_cycle_is_built_as_one_group() {
    let report = crawl(pandas_source(), &["pandas-feedstock"]).await;

    assert_eq!(order(&report), vec!["cython", "bottleneck", "pluggy", "pytest", "pandas"]);

    let classes = report.classes();
    assert_eq!(classes.len(), 4);
    let cycles: Vec<_> = classes.iter().filter(|c| c.is_cycle()).collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(
        cycles[0].members.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["pluggy", "pytest"]
    );
    assert_eq!(cycles[0].cycle_edges.len(), 2);
}

#[tokio::test]
async fn test_every_edge_points_backwards_outside_cycles() {
    let report = crawl(pandas_source(), &["pandas"]).await;
    let classes = report.classes();
    let tier: BTreeMap<&PackageId, usize> = classes
        .iter()
        .enumerate()
        .flat_map(|(i, class)| class.members.iter().map(move |m| (m, i)))
        .collect();

    for (node, deps) in &report.edges {
        for dep in deps {
            assert!(tier[dep] <= tier[node], "{dep} must not come after {node}");
            if tier[dep] == tier[node] {
                assert!(classes[tier[node]].is_cycle());
            }
        }
    }
}

#[tokio::test]
async fn test_several_roots_share_one_order() {
    let source = pandas_source()
        .with_recipe("scikit-image", &RecipeFixture::new("scikit-image").host(&["cython", "pooch"]).to_yaml())
        .with_recipe("pooch", &RecipeFixture::new("pooch").to_yaml());
    let report = crawl(source, &["scikit-image", "pandas"]).await;

    let order = order(&report);
    assert_eq!(order.len(), 7);
    assert_eq!(order[..2], ["cython", "pooch"]);
    assert_eq!(report.roots.len(), 2);
}

#[tokio::test]
async fn test_order_is_independent_of_root_order() {
    let first = crawl(pandas_source(), &["pandas", "pytest", "cython"]).await;
    let second = crawl(pandas_source(), &["cython", "pytest", "pandas"]).await;
    assert_eq!(order(&first), order(&second));
    assert_eq!(first.edges, second.edges);
}
