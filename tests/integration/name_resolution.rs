//! Mapping dependency names onto feedstocks during a crawl.

use std::collections::BTreeSet;

use feedcrawl::core::PackageId;
use feedcrawl::resolver::{CrawlOptions, Crawler, DependencyStatus, NodeKey};
use feedcrawl::source::{RecipeFetcher, Resolution};
use feedcrawl::templating::RecipeRenderer;
use feedcrawl::test_utils::{MemorySource, RecipeFixture};

fn fetcher(source: MemorySource) -> RecipeFetcher<MemorySource> {
    RecipeFetcher::new(source, RecipeRenderer::default())
}

#[tokio::test]
async fn test_resolution_priority() {
    let source = MemorySource::new()
        .with_recipe("libcurl", &RecipeFixture::new("libcurl").to_yaml())
        .with_recipe("curl", &RecipeFixture::new("curl").output("libcurl-static", &[]).to_yaml())
        .with_outputs("libcurl-static", &["curl"])
        .with_outputs("libgone", &["gone"]);
    let mut fetcher = fetcher(source);

    // A feedstock of the same name wins over any lookup.
    assert!(matches!(fetcher.resolve("libcurl").await, Resolution::Direct(_)));

    let lookup = fetcher.resolve("libcurl-static").await;
    assert!(matches!(lookup, Resolution::Lookup(_)));
    assert_eq!(lookup.feedstock(), Some(&PackageId::new("curl")));

    assert!(matches!(
        fetcher.resolve("libgone").await,
        Resolution::Missing { feedstock } if feedstock == PackageId::new("gone")
    ));
    assert!(matches!(fetcher.resolve("nowhere").await, Resolution::Unresolved));
}

#[tokio::test]
async fn test_underscore_output_of_dashed_feedstock() {
    let parent = RecipeFixture::new("ruamel-yaml").output("ruamel_yaml", &[]).to_yaml();
    let source = MemorySource::new()
        .with_recipe("app", &RecipeFixture::new("app").run(&["ruamel_yaml"]).to_yaml())
        .with_recipe("ruamel-yaml", &parent);
    let mut crawler = Crawler::new(fetcher(source), CrawlOptions::default());

    let report = crawler.crawl(&[PackageId::new("app")]).await;
    let entry = &report.children(&report.roots[0])[0];
    assert_eq!(entry.status, DependencyStatus::Available);
    assert_eq!(entry.subpackage_of, Some(PackageId::new("ruamel-yaml")));
    assert_eq!(
        entry.node,
        Some(NodeKey::new(PackageId::new("ruamel-yaml"), "ruamel_yaml"))
    );
    assert!(report.edges.contains_key(&PackageId::new("ruamel-yaml")));
}

#[tokio::test]
async fn test_sub_output_requirements_are_followed() {
    let arrow = RecipeFixture::new("arrow-cpp")
        .host(&["cmake-build-helper"])
        .output("libarrow", &["zstd"])
        .output("pyarrow", &["libarrow"])
        .to_yaml();
    let source = MemorySource::new()
        .with_recipe("app", &RecipeFixture::new("app").run(&["pyarrow"]).to_yaml())
        .with_recipe("arrow-cpp", &arrow)
        .with_recipe("zstd", &RecipeFixture::new("zstd").to_yaml())
        .with_outputs("pyarrow", &["arrow-cpp"])
        .with_outputs("libarrow", &["arrow-cpp"]);
    let mut crawler = Crawler::new(fetcher(source), CrawlOptions::default());

    let report = crawler.crawl(&[PackageId::new("app")]).await;
    let arrow = PackageId::new("arrow-cpp");

    // pyarrow pulls in libarrow, whose zstd dependency lands on arrow-cpp.
    let pyarrow = NodeKey::new(arrow.clone(), "pyarrow");
    let libarrow = NodeKey::new(arrow.clone(), "libarrow");
    assert_eq!(report.children(&pyarrow)[0].node, Some(libarrow.clone()));
    assert_eq!(report.children(&libarrow)[0].name, "zstd");
    assert_eq!(report.edges[&arrow], BTreeSet::from([PackageId::new("zstd")]));

    // The top-level host list belongs to neither output.
    assert!(!report.tree.values().flatten().any(|e| e.name == "cmake-build-helper"));

    let order = report.build_order();
    let names: Vec<&str> = order.iter().map(PackageId::as_str).collect();
    assert_eq!(names, vec!["zstd", "arrow-cpp", "app"]);
}

#[tokio::test]
async fn test_missing_root_is_located_through_lookup() {
    let source = MemorySource::new()
        .with_recipe("curl", &RecipeFixture::new("curl").output("libcurl", &[]).to_yaml())
        .with_outputs("libcurl", &["curl"]);
    let mut crawler = Crawler::new(fetcher(source), CrawlOptions::default());

    let report = crawler.crawl(&[PackageId::new("libcurl-feedstock")]).await;
    assert_eq!(report.roots, vec![NodeKey::new(PackageId::new("curl"), "libcurl")]);
    assert!(report.unlocated_roots.is_empty());
}
