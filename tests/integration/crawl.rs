//! Crawls over templated recipes with selectors and availability checks.

use feedcrawl::core::PackageId;
use feedcrawl::resolver::{ConstraintFailure, CrawlOptions, Crawler, DependencyStatus};
use feedcrawl::source::RecipeFetcher;
use feedcrawl::templating::{Arch, RecipeRenderer, RenderContext};
use feedcrawl::test_utils::{MemorySource, RecipeFixture, init_test_logging};

const SCIPY: &str = r#"{% set name = "scipy" %}
{% set version = "1.13.1" %}

package:
  name: {{ name }}
  version: {{ version }}

build:
  number: 0
  skip: true  # [win]

requirements:
  build:
    - {{ compiler('c') }}
    - {{ compiler('fortran') }}  # [unix]
    - meson-python
  host:
    - python
    - pip
    - pybind11 >=2.12
    - libblas
    - m2w64-toolchain  # [win]
  run:
    - python
    - pybind11
"#;

fn crawler(source: MemorySource, archs: &[Arch], check_constraints: bool) -> Crawler<MemorySource> {
    let renderer = RecipeRenderer::new(RenderContext::new(archs.to_vec()));
    let options = CrawlOptions {
        archs: archs.to_vec(),
        check_constraints,
        ..CrawlOptions::default()
    };
    Crawler::new(RecipeFetcher::new(source, renderer), options)
}

fn source() -> MemorySource {
    MemorySource::new()
        .with_recipe("scipy", SCIPY)
        .with_recipe("meson-python", &RecipeFixture::new("meson-python").version("0.16.0").to_yaml())
        .with_recipe("pybind11", &RecipeFixture::new("pybind11").version("2.11.1").to_yaml())
        .with_recipe("pip", &RecipeFixture::new("pip").version("24.0").to_yaml())
}

fn declared(report: &feedcrawl::resolver::CrawlReport) -> Vec<&str> {
    report.children(&report.roots[0]).iter().map(|entry| entry.name.as_str()).collect()
}

#[tokio::test]
async fn test_templated_recipe_for_linux() {
    init_test_logging(None);
    let mut crawler = crawler(source(), &[Arch::Linux64], false);
    let report = crawler.crawl(&[PackageId::new("scipy-feedstock")]).await;

    // Compiler stubs, python and the pinned libblas are not followed.
    assert_eq!(declared(&report), vec!["meson-python", "pip", "pybind11"]);
    assert!(!report.has_problems());
    assert_eq!(report.edges.len(), 4);

    let order: Vec<String> = report.build_order().iter().map(PackageId::feedstock_name).collect();
    assert_eq!(
        order,
        vec!["meson-python-feedstock", "pip-feedstock", "pybind11-feedstock", "scipy-feedstock"]
    );
}

#[tokio::test]
async fn test_windows_selectors_add_dependencies() {
    let mut crawler = crawler(source(), &[Arch::Linux64, Arch::Win64], false);
    let report = crawler.crawl(&[PackageId::new("scipy")]).await;

    assert!(declared(&report).contains(&"m2w64-toolchain"));
    assert_eq!(report.needs_review, vec!["m2w64-toolchain"]);
}

#[tokio::test]
async fn test_version_range_check() {
    let mut crawler = crawler(source(), &[Arch::Linux64], true);
    let report = crawler.crawl(&[PackageId::new("scipy")]).await;

    assert_eq!(report.outdated, vec!["pybind11"]);
    let pybind = report
        .children(&report.roots[0])
        .iter()
        .find(|entry| entry.name == "pybind11")
        .unwrap();
    assert_eq!(pybind.range.as_deref(), Some(">=2.12"));
    assert_eq!(pybind.version.as_deref(), Some("2.11.1"));
    assert_eq!(
        pybind.status,
        DependencyStatus::Outdated(vec![ConstraintFailure::VersionOutOfRange {
            version: "2.11.1".to_string(),
            range: ">=2.12".to_string(),
        }])
    );
}

#[tokio::test]
async fn test_skipped_arch_is_reported_only_where_required() {
    let app = RecipeFixture::new("app").run(&["scipy", "pip  # [win]"]).to_yaml();
    let source = source().with_recipe("app", &app);

    let mut linux_and_win = crawler(source, &[Arch::Linux64, Arch::Win64], true);
    let report = linux_and_win.crawl(&[PackageId::new("app")]).await;
    let scipy = report
        .children(&report.roots[0])
        .iter()
        .find(|entry| entry.name == "scipy")
        .unwrap();
    assert_eq!(
        scipy.status,
        DependencyStatus::Outdated(vec![ConstraintFailure::SkippedArchs(vec![Arch::Win64])])
    );
    assert!(report.outdated.contains(&"scipy".to_string()));
    assert!(!report.outdated.contains(&"pip".to_string()));
}

#[tokio::test]
async fn test_crawl_is_repeatable_on_one_fetcher() {
    let mut crawler = crawler(source(), &[Arch::Linux64], false);
    let first = crawler.crawl(&[PackageId::new("scipy")]).await;
    let requests = crawler.fetcher().source().recipe_requests();
    let second = crawler.crawl(&[PackageId::new("scipy")]).await;

    assert_eq!(first, second);
    // The second crawl is served from the caches.
    assert_eq!(crawler.fetcher().source().recipe_requests(), requests);
}
