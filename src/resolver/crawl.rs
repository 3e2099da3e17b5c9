//! Breadth-first crawl over feedstock recipes.
//!
//! A crawl starts from root feedstocks and follows every dependency declared
//! in their recipes until no new feedstock turns up. Work items are
//! `(feedstock, package)` pairs: a split feedstock may be reached through
//! several of its outputs, and each output has its own requirement lists.
//! Edges are recorded per feedstock, so the edge map the sorter sees has one
//! node per feedstock.
//!
//! All mutable state lives in a [`CrawlState`] created per call to
//! [`Crawler::crawl`]; the fetcher and its caches are the only things shared
//! between crawls.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::EdgeMap;
use super::checks::{ConstraintFailure, check_dependency, dependency_arch_support};
use super::sort::{EquivalenceClass, build_order, sort};
use crate::core::PackageId;
use crate::recipe::{DependencyFilter, extract_specs};
use crate::source::{FetchedRecipe, RecipeFetcher, RecipeSource, Resolution};
use crate::templating::Arch;
use crate::utils::progress::Spinner;

/// A package read from a feedstock's recipe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey {
    pub feedstock: PackageId,
    /// Top-level package or sub-output name within the recipe.
    pub package: String,
}

impl NodeKey {
    pub fn new(feedstock: PackageId, package: impl Into<String>) -> Self {
        Self {
            feedstock,
            package: package.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.feedstock.feedstock_name())
    }
}

/// Outcome for one declared dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    Available,
    /// Found, but failing availability checks.
    Outdated(Vec<ConstraintFailure>),
    /// A feedstock was named but has no recipe on the branch.
    Missing,
    /// No feedstock could be located.
    Unresolved,
}

impl DependencyStatus {
    pub const fn marker(&self) -> &'static str {
        match self {
            Self::Available => "(✓)",
            Self::Outdated(_) => "(^)",
            Self::Missing => "(!)",
            Self::Unresolved => "(?)",
        }
    }

    pub const fn is_problem(&self) -> bool {
        !matches!(self, Self::Available)
    }
}

/// One line of the dependency tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Name as declared in the parent recipe.
    pub name: String,
    pub range: Option<String>,
    pub status: DependencyStatus,
    /// Node the dependency resolved to, when a recipe was found.
    pub node: Option<NodeKey>,
    /// Parent feedstock when the name was guessed to be a sub-output.
    pub subpackage_of: Option<PackageId>,
    /// Version of the resolved recipe.
    pub version: Option<String>,
}

/// Settings of one crawl.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub archs: Vec<Arch>,
    /// Check version ranges and architecture skips of found dependencies.
    pub check_constraints: bool,
    pub filter: DependencyFilter,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            archs: Arch::SUPPORTED.to_vec(),
            check_constraints: false,
            filter: DependencyFilter::default(),
        }
    }
}

/// Everything a crawl found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    /// Located roots, in the order given.
    pub roots: Vec<NodeKey>,
    /// Roots without a recipe; skipped.
    pub unlocated_roots: Vec<PackageId>,
    pub edges: EdgeMap,
    pub tree: BTreeMap<NodeKey, Vec<TreeEntry>>,
    pub missing: Vec<String>,
    pub outdated: Vec<String>,
    pub needs_review: Vec<String>,
}

impl CrawlReport {
    pub fn children(&self, node: &NodeKey) -> &[TreeEntry] {
        self.tree.get(node).map_or(&[], Vec::as_slice)
    }

    pub fn classes(&self) -> Vec<EquivalenceClass> {
        sort(&self.edges).collect()
    }

    pub fn build_order(&self) -> Vec<PackageId> {
        build_order(&self.edges)
    }

    pub fn has_problems(&self) -> bool {
        !(self.missing.is_empty() && self.outdated.is_empty() && self.needs_review.is_empty())
    }
}

struct WorkItem {
    node: NodeKey,
    recipe: Arc<FetchedRecipe>,
}

/// Mutable state of a single crawl.
#[derive(Default)]
pub struct CrawlState {
    queue: VecDeque<WorkItem>,
    visited: BTreeSet<NodeKey>,
    report: CrawlReport,
}

impl CrawlState {
    fn enqueue(&mut self, node: NodeKey, recipe: Arc<FetchedRecipe>) {
        if self.visited.insert(node.clone()) {
            self.queue.push_back(WorkItem { node, recipe });
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn visited(&self) -> usize {
        self.visited.len()
    }

    fn into_report(self) -> CrawlReport {
        self.report
    }
}

fn note(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

/// Crawls recipes through a [`RecipeFetcher`].
pub struct Crawler<S> {
    fetcher: RecipeFetcher<S>,
    options: CrawlOptions,
    progress: Spinner,
}

impl<S: RecipeSource> Crawler<S> {
    pub fn new(fetcher: RecipeFetcher<S>, options: CrawlOptions) -> Self {
        Self {
            fetcher,
            options,
            progress: Spinner::hidden(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Spinner) -> Self {
        self.progress = progress;
        self
    }

    pub fn fetcher(&self) -> &RecipeFetcher<S> {
        &self.fetcher
    }

    pub fn fetcher_mut(&mut self) -> &mut RecipeFetcher<S> {
        &mut self.fetcher
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.options
    }

    /// Crawl from `roots` to a fixed point.
    ///
    /// Roots without a recipe are logged and skipped. Missing or unresolved
    /// dependencies are reported, never fatal.
    pub async fn crawl(&mut self, roots: &[PackageId]) -> CrawlReport {
        let mut state = CrawlState::default();
        self.progress.set_prefix("Crawling");

        for root in roots {
            match self.fetcher.locate(root.as_str(), true).await {
                Some(found) => {
                    let node = NodeKey::new(found.feedstock.clone(), root.as_str());
                    if !state.report.roots.contains(&node) {
                        state.report.roots.push(node.clone());
                    }
                    state.enqueue(node, found);
                }
                None => {
                    warn!("Unable to locate the {} feedstock", root.feedstock_name());
                    state.report.unlocated_roots.push(root.clone());
                }
            }
        }

        while let Some(item) = state.queue.pop_front() {
            self.progress.set_message(format!(
                "{} ({} visited, {} queued)",
                item.node.feedstock.feedstock_name(),
                state.visited(),
                state.queued()
            ));
            self.process(&mut state, item).await;
        }
        self.progress.finish_and_clear();

        let report = state.into_report();
        info!(
            "Crawled {} feedstocks: {} missing, {} outdated, {} to review",
            report.edges.len(),
            report.missing.len(),
            report.outdated.len(),
            report.needs_review.len()
        );
        report
    }

    async fn process(&mut self, state: &mut CrawlState, item: WorkItem) {
        let WorkItem { node, recipe } = item;
        info!("Processing {} ({})", node.feedstock.feedstock_name(), node.package);

        let specs = extract_specs(&recipe.recipe, &node.package, &self.options.filter);
        let mut entries = Vec::with_capacity(specs.len());
        let mut dependencies = BTreeSet::new();

        for (name, spec) in specs {
            if name == node.package {
                continue;
            }
            let resolution = self.fetcher.resolve(&name).await;
            let mut entry = TreeEntry {
                name: name.clone(),
                range: spec.range.clone(),
                status: DependencyStatus::Available,
                node: None,
                subpackage_of: None,
                version: None,
            };

            match &resolution {
                Resolution::Missing { feedstock } => {
                    debug!("{} -> {} (missing)", name, feedstock.feedstock_name());
                    entry.status = DependencyStatus::Missing;
                    note(&mut state.report.missing, &name);
                }
                Resolution::Unresolved => {
                    entry.status = DependencyStatus::Unresolved;
                    note(&mut state.report.needs_review, &name);
                }
                Resolution::Direct(fetched)
                | Resolution::Lookup(fetched)
                | Resolution::Guessed { parent: fetched, .. } => {
                    let fetched = Arc::clone(fetched);
                    if matches!(resolution, Resolution::Guessed { .. }) {
                        entry.subpackage_of = Some(fetched.feedstock.clone());
                    }
                    let child = NodeKey::new(fetched.feedstock.clone(), resolution.package_name(&name));
                    entry.version = fetched.recipe.version().map(str::to_string);

                    if self.options.check_constraints {
                        let required_on = dependency_arch_support(
                            &recipe.raw,
                            &node.package,
                            &name,
                            &self.options.archs,
                        );
                        let failures =
                            check_dependency(&spec, &fetched, &required_on, &self.options.archs);
                        if !failures.is_empty() {
                            entry.status = DependencyStatus::Outdated(failures);
                            note(&mut state.report.outdated, &name);
                        }
                    }

                    if fetched.feedstock != node.feedstock {
                        dependencies.insert(fetched.feedstock.clone());
                    }
                    entry.node = Some(child.clone());
                    state.enqueue(child, fetched);
                }
            }
            entries.push(entry);
        }

        state
            .report
            .edges
            .entry(node.feedstock.clone())
            .or_default()
            .extend(dependencies);
        state.report.tree.insert(node, entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templating::RecipeRenderer;
    use crate::test_utils::{MemorySource, RecipeFixture};

    fn crawler(source: MemorySource, options: CrawlOptions) -> Crawler<MemorySource> {
        Crawler::new(RecipeFetcher::new(source, RecipeRenderer::default()), options)
    }

    fn ids(names: &[&str]) -> Vec<PackageId> {
        names.iter().map(PackageId::new).collect()
    }

    fn names(order: &[PackageId]) -> Vec<&str> {
        order.iter().map(PackageId::as_str).collect()
    }

    #[tokio::test]
    async fn test_chain_builds_in_dependency_order() {
        let source = MemorySource::new()
            .with_recipe("app", &RecipeFixture::new("app").run(&["libfoo >=1.0"]).to_yaml())
            .with_recipe("libfoo", &RecipeFixture::new("libfoo").host(&["zlib"]).to_yaml())
            .with_recipe("zlib", &RecipeFixture::new("zlib").to_yaml());
        let mut c = crawler(source, CrawlOptions::default());

        let report = c.crawl(&ids(&["app-feedstock"])).await;
        assert_eq!(names(&report.build_order()), vec!["zlib", "libfoo", "app"]);
        assert_eq!(report.roots, vec![NodeKey::new(PackageId::new("app"), "app")]);
        assert!(!report.has_problems());

        let children = report.children(&report.roots[0]);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].range.as_deref(), Some(">=1.0"));
        assert_eq!(children[0].status, DependencyStatus::Available);
    }

    #[tokio::test]
    async fn test_cycle_collapses_into_one_class() {
        let source = MemorySource::new()
            .with_recipe("aaa", &RecipeFixture::new("aaa").run(&["bbb"]).to_yaml())
            .with_recipe("bbb", &RecipeFixture::new("bbb").run(&["aaa"]).to_yaml());
        let mut c = crawler(source, CrawlOptions::default());

        let report = c.crawl(&ids(&["aaa"])).await;
        let classes = report.classes();
        assert_eq!(classes.len(), 1);
        assert!(classes[0].is_cycle());
        assert_eq!(names(&report.build_order()), vec!["aaa", "bbb"]);
    }

    #[tokio::test]
    async fn test_filtered_names_are_not_followed() {
        let recipe = RecipeFixture::new("app")
            .build(&["{{ compiler('c') }}", "ctng-compilers-src"])
            .host(&["python", "numpy", "_openmp_mutex", "pip"])
            .to_yaml();
        let source = MemorySource::new()
            .with_recipe("app", &recipe)
            .with_recipe("pip", &RecipeFixture::new("pip").to_yaml());
        let mut c = crawler(source, CrawlOptions::default());

        let report = c.crawl(&ids(&["app"])).await;
        let declared: Vec<&str> = report.children(&report.roots[0]).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(declared, vec!["pip"]);
        assert_eq!(report.edges[&PackageId::new("app")], BTreeSet::from([PackageId::new("pip")]));
    }

    #[tokio::test]
    async fn test_problem_lists_are_deduplicated() {
        let source = MemorySource::new()
            .with_recipe("app", &RecipeFixture::new("app").run(&["gone-lib", "mystery", "tool"]).to_yaml())
            .with_recipe("tool", &RecipeFixture::new("tool").run(&["gone-lib", "mystery"]).to_yaml())
            .with_outputs("gone-lib", &["gone"]);
        let mut c = crawler(source, CrawlOptions::default());

        let report = c.crawl(&ids(&["app"])).await;
        assert_eq!(report.missing, vec!["gone-lib"]);
        assert_eq!(report.needs_review, vec!["mystery"]);
        assert!(report.has_problems());
        // Unavailable dependencies never become graph nodes.
        assert_eq!(names(&report.build_order()), vec!["tool", "app"]);
    }

    #[tokio::test]
    async fn test_unlocated_roots_are_skipped() {
        let source = MemorySource::new().with_recipe("zlib", &RecipeFixture::new("zlib").to_yaml());
        let mut c = crawler(source, CrawlOptions::default());

        let report = c.crawl(&ids(&["nothere", "zlib"])).await;
        assert_eq!(report.unlocated_roots, ids(&["nothere"]));
        assert_eq!(names(&report.build_order()), vec!["zlib"]);
    }

    #[tokio::test]
    async fn test_renamed_dependency_joins_its_feedstock() {
        let zlib = RecipeFixture::new("zlib")
            .output("libzlib", &[])
            .output("zlib", &["libzlib"])
            .to_yaml();
        let source = MemorySource::new()
            .with_recipe("app", &RecipeFixture::new("app").run(&["libzlib", "zlib"]).to_yaml())
            .with_recipe("zlib", &zlib)
            .with_outputs("libzlib", &["zlib"]);
        let mut c = crawler(source, CrawlOptions::default());

        let report = c.crawl(&ids(&["app"])).await;
        assert_eq!(report.edges.len(), 2);
        assert_eq!(names(&report.build_order()), vec!["zlib", "app"]);
        let children = report.children(&report.roots[0]);
        assert_eq!(
            children[0].node,
            Some(NodeKey::new(PackageId::new("zlib"), "libzlib"))
        );
        // libzlib is read from the zlib recipe, without a self edge.
        assert!(report.edges[&PackageId::new("zlib")].is_empty());
    }

    #[tokio::test]
    async fn test_each_recipe_is_fetched_once() {
        let source = MemorySource::new()
            .with_recipe("app", &RecipeFixture::new("app").run(&["left", "right"]).to_yaml())
            .with_recipe("left", &RecipeFixture::new("left").run(&["base"]).to_yaml())
            .with_recipe("right", &RecipeFixture::new("right").run(&["base"]).to_yaml())
            .with_recipe("base", &RecipeFixture::new("base").to_yaml());
        let mut c = crawler(source, CrawlOptions::default());

        c.crawl(&ids(&["app"])).await;
        assert_eq!(c.fetcher().source().recipe_requests(), 4);
        assert_eq!(c.fetcher().source().lookup_requests(), 0);
    }

    #[tokio::test]
    async fn test_guessed_subpackage_is_recorded() {
        let parent = RecipeFixture::new("arrow-cpp").output("arrow-cpp-proc", &[]).to_yaml();
        let source = MemorySource::new()
            .with_recipe("app", &RecipeFixture::new("app").run(&["arrow-cpp-proc"]).to_yaml())
            .with_recipe("arrow-cpp", &parent);
        let mut c = crawler(source, CrawlOptions::default());

        let report = c.crawl(&ids(&["app"])).await;
        let entry = &report.children(&report.roots[0])[0];
        assert_eq!(entry.subpackage_of, Some(PackageId::new("arrow-cpp")));
        assert_eq!(names(&report.build_order()), vec!["arrow-cpp", "app"]);
    }

    #[tokio::test]
    async fn test_every_located_dependency_is_followed() {
        let source = MemorySource::new()
            .with_recipe(
                "app",
                &RecipeFixture::new("app").run(&["zlib", "libcurl-static", "arrow-cpp-proc"]).to_yaml(),
            )
            .with_recipe("zlib", &RecipeFixture::new("zlib").to_yaml())
            .with_recipe("curl", &RecipeFixture::new("curl").to_yaml())
            .with_outputs("libcurl-static", &["curl"])
            .with_recipe("arrow-cpp", &RecipeFixture::new("arrow-cpp").output("arrow-cpp-proc", &[]).to_yaml());
        let mut c = crawler(source, CrawlOptions::default());

        let report = c.crawl(&ids(&["app"])).await;
        let children = report.children(&report.roots[0]);
        assert_eq!(children.len(), 3);
        for (dep, feedstock) in [("zlib", "zlib"), ("libcurl-static", "curl"), ("arrow-cpp-proc", "arrow-cpp")] {
            let entry = children.iter().find(|e| e.name == dep).unwrap();
            assert_eq!(entry.status, DependencyStatus::Available);
            assert_eq!(entry.node, Some(NodeKey::new(PackageId::new(feedstock), dep)));
            assert_eq!(entry.subpackage_of.is_some(), dep == "arrow-cpp-proc");
        }
        assert_eq!(
            report.edges[&PackageId::new("app")],
            ids(&["arrow-cpp", "curl", "zlib"]).into_iter().collect::<BTreeSet<_>>()
        );
        assert!(!report.has_problems());
    }

    #[tokio::test]
    async fn test_constraint_checks_mark_outdated() {
        let app = RecipeFixture::new("app").run(&["libfoo >=2", "libbar  # [win]"]).to_yaml();
        let source = MemorySource::new()
            .with_recipe("app", &app)
            .with_recipe("libfoo", &RecipeFixture::new("libfoo").version("1.4").to_yaml())
            .with_recipe("libbar", &RecipeFixture::new("libbar").skip("# [win]").to_yaml());
        let options = CrawlOptions {
            archs: vec![Arch::Linux64, Arch::Win64],
            check_constraints: true,
            ..CrawlOptions::default()
        };
        let mut c = crawler(source, options);

        let report = c.crawl(&ids(&["app"])).await;
        assert_eq!(report.outdated, vec!["libbar", "libfoo"]);
        let children = report.children(&report.roots[0]);
        assert!(matches!(&children[1].status, DependencyStatus::Outdated(f) if f.len() == 1));
        // Outdated dependencies are still part of the build order.
        assert_eq!(names(&report.build_order()), vec!["libbar", "libfoo", "app"]);
    }

    #[tokio::test]
    async fn test_checks_disabled_by_default() {
        let source = MemorySource::new()
            .with_recipe("app", &RecipeFixture::new("app").run(&["libfoo >=2"]).to_yaml())
            .with_recipe("libfoo", &RecipeFixture::new("libfoo").version("1.4").to_yaml());
        let mut c = crawler(source, CrawlOptions::default());
        assert!(c.crawl(&ids(&["app"])).await.outdated.is_empty());
    }
}
