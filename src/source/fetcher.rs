//! Memoized recipe fetching and dependency-name resolution.
//!
//! [`RecipeFetcher`] wraps a [`RecipeSource`] with two LRU caches, one for
//! rendered recipes keyed by `(name, branch)` and one for feedstock-name
//! lookups keyed by package name. Failures are cached as well, so within one
//! crawl no request is ever issued twice.
//!
//! # Name resolution
//!
//! A dependency name does not always match the feedstock that builds it.
//! [`RecipeFetcher::resolve`] tries, in strict order:
//!
//! 1. a feedstock named exactly like the dependency ([`Resolution::Direct`])
//! 2. the feedstock-outputs service ([`Resolution::Lookup`])
//! 3. separator guesses: `-` kept, `-` to `_`, `_` kept, `_` to `-`; each
//!    guess tries the prefixes of the transformed name, longest first, and
//!    accepts a prefix feedstock declaring a matching sub-output
//!    ([`Resolution::Guessed`])
//!
//! Anything else is [`Resolution::Missing`] when some feedstock name was
//! determined, or [`Resolution::Unresolved`].

use std::sync::Arc;

use tracing::{debug, warn};

use super::RecipeSource;
use crate::cache::LookupCache;
use crate::constants::{DEFAULT_BRANCH, DEFAULT_CACHE_CAPACITY};
use crate::core::PackageId;
use crate::recipe::Recipe;
use crate::templating::RecipeRenderer;

/// Separator guesses as (separator, replacement), tried in order.
const SEPARATOR_GUESSES: [(char, char); 4] = [('-', '-'), ('-', '_'), ('_', '_'), ('_', '-')];

/// A located and rendered recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRecipe {
    /// Feedstock the recipe was read from.
    pub feedstock: PackageId,
    pub branch: String,
    /// Text as served, before rendering.
    pub raw: String,
    pub recipe: Recipe,
}

/// How a dependency name was mapped onto a feedstock.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Direct(Arc<FetchedRecipe>),
    Lookup(Arc<FetchedRecipe>),
    /// `output` is a sub-output of the parent feedstock's recipe.
    Guessed {
        parent: Arc<FetchedRecipe>,
        output: String,
    },
    /// A feedstock was named but its recipe is not on the branch.
    Missing {
        feedstock: PackageId,
    },
    Unresolved,
}

impl Resolution {
    pub fn recipe(&self) -> Option<&Arc<FetchedRecipe>> {
        match self {
            Self::Direct(found) | Self::Lookup(found) => Some(found),
            Self::Guessed { parent, .. } => Some(parent),
            Self::Missing { .. } | Self::Unresolved => None,
        }
    }

    /// Feedstock the dependency maps to, if any was determined.
    pub fn feedstock(&self) -> Option<&PackageId> {
        match self {
            Self::Missing { feedstock } => Some(feedstock),
            other => other.recipe().map(|found| &found.feedstock),
        }
    }

    /// Name under which the dependency's requirements are read from the
    /// resolved recipe.
    pub fn package_name<'a>(&'a self, dep: &'a str) -> &'a str {
        match self {
            Self::Guessed { output, .. } => output,
            _ => dep,
        }
    }

    pub fn is_found(&self) -> bool {
        self.recipe().is_some()
    }
}

/// Fetches, renders and memoizes recipes from a [`RecipeSource`].
pub struct RecipeFetcher<S> {
    source: S,
    renderer: RecipeRenderer,
    branch: String,
    recipes: LookupCache<(String, String), Option<Arc<FetchedRecipe>>>,
    lookups: LookupCache<String, Vec<String>>,
}

impl<S: RecipeSource> RecipeFetcher<S> {
    pub fn new(source: S, renderer: RecipeRenderer) -> Self {
        Self::with_capacity(source, renderer, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(source: S, renderer: RecipeRenderer, capacity: usize) -> Self {
        Self {
            source,
            renderer,
            branch: DEFAULT_BRANCH.to_string(),
            recipes: LookupCache::new("recipes", capacity),
            lookups: LookupCache::new("feedstock-names", capacity),
        }
    }

    /// Default branch used by [`locate`](Self::locate) and
    /// [`resolve`](Self::resolve).
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn renderer(&self) -> &RecipeRenderer {
        &self.renderer
    }

    /// Recipe of feedstock `name` on `branch`, rendered.
    ///
    /// Absence and transport failures both yield `None`; either result is
    /// cached.
    pub async fn fetch(&mut self, name: &str, branch: &str) -> Option<Arc<FetchedRecipe>> {
        let key = (name.to_string(), branch.to_string());
        if let Some(cached) = self.recipes.get(&key) {
            return cached;
        }

        let fetched = match self.source.recipe(name, branch).await {
            Ok(raw) => {
                let recipe = self.renderer.render(name, &raw);
                Some(Arc::new(FetchedRecipe {
                    feedstock: PackageId::new(name),
                    branch: branch.to_string(),
                    raw,
                    recipe,
                }))
            }
            Err(e) => {
                debug!("No recipe for {}: {}", name, e);
                None
            }
        };
        self.recipes.insert(key, fetched.clone());
        fetched
    }

    /// All feedstocks the lookup service lists for package `dep`.
    ///
    /// Identifiers shorter than three characters are never looked up.
    pub async fn lookup_feedstocks(&mut self, dep: &str) -> Vec<String> {
        if dep.chars().count() < 3 {
            return Vec::new();
        }
        if let Some(cached) = self.lookups.get(&dep.to_string()) {
            return cached;
        }

        let names = match self.source.feedstock_outputs(dep, DEFAULT_BRANCH).await {
            Ok(names) => names,
            Err(e) => {
                debug!("Feedstock lookup for {} failed: {}", dep, e);
                Vec::new()
            }
        };
        self.lookups.insert(dep.to_string(), names.clone());
        names
    }

    /// First feedstock the lookup service lists for `dep`.
    pub async fn lookup_feedstock(&mut self, dep: &str) -> Option<String> {
        self.lookup_feedstocks(dep).await.into_iter().next()
    }

    /// Fetch `name` on the default branch, falling back to one lookup of an
    /// alternate feedstock name when `lookup` is set.
    pub async fn locate(&mut self, name: &str, lookup: bool) -> Option<Arc<FetchedRecipe>> {
        let branch = self.branch.clone();
        if let Some(found) = self.fetch(name, &branch).await {
            return Some(found);
        }
        if !lookup {
            return None;
        }
        let alternate = self.lookup_feedstock(name).await?;
        if alternate == name {
            return None;
        }
        self.fetch(&alternate, &branch).await
    }

    /// Map a dependency name onto a feedstock.
    ///
    /// Only the caches are touched; the result depends on `dep` alone.
    pub async fn resolve(&mut self, dep: &str) -> Resolution {
        let branch = self.branch.clone();
        if let Some(found) = self.fetch(dep, &branch).await {
            return Resolution::Direct(found);
        }

        let mut named = None;
        if let Some(alternate) = self.lookup_feedstock(dep).await {
            if alternate != dep
                && let Some(found) = self.fetch(&alternate, &branch).await
            {
                return Resolution::Lookup(found);
            }
            named = Some(PackageId::new(&alternate));
        }

        for (separator, replacement) in SEPARATOR_GUESSES {
            if let Some((parent, output)) = self.guess(dep, separator, replacement).await {
                debug!("{} is a sub-output of {}", dep, parent.feedstock.feedstock_name());
                return Resolution::Guessed { parent, output };
            }
        }

        match named {
            Some(feedstock) => {
                warn!("{} maps to {} which has no recipe on {}", dep, feedstock.feedstock_name(), branch);
                Resolution::Missing { feedstock }
            }
            None => Resolution::Unresolved,
        }
    }

    async fn guess(
        &mut self,
        dep: &str,
        separator: char,
        replacement: char,
    ) -> Option<(Arc<FetchedRecipe>, String)> {
        if !dep.contains(separator) {
            return None;
        }
        let transformed = dep.replace(separator, &replacement.to_string());
        let restored = transformed.replace(replacement, &separator.to_string());
        let parts: Vec<&str> = transformed.split(separator).collect();

        for end in (1..=parts.len()).rev() {
            let prefix = parts[..end].join(&separator.to_string());
            let Some(parent) = self.locate(&prefix, true).await else {
                continue;
            };
            let output = parent
                .recipe
                .output_names()
                .find(|name| *name == transformed || *name == restored)
                .map(str::to_string);
            if let Some(output) = output {
                return Some((parent, output));
            }
        }
        None
    }

    /// (hits, misses) of the recipe and lookup caches.
    pub fn cache_stats(&self) -> [(usize, usize); 2] {
        [self.recipes.stats(), self.lookups.stats()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemorySource;

    fn fetcher(source: MemorySource) -> RecipeFetcher<MemorySource> {
        RecipeFetcher::new(source, RecipeRenderer::default())
    }

    #[tokio::test]
    async fn test_fetch_is_memoized_including_misses() {
        let source = MemorySource::new().with_recipe("zlib", "package:\n  name: zlib\n");
        let mut f = fetcher(source);

        assert!(f.fetch("zlib", "main").await.is_some());
        assert!(f.fetch("zlib", "main").await.is_some());
        assert!(f.fetch("nope", "main").await.is_none());
        assert!(f.fetch("nope", "main").await.is_none());
        assert_eq!(f.source().recipe_requests(), 2);
        assert_eq!(f.cache_stats()[0], (2, 2));
    }

    #[tokio::test]
    async fn test_branch_is_part_of_the_key() {
        let source = MemorySource::new()
            .with_recipe("zlib", "package:\n  name: zlib\n  version: 1.3\n")
            .with_branch_recipe("zlib", "dev", "package:\n  name: zlib\n  version: 1.4\n");
        let mut f = fetcher(source);
        let main = f.fetch("zlib", "main").await.unwrap();
        let dev = f.fetch("zlib", "dev").await.unwrap();
        assert_eq!(main.recipe.version(), Some("1.3"));
        assert_eq!(dev.recipe.version(), Some("1.4"));
        assert_eq!(dev.branch, "dev");
    }

    #[tokio::test]
    async fn test_short_names_are_never_looked_up() {
        let source = MemorySource::new().with_outputs("xz", &["xz"]);
        let mut f = fetcher(source);
        assert_eq!(f.lookup_feedstock("xz").await, None);
        assert_eq!(f.source().lookup_requests(), 0);
    }

    #[tokio::test]
    async fn test_lookup_is_memoized() {
        let source = MemorySource::new().with_outputs("libzlib", &["zlib", "zlib-ng"]);
        let mut f = fetcher(source);
        assert_eq!(f.lookup_feedstock("libzlib").await.as_deref(), Some("zlib"));
        assert_eq!(f.lookup_feedstocks("libzlib").await, vec!["zlib", "zlib-ng"]);
        assert_eq!(f.source().lookup_requests(), 1);
    }

    #[tokio::test]
    async fn test_locate_lookup_only_when_requested() {
        let source = MemorySource::new()
            .with_recipe("zlib", "package:\n  name: zlib\n")
            .with_outputs("libzlib", &["zlib"]);
        let mut f = fetcher(source);
        assert!(f.locate("libzlib", false).await.is_none());
        let found = f.locate("libzlib", true).await.unwrap();
        assert_eq!(found.feedstock.as_str(), "zlib");
    }

    #[tokio::test]
    async fn test_resolve_priority() {
        let source = MemorySource::new()
            .with_recipe("zlib", "package:\n  name: zlib\n")
            .with_outputs("libzlib", &["zlib"])
            .with_outputs("gone-pkg", &["gone"]);
        let mut f = fetcher(source);

        assert!(matches!(f.resolve("zlib").await, Resolution::Direct(_)));
        let lookup = f.resolve("libzlib").await;
        assert!(matches!(lookup, Resolution::Lookup(_)));
        assert_eq!(lookup.feedstock().map(PackageId::as_str), Some("zlib"));
        assert_eq!(
            f.resolve("gone-pkg").await,
            Resolution::Missing {
                feedstock: PackageId::new("gone")
            }
        );
        assert_eq!(f.resolve("nothing").await, Resolution::Unresolved);
    }

    #[tokio::test]
    async fn test_resolve_guesses_sub_output_by_prefix() {
        let parent = "package:\n  name: arrow-cpp\noutputs:\n  - name: arrow-cpp-proc\n  - name: libarrow\n";
        let source = MemorySource::new().with_recipe("arrow-cpp", parent);
        let mut f = fetcher(source);

        match f.resolve("arrow-cpp-proc").await {
            Resolution::Guessed { parent, output } => {
                assert_eq!(parent.feedstock.as_str(), "arrow-cpp");
                assert_eq!(output, "arrow-cpp-proc");
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_guesses_across_separators() {
        let parent = "package:\n  name: foo_bar\noutputs:\n  - name: foo_bar\n";
        let source = MemorySource::new().with_recipe("foo_bar", parent);
        let mut f = fetcher(source);

        let resolution = f.resolve("foo-bar").await;
        assert!(matches!(&resolution, Resolution::Guessed { output, .. } if output == "foo_bar"));
        assert_eq!(resolution.package_name("foo-bar"), "foo_bar");
    }

    #[tokio::test]
    async fn test_resolve_is_repeatable_without_new_requests() {
        let source = MemorySource::new().with_recipe("arrow-cpp", "package:\n  name: arrow-cpp\n");
        let mut f = fetcher(source);
        let first = f.resolve("arrow-cpp-missing").await;
        let requests = f.source().recipe_requests() + f.source().lookup_requests();
        let second = f.resolve("arrow-cpp-missing").await;
        assert_eq!(first, second);
        assert_eq!(f.source().recipe_requests() + f.source().lookup_requests(), requests);
    }
}
