//! In-memory recipe source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::constants::DEFAULT_BRANCH;
use crate::core::CrawlError;
use crate::source::{RecipeSource, outputs_url, recipe_url};

const BASE_URL: &str = "memory://recipes";
const ORG: &str = "test-org";

/// [`RecipeSource`] serving fixed documents and counting every request.
#[derive(Debug, Default)]
pub struct MemorySource {
    recipes: HashMap<(String, String), String>,
    outputs: HashMap<String, Vec<String>>,
    recipe_requests: AtomicUsize,
    lookup_requests: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `text` as the recipe of feedstock `name` on the default branch.
    #[must_use]
    pub fn with_recipe(self, name: &str, text: &str) -> Self {
        self.with_branch_recipe(name, DEFAULT_BRANCH, text)
    }

    #[must_use]
    pub fn with_branch_recipe(mut self, name: &str, branch: &str, text: &str) -> Self {
        self.recipes.insert((name.to_string(), branch.to_string()), text.to_string());
        self
    }

    /// List `feedstocks` as the producers of package `dep`.
    #[must_use]
    pub fn with_outputs(mut self, dep: &str, feedstocks: &[&str]) -> Self {
        self.outputs
            .insert(dep.to_string(), feedstocks.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn has_recipe(&self, name: &str, branch: &str) -> bool {
        self.recipes.contains_key(&(name.to_string(), branch.to_string()))
    }

    /// Recipe requests served so far, hits and misses alike.
    pub fn recipe_requests(&self) -> usize {
        self.recipe_requests.load(Ordering::SeqCst)
    }

    pub fn lookup_requests(&self) -> usize {
        self.lookup_requests.load(Ordering::SeqCst)
    }
}

impl RecipeSource for MemorySource {
    async fn recipe(&self, name: &str, branch: &str) -> Result<String, CrawlError> {
        self.recipe_requests.fetch_add(1, Ordering::SeqCst);
        self.recipes
            .get(&(name.to_string(), branch.to_string()))
            .cloned()
            .ok_or_else(|| CrawlError::NotFound {
                url: recipe_url(BASE_URL, ORG, name, branch),
                status: 404,
            })
    }

    async fn feedstock_outputs(&self, dep: &str, branch: &str) -> Result<Vec<String>, CrawlError> {
        self.lookup_requests.fetch_add(1, Ordering::SeqCst);
        self.outputs.get(dep).cloned().ok_or_else(|| CrawlError::NotFound {
            url: outputs_url(BASE_URL, ORG, dep, branch).unwrap_or_else(|| dep.to_string()),
            status: 404,
        })
    }
}
