//! Access to the remote recipe repository.
//!
//! Two documents are read from the repository host:
//!
//! - `{base}/{org}/{name}-feedstock/{branch}/recipe/meta.yaml`, the raw recipe
//! - `{base}/{org}/feedstock-outputs/{branch}/outputs/{c1}/{c2}/{c3}/{dep}.json`,
//!   the list of feedstocks producing package `dep`
//!
//! The network boundary is the [`RecipeSource`] trait. [`HttpRecipeSource`]
//! talks to the real host; tests substitute an in-memory source. Everything
//! above the trait (memoization, name resolution) lives in [`fetcher`].

pub mod fetcher;

pub use fetcher::{FetchedRecipe, RecipeFetcher, Resolution};

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::redirect::Policy;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GlobalConfig;
use crate::constants::{FEEDSTOCK_OUTPUTS_REPO, RECIPE_PATH};
use crate::core::{CrawlError, FEEDSTOCK_SUFFIX};

/// Where recipes and feedstock-name lookups come from.
///
/// Both methods report absence as [`CrawlError::NotFound`] and transport
/// problems as [`CrawlError::Network`]; callers treat the two alike.
#[allow(async_fn_in_trait)]
pub trait RecipeSource {
    /// Raw `meta.yaml` text of feedstock `name` on `branch`.
    async fn recipe(&self, name: &str, branch: &str) -> Result<String, CrawlError>;

    /// Feedstocks (without the `-feedstock` suffix) that produce package `dep`.
    async fn feedstock_outputs(&self, dep: &str, branch: &str) -> Result<Vec<String>, CrawlError>;
}

/// Body of a feedstock-outputs document.
#[derive(Debug, Deserialize)]
struct FeedstockOutputs {
    #[serde(default)]
    feedstocks: Vec<String>,
}

/// URL of the recipe of feedstock `name`.
pub fn recipe_url(base_url: &str, org: &str, name: &str, branch: &str) -> String {
    format!(
        "{}/{org}/{name}{FEEDSTOCK_SUFFIX}/{branch}/{RECIPE_PATH}",
        base_url.trim_end_matches('/')
    )
}

/// URL of the feedstock-outputs document for `dep`.
///
/// Returns `None` for identifiers shorter than three characters, which the
/// sharded layout cannot address.
pub fn outputs_url(base_url: &str, org: &str, dep: &str, branch: &str) -> Option<String> {
    let mut chars = dep.chars();
    let (c1, c2, c3) = (chars.next()?, chars.next()?, chars.next()?);
    Some(format!(
        "{}/{org}/{FEEDSTOCK_OUTPUTS_REPO}/{branch}/outputs/{c1}/{c2}/{c3}/{dep}.json",
        base_url.trim_end_matches('/')
    ))
}

/// [`RecipeSource`] backed by an HTTP host serving raw repository files.
#[derive(Debug, Clone)]
pub struct HttpRecipeSource {
    client: reqwest::Client,
    base_url: String,
    org: String,
}

impl HttpRecipeSource {
    /// Build a source from the global configuration.
    ///
    /// Redirects are never followed: the raw-file host answers a renamed or
    /// missing repository with a redirect, which must count as absent.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            &config.org,
            Duration::from_secs(config.request_timeout_secs),
            &config.user_agent(),
        )
    }

    pub fn new(base_url: &str, org: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            org: org.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, CrawlError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(|e| CrawlError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("Could not find {} (HTTP {})", url, status.as_u16());
            return Err(CrawlError::NotFound {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl RecipeSource for HttpRecipeSource {
    async fn recipe(&self, name: &str, branch: &str) -> Result<String, CrawlError> {
        let url = recipe_url(&self.base_url, &self.org, name, branch);
        let response = self.get(&url).await?;
        response.text().await.map_err(|e| CrawlError::Network {
            url,
            reason: e.to_string(),
        })
    }

    async fn feedstock_outputs(&self, dep: &str, branch: &str) -> Result<Vec<String>, CrawlError> {
        let Some(url) = outputs_url(&self.base_url, &self.org, dep, branch) else {
            return Err(CrawlError::NotFound {
                url: dep.to_string(),
                status: 404,
            });
        };
        let response = self.get(&url).await?;
        let body: FeedstockOutputs = response.json().await.map_err(|e| CrawlError::Network {
            url,
            reason: format!("invalid feedstock-outputs document: {e}"),
        })?;
        Ok(body.feedstocks)
    }
}
